use std::hash::Hash;
use std::sync::Arc;

/// One equivalence group: the full set of keys assigned to it, and the
/// value they all share.  Nodes are immutable; every change allocates a
/// replacement node and repoints the member keys at it.
struct Node<K, V> {
    keys: im::HashSet<K>,
    value: Option<V>,
}

/// A persistent map from keys to group values, where any two keys can
/// be merged into a single group that shares one value.
///
/// Reading or writing through any member key sees the group's value.
/// Cloning a `Context` is cheap (structural sharing), and mutating a
/// clone never affects the original, which is what lets a search engine
/// fork a snapshot per branch.
///
/// A group carries its full member-key set, so updates and merges cost
/// one map write per member.  Member sets stay small in practice (they
/// are bounded by decomposition fan-out), and in exchange reads are a
/// single lookup with no chasing.
pub struct Context<K, V> {
    nodes: im::HashMap<K, Arc<Node<K, V>>>,
}

impl<K: Hash + Eq + Clone, V> Context<K, V> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: im::HashMap::new(),
        }
    }

    /// Returns the value shared by `key`'s group, if the group has one.
    #[must_use]
    pub fn get(&self, key: &K) -> Option<&V> {
        self.nodes.get(key).and_then(|node| node.value.as_ref())
    }

    /// Sets the value of `key`'s group, creating a singleton group for
    /// a previously-unseen key.
    pub fn insert(&mut self, key: K, value: V) {
        self.update(key, |_| Some(value));
    }

    /// Replaces the value of `key`'s group with `transform` applied to
    /// the current value.  Returning `None` clears the value but keeps
    /// the group intact.
    pub fn update(&mut self, key: K, transform: impl FnOnce(Option<&V>) -> Option<V>) {
        let old_node = self.nodes.get(&key).cloned();
        let new_value = transform(old_node.as_ref().and_then(|node| node.value.as_ref()));

        let all_keys = match &old_node {
            Some(node) => node.keys.clone(),
            None => im::HashSet::unit(key.clone()),
        };

        self.assign(all_keys, new_value);
    }

    /// Unions the groups of `key1` and `key2` (creating singleton
    /// groups for previously-unseen keys) into one group whose value is
    /// `combine` applied to the two old values.
    ///
    /// # Errors
    ///
    /// Propagates `combine`'s error; the context is left untouched in
    /// that case.
    pub fn merge<E>(
        &mut self,
        key1: K,
        key2: K,
        combine: impl FnOnce(Option<&V>, Option<&V>) -> Result<Option<V>, E>,
    ) -> Result<(), E> {
        let node1 = self.nodes.get(&key1).cloned();
        let node2 = self.nodes.get(&key2).cloned();

        let new_value = combine(
            node1.as_ref().and_then(|node| node.value.as_ref()),
            node2.as_ref().and_then(|node| node.value.as_ref()),
        )?;

        let mut all_keys = match &node1 {
            Some(node) => node.keys.clone(),
            None => im::HashSet::new(),
        };
        if let Some(node) = &node2 {
            all_keys = all_keys.union(node.keys.clone());
        }
        all_keys.insert(key1);
        all_keys.insert(key2);

        self.assign(all_keys, new_value);
        Ok(())
    }

    /// Drops `key`'s own membership record.  Other members of the
    /// group keep the shared node and its value.
    pub fn remove(&mut self, key: &K) {
        self.nodes.remove(key);
    }

    /// Points every key in `keys` at one fresh node holding `value`.
    fn assign(&mut self, keys: im::HashSet<K>, value: Option<V>) {
        let node = Arc::new(Node {
            keys: keys.clone(),
            value,
        });
        for member in keys.iter() {
            self.nodes.insert(member.clone(), node.clone());
        }
    }
}

impl<K: Clone, V> Clone for Context<K, V> {
    fn clone(&self) -> Self {
        Self {
            nodes: self.nodes.clone(),
        }
    }
}

impl<K: Hash + Eq + Clone, V> Default for Context<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

#[test]
fn test_insert_and_clear() {
    let mut context = Context::<String, i32>::new();

    assert_eq!(context.get(&"a".to_owned()), None);

    context.insert("a".to_owned(), 8);
    assert_eq!(context.get(&"a".to_owned()), Some(&8));

    // Clearing the value keeps the group alive.
    context.update("a".to_owned(), |_| None);
    assert_eq!(context.get(&"a".to_owned()), None);

    context.insert("a".to_owned(), 7);
    assert_eq!(context.get(&"a".to_owned()), Some(&7));
}

#[test]
fn test_update_sees_the_old_value() {
    let mut context = Context::<String, i32>::new();

    context.update("a".to_owned(), |value| {
        assert_eq!(value, None);
        Some(7)
    });
    assert_eq!(context.get(&"a".to_owned()), Some(&7));

    context.update("a".to_owned(), |value| {
        assert_eq!(value, Some(&7));
        Some(3)
    });
    assert_eq!(context.get(&"a".to_owned()), Some(&3));
}

#[test]
fn test_merge_shares_one_value() {
    let mut context = Context::<String, i32>::new();

    context
        .merge("a".to_owned(), "b".to_owned(), |_, _| Ok::<_, ()>(Some(3)))
        .expect("ok");
    assert_eq!(context.get(&"a".to_owned()), Some(&3));
    assert_eq!(context.get(&"b".to_owned()), Some(&3));

    // Writing through one member is visible through the other.
    context.insert("a".to_owned(), 4);
    assert_eq!(context.get(&"a".to_owned()), Some(&4));
    assert_eq!(context.get(&"b".to_owned()), Some(&4));

    // Growing the group transitively covers all three keys.
    context
        .merge("b".to_owned(), "c".to_owned(), |_, _| Ok::<_, ()>(None))
        .expect("ok");
    assert_eq!(context.get(&"a".to_owned()), None);
    assert_eq!(context.get(&"b".to_owned()), None);
    assert_eq!(context.get(&"c".to_owned()), None);

    context.insert("a".to_owned(), 6);
    assert_eq!(context.get(&"a".to_owned()), Some(&6));
    assert_eq!(context.get(&"b".to_owned()), Some(&6));
    assert_eq!(context.get(&"c".to_owned()), Some(&6));
}

#[test]
fn test_merge_error_leaves_context_untouched() {
    let mut context = Context::<String, i32>::new();
    context.insert("a".to_owned(), 1);
    context.insert("b".to_owned(), 2);

    let result = context.merge("a".to_owned(), "b".to_owned(), |_, _| Err("clash"));
    assert_eq!(result, Err("clash"));

    // The old singleton groups survive.
    assert_eq!(context.get(&"a".to_owned()), Some(&1));
    assert_eq!(context.get(&"b".to_owned()), Some(&2));
    context.insert("a".to_owned(), 9);
    assert_eq!(context.get(&"b".to_owned()), Some(&2));
}

#[test]
fn test_copies_are_independent() {
    let mut original = Context::<String, i32>::new();
    original.insert("a".to_owned(), 4);

    let mut copy = original.clone();
    copy.insert("a".to_owned(), 5);

    assert_eq!(original.get(&"a".to_owned()), Some(&4));
    assert_eq!(copy.get(&"a".to_owned()), Some(&5));
}

#[test]
fn test_merged_copies_are_independent() {
    // Merging in a copy must not leak group structure back into the
    // original.
    let mut original = Context::<String, i32>::new();
    original.insert("a".to_owned(), 4);

    let mut copy = original.clone();
    copy.merge("a".to_owned(), "b".to_owned(), |a, _| Ok::<_, ()>(a.copied()))
        .expect("ok");
    copy.insert("b".to_owned(), 5);

    assert_eq!(original.get(&"a".to_owned()), Some(&4));
    assert_eq!(original.get(&"b".to_owned()), None);
    assert_eq!(copy.get(&"a".to_owned()), Some(&5));
}

#[test]
fn test_remove_forgets_one_key() {
    let mut context = Context::<String, i32>::new();
    context.insert("a".to_owned(), 8);

    assert_eq!(context.get(&"a".to_owned()), Some(&8));
    context.remove(&"a".to_owned());
    assert_eq!(context.get(&"a".to_owned()), None);

    // Removing one member leaves the rest of its group readable.
    context
        .merge("b".to_owned(), "c".to_owned(), |_, _| Ok::<_, ()>(Some(5)))
        .expect("ok");
    context.remove(&"b".to_owned());
    assert_eq!(context.get(&"b".to_owned()), None);
    assert_eq!(context.get(&"c".to_owned()), Some(&5));
}
