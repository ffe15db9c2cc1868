use std::any::Any;
use std::sync::Arc;

/// Type-erased payload for one bound value.  The concrete type behind
/// the `Any` is fixed by the `Identity` that owns the binding.
pub(crate) type Value = Arc<dyn Any>;

/// Equality over erased payloads, instantiated per concrete value type.
/// A downcast miss compares unequal rather than panicking; it can only
/// happen if two identities with different value types end up in one
/// group, which the typed construction surface does not allow.
fn any_eq<V: PartialEq + 'static>(lhs: &dyn Any, rhs: &dyn Any) -> bool {
    match (lhs.downcast_ref::<V>(), rhs.downcast_ref::<V>()) {
        (Some(lhs), Some(rhs)) => lhs == rhs,
        _ => false,
    }
}

/// The derivation tag of a derived identity: which identity it was
/// decomposed from, and under which key.
pub(crate) struct Basis {
    pub(crate) source: Identity,
    pub(crate) key: String,
}

struct Inner {
    sequence: u64,
    basis: Option<Basis>,
    equal: fn(&dyn Any, &dyn Any) -> bool,
}

/// An `Identity` names one logical variable's storage slot.
///
/// Plain identities are unique: each call to `fresh` compares equal
/// only to its own clones.  Derived identities instead compare
/// *structurally*, by `(source, key)`: two call sites that decompose
/// the same source under the same key converge on the same slot, no
/// matter how many handle objects they allocate along the way.
///
/// An identity also remembers how to compare two bound values of its
/// declared value type, so the store can detect conflicting bindings
/// after the type has been erased.
#[derive(Clone)]
pub struct Identity {
    inner: Arc<Inner>,
}

impl Identity {
    /// Returns the identity of a brand-new plain variable of value
    /// type `V`.
    pub(crate) fn fresh<V: PartialEq + 'static>() -> Self {
        Self {
            inner: Arc::new(Inner {
                sequence: next_sequence(),
                basis: None,
                equal: any_eq::<V>,
            }),
        }
    }

    /// Returns the identity of a variable of value type `V` derived
    /// from `source` under `key`.
    pub(crate) fn derived<V: PartialEq + 'static>(source: &Identity, key: String) -> Self {
        Self {
            inner: Arc::new(Inner {
                sequence: next_sequence(),
                basis: Some(Basis {
                    source: source.clone(),
                    key,
                }),
                equal: any_eq::<V>,
            }),
        }
    }

    /// Compares two erased payloads with this identity's value type.
    pub(crate) fn values_equal(&self, lhs: &Value, rhs: &Value) -> bool {
        (self.inner.equal)(lhs.as_ref(), rhs.as_ref())
    }

    pub(crate) fn basis(&self) -> Option<&Basis> {
        self.inner.basis.as_ref()
    }
}

fn next_sequence() -> u64 {
    use std::sync::atomic::{AtomicU64, Ordering};
    static IDENTITY_COUNTER: AtomicU64 = AtomicU64::new(0);

    IDENTITY_COUNTER.fetch_add(1, Ordering::Relaxed)
}

impl PartialEq for Identity {
    fn eq(&self, other: &Self) -> bool {
        match (&self.inner.basis, &other.inner.basis) {
            (Some(lhs), Some(rhs)) => lhs.source == rhs.source && lhs.key == rhs.key,
            _ => self.inner.sequence == other.inner.sequence,
        }
    }
}

impl Eq for Identity {}

impl std::hash::Hash for Identity {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        // Must agree with `eq`: derived identities hash their basis,
        // plain ones their sequence id.
        match &self.inner.basis {
            Some(basis) => {
                basis.source.hash(state);
                basis.key.hash(state);
            }
            None => self.inner.sequence.hash(state),
        }
    }
}

impl std::fmt::Debug for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.inner.basis {
            Some(basis) => write!(f, "{:?}/{}", basis.source, basis.key),
            None => write!(f, "Identity({})", self.inner.sequence),
        }
    }
}

#[test]
fn test_fresh_identities_are_distinct() {
    let id0 = Identity::fresh::<i32>();
    let id1 = Identity::fresh::<i32>();

    assert_eq!(id0, id0.clone());
    assert_ne!(id0, id1);
}

#[test]
fn test_derived_identities_compare_structurally() {
    let source = Identity::fresh::<(i32, i32)>();
    let other = Identity::fresh::<(i32, i32)>();

    // Independently constructed handles for the same decomposition
    // are the same identity.
    let left = Identity::derived::<i32>(&source, "pair.0".into());
    let left_again = Identity::derived::<i32>(&source, "pair.0".into());
    assert_eq!(left, left_again);

    // A different key, or a different source, is a different slot.
    let right = Identity::derived::<i32>(&source, "pair.1".into());
    assert_ne!(left, right);
    assert_ne!(left, Identity::derived::<i32>(&other, "pair.0".into()));
}

#[test]
fn test_derived_identities_hash_structurally() {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::Hash;
    use std::hash::Hasher;

    let source = Identity::fresh::<(i32, i32)>();
    let left = Identity::derived::<i32>(&source, "pair.0".into());
    let left_again = Identity::derived::<i32>(&source, "pair.0".into());

    let mut h0 = DefaultHasher::new();
    let mut h1 = DefaultHasher::new();

    left.hash(&mut h0);
    left_again.hash(&mut h1);
    assert_eq!(h0.finish(), h1.finish());
}

#[test]
fn test_values_equal_uses_declared_type() {
    let id = Identity::fresh::<String>();
    let a: Value = Arc::new("a".to_owned());
    let a_again: Value = Arc::new("a".to_owned());
    let b: Value = Arc::new("b".to_owned());

    assert!(id.values_equal(&a, &a_again));
    assert!(!id.values_equal(&a, &b));

    // Payloads of the wrong type never compare equal.
    let three: Value = Arc::new(3i32);
    assert!(!id.values_equal(&a, &three));
}
