//! A `Generator` is a pull-based stream of values: it hands out one
//! value per call to `next`, may well be infinite, and is consumed as
//! it is traversed (there is no rewinding).  On top of the usual lazy
//! `map`/`flat_map` plumbing, generators know how to *interleave*: a
//! round-robin merge of sibling streams that keeps every sibling
//! productive even when one of them never runs dry.
mod interleave;

/// A lazy, possibly-infinite sequence of values.
///
/// Each `Generator` represents the values *remaining*, not the values
/// total: pulling from a generator permanently consumes its front.
pub struct Generator<T> {
    source: Box<dyn Iterator<Item = T>>,
}

impl<T: 'static> Generator<T> {
    /// Wraps an arbitrary iterator.
    #[must_use]
    pub fn new(source: impl Iterator<Item = T> + 'static) -> Self {
        Self {
            source: Box::new(source),
        }
    }

    /// Returns a generator that is exhausted from the start.
    #[must_use]
    pub fn empty() -> Self {
        Self::new(std::iter::empty())
    }

    /// Returns a generator that yields `value` and nothing else.
    #[must_use]
    pub fn once(value: T) -> Self {
        Self::new(std::iter::once(value))
    }

    /// Returns a generator over a fixed sequence of values, in order.
    #[must_use]
    pub fn from_values(values: Vec<T>) -> Self {
        Self::new(values.into_iter())
    }

    /// Returns a generator that pulls values from `produce` until it
    /// returns `None`.  The closure is only invoked as values are
    /// demanded, so it may represent an unbounded sequence.
    #[must_use]
    pub fn from_fn(produce: impl FnMut() -> Option<T> + 'static) -> Self {
        Self::new(std::iter::from_fn(produce))
    }

    /// Returns a round-robin merge of `branches`.
    ///
    /// Each pull takes one value from the branch at the front of an
    /// internal queue and sends that branch to the back; exhausted
    /// branches are dropped.  No branch can starve another: a value
    /// sitting at the front of any live branch is reached after at
    /// most one pull per sibling.
    #[must_use]
    pub fn interleave(branches: Vec<Generator<T>>) -> Self {
        Self::new(interleave::Interleave::new(branches))
    }

    /// Lazily transforms each value.
    #[must_use]
    pub fn map<U: 'static>(self, transform: impl FnMut(T) -> U + 'static) -> Generator<U> {
        Generator::new(self.source.map(transform))
    }

    /// Lazily transforms each value, dropping the misses.
    #[must_use]
    pub fn filter_map<U: 'static>(
        self,
        transform: impl FnMut(T) -> Option<U> + 'static,
    ) -> Generator<U> {
        Generator::new(self.source.filter_map(transform))
    }

    /// Lazily expands each value into its own generator and yields the
    /// expansions back to back, in encounter order.
    #[must_use]
    pub fn flat_map<U: 'static>(
        self,
        transform: impl FnMut(T) -> Generator<U> + 'static,
    ) -> Generator<U> {
        Generator::new(self.source.flat_map(transform))
    }
}

impl<T: 'static> Default for Generator<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T> Iterator for Generator<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.source.next()
    }
}

#[test]
fn test_from_values_yields_in_order() {
    let values: Vec<u32> = Generator::from_values(vec![1, 2, 3]).collect();
    assert_eq!(values, [1, 2, 3]);
}

#[test]
fn test_empty_is_exhausted() {
    let mut empty = Generator::<u32>::empty();
    assert_eq!(empty.next(), None);
    assert_eq!(empty.next(), None);
}

#[test]
fn test_from_fn_is_lazy() {
    // The producer must not run ahead of demand.
    use std::cell::Cell;
    use std::rc::Rc;

    let calls = Rc::new(Cell::new(0u32));
    let counter = calls.clone();
    let mut naturals = Generator::from_fn(move || {
        counter.set(counter.get() + 1);
        Some(counter.get())
    });

    assert_eq!(calls.get(), 0);
    assert_eq!(naturals.next(), Some(1));
    assert_eq!(naturals.next(), Some(2));
    assert_eq!(calls.get(), 2);
}

#[test]
fn test_map_and_filter_map() {
    let doubled: Vec<u32> = Generator::from_values(vec![1, 2, 3])
        .map(|x| 2 * x)
        .collect();
    assert_eq!(doubled, [2, 4, 6]);

    let odd: Vec<u32> = Generator::from_values(vec![1, 2, 3, 4, 5])
        .filter_map(|x| if x % 2 == 1 { Some(x) } else { None })
        .collect();
    assert_eq!(odd, [1, 3, 5]);
}

#[test]
fn test_flat_map_concatenates_in_encounter_order() {
    let expanded: Vec<u32> = Generator::from_values(vec![1u32, 2, 3])
        .flat_map(|x| Generator::from_values(vec![10 * x, 10 * x + 1]))
        .collect();
    assert_eq!(expanded, [10, 11, 20, 21, 30, 31]);
}

#[test]
fn test_flat_map_is_lazy_on_infinite_input() {
    // An infinite upstream is fine as long as we only take a prefix.
    let mut n = 0u32;
    let naturals = Generator::from_fn(move || {
        n += 1;
        Some(n)
    });

    let prefix: Vec<u32> = naturals
        .flat_map(|x| Generator::once(x * x))
        .take(4)
        .collect();
    assert_eq!(prefix, [1, 4, 9, 16]);
}

#[test]
fn test_interleave_takes_turns() {
    // Pops the front branch, takes one value, requeues it: with two
    // live branches the merge alternates.
    let odd = Generator::from_values(vec![1u32, 3, 5]);
    let even = Generator::from_values(vec![2u32, 4]);

    let merged: Vec<u32> = Generator::interleave(vec![odd, even]).collect();
    assert_eq!(merged, [1, 2, 3, 4, 5]);
}

#[test]
fn test_interleave_never_starves_a_finite_branch() {
    // One branch yields forever; the other holds a single value.  The
    // singleton must surface within one full rotation of the queue.
    let mut n = 0u32;
    let endless = Generator::from_fn(move || {
        n += 1;
        Some(n)
    });
    let lone = Generator::once(99u32);

    let prefix: Vec<u32> = Generator::interleave(vec![endless, lone]).take(4).collect();
    assert!(prefix[..2].contains(&99), "prefix was {prefix:?}");
}
