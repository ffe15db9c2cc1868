//! Round-robin merging of sibling generators.
use crate::Generator;
use std::collections::VecDeque;

/// Iterator over a rotating queue of branches: one value per live
/// branch per rotation, exhausted branches dropped on the spot.
pub(crate) struct Interleave<T> {
    queue: VecDeque<Generator<T>>,
}

impl<T> Interleave<T> {
    pub(crate) fn new(branches: Vec<Generator<T>>) -> Self {
        Self {
            queue: branches.into_iter().collect(),
        }
    }
}

impl<T> Iterator for Interleave<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        while let Some(mut branch) = self.queue.pop_front() {
            if let Some(value) = branch.next() {
                self.queue.push_back(branch);
                return Some(value);
            }
            // Exhausted branches are not requeued.
        }

        None
    }
}

#[test]
fn test_exhausted_branches_drop_out() {
    // Once the short branch runs dry the rotation continues over the
    // survivors only.
    let short = Generator::from_values(vec![1u32]);
    let long = Generator::from_values(vec![2u32, 3, 4]);

    let merged: Vec<u32> = Interleave::new(vec![short, long]).collect();
    assert_eq!(merged, [1, 2, 3, 4]);
}

#[test]
fn test_empty_queue_is_exhausted() {
    let mut merged = Interleave::<u32>::new(vec![]);
    assert_eq!(merged.next(), None);
}

#[test]
fn test_initially_empty_branches_are_skipped() {
    let merged: Vec<u32> = Interleave::new(vec![
        Generator::empty(),
        Generator::from_values(vec![7, 8]),
        Generator::empty(),
    ])
    .collect();
    assert_eq!(merged, [7, 8]);
}
