//! Lock-free work queue for distributing rows across parallel workers

use std::sync::atomic::{AtomicUsize, Ordering};

/// Lock-free queue of `(index, item)` pairs.
///
/// Workers call [`next()`](WorkQueue::next) to claim the next pair. The index
/// is the item's position in the caller's original sequence, so results can
/// be written back in place regardless of completion order.
pub struct WorkQueue<S> {
    items: Vec<(usize, S)>,
    cursor: AtomicUsize,
}

impl<S> WorkQueue<S> {
    /// Queue every item, indexed by position
    pub fn new(items: Vec<S>) -> Self {
        Self::from_indexed(items.into_iter().enumerate().collect())
    }

    /// Queue only items passing `keep` (resume support); indices are the
    /// positions in the unfiltered sequence
    pub fn filtered(items: Vec<S>, keep: impl Fn(&S) -> bool) -> Self {
        let indexed: Vec<(usize, S)> = items
            .into_iter()
            .enumerate()
            .filter(|(_, s)| keep(s))
            .collect();
        log::debug!("{} items in work queue", indexed.len());
        Self::from_indexed(indexed)
    }

    pub fn from_indexed(items: Vec<(usize, S)>) -> Self {
        Self {
            items,
            cursor: AtomicUsize::new(0),
        }
    }

    /// Claim the next item (lock-free)
    pub fn next(&self) -> Option<(usize, &S)> {
        let i = self.cursor.fetch_add(1, Ordering::Relaxed);
        self.items.get(i).map(|(idx, s)| (*idx, s))
    }

    /// Total items in queue
    pub fn total(&self) -> usize {
        self.items.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_indexes_by_position() {
        let q = WorkQueue::new(vec!["a", "b"]);
        assert_eq!(q.total(), 2);
        assert_eq!(q.next(), Some((0, &"a")));
        assert_eq!(q.next(), Some((1, &"b")));
        assert_eq!(q.next(), None);
        assert_eq!(q.next(), None);
    }

    #[test]
    fn filtered_keeps_original_indices() {
        let q = WorkQueue::filtered(vec![1, 2, 3, 4], |x| *x % 2 == 0);
        assert_eq!(q.total(), 2);
        assert_eq!(q.next(), Some((1, &2)));
        assert_eq!(q.next(), Some((3, &4)));
        assert_eq!(q.next(), None);
    }

    #[test]
    fn concurrent_claims_are_disjoint() {
        let q = WorkQueue::new((0..1000).collect::<Vec<_>>());
        let claimed = std::sync::Mutex::new(Vec::new());
        std::thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| {
                    while let Some((idx, _)) = q.next() {
                        claimed.lock().unwrap().push(idx);
                    }
                });
            }
        });
        let mut claimed = claimed.into_inner().unwrap();
        claimed.sort_unstable();
        assert_eq!(claimed, (0..1000).collect::<Vec<_>>());
    }
}
