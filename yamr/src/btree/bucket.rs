//! Sorted key → value container shared by leaves and internal nodes.

use crate::btree::error::TreeError;

/// Unique keys in ascending order, each mapped to a `V`.
///
/// Leaves store `V = Vec<u8>`; internal nodes store child references.
#[derive(Debug)]
pub struct Bucket<V> {
    entries: Vec<(Vec<u8>, V)>,
}

impl<V> Bucket<V> {
    /// Create an empty bucket.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Build a bucket from entries that must already be strictly ascending.
    ///
    /// Returns `None` if the keys are out of order or repeated.
    #[must_use]
    pub fn from_sorted(entries: Vec<(Vec<u8>, V)>) -> Option<Self> {
        let ascending = entries.windows(2).all(|pair| pair[0].0 < pair[1].0);
        ascending.then_some(Self { entries })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn find(&self, key: &[u8]) -> Result<usize, usize> {
        self.entries
            .binary_search_by(|(k, _)| k.as_slice().cmp(key))
    }

    /// Get a value by key.
    #[must_use]
    pub fn get(&self, key: &[u8]) -> Option<&V> {
        self.find(key).ok().map(|i| &self.entries[i].1)
    }

    /// Insert or replace an entry.
    ///
    /// Returns the old value if the key was already present.
    pub fn upsert(&mut self, key: Vec<u8>, value: V) -> Option<V> {
        match self.find(&key) {
            Ok(i) => Some(std::mem::replace(&mut self.entries[i].1, value)),
            Err(i) => {
                self.entries.insert(i, (key, value));
                None
            }
        }
    }

    /// Index of the entry with the largest key `<= key`, if any.
    #[must_use]
    pub fn floor_index(&self, key: &[u8]) -> Option<usize> {
        match self.find(key) {
            Ok(i) => Some(i),
            Err(0) => None,
            Err(i) => Some(i - 1),
        }
    }

    #[must_use]
    pub fn first_key(&self) -> Option<&[u8]> {
        self.entries.first().map(|(k, _)| k.as_slice())
    }

    #[must_use]
    pub fn last_key(&self) -> Option<&[u8]> {
        self.entries.last().map(|(k, _)| k.as_slice())
    }

    #[must_use]
    pub fn key_at(&self, index: usize) -> Option<&[u8]> {
        self.entries.get(index).map(|(k, _)| k.as_slice())
    }

    pub fn value_at_mut(&mut self, index: usize) -> Option<&mut V> {
        self.entries.get_mut(index).map(|(_, v)| v)
    }

    /// Move every entry from `at` onwards into a new bucket.
    #[must_use]
    pub fn split_off(&mut self, at: usize) -> Self {
        Self {
            entries: self.entries.split_off(at),
        }
    }

    /// Remove and return the smallest entry.
    pub fn pop_first(&mut self) -> Option<(Vec<u8>, V)> {
        if self.entries.is_empty() {
            None
        } else {
            Some(self.entries.remove(0))
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &[u8]> {
        self.entries.iter().map(|(k, _)| k.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&[u8], &V)> {
        self.entries.iter().map(|(k, v)| (k.as_slice(), v))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&[u8], &mut V)> {
        self.entries.iter_mut().map(|(k, v)| (k.as_slice(), v))
    }

    /// Entries with key `>= key`, in order.
    pub fn range_from(&self, key: &[u8]) -> impl Iterator<Item = (&[u8], &V)> {
        let start = self.find(key).unwrap_or_else(|i| i);
        self.entries[start..].iter().map(|(k, v)| (k.as_slice(), v))
    }
}

impl<V> Default for Bucket<V> {
    fn default() -> Self {
        Self::new()
    }
}

/// Check both halves of a split against the bucket invariant.
///
/// `lower` keeps everything below `separator`, `upper` everything at or above
/// it, and neither may still be full.
pub fn check_split<A, B>(
    lower: &Bucket<A>,
    separator: &[u8],
    upper: &Bucket<B>,
    max_size: usize,
) -> Result<(), TreeError> {
    let violation = |detail: String| Err(TreeError::OverflowInvariantViolation(detail));

    if lower.is_empty() {
        return violation("lower half of split is empty".to_string());
    }
    if lower.len() >= max_size || upper.len() >= max_size {
        return violation(format!(
            "split halves of {} and {} entries with max_size {max_size}",
            lower.len(),
            upper.len()
        ));
    }
    if lower.last_key().is_some_and(|last| last >= separator) {
        return violation("lower half reaches past the separator".to_string());
    }
    if upper.first_key().is_some_and(|first| first < separator) {
        return violation("upper half starts below the separator".to_string());
    }
    Ok(())
}
