//! Read-only snapshot of the derived view.

use std::sync::Arc;

/// The rows exposed to rendering, as a read-only snapshot.
///
/// A `Rows` shares the raw collection it was derived from and holds the
/// indexes of the visible records, so taking one never copies records and
/// later changes to the data source never affect it.
pub struct Rows<T> {
    raw: Arc<[T]>,
    indices: Arc<[usize]>,
}

impl<T> Rows<T> {
    pub(crate) fn new(raw: Arc<[T]>, indices: Vec<usize>) -> Self {
        Self {
            raw,
            indices: indices.into(),
        }
    }

    /// An empty snapshot.
    pub fn empty() -> Self {
        Self {
            raw: Arc::from(Vec::new()),
            indices: Arc::from(Vec::new()),
        }
    }

    /// Number of visible rows.
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// Returns `true` if no rows are visible.
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Returns the visible row at `index`.
    pub fn get(&self, index: usize) -> Option<&T> {
        self.indices.get(index).map(|&i| &self.raw[i])
    }

    /// Returns the raw-collection index of the visible row at `index`.
    pub fn source_index(&self, index: usize) -> Option<usize> {
        self.indices.get(index).copied()
    }

    /// Iterates the visible rows in order.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            raw: &self.raw,
            indices: self.indices.iter(),
        }
    }

    /// Copies the visible rows into a vector.
    pub fn to_vec(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.iter().cloned().collect()
    }
}

impl<T> Clone for Rows<T> {
    fn clone(&self) -> Self {
        Self {
            raw: Arc::clone(&self.raw),
            indices: Arc::clone(&self.indices),
        }
    }
}

impl<T> Default for Rows<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Rows<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T: PartialEq> PartialEq for Rows<T> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().zip(other.iter()).all(|(a, b)| a == b)
    }
}

impl<'a, T> IntoIterator for &'a Rows<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over the visible rows of a [`Rows`] snapshot.
pub struct Iter<'a, T> {
    raw: &'a [T],
    indices: std::slice::Iter<'a, usize>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let raw = self.raw;
        self.indices.next().map(move |&i| &raw[i])
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.indices.size_hint()
    }
}

impl<T> DoubleEndedIterator for Iter<'_, T> {
    fn next_back(&mut self) -> Option<Self::Item> {
        let raw = self.raw;
        self.indices.next_back().map(move |&i| &raw[i])
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}
