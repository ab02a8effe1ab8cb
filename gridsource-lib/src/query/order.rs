//! Sort descriptors for the sort axis.

use std::cmp::Ordering;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Comparator used when the sort axis is handled on the client.
pub type CompareFn<T> = Arc<dyn Fn(&T, &T) -> Ordering + Send + Sync>;

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Ascending order (A-Z, 0-9).
    Asc,
    /// Descending order (Z-A, 9-0).
    Desc,
}

impl Direction {
    /// Returns the opposite direction.
    pub fn reverse(self) -> Self {
        match self {
            Direction::Asc => Direction::Desc,
            Direction::Desc => Direction::Asc,
        }
    }
}

/// A sort descriptor.
///
/// The `id` names the sorted column so a provider handling the sort axis can
/// translate it into its own query. The comparator is only used when sorting
/// on the client, where ties always keep their raw-collection order.
///
/// # Example
///
/// ```
/// use gridsource_lib::query::{Direction, Sort};
///
/// let by_len = Sort::by_key("len", Direction::Desc, |s: &String| s.len());
/// assert_eq!(by_len.id(), "len");
/// assert_eq!(by_len.direction(), Direction::Desc);
/// ```
pub struct Sort<T> {
    id: String,
    direction: Direction,
    compare: CompareFn<T>,
}

impl<T> Sort<T> {
    /// Creates a sort descriptor with an explicit direction and comparator.
    pub fn new<F>(id: impl Into<String>, direction: Direction, compare: F) -> Self
    where
        F: Fn(&T, &T) -> Ordering + Send + Sync + 'static,
    {
        Self {
            id: id.into(),
            direction,
            compare: Arc::new(compare),
        }
    }

    /// Creates an ascending sort.
    pub fn asc<F>(id: impl Into<String>, compare: F) -> Self
    where
        F: Fn(&T, &T) -> Ordering + Send + Sync + 'static,
    {
        Self::new(id, Direction::Asc, compare)
    }

    /// Creates a descending sort.
    pub fn desc<F>(id: impl Into<String>, compare: F) -> Self
    where
        F: Fn(&T, &T) -> Ordering + Send + Sync + 'static,
    {
        Self::new(id, Direction::Desc, compare)
    }

    /// Creates a sort comparing an extracted key.
    pub fn by_key<K, F>(id: impl Into<String>, direction: Direction, key: F) -> Self
    where
        K: Ord,
        F: Fn(&T) -> K + Send + Sync + 'static,
    {
        Self::new(id, direction, move |a, b| key(a).cmp(&key(b)))
    }

    /// Returns the same descriptor with the direction flipped.
    pub fn reversed(&self) -> Self {
        Self {
            id: self.id.clone(),
            direction: self.direction.reverse(),
            compare: Arc::clone(&self.compare),
        }
    }

    /// Returns the sorted column id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the sort direction.
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Compares two records, honoring the direction.
    ///
    /// Descending order swaps the operands, so records the comparator deems
    /// equal still compare equal.
    pub fn compare(&self, a: &T, b: &T) -> Ordering {
        match self.direction {
            Direction::Asc => (self.compare)(a, b),
            Direction::Desc => (self.compare)(b, a),
        }
    }
}

impl<T> Clone for Sort<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            direction: self.direction,
            compare: Arc::clone(&self.compare),
        }
    }
}

impl<T> std::fmt::Debug for Sort<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sort")
            .field("id", &self.id)
            .field("direction", &self.direction)
            .finish_non_exhaustive()
    }
}
