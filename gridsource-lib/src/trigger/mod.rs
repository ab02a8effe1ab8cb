//! Trigger events and their routing.
//!
//! A trigger is a change on one axis of the data source state. Every change
//! is posted as a [`TriggerEvent`] to the [`TriggerBus`], classified by the
//! [`TriggerPolicy`], and then either applied to the client-side view or
//! delegated to the trigger handler.

mod bus;
mod pending;
mod policy;

pub use bus::Subscription;
pub use bus::TriggerBus;
pub(crate) use pending::PendingTriggers;
pub use policy::Handling;
pub use policy::PolicyBuilder;
pub use policy::TriggerPolicy;

use crate::fetch::SourceRef;
use crate::query::{DataFilter, PageRequest, Sort};

/// The axis a trigger event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TriggerKind {
    /// Filter value changed.
    Filter,
    /// Sort descriptor changed.
    Sort,
    /// Page request changed.
    Page,
    /// A new trigger handler was bound.
    SourceChanged,
    /// Explicit refresh request.
    Refresh,
}

impl TriggerKind {
    /// All kinds, in declaration order.
    pub const ALL: [TriggerKind; 5] = [
        TriggerKind::Filter,
        TriggerKind::Sort,
        TriggerKind::Page,
        TriggerKind::SourceChanged,
        TriggerKind::Refresh,
    ];

    /// Kinds whose handling can be configured per data source.
    pub const CONFIGURABLE: [TriggerKind; 3] =
        [TriggerKind::Filter, TriggerKind::Sort, TriggerKind::Page];

    /// Returns `true` if this kind can be handled on the client.
    pub fn is_configurable(self) -> bool {
        match self {
            TriggerKind::Filter | TriggerKind::Sort | TriggerKind::Page => true,
            TriggerKind::SourceChanged | TriggerKind::Refresh => false,
        }
    }

    fn bit(self) -> u8 {
        match self {
            TriggerKind::Filter => 1,
            TriggerKind::Sort => 1 << 1,
            TriggerKind::Page => 1 << 2,
            TriggerKind::SourceChanged => 1 << 3,
            TriggerKind::Refresh => 1 << 4,
        }
    }
}

impl std::fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TriggerKind::Filter => "filter",
            TriggerKind::Sort => "sort",
            TriggerKind::Page => "page",
            TriggerKind::SourceChanged => "source-changed",
            TriggerKind::Refresh => "refresh",
        };
        f.write_str(name)
    }
}

/// A set of trigger kinds.
///
/// # Example
///
/// ```
/// use gridsource_lib::trigger::{TriggerKind, TriggerSet};
///
/// let set: TriggerSet = [TriggerKind::Filter, TriggerKind::Page].into_iter().collect();
/// assert!(set.contains(TriggerKind::Page));
/// assert!(!set.contains(TriggerKind::Sort));
/// assert_eq!(set.len(), 2);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct TriggerSet(u8);

impl TriggerSet {
    /// The empty set.
    pub const EMPTY: TriggerSet = TriggerSet(0);

    /// Creates a set holding a single kind.
    pub fn only(kind: TriggerKind) -> Self {
        Self(kind.bit())
    }

    /// Adds a kind to the set.
    pub fn insert(&mut self, kind: TriggerKind) {
        self.0 |= kind.bit();
    }

    /// Returns `true` if the set holds `kind`.
    pub fn contains(&self, kind: TriggerKind) -> bool {
        self.0 & kind.bit() != 0
    }

    /// Returns the union of two sets.
    pub fn union(self, other: TriggerSet) -> Self {
        Self(self.0 | other.0)
    }

    /// Returns `true` if the set is empty.
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Returns the number of kinds in the set.
    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// Iterates the kinds in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = TriggerKind> + '_ {
        TriggerKind::ALL.into_iter().filter(|k| self.contains(*k))
    }
}

impl FromIterator<TriggerKind> for TriggerSet {
    fn from_iter<I: IntoIterator<Item = TriggerKind>>(iter: I) -> Self {
        let mut set = TriggerSet::EMPTY;
        for kind in iter {
            set.insert(kind);
        }
        set
    }
}

/// A state change on one axis, carrying the new value.
///
/// `None` clears the axis.
pub enum TriggerEvent<T> {
    /// New filter value.
    Filter(Option<DataFilter<T>>),
    /// New sort descriptor.
    Sort(Option<Sort<T>>),
    /// New page request.
    Page(Option<PageRequest>),
    /// A new trigger handler replaces the bound one.
    SourceChanged(SourceRef<T>),
    /// Explicit re-fetch.
    Refresh,
}

impl<T> TriggerEvent<T> {
    /// Returns the axis this event belongs to.
    pub fn kind(&self) -> TriggerKind {
        match self {
            TriggerEvent::Filter(_) => TriggerKind::Filter,
            TriggerEvent::Sort(_) => TriggerKind::Sort,
            TriggerEvent::Page(_) => TriggerKind::Page,
            TriggerEvent::SourceChanged(_) => TriggerKind::SourceChanged,
            TriggerEvent::Refresh => TriggerKind::Refresh,
        }
    }
}

impl<T> Clone for TriggerEvent<T> {
    fn clone(&self) -> Self {
        match self {
            TriggerEvent::Filter(f) => TriggerEvent::Filter(f.clone()),
            TriggerEvent::Sort(s) => TriggerEvent::Sort(s.clone()),
            TriggerEvent::Page(p) => TriggerEvent::Page(*p),
            TriggerEvent::SourceChanged(src) => TriggerEvent::SourceChanged(src.clone()),
            TriggerEvent::Refresh => TriggerEvent::Refresh,
        }
    }
}

impl<T> std::fmt::Debug for TriggerEvent<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TriggerEvent::Filter(v) => f.debug_tuple("Filter").field(v).finish(),
            TriggerEvent::Sort(v) => f.debug_tuple("Sort").field(v).finish(),
            TriggerEvent::Page(v) => f.debug_tuple("Page").field(v).finish(),
            TriggerEvent::SourceChanged(_) => f.write_str("SourceChanged(..)"),
            TriggerEvent::Refresh => f.write_str("Refresh"),
        }
    }
}
