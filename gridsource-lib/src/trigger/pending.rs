//! Delegated triggers buffered until a handler is attached.

use super::{TriggerEvent, TriggerSet};

/// Buffer of delegated triggers posted while no handler is attached.
///
/// Only the most recent event per kind is kept. On attach the buffer is
/// coalesced into a single fetch: the request lists every buffered kind and
/// carries the last buffered event as its reason.
pub(crate) struct PendingTriggers<T> {
    events: Vec<(u64, TriggerEvent<T>)>,
    seq: u64,
}

impl<T> PendingTriggers<T> {
    pub(crate) fn new() -> Self {
        Self {
            events: Vec::new(),
            seq: 0,
        }
    }

    /// Buffers an event, replacing any earlier event of the same kind.
    pub(crate) fn push(&mut self, event: TriggerEvent<T>) {
        let kind = event.kind();
        self.events.retain(|(_, e)| e.kind() != kind);
        self.seq += 1;
        self.events.push((self.seq, event));
    }

    /// Returns `true` if nothing is buffered.
    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Number of buffered kinds.
    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.events.len()
    }

    /// Buffered kinds.
    pub(crate) fn kinds(&self) -> TriggerSet {
        self.events.iter().map(|(_, e)| e.kind()).collect()
    }

    /// Drains the buffer into one coalesced trigger: the set of buffered
    /// kinds and the most recently buffered event.
    pub(crate) fn take(&mut self) -> Option<(TriggerSet, TriggerEvent<T>)> {
        let kinds = self.kinds();
        let (_, last) = self.events.drain(..).max_by_key(|(seq, _)| *seq)?;
        Some((kinds, last))
    }

    pub(crate) fn clear(&mut self) {
        self.events.clear();
    }

    /// Returns the latest buffered event of `kind`, if any.
    #[cfg(test)]
    pub(crate) fn latest(&self, kind: super::TriggerKind) -> Option<&TriggerEvent<T>> {
        self.events
            .iter()
            .find(|(_, e)| e.kind() == kind)
            .map(|(_, e)| e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{DataFilter, PageRequest};
    use crate::trigger::TriggerKind;

    #[test]
    fn test_collapses_per_kind() {
        let mut pending: PendingTriggers<u32> = PendingTriggers::new();
        pending.push(TriggerEvent::Filter(Some(DataFilter::text("a"))));
        pending.push(TriggerEvent::Filter(Some(DataFilter::text("ab"))));
        assert_eq!(pending.len(), 1);

        match pending.latest(TriggerKind::Filter) {
            Some(TriggerEvent::Filter(Some(f))) => assert_eq!(f.as_text(), Some("ab")),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_take_coalesces_kinds() {
        let mut pending: PendingTriggers<u32> = PendingTriggers::new();
        pending.push(TriggerEvent::Filter(Some(DataFilter::text("a"))));
        pending.push(TriggerEvent::Page(Some(PageRequest::new(1, 10))));
        pending.push(TriggerEvent::Filter(Some(DataFilter::text("ab"))));

        let (kinds, last) = pending.take().unwrap();
        assert_eq!(kinds.len(), 2);
        assert!(kinds.contains(TriggerKind::Filter));
        assert!(kinds.contains(TriggerKind::Page));
        assert_eq!(last.kind(), TriggerKind::Filter);
        assert!(pending.is_empty());
        assert!(pending.take().is_none());
    }
}
