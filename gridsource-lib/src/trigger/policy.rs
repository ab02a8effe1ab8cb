//! Per-kind trigger handling policy.

use super::{TriggerKind, TriggerSet};

/// How a trigger kind is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Handling {
    /// Applied locally to the already-fetched collection.
    Client,
    /// Forwarded to the trigger handler, which returns a new collection.
    Delegated,
}

/// Decides, per trigger kind, whether a change is handled on the client or
/// delegated to the trigger handler.
///
/// By default every configurable kind is handled on the client.
/// [`TriggerKind::SourceChanged`] and [`TriggerKind::Refresh`] are always
/// delegated. A policy is immutable once built; it is assembled with a
/// [`PolicyBuilder`] which can only add delegated kinds.
///
/// # Example
///
/// ```
/// use gridsource_lib::trigger::{Handling, TriggerKind, TriggerPolicy};
///
/// let policy = TriggerPolicy::builder()
///     .delegate(TriggerKind::Page)
///     .seal();
///
/// assert_eq!(policy.classify(TriggerKind::Page), Handling::Delegated);
/// assert_eq!(policy.classify(TriggerKind::Filter), Handling::Client);
/// assert_eq!(policy.classify(TriggerKind::Refresh), Handling::Delegated);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TriggerPolicy {
    delegated: TriggerSet,
}

impl TriggerPolicy {
    /// A policy handling filter, sort and page on the client.
    pub fn client_side() -> Self {
        Self::default()
    }

    /// Starts building a policy.
    pub fn builder() -> PolicyBuilder {
        PolicyBuilder::default()
    }

    /// Classifies a trigger kind.
    pub fn classify(&self, kind: TriggerKind) -> Handling {
        match kind {
            TriggerKind::SourceChanged | TriggerKind::Refresh => Handling::Delegated,
            TriggerKind::Filter | TriggerKind::Sort | TriggerKind::Page => {
                if self.delegated.contains(kind) {
                    Handling::Delegated
                } else {
                    Handling::Client
                }
            }
        }
    }

    /// Returns `true` if `kind` is delegated to the trigger handler.
    pub fn is_delegated(&self, kind: TriggerKind) -> bool {
        self.classify(kind) == Handling::Delegated
    }

    /// Returns `true` if `kind` is handled on the client.
    pub fn is_client(&self, kind: TriggerKind) -> bool {
        self.classify(kind) == Handling::Client
    }

    /// Returns the configurable kinds delegated by this policy.
    pub fn delegated(&self) -> TriggerSet {
        self.delegated
    }
}

/// Append-only builder for a [`TriggerPolicy`].
#[derive(Debug, Clone, Default)]
pub struct PolicyBuilder {
    delegated: TriggerSet,
}

impl PolicyBuilder {
    /// Delegates one kind to the trigger handler.
    ///
    /// Non-configurable kinds are always delegated and are ignored here.
    pub fn delegate(mut self, kind: TriggerKind) -> Self {
        if kind.is_configurable() {
            self.delegated.insert(kind);
        }
        self
    }

    /// Delegates every kind in `kinds`.
    pub fn delegate_all(self, kinds: impl IntoIterator<Item = TriggerKind>) -> Self {
        kinds.into_iter().fold(self, PolicyBuilder::delegate)
    }

    /// Finishes the policy. It cannot be changed afterwards.
    pub fn seal(self) -> TriggerPolicy {
        TriggerPolicy {
            delegated: self.delegated,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_client_side() {
        let policy = TriggerPolicy::client_side();
        for kind in TriggerKind::CONFIGURABLE {
            assert_eq!(policy.classify(kind), Handling::Client);
        }
        assert!(policy.delegated().is_empty());
    }

    #[test]
    fn test_source_changed_and_refresh_always_delegated() {
        let policy = TriggerPolicy::client_side();
        assert!(policy.is_delegated(TriggerKind::SourceChanged));
        assert!(policy.is_delegated(TriggerKind::Refresh));
    }

    #[test]
    fn test_builder_is_append_only() {
        let policy = TriggerPolicy::builder()
            .delegate(TriggerKind::Sort)
            .delegate_all([TriggerKind::Page, TriggerKind::Refresh])
            .seal();

        assert!(policy.is_delegated(TriggerKind::Sort));
        assert!(policy.is_delegated(TriggerKind::Page));
        assert!(policy.is_client(TriggerKind::Filter));
        assert_eq!(policy.delegated().len(), 2);
    }
}
