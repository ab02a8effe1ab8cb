//! Data source error types

use super::ProviderError;
use super::ViewError;

/// Misuse of the data source API, reported at the call site.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DataSourceError {
    /// `attach` was called while a provider is already bound.
    #[error("a trigger handler is already attached; detach it first")]
    AlreadyAttached,

    /// `detach` was called with no provider bound.
    #[error("no trigger handler is attached")]
    NotAttached,

    /// The data source has been disposed.
    #[error("the data source has been disposed")]
    Disposed,

    /// `recreate` was called on a data source built without keep-alive.
    #[error("the data source was not built with keep-alive")]
    NotKeepAlive,

    /// `recreate` was called before `dispose`.
    #[error("the data source is still live")]
    NotDisposed,
}

/// A recoverable failure carried by the `error` lifecycle event.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SourceError {
    /// The trigger handler failed for the current generation.
    #[error("provider failed: {0}")]
    Provider(#[from] ProviderError),

    /// Client-side filtering or sorting failed.
    #[error("view failed: {0}")]
    View(#[from] ViewError),
}

impl SourceError {
    /// Returns `true` if this error came from the trigger handler.
    pub fn is_provider(&self) -> bool {
        matches!(self, Self::Provider(_))
    }

    /// Returns `true` if this error came from client-side view derivation.
    pub fn is_view(&self) -> bool {
        matches!(self, Self::View(_))
    }
}
