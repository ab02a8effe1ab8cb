//! Data source lifecycle state.

/// Lifecycle of a data source.
///
/// `Idle -> Fetching -> Ready`, with `Fetching -> Error` on handler failure
/// and `Error -> Fetching` on the next delegated trigger. `Disposed` is
/// terminal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum DataSourceState {
    /// No collection fetched yet.
    #[default]
    Idle,
    /// An asynchronous fetch of the latest generation is in flight.
    Fetching,
    /// The latest fetch succeeded.
    Ready,
    /// The latest fetch failed; the last good rows are still exposed.
    Error,
    /// The data source was disposed.
    Disposed,
}

impl DataSourceState {
    /// Check if no collection was fetched yet
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    /// Check if a fetch is in flight
    pub fn is_fetching(&self) -> bool {
        matches!(self, Self::Fetching)
    }

    /// Check if the latest fetch succeeded
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }

    /// Check if the latest fetch failed
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error)
    }

    /// Check if the data source was disposed
    pub fn is_disposed(&self) -> bool {
        matches!(self, Self::Disposed)
    }
}

impl std::fmt::Display for DataSourceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Fetching => "fetching",
            Self::Ready => "ready",
            Self::Error => "error",
            Self::Disposed => "disposed",
        };
        f.write_str(name)
    }
}
