//! Provider error type

use std::sync::Arc;

/// Error returned by a trigger handler when it fails to produce a collection.
///
/// The error is cheap to clone so it can be broadcast to every lifecycle
/// subscriber. The underlying cause, if any, is kept behind an `Arc`.
///
/// # Example
///
/// ```
/// use gridsource_lib::error::ProviderError;
///
/// let err = ProviderError::new("backend unavailable");
/// assert_eq!(err.message(), "backend unavailable");
/// ```
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct ProviderError {
    message: String,
    #[source]
    source: Option<Arc<dyn std::error::Error + Send + Sync>>,
}

impl ProviderError {
    /// Creates a new provider error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a provider error wrapping an underlying cause.
    pub fn with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Arc::new(source)),
        }
    }

    /// Error raised when an async fetch is issued outside a tokio runtime.
    pub(crate) fn no_runtime() -> Self {
        Self::new("no async runtime available to drive the pending fetch")
    }

    /// Returns the error message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<String> for ProviderError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for ProviderError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<std::io::Error> for ProviderError {
    fn from(err: std::io::Error) -> Self {
        Self::with_source(err.to_string(), err)
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;
    use std::io;

    use super::*;

    #[test]
    fn test_display_is_message() {
        let err = ProviderError::from("backend unavailable");
        assert_eq!(err.to_string(), "backend unavailable");
        assert!(err.source().is_none());
    }

    #[test]
    fn test_source_survives_clone() {
        let err = ProviderError::from(io::Error::new(io::ErrorKind::NotFound, "missing table"));
        let copy = err.clone();

        assert_eq!(copy.message(), "missing table");
        assert_eq!(
            copy.source().map(|cause| cause.to_string()).as_deref(),
            Some("missing table")
        );
    }
}
