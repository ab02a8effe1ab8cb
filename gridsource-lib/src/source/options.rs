//! Data source configuration

use serde::{Deserialize, Serialize};

/// Construction-time options for a data source.
///
/// Which axes are delegated to the trigger handler is configured on the
/// builder, since it seals the trigger policy.
///
/// # Example
///
/// ```
/// use gridsource_lib::DataSourceOptions;
///
/// let options = DataSourceOptions::default()
///     .with_skip_initial(true)
///     .with_event_capacity(64);
///
/// assert!(options.skip_initial);
/// assert!(!options.keep_alive);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSourceOptions {
    /// Suppress the automatic fetch issued on first attach.
    ///
    /// Default: false
    pub skip_initial: bool,

    /// Keep the handler binding and rows across `dispose`, so the source can
    /// be recreated without a new fetch.
    ///
    /// Default: false
    pub keep_alive: bool,

    /// Lifecycle events buffered per subscriber before it starts lagging.
    ///
    /// Default: 256
    pub event_capacity: usize,
}

impl Default for DataSourceOptions {
    fn default() -> Self {
        Self {
            skip_initial: false,
            keep_alive: false,
            event_capacity: 256,
        }
    }
}

impl DataSourceOptions {
    /// Creates options with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether the initial fetch is skipped.
    pub fn with_skip_initial(mut self, skip: bool) -> Self {
        self.skip_initial = skip;
        self
    }

    /// Sets whether the source survives `dispose`.
    pub fn with_keep_alive(mut self, keep_alive: bool) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    /// Sets the per-subscriber event buffer.
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_partial() {
        let options: DataSourceOptions = serde_json::from_str(r#"{"keep_alive":true}"#).unwrap();
        assert!(options.keep_alive);
        assert!(!options.skip_initial);
        assert_eq!(options.event_capacity, 256);
    }

    #[test]
    fn test_builder_methods() {
        let options = DataSourceOptions::new()
            .with_skip_initial(true)
            .with_keep_alive(true)
            .with_event_capacity(8);
        assert_eq!(
            options,
            DataSourceOptions {
                skip_initial: true,
                keep_alive: true,
                event_capacity: 8,
            }
        );
    }
}
