//! Client-side view errors

/// Errors raised while deriving the visible rows from the raw collection.
///
/// These are recoverable: the raw collection is never touched, and the error
/// is reported once through the data source's `error` event.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ViewError {
    /// The filter predicate panicked. The view falls back to "no filtering".
    #[error("filter predicate panicked: {0}")]
    FilterPanicked(String),

    /// The sort comparator panicked. The previous view is kept.
    #[error("sort comparator '{id}' panicked: {message}")]
    ComparatorPanicked {
        /// Id of the sort descriptor whose comparator failed.
        id: String,
        /// Panic message.
        message: String,
    },

    /// A text filter was applied on the client but no text matcher is configured.
    #[error("text filter '{0}' requires a text matcher")]
    MissingTextMatcher(String),
}
