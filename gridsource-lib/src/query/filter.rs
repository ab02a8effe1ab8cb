//! Filter values for the filter axis.

use std::sync::Arc;

/// Predicate applied to each raw record: `(record, index, raw_collection)`.
///
/// Predicates must be pure. A panicking predicate is caught and reported as a
/// view error, and the view is then computed without filtering.
pub type FilterFn<T> = Arc<dyn Fn(&T, usize, &[T]) -> bool + Send + Sync>;

/// A filter value for the filter axis.
///
/// A text filter is a plain query string. When the filter axis is delegated
/// the provider interprets it however it likes; when it is handled on the
/// client it is matched with the configured [`TextMatcher`].
///
/// # Example
///
/// ```
/// use gridsource_lib::query::DataFilter;
///
/// let by_text: DataFilter<u32> = DataFilter::text("42");
/// let even = DataFilter::predicate(|n: &u32, _, _| n % 2 == 0);
///
/// assert_eq!(by_text.as_text(), Some("42"));
/// assert!(even.as_text().is_none());
/// ```
pub enum DataFilter<T> {
    /// Free text query.
    Text(String),
    /// Record predicate.
    Predicate(FilterFn<T>),
}

impl<T> DataFilter<T> {
    /// Creates a text filter.
    pub fn text(value: impl Into<String>) -> Self {
        DataFilter::Text(value.into())
    }

    /// Creates a predicate filter.
    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(&T, usize, &[T]) -> bool + Send + Sync + 'static,
    {
        DataFilter::Predicate(Arc::new(f))
    }

    /// Returns the query string if this is a text filter.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            DataFilter::Text(value) => Some(value),
            DataFilter::Predicate(_) => None,
        }
    }
}

impl<T> Clone for DataFilter<T> {
    fn clone(&self) -> Self {
        match self {
            DataFilter::Text(value) => DataFilter::Text(value.clone()),
            DataFilter::Predicate(f) => DataFilter::Predicate(Arc::clone(f)),
        }
    }
}

impl<T> std::fmt::Debug for DataFilter<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataFilter::Text(value) => f.debug_tuple("Text").field(value).finish(),
            DataFilter::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

/// Matches records against a text query on the client.
///
/// `compile` is called once per recomputation and returns a per-record
/// predicate, so matchers can parse the query a single time.
///
/// Any `Fn(&T, &str) -> bool` closure is a text matcher.
pub trait TextMatcher<T>: Send + Sync {
    /// Prepares a predicate for the given query.
    fn compile<'a>(&'a self, query: &str) -> Box<dyn FnMut(&T) -> bool + 'a>
    where
        T: 'a;
}

impl<T, F> TextMatcher<T> for F
where
    F: Fn(&T, &str) -> bool + Send + Sync,
{
    fn compile<'a>(&'a self, query: &str) -> Box<dyn FnMut(&T) -> bool + 'a>
    where
        T: 'a,
    {
        let query = query.to_string();
        Box::new(move |record| self(record, &query))
    }
}
