//! Fuzzy text matching using nucleo-matcher.

use nucleo_matcher::pattern::{AtomKind, CaseMatching, Normalization, Pattern};
use nucleo_matcher::{Config, Matcher, Utf32Str};

use super::TextMatcher;

/// Built-in fuzzy text matcher.
///
/// Matches the query against a label extracted from each record. Matching is
/// case-insensitive. An empty (or whitespace-only) query matches every record.
///
/// # Example
///
/// ```
/// use gridsource_lib::query::{FuzzyText, TextMatcher};
///
/// let matcher = FuzzyText::new(|name: &String| name.clone());
/// let mut pred = matcher.compile("ap");
/// assert!(pred(&"apple".to_string()));
/// assert!(!pred(&"banana".to_string()));
/// ```
pub struct FuzzyText<T> {
    label: Box<dyn Fn(&T) -> String + Send + Sync>,
}

impl<T> FuzzyText<T> {
    /// Creates a fuzzy matcher over the label returned by `label`.
    pub fn new<F>(label: F) -> Self
    where
        F: Fn(&T) -> String + Send + Sync + 'static,
    {
        Self {
            label: Box::new(label),
        }
    }
}

impl<T> TextMatcher<T> for FuzzyText<T> {
    fn compile<'a>(&'a self, query: &str) -> Box<dyn FnMut(&T) -> bool + 'a>
    where
        T: 'a,
    {
        if query.trim().is_empty() {
            return Box::new(|_| true);
        }

        let mut matcher = Matcher::new(Config::DEFAULT);
        let pattern = Pattern::new(
            query,
            CaseMatching::Ignore,
            Normalization::Smart,
            AtomKind::Fuzzy,
        );
        let mut buf = Vec::new();

        Box::new(move |record| {
            let label = (self.label)(record);
            let haystack = Utf32Str::new(&label, &mut buf);
            pattern.score(haystack, &mut matcher).is_some()
        })
    }
}

impl<T> std::fmt::Debug for FuzzyText<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("FuzzyText(..)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn matching(query: &str, items: &[String]) -> Vec<usize> {
        let matcher = FuzzyText::new(|s: &String| s.clone());
        let mut pred = matcher.compile(query);
        items
            .iter()
            .enumerate()
            .filter(|(_, item)| pred(item))
            .map(|(i, _)| i)
            .collect()
    }

    #[test]
    fn test_empty_query_matches_all() {
        let items = names(&["apple", "banana"]);
        assert_eq!(matching("", &items), vec![0, 1]);
        assert_eq!(matching("   ", &items), vec![0, 1]);
    }

    #[test]
    fn test_fuzzy_matching() {
        let items = names(&["apple", "banana", "apricot"]);
        assert_eq!(matching("ap", &items), vec![0, 2]);
    }

    #[test]
    fn test_case_insensitive() {
        let items = names(&["Apple", "BANANA"]);
        assert_eq!(matching("apple", &items), vec![0]);
    }

    #[test]
    fn test_no_matches() {
        let items = names(&["apple", "banana"]);
        assert!(matching("xyz", &items).is_empty());
    }
}
