//! Axis values for the data source.
//!
//! Each configurable trigger axis carries one of these values:
//!
//! - [`DataFilter`] - text or predicate filter
//! - [`Sort`] - sort descriptor with its comparator
//! - [`PageRequest`] - requested page, resolved into a [`PageInfo`]
//!
//! Text filters handled on the client are matched with a [`TextMatcher`];
//! [`FuzzyText`] is the built-in one.

mod filter;
mod fuzzy;
mod order;
mod page;

pub use filter::DataFilter;
pub use filter::FilterFn;
pub use filter::TextMatcher;
pub use fuzzy::FuzzyText;
pub use order::CompareFn;
pub use order::Direction;
pub use order::Sort;
pub use page::PageInfo;
pub use page::PageRequest;
