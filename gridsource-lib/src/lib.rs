//! Reactive data source for tabular views
//!
//! A [`DataSource`] sits between a table and whatever produces its rows. The
//! table changes the filter, sort and page; the data source either applies
//! those changes to the collection it already holds or hands them to a
//! caller-supplied trigger handler that fetches a new collection.
//!
//! Fetches are numbered by [`fetch::Generation`] and only the latest one is
//! ever applied, so slow responses to superseded requests are dropped.

pub mod error;
pub mod fetch;
pub mod query;
pub mod source;
pub mod trigger;
pub mod view;

pub use source::DataSource;
pub use source::DataSourceBuilder;
pub use source::DataSourceEvent;
pub use source::DataSourceOptions;
pub use source::DataSourceState;

pub mod prelude {
    pub use crate::error::{DataSourceError, ProviderError, SourceError, ViewError};
    pub use crate::fetch::{
        AsyncHandler, AsyncTriggerHandler, Collection, Fetch, Generation, TriggerHandler,
        TriggerRequest,
    };
    pub use crate::query::{DataFilter, Direction, FuzzyText, PageInfo, PageRequest, Sort};
    pub use crate::source::{
        DataSource, DataSourceBuilder, DataSourceEvent, DataSourceOptions, DataSourceState,
        EventStream, FetchNotice,
    };
    pub use crate::trigger::{TriggerEvent, TriggerKind, TriggerPolicy, TriggerSet};
    pub use crate::view::Rows;
}
