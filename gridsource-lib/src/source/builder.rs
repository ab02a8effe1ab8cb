//! Data source construction.

use std::sync::Arc;

use log::warn;

use super::{DataSource, DataSourceOptions};
use crate::fetch::{AsyncHandler, AsyncTriggerHandler, SourceRef, TriggerHandler};
use crate::query::{FuzzyText, TextMatcher};
use crate::trigger::{PolicyBuilder, TriggerKind};

type CreatedHook<T> = Box<dyn FnOnce(&DataSource<T>) + Send>;

/// Builder for a [`DataSource`].
///
/// # Example
///
/// ```
/// use gridsource_lib::fetch::{Fetch, TriggerRequest};
/// use gridsource_lib::query::PageRequest;
/// use gridsource_lib::trigger::TriggerKind;
/// use gridsource_lib::DataSource;
///
/// let source = DataSource::builder()
///     .custom_triggers([TriggerKind::Page])
///     .on_trigger(|request: TriggerRequest<u32>| {
///         let page = request.page.unwrap_or(PageRequest::first(10));
///         let start = (page.index * page.size) as u32;
///         Fetch::ready((start..start + page.size as u32).collect::<Vec<_>>())
///     })
///     .create();
///
/// source.set_page(PageRequest::new(2, 10)).unwrap();
/// assert_eq!(source.rows().get(0), Some(&20));
/// ```
pub struct DataSourceBuilder<T> {
    handler: Option<SourceRef<T>>,
    policy: PolicyBuilder,
    options: DataSourceOptions,
    matcher: Option<Arc<dyn TextMatcher<T>>>,
    on_created: Option<CreatedHook<T>>,
}

impl<T> DataSourceBuilder<T>
where
    T: Send + Sync + 'static,
{
    /// Creates a builder with every configurable axis handled on the client.
    pub fn new() -> Self {
        Self {
            handler: None,
            policy: PolicyBuilder::default(),
            options: DataSourceOptions::default(),
            matcher: None,
            on_created: None,
        }
    }

    /// Sets the trigger handler attached on [`create`](Self::create).
    pub fn on_trigger<H>(mut self, handler: H) -> Self
    where
        H: TriggerHandler<T> + 'static,
    {
        self.handler = Some(SourceRef::new(handler));
        self
    }

    /// Sets an async trigger handler attached on [`create`](Self::create).
    pub fn on_trigger_async<H>(self, handler: H) -> Self
    where
        H: AsyncTriggerHandler<T>,
    {
        self.on_trigger(AsyncHandler::new(handler))
    }

    /// Delegates the given axes to the trigger handler.
    ///
    /// Only filter, sort and page are configurable; other kinds are ignored.
    pub fn custom_triggers(mut self, kinds: impl IntoIterator<Item = TriggerKind>) -> Self {
        self.policy = self.policy.delegate_all(kinds);
        self
    }

    /// Skips the fetch issued on first attach.
    pub fn skip_initial_trigger(mut self) -> Self {
        self.options.skip_initial = true;
        self
    }

    /// Keeps the source recreatable after dispose.
    pub fn keep_alive(mut self) -> Self {
        self.options.keep_alive = true;
        self
    }

    /// Replaces the options wholesale.
    pub fn options(mut self, options: DataSourceOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets the matcher used for client-side text filters.
    pub fn text_matcher<M>(mut self, matcher: M) -> Self
    where
        M: TextMatcher<T> + 'static,
    {
        self.matcher = Some(Arc::new(matcher));
        self
    }

    /// Uses fuzzy matching on the label returned by `label` for text filters.
    pub fn fuzzy_text<F>(self, label: F) -> Self
    where
        F: Fn(&T) -> String + Send + Sync + 'static,
    {
        self.text_matcher(FuzzyText::new(label))
    }

    /// Runs `hook` once the source exists, before the handler is attached.
    pub fn on_created<F>(mut self, hook: F) -> Self
    where
        F: FnOnce(&DataSource<T>) + Send + 'static,
    {
        self.on_created = Some(Box::new(hook));
        self
    }

    /// Builds the data source and attaches the trigger handler, if one was set.
    pub fn create(self) -> DataSource<T> {
        let source = DataSource::from_parts(self.policy.seal(), self.options, self.matcher);
        if let Some(hook) = self.on_created {
            hook(&source);
        }
        if let Some(handler) = self.handler {
            if let Err(err) = source.attach_source(handler) {
                warn!("{} could not attach trigger handler: {}", source.id(), err);
            }
        }
        source
    }
}

impl<T> Default for DataSourceBuilder<T>
where
    T: Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
