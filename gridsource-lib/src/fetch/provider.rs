//! Trigger handler contract.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;

use super::Generation;
use crate::error::ProviderError;
use crate::query::{DataFilter, PageRequest, Sort};
use crate::trigger::{TriggerEvent, TriggerSet};

/// A collection returned by the trigger handler.
///
/// When the page axis is delegated, the handler returns a single page of rows
/// and reports the full length through [`with_total_count`](Self::with_total_count).
#[derive(Debug, Clone)]
pub struct Collection<T> {
    rows: Vec<T>,
    total_count: Option<usize>,
}

impl<T> Collection<T> {
    /// Creates a collection from rows.
    pub fn new(rows: Vec<T>) -> Self {
        Self {
            rows,
            total_count: None,
        }
    }

    /// Sets the total row count known to the handler.
    pub fn with_total_count(mut self, count: usize) -> Self {
        self.total_count = Some(count);
        self
    }

    /// Returns the rows.
    pub fn rows(&self) -> &[T] {
        &self.rows
    }

    /// Consumes the collection and returns the rows.
    pub fn into_rows(self) -> Vec<T> {
        self.rows
    }

    /// Returns the total row count, if the handler reported one.
    pub fn total_count(&self) -> Option<usize> {
        self.total_count
    }

    /// Returns the number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns `true` if there are no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl<T> From<Vec<T>> for Collection<T> {
    fn from(rows: Vec<T>) -> Self {
        Self::new(rows)
    }
}

/// Result of an in-flight fetch. `Ok(None)` means the handler declined.
pub type PendingFetch<T> = BoxFuture<'static, Result<Option<Collection<T>>, ProviderError>>;

/// What a trigger handler returns for one trigger.
pub enum Fetch<T> {
    /// The collection is available immediately.
    Ready(Collection<T>),
    /// The collection will be available later.
    Pending(PendingFetch<T>),
    /// The handler failed immediately.
    Failed(ProviderError),
    /// The handler declines to fetch for this trigger; nothing changes.
    Declined,
}

impl<T> Fetch<T> {
    /// An immediately available collection.
    pub fn ready(rows: impl Into<Collection<T>>) -> Self {
        Fetch::Ready(rows.into())
    }

    /// A collection produced by a future.
    pub fn pending<F>(future: F) -> Self
    where
        F: Future<Output = Result<Collection<T>, ProviderError>> + Send + 'static,
        T: 'static,
    {
        Fetch::Pending(future.map(|result| result.map(Some)).boxed())
    }

    /// A future that may still decline by resolving to `Ok(None)`.
    pub fn pending_optional<F>(future: F) -> Self
    where
        F: Future<Output = Result<Option<Collection<T>>, ProviderError>> + Send + 'static,
        T: 'static,
    {
        Fetch::Pending(future.boxed())
    }

    /// An immediate failure.
    pub fn failed(error: impl Into<ProviderError>) -> Self {
        Fetch::Failed(error.into())
    }
}

impl<T> std::fmt::Debug for Fetch<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Fetch::Ready(c) => write!(f, "Ready({} rows)", c.len()),
            Fetch::Pending(_) => f.write_str("Pending(..)"),
            Fetch::Failed(e) => f.debug_tuple("Failed").field(e).finish(),
            Fetch::Declined => f.write_str("Declined"),
        }
    }
}

/// Everything a trigger handler sees for one fetch.
///
/// Axis values are the current values of every axis, delegated or not, so a
/// handler can serve filter, sort and page in one query.
pub struct TriggerRequest<T> {
    /// Generation this fetch belongs to.
    pub generation: Generation,
    /// The trigger that caused this fetch.
    pub event: TriggerEvent<T>,
    /// Kinds changed since the previous fetch (several after buffered replay).
    pub changed: TriggerSet,
    /// Current filter.
    pub filter: Option<DataFilter<T>>,
    /// Current sort.
    pub sort: Option<Sort<T>>,
    /// Current page request.
    pub page: Option<PageRequest>,
    /// The raw collection held before this fetch.
    pub previous: Arc<[T]>,
}

impl<T> Clone for TriggerRequest<T> {
    fn clone(&self) -> Self {
        Self {
            generation: self.generation,
            event: self.event.clone(),
            changed: self.changed,
            filter: self.filter.clone(),
            sort: self.sort.clone(),
            page: self.page,
            previous: Arc::clone(&self.previous),
        }
    }
}

impl<T> std::fmt::Debug for TriggerRequest<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TriggerRequest")
            .field("generation", &self.generation)
            .field("event", &self.event)
            .field("changed", &self.changed)
            .field("filter", &self.filter)
            .field("sort", &self.sort)
            .field("page", &self.page)
            .field("previous_len", &self.previous.len())
            .finish()
    }
}

/// The caller-supplied provider of collections.
///
/// Handlers must not mutate the data source from inside `on_trigger`; they
/// may perform any external I/O. Any `Fn(TriggerRequest<T>) -> Fetch<T>`
/// closure is a handler.
///
/// # Example
///
/// ```
/// use gridsource_lib::fetch::{Fetch, TriggerHandler, TriggerRequest};
///
/// let handler = |req: TriggerRequest<u32>| {
///     let size = req.page.map(|p| p.size).unwrap_or(10) as u32;
///     Fetch::ready((0..size).collect::<Vec<_>>())
/// };
/// # fn assert_handler<H: TriggerHandler<u32>>(_: &H) {}
/// # assert_handler(&handler);
/// ```
pub trait TriggerHandler<T>: Send + Sync {
    /// Produces the collection for a trigger.
    fn on_trigger(&self, request: TriggerRequest<T>) -> Fetch<T>;
}

impl<T, F> TriggerHandler<T> for F
where
    F: Fn(TriggerRequest<T>) -> Fetch<T> + Send + Sync,
{
    fn on_trigger(&self, request: TriggerRequest<T>) -> Fetch<T> {
        self(request)
    }
}

/// Async flavor of [`TriggerHandler`].
///
/// Wrap implementations in [`AsyncHandler`] to attach them. Returning
/// `Ok(None)` declines the fetch.
#[async_trait]
pub trait AsyncTriggerHandler<T>: Send + Sync + 'static
where
    T: Send + Sync + 'static,
{
    /// Fetches the collection for a trigger.
    async fn fetch(
        &self,
        request: TriggerRequest<T>,
    ) -> Result<Option<Collection<T>>, ProviderError>;
}

/// Adapts an [`AsyncTriggerHandler`] into a [`TriggerHandler`].
pub struct AsyncHandler<H> {
    inner: Arc<H>,
}

impl<H> AsyncHandler<H> {
    /// Wraps an async handler.
    pub fn new(handler: H) -> Self {
        Self {
            inner: Arc::new(handler),
        }
    }
}

impl<T, H> TriggerHandler<T> for AsyncHandler<H>
where
    T: Send + Sync + 'static,
    H: AsyncTriggerHandler<T>,
{
    fn on_trigger(&self, request: TriggerRequest<T>) -> Fetch<T> {
        let inner = Arc::clone(&self.inner);
        Fetch::pending_optional(async move { inner.fetch(request).await })
    }
}

/// Shared reference to a bound trigger handler.
pub struct SourceRef<T> {
    handler: Arc<dyn TriggerHandler<T>>,
}

impl<T> SourceRef<T> {
    /// Wraps a handler.
    pub fn new<H>(handler: H) -> Self
    where
        H: TriggerHandler<T> + 'static,
    {
        Self {
            handler: Arc::new(handler),
        }
    }

    /// Invokes the handler.
    pub fn on_trigger(&self, request: TriggerRequest<T>) -> Fetch<T> {
        self.handler.on_trigger(request)
    }

    /// Returns `true` if both references point at the same handler.
    pub fn ptr_eq(&self, other: &SourceRef<T>) -> bool {
        Arc::ptr_eq(&self.handler, &other.handler)
    }
}

impl<T> Clone for SourceRef<T> {
    fn clone(&self) -> Self {
        Self {
            handler: Arc::clone(&self.handler),
        }
    }
}

impl<T> std::fmt::Debug for SourceRef<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SourceRef(..)")
    }
}
