//! Lifecycle events exposed to the rendering layer.

use futures::stream::BoxStream;
use futures::StreamExt;
use log::warn;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

use crate::error::SourceError;
use crate::fetch::Generation;
use crate::trigger::TriggerEvent;

/// Identifies the fetch a lifecycle event belongs to.
pub struct FetchNotice<T> {
    /// Latest generation before this fetch was issued.
    pub previous_generation: Generation,
    /// Generation of this fetch.
    pub generation: Generation,
    /// The trigger that caused it.
    pub event: TriggerEvent<T>,
}

impl<T> Clone for FetchNotice<T> {
    fn clone(&self) -> Self {
        Self {
            previous_generation: self.previous_generation,
            generation: self.generation,
            event: self.event.clone(),
        }
    }
}

impl<T> std::fmt::Debug for FetchNotice<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchNotice")
            .field("previous_generation", &self.previous_generation)
            .field("generation", &self.generation)
            .field("event", &self.event)
            .finish()
    }
}

/// A lifecycle notification.
///
/// Every delegated fetch emits exactly one `SourceChanging`, followed by one
/// `SourceChanged` or `Error`, or by nothing when the handler declines or the
/// result is superseded.
pub enum DataSourceEvent<T> {
    /// A delegated fetch is about to start.
    SourceChanging(FetchNotice<T>),
    /// The raw collection was replaced.
    SourceChanged(FetchNotice<T>),
    /// A fetch or a client-side recomputation failed.
    Error {
        /// The fetch (or, for view errors, the latest generation) involved.
        notice: FetchNotice<T>,
        /// What went wrong.
        error: SourceError,
    },
    /// A client-handled axis changed; re-read the rows.
    ViewInvalidated(TriggerEvent<T>),
}

impl<T> DataSourceEvent<T> {
    /// Short name of the event.
    pub fn name(&self) -> &'static str {
        match self {
            Self::SourceChanging(_) => "source-changing",
            Self::SourceChanged(_) => "source-changed",
            Self::Error { .. } => "error",
            Self::ViewInvalidated(_) => "view-invalidated",
        }
    }

    /// Returns the fetch notice, if the event carries one.
    pub fn notice(&self) -> Option<&FetchNotice<T>> {
        match self {
            Self::SourceChanging(notice) | Self::SourceChanged(notice) => Some(notice),
            Self::Error { notice, .. } => Some(notice),
            Self::ViewInvalidated(_) => None,
        }
    }

    /// Returns the error, if this is an error event.
    pub fn error(&self) -> Option<&SourceError> {
        match self {
            Self::Error { error, .. } => Some(error),
            _ => None,
        }
    }
}

impl<T> Clone for DataSourceEvent<T> {
    fn clone(&self) -> Self {
        match self {
            Self::SourceChanging(notice) => Self::SourceChanging(notice.clone()),
            Self::SourceChanged(notice) => Self::SourceChanged(notice.clone()),
            Self::Error { notice, error } => Self::Error {
                notice: notice.clone(),
                error: error.clone(),
            },
            Self::ViewInvalidated(event) => Self::ViewInvalidated(event.clone()),
        }
    }
}

impl<T> std::fmt::Debug for DataSourceEvent<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SourceChanging(notice) => f.debug_tuple("SourceChanging").field(notice).finish(),
            Self::SourceChanged(notice) => f.debug_tuple("SourceChanged").field(notice).finish(),
            Self::Error { notice, error } => f
                .debug_struct("Error")
                .field("notice", notice)
                .field("error", error)
                .finish(),
            Self::ViewInvalidated(event) => f.debug_tuple("ViewInvalidated").field(event).finish(),
        }
    }
}

/// Stream of lifecycle events for one subscriber.
pub type EventStream<T> = BoxStream<'static, DataSourceEvent<T>>;

/// Turns a broadcast receiver into an event stream.
///
/// The stream ends once the data source is disposed. A subscriber that falls
/// behind skips the events it missed.
pub(crate) fn stream<T>(receiver: Option<broadcast::Receiver<DataSourceEvent<T>>>) -> EventStream<T>
where
    T: Send + Sync + 'static,
{
    async_stream::stream! {
        if let Some(mut rx) = receiver {
            loop {
                match rx.recv().await {
                    Ok(event) => yield event,
                    Err(RecvError::Lagged(missed)) => {
                        warn!("event subscriber lagged, skipped {missed} events");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }
    }
    .boxed()
}
