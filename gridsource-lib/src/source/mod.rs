//! The data source facade.
//!
//! A [`DataSource`] wires the trigger bus, the trigger policy, the fetch
//! coordinator and the collection view together. Axis changes are posted to
//! the bus; client-handled ones only invalidate the view, delegated ones are
//! turned into fetches against the bound trigger handler.

mod builder;
mod events;
mod options;
mod state;

pub use builder::DataSourceBuilder;
pub use events::{DataSourceEvent, EventStream, FetchNotice};
pub use options::DataSourceOptions;
pub use state::DataSourceState;

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::FutureExt;
use log::{debug, info, warn};
use tokio::runtime::Handle;
use tokio::sync::{broadcast, watch};

use crate::error::{panic_message, DataSourceError, ProviderError, SourceError};
use crate::fetch::{
    Collection, Fetch, FetchCoordinator, Generation, Outcome, PendingFetch, SourceRef,
    TriggerHandler, TriggerRequest,
};
use crate::query::{DataFilter, PageInfo, PageRequest, Sort, TextMatcher};
use crate::trigger::{
    Handling, PendingTriggers, Subscription, TriggerBus, TriggerEvent, TriggerKind, TriggerPolicy,
    TriggerSet,
};
use crate::view::{CollectionView, Rows};

/// Process-unique identifier of a data source, used in log output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DataSourceId(usize);

impl DataSourceId {
    fn new() -> Self {
        static COUNTER: AtomicUsize = AtomicUsize::new(0);
        Self(COUNTER.fetch_add(1, Ordering::SeqCst))
    }
}

impl std::fmt::Display for DataSourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "source#{}", self.0)
    }
}

/// Reactive adapter between a tabular view and a trigger handler.
///
/// Cloning yields another handle to the same data source.
///
/// # Example
///
/// ```
/// use gridsource_lib::fetch::{Fetch, TriggerRequest};
/// use gridsource_lib::query::{Direction, Sort};
/// use gridsource_lib::DataSource;
///
/// let source = DataSource::builder()
///     .on_trigger(|_: TriggerRequest<u32>| Fetch::ready(vec![3, 1, 2]))
///     .create();
///
/// source.set_sort(Sort::by_key("n", Direction::Asc, |n: &u32| *n)).unwrap();
/// assert_eq!(source.rows().to_vec(), vec![1, 2, 3]);
/// ```
pub struct DataSource<T> {
    shared: Arc<Shared<T>>,
}

struct Shared<T> {
    id: DataSourceId,
    core: Mutex<Core<T>>,
    bus: TriggerBus<TriggerEvent<T>>,
    state: watch::Sender<DataSourceState>,
    policy: TriggerPolicy,
    options: DataSourceOptions,
    matcher: Option<Arc<dyn TextMatcher<T>>>,
}

struct Core<T> {
    view: CollectionView<T>,
    coordinator: FetchCoordinator<T>,
    pending: PendingTriggers<T>,
    events: Option<broadcast::Sender<DataSourceEvent<T>>>,
    // Last state other than `Fetching`, restored when a fetch is declined.
    settled: DataSourceState,
    view_cause: TriggerEvent<T>,
    attached_once: bool,
    disposed: bool,
    subscription: Option<Subscription>,
}

impl<T> Core<T> {
    fn emit(&self, event: DataSourceEvent<T>) {
        if let Some(events) = &self.events {
            // No receivers is fine.
            let _ = events.send(event);
        }
    }
}

impl<T> DataSource<T>
where
    T: Send + Sync + 'static,
{
    /// Starts building a data source.
    pub fn builder() -> DataSourceBuilder<T> {
        DataSourceBuilder::new()
    }

    pub(crate) fn from_parts(
        policy: TriggerPolicy,
        options: DataSourceOptions,
        matcher: Option<Arc<dyn TextMatcher<T>>>,
    ) -> Self {
        let (events, _) = broadcast::channel(options.event_capacity.max(1));
        let (state, _) = watch::channel(DataSourceState::Idle);
        let core = Core {
            view: CollectionView::new(policy, matcher.clone()),
            coordinator: FetchCoordinator::new(),
            pending: PendingTriggers::new(),
            events: Some(events),
            settled: DataSourceState::Idle,
            view_cause: TriggerEvent::Refresh,
            attached_once: false,
            disposed: false,
            subscription: None,
        };
        let shared = Arc::new(Shared {
            id: DataSourceId::new(),
            core: Mutex::new(core),
            bus: TriggerBus::new(),
            state,
            policy,
            options,
            matcher,
        });

        let weak = Arc::downgrade(&shared);
        let subscription = shared.bus.subscribe(move |event: &TriggerEvent<T>| {
            if let Some(shared) = weak.upgrade() {
                shared.on_trigger(event);
            }
        });
        shared.lock().subscription = Some(subscription);

        debug!(
            "{} created (delegated: {:?})",
            shared.id,
            policy.delegated().iter().collect::<Vec<_>>()
        );
        Self { shared }
    }

    /// Identifier used in log output.
    pub fn id(&self) -> DataSourceId {
        self.shared.id
    }

    /// Binds a trigger handler.
    ///
    /// Triggers buffered while no handler was bound are replayed as one fetch.
    /// On the first attach with nothing buffered, an initial refresh fetch is
    /// issued unless `skip_initial` is set.
    pub fn attach<H>(&self, handler: H) -> Result<(), DataSourceError>
    where
        H: TriggerHandler<T> + 'static,
    {
        self.attach_source(SourceRef::new(handler))
    }

    /// Binds an already shared trigger handler. See [`attach`](Self::attach).
    pub fn attach_source(&self, source: SourceRef<T>) -> Result<(), DataSourceError> {
        let replay = {
            let mut core = self.shared.lock();
            if core.disposed {
                return Err(DataSourceError::Disposed);
            }
            if core.coordinator.is_attached() {
                return Err(DataSourceError::AlreadyAttached);
            }
            core.coordinator.bind(source);
            let first = !core.attached_once;
            core.attached_once = true;

            match core.pending.take() {
                Some((changed, last)) => {
                    debug!(
                        "{} replaying {} buffered trigger(s)",
                        self.shared.id,
                        changed.len()
                    );
                    Some((last, changed))
                }
                None if first && !self.shared.options.skip_initial => Some((
                    TriggerEvent::Refresh,
                    TriggerSet::only(TriggerKind::Refresh),
                )),
                None => None,
            }
        };

        info!("{} attached trigger handler", self.shared.id);
        if let Some((reason, changed)) = replay {
            self.shared.request_fetch(reason, changed);
        }
        Ok(())
    }

    /// Unbinds the trigger handler and returns it.
    ///
    /// An in-flight fetch becomes stale. Later delegated triggers are buffered
    /// until the next attach.
    pub fn detach(&self) -> Result<SourceRef<T>, DataSourceError> {
        let mut core = self.shared.lock();
        if core.disposed {
            return Err(DataSourceError::Disposed);
        }
        if !core.coordinator.is_attached() {
            return Err(DataSourceError::NotAttached);
        }
        let handler = core
            .coordinator
            .unbind()
            .ok_or(DataSourceError::NotAttached)?;
        let settled = core.settled;
        self.shared.set_state(&mut core, settled);
        info!("{} detached trigger handler", self.shared.id);
        Ok(handler)
    }

    /// Returns `true` if a trigger handler is bound.
    pub fn is_attached(&self) -> bool {
        self.shared.lock().coordinator.is_attached()
    }

    /// Binds a different trigger handler, replacing the current one, and
    /// fetches from it.
    pub fn replace_source<H>(&self, handler: H) -> Result<(), DataSourceError>
    where
        H: TriggerHandler<T> + 'static,
    {
        self.post(TriggerEvent::SourceChanged(SourceRef::new(handler)))
    }

    /// Asks the trigger handler for a fresh collection.
    pub fn refresh(&self) -> Result<(), DataSourceError> {
        self.post(TriggerEvent::Refresh)
    }

    /// Sets the filter.
    pub fn set_filter(&self, filter: DataFilter<T>) -> Result<(), DataSourceError> {
        self.post(TriggerEvent::Filter(Some(filter)))
    }

    /// Removes the filter.
    pub fn clear_filter(&self) -> Result<(), DataSourceError> {
        self.post(TriggerEvent::Filter(None))
    }

    /// Sets the sort descriptor.
    pub fn set_sort(&self, sort: Sort<T>) -> Result<(), DataSourceError> {
        self.post(TriggerEvent::Sort(Some(sort)))
    }

    /// Removes the sort descriptor, restoring raw order.
    pub fn clear_sort(&self) -> Result<(), DataSourceError> {
        self.post(TriggerEvent::Sort(None))
    }

    /// Sets the page request.
    pub fn set_page(&self, page: PageRequest) -> Result<(), DataSourceError> {
        self.post(TriggerEvent::Page(Some(page)))
    }

    /// Removes the page request, showing every row.
    pub fn clear_page(&self) -> Result<(), DataSourceError> {
        self.post(TriggerEvent::Page(None))
    }

    fn post(&self, event: TriggerEvent<T>) -> Result<(), DataSourceError> {
        if self.is_disposed() {
            return Err(DataSourceError::Disposed);
        }
        self.shared.bus.post(event);
        Ok(())
    }

    /// Current visible rows.
    ///
    /// A failed client-side recomputation is reported once on the event
    /// stream; the rows returned are the fallback view.
    pub fn rows(&self) -> Rows<T> {
        let mut core = self.shared.lock();
        let (rows, error) = core.view.view();
        if let Some(error) = error {
            let generation = core.coordinator.latest();
            let notice = FetchNotice {
                previous_generation: generation,
                generation,
                event: core.view_cause.clone(),
            };
            core.emit(DataSourceEvent::Error {
                notice,
                error: SourceError::View(error),
            });
        }
        rows
    }

    /// Page description of the current rows.
    pub fn page_info(&self) -> PageInfo {
        self.rows();
        self.shared.lock().view.page_info()
    }

    /// Current filter.
    pub fn filter(&self) -> Option<DataFilter<T>> {
        self.shared.lock().view.filter().cloned()
    }

    /// Current sort descriptor.
    pub fn sort(&self) -> Option<Sort<T>> {
        self.shared.lock().view.sort().cloned()
    }

    /// Current page request.
    pub fn page(&self) -> Option<PageRequest> {
        self.shared.lock().view.page()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> DataSourceState {
        *self.shared.state.borrow()
    }

    /// Subscribes to lifecycle state changes.
    pub fn watch_state(&self) -> watch::Receiver<DataSourceState> {
        self.shared.state.subscribe()
    }

    /// Waits until no fetch is in flight.
    pub async fn settled(&self) {
        let mut state = self.shared.state.subscribe();
        let _ = state.wait_for(|state| !state.is_fetching()).await;
    }

    /// Subscribes to lifecycle events.
    ///
    /// Only events emitted after this call are seen. The stream ends when the
    /// data source is disposed.
    pub fn events(&self) -> EventStream<T> {
        let receiver = self
            .shared
            .lock()
            .events
            .as_ref()
            .map(|events| events.subscribe());
        events::stream(receiver)
    }

    /// Latest issued fetch generation.
    pub fn generation(&self) -> Generation {
        self.shared.lock().coordinator.latest()
    }

    /// The sealed trigger policy.
    pub fn policy(&self) -> TriggerPolicy {
        self.shared.policy
    }

    /// Construction options.
    pub fn options(&self) -> &DataSourceOptions {
        &self.shared.options
    }

    /// Returns `true` once [`dispose`](Self::dispose) was called.
    pub fn is_disposed(&self) -> bool {
        self.shared.lock().disposed
    }

    /// Tears the data source down. Calling it again has no effect.
    ///
    /// Pending results are discarded, listeners are released and the event
    /// stream ends. Without keep-alive the trigger handler is unbound as well.
    pub fn dispose(&self) {
        let subscription = {
            let mut core = self.shared.lock();
            if core.disposed {
                return;
            }
            core.disposed = true;
            if self.shared.options.keep_alive {
                core.coordinator.invalidate();
            } else {
                core.coordinator.unbind();
            }
            core.pending.clear();
            self.shared.set_state(&mut core, DataSourceState::Disposed);
            core.events = None;
            core.subscription.take()
        };
        if let Some(subscription) = subscription {
            subscription.unsubscribe();
        }
        self.shared.bus.clear();
        info!("{} disposed", self.shared.id);
    }

    /// Builds a live data source from a disposed keep-alive one.
    ///
    /// The new source keeps the trigger handler, the raw collection and the
    /// axis values, and issues no fetch.
    pub fn recreate(&self) -> Result<DataSource<T>, DataSourceError> {
        if !self.shared.options.keep_alive {
            return Err(DataSourceError::NotKeepAlive);
        }
        let core = self.shared.lock();
        if !core.disposed {
            return Err(DataSourceError::NotDisposed);
        }

        let fresh = DataSource::from_parts(
            self.shared.policy,
            self.shared.options.clone(),
            self.shared.matcher.clone(),
        );
        {
            let mut next = fresh.shared.lock();
            next.view.inherit(&core.view);
            next.view_cause = core.view_cause.clone();
            if let Some(handler) = core.coordinator.handler() {
                next.coordinator.bind(handler);
            }
            next.attached_once = core.attached_once;
            let state = if next.view.is_loaded() {
                DataSourceState::Ready
            } else {
                DataSourceState::Idle
            };
            fresh.shared.set_state(&mut next, state);
        }
        info!("{} recreated as {}", self.shared.id, fresh.shared.id);
        Ok(fresh)
    }
}

impl<T> Clone for DataSource<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> std::fmt::Debug for DataSource<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataSource")
            .field("id", &self.shared.id)
            .field("state", &*self.shared.state.borrow())
            .field("policy", &self.shared.policy)
            .finish()
    }
}

impl<T> Shared<T>
where
    T: Send + Sync + 'static,
{
    fn lock(&self) -> MutexGuard<'_, Core<T>> {
        self.core.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, core: &mut Core<T>, state: DataSourceState) {
        if !state.is_fetching() {
            core.settled = state;
        }
        self.state.send_if_modified(|current| {
            if *current == state {
                return false;
            }
            debug!("{} state {} -> {}", self.id, current, state);
            *current = state;
            true
        });
    }

    /// Bus listener: routes one trigger event.
    fn on_trigger(self: &Arc<Self>, event: &TriggerEvent<T>) {
        let kind = event.kind();
        let mut core = self.lock();
        if core.disposed {
            return;
        }
        core.view.set_axis(event);

        match self.policy.classify(kind) {
            Handling::Client => {
                debug!("{} applying {} on the client", self.id, kind);
                core.view_cause = event.clone();
                core.emit(DataSourceEvent::ViewInvalidated(event.clone()));
            }
            Handling::Delegated => {
                if let TriggerEvent::SourceChanged(source) = event {
                    core.coordinator.bind(source.clone());
                    core.attached_once = true;
                }
                if !core.coordinator.is_attached() {
                    debug!("{} no handler attached, buffering {}", self.id, kind);
                    core.pending.push(event.clone());
                    return;
                }
                let changed = core
                    .pending
                    .take()
                    .map(|(kinds, _)| kinds)
                    .unwrap_or_default()
                    .union(TriggerSet::only(kind));
                drop(core);
                self.request_fetch(event.clone(), changed);
            }
        }
    }

    /// Issues a new generation and calls the trigger handler for it.
    fn request_fetch(self: &Arc<Self>, reason: TriggerEvent<T>, changed: TriggerSet) {
        let (handler, request, notice) = {
            let mut core = self.lock();
            if core.disposed {
                return;
            }
            let Some(handler) = core.coordinator.handler() else {
                core.pending.push(reason);
                return;
            };
            let previous_generation = core.coordinator.latest();
            let generation = core.coordinator.issue();
            let request = TriggerRequest {
                generation,
                event: reason.clone(),
                changed,
                filter: core.view.filter().cloned(),
                sort: core.view.sort().cloned(),
                page: core.view.page(),
                previous: core.view.raw(),
            };
            let notice = FetchNotice {
                previous_generation,
                generation,
                event: reason,
            };
            self.set_state(&mut core, DataSourceState::Fetching);
            core.emit(DataSourceEvent::SourceChanging(notice.clone()));
            (handler, request, notice)
        };

        debug!(
            "{} fetching {} for {}",
            self.id,
            notice.generation,
            notice.event.kind()
        );
        let fetch = catch_unwind(AssertUnwindSafe(|| handler.on_trigger(request)))
            .unwrap_or_else(|payload| {
                Fetch::Failed(ProviderError::new(format!(
                    "trigger handler panicked: {}",
                    panic_message(&*payload)
                )))
            });

        match fetch {
            Fetch::Ready(collection) => self.complete(notice, Ok(Some(collection))),
            Fetch::Failed(error) => self.complete(notice, Err(error)),
            Fetch::Declined => self.complete(notice, Ok(None)),
            Fetch::Pending(future) => self.spawn_fetch(notice, future),
        }
    }

    fn spawn_fetch(self: &Arc<Self>, notice: FetchNotice<T>, future: PendingFetch<T>) {
        let runtime = match Handle::try_current() {
            Ok(runtime) => runtime,
            Err(_) => {
                warn!(
                    "{} pending fetch {} outside a tokio runtime",
                    self.id, notice.generation
                );
                self.complete(notice, Err(ProviderError::no_runtime()));
                return;
            }
        };

        {
            let mut core = self.lock();
            if core.disposed || core.coordinator.latest() != notice.generation {
                return;
            }
            core.coordinator.begin(notice.generation);
        }

        let weak = Arc::downgrade(self);
        runtime.spawn(async move {
            let result = AssertUnwindSafe(future)
                .catch_unwind()
                .await
                .unwrap_or_else(|payload| {
                    Err(ProviderError::new(format!(
                        "trigger handler panicked: {}",
                        panic_message(&*payload)
                    )))
                });
            if let Some(shared) = weak.upgrade() {
                shared.complete(notice, result);
            }
        });
    }

    /// Applies the result of a fetch if it belongs to the latest generation.
    fn complete(
        &self,
        notice: FetchNotice<T>,
        result: Result<Option<Collection<T>>, ProviderError>,
    ) {
        let mut core = self.lock();
        if core.disposed {
            return;
        }
        match core.coordinator.complete(notice.generation, result) {
            Outcome::Stale => {}
            Outcome::Declined => {
                debug!("{} fetch {} declined", self.id, notice.generation);
                let settled = core.settled;
                self.set_state(&mut core, settled);
            }
            Outcome::Apply(collection) => {
                debug!(
                    "{} fetch {} returned {} rows",
                    self.id,
                    notice.generation,
                    collection.len()
                );
                core.view.set_raw(collection);
                core.view_cause = notice.event.clone();
                self.set_state(&mut core, DataSourceState::Ready);
                core.emit(DataSourceEvent::SourceChanged(notice));
            }
            Outcome::Fail(error) => {
                warn!("{} fetch {} failed: {}", self.id, notice.generation, error);
                self.set_state(&mut core, DataSourceState::Error);
                core.emit(DataSourceEvent::Error {
                    notice,
                    error: SourceError::Provider(error),
                });
            }
        }
    }
}
