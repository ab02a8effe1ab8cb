//! Integration tests for asynchronous trigger handlers.
//!
//! Each fetch waits on a `oneshot` channel so the test decides when, and in
//! which order, results arrive.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::{FutureExt, StreamExt};
use gridsource_lib::error::ProviderError;
use gridsource_lib::fetch::{AsyncTriggerHandler, Collection, Fetch, TriggerRequest};
use gridsource_lib::query::PageRequest;
use gridsource_lib::source::EventStream;
use gridsource_lib::trigger::TriggerKind;
use gridsource_lib::{DataSource, DataSourceEvent, DataSourceState};
use simplelog::{Config, LevelFilter, TestLogger};
use tokio::sync::oneshot;

fn init_logging() {
    let _ = TestLogger::init(LevelFilter::Debug, Config::default());
}

fn drain<T: Send + Sync + 'static>(events: &mut EventStream<T>) -> Vec<DataSourceEvent<T>> {
    let mut out = Vec::new();
    while let Some(Some(event)) = events.next().now_or_never() {
        out.push(event);
    }
    out
}

fn names<T>(events: &[DataSourceEvent<T>]) -> Vec<&'static str> {
    events.iter().map(DataSourceEvent::name).collect()
}

/// Lets spawned fetch tasks run to completion.
async fn run_pending_tasks() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}

type Reply = Result<Option<Vec<u32>>, ProviderError>;

/// Handler whose fetches resolve only when the test says so.
#[derive(Clone, Default)]
struct Gate {
    waiting: Arc<Mutex<Vec<Option<oneshot::Sender<Reply>>>>>,
    requests: Arc<Mutex<Vec<TriggerRequest<u32>>>>,
}

impl Gate {
    fn handler(&self) -> impl Fn(TriggerRequest<u32>) -> Fetch<u32> + Send + Sync + 'static {
        let gate = self.clone();
        move |request: TriggerRequest<u32>| {
            let (tx, rx) = oneshot::channel::<Reply>();
            gate.waiting.lock().unwrap().push(Some(tx));
            gate.requests.lock().unwrap().push(request);
            Fetch::pending_optional(async move {
                match rx.await {
                    Ok(reply) => reply.map(|rows| rows.map(Collection::new)),
                    Err(_) => Err(ProviderError::new("gate dropped")),
                }
            })
        }
    }

    fn issued(&self) -> usize {
        self.waiting.lock().unwrap().len()
    }

    fn reply(&self, fetch: usize, reply: Reply) {
        let tx = self.waiting.lock().unwrap()[fetch]
            .take()
            .expect("fetch already resolved");
        let _ = tx.send(reply);
    }

    fn resolve(&self, fetch: usize, rows: Vec<u32>) {
        self.reply(fetch, Ok(Some(rows)));
    }
}

// =============================================================================
// Stale-fetch suppression
// =============================================================================

mod stale {
    use super::*;

    #[tokio::test]
    async fn test_older_fetch_resolving_last_is_dropped() {
        init_logging();
        let gate = Gate::default();
        let source = DataSource::builder()
            .skip_initial_trigger()
            .on_trigger(gate.handler())
            .create();

        source.refresh().unwrap();
        source.refresh().unwrap();
        assert_eq!(gate.issued(), 2);
        assert_eq!(source.state(), DataSourceState::Fetching);

        gate.resolve(1, vec![2, 2]);
        source.settled().await;
        assert_eq!(source.state(), DataSourceState::Ready);
        assert_eq!(source.rows().to_vec(), vec![2, 2]);

        gate.resolve(0, vec![1]);
        run_pending_tasks().await;
        assert_eq!(source.rows().to_vec(), vec![2, 2]);
        assert_eq!(source.state(), DataSourceState::Ready);
    }

    #[tokio::test]
    async fn test_older_fetch_resolving_first_is_dropped() {
        init_logging();
        let gate = Gate::default();
        let source = DataSource::builder()
            .skip_initial_trigger()
            .on_trigger(gate.handler())
            .create();

        source.refresh().unwrap();
        source.refresh().unwrap();

        gate.resolve(0, vec![1]);
        run_pending_tasks().await;
        assert!(source.rows().is_empty());
        assert_eq!(source.state(), DataSourceState::Fetching);

        gate.resolve(1, vec![2, 2]);
        source.settled().await;
        assert_eq!(source.rows().to_vec(), vec![2, 2]);
    }

    #[tokio::test]
    async fn test_stale_failure_not_reported() {
        init_logging();
        let gate = Gate::default();
        let source = DataSource::builder()
            .skip_initial_trigger()
            .on_trigger(gate.handler())
            .create();
        let mut events = source.events();

        source.refresh().unwrap();
        source.refresh().unwrap();
        gate.resolve(1, vec![9]);
        source.settled().await;
        gate.reply(0, Err(ProviderError::new("too late")));
        run_pending_tasks().await;

        let seen = drain(&mut events);
        assert_eq!(
            names(&seen),
            vec!["source-changing", "source-changing", "source-changed"]
        );
        assert_eq!(source.state(), DataSourceState::Ready);
    }

    #[tokio::test]
    async fn test_generation_in_request() {
        init_logging();
        let gate = Gate::default();
        let source = DataSource::builder()
            .skip_initial_trigger()
            .on_trigger(gate.handler())
            .create();

        source.refresh().unwrap();
        source.refresh().unwrap();

        let requests = gate.requests.lock().unwrap();
        assert!(requests[0].generation < requests[1].generation);
        assert_eq!(source.generation(), requests[1].generation);
    }
}

// =============================================================================
// State and events
// =============================================================================

mod lifecycle {
    use super::*;

    #[tokio::test]
    async fn test_state_transitions() {
        init_logging();
        let gate = Gate::default();
        let source = DataSource::builder().on_trigger(gate.handler()).create();
        let mut state = source.watch_state();

        assert_eq!(*state.borrow_and_update(), DataSourceState::Fetching);

        gate.reply(0, Err(ProviderError::new("offline")));
        state.changed().await.unwrap();
        assert_eq!(*state.borrow_and_update(), DataSourceState::Error);

        source.refresh().unwrap();
        assert_eq!(*state.borrow_and_update(), DataSourceState::Fetching);

        gate.resolve(1, vec![1, 2, 3]);
        state.changed().await.unwrap();
        assert_eq!(*state.borrow_and_update(), DataSourceState::Ready);
        assert_eq!(source.rows().len(), 3);
    }

    #[tokio::test]
    async fn test_rows_available_while_fetching() {
        init_logging();
        let gate = Gate::default();
        let source = DataSource::builder().on_trigger(gate.handler()).create();
        gate.resolve(0, vec![1, 2]);
        source.settled().await;

        source.refresh().unwrap();
        assert_eq!(source.state(), DataSourceState::Fetching);
        assert_eq!(source.rows().to_vec(), vec![1, 2]);

        gate.resolve(1, vec![3]);
        source.settled().await;
        assert_eq!(source.rows().to_vec(), vec![3]);
    }

    #[tokio::test]
    async fn test_changing_fires_before_resolution() {
        init_logging();
        let gate = Gate::default();
        let source = DataSource::builder()
            .skip_initial_trigger()
            .on_trigger(gate.handler())
            .create();
        let mut events = source.events();

        source.refresh().unwrap();
        assert_eq!(names(&drain(&mut events)), vec!["source-changing"]);

        gate.resolve(0, vec![1]);
        let next = events.next().await.unwrap();
        assert_eq!(next.name(), "source-changed");
    }

    #[tokio::test]
    async fn test_async_decline_restores_state() {
        init_logging();
        let gate = Gate::default();
        let source = DataSource::builder().on_trigger(gate.handler()).create();
        gate.resolve(0, vec![5]);
        source.settled().await;
        let mut events = source.events();

        source.refresh().unwrap();
        assert_eq!(source.state(), DataSourceState::Fetching);
        gate.reply(1, Ok(None));
        source.settled().await;

        assert_eq!(source.state(), DataSourceState::Ready);
        assert_eq!(source.rows().to_vec(), vec![5]);
        assert_eq!(names(&drain(&mut events)), vec!["source-changing"]);
    }

    #[tokio::test]
    async fn test_panicking_future_reports_error() {
        init_logging();
        let source = DataSource::builder()
            .on_trigger(|_: TriggerRequest<u32>| {
                Fetch::pending(async {
                    if true {
                        panic!("future blew up");
                    }
                    Ok::<_, ProviderError>(Collection::new(vec![1]))
                })
            })
            .create();

        source.settled().await;
        assert_eq!(source.state(), DataSourceState::Error);
    }

    #[tokio::test]
    async fn test_independent_subscribers() {
        init_logging();
        let gate = Gate::default();
        let source = DataSource::builder()
            .skip_initial_trigger()
            .on_trigger(gate.handler())
            .create();
        let mut first = source.events();

        source.refresh().unwrap();
        let mut second = source.events();
        gate.resolve(0, vec![1]);
        source.settled().await;

        assert_eq!(
            names(&drain(&mut first)),
            vec!["source-changing", "source-changed"]
        );
        assert_eq!(names(&drain(&mut second)), vec!["source-changed"]);
    }
}

// =============================================================================
// Dispose and detach with fetches in flight
// =============================================================================

mod teardown {
    use super::*;

    #[tokio::test]
    async fn test_result_after_dispose_ignored() {
        init_logging();
        let gate = Gate::default();
        let source = DataSource::builder().on_trigger(gate.handler()).create();
        let mut events = source.events();

        source.dispose();
        gate.resolve(0, vec![1]);
        run_pending_tasks().await;

        assert_eq!(source.state(), DataSourceState::Disposed);
        assert!(source.rows().is_empty());
        assert!(drain(&mut events).is_empty());
    }

    #[tokio::test]
    async fn test_detach_makes_in_flight_stale() {
        init_logging();
        let gate = Gate::default();
        let source = DataSource::builder().on_trigger(gate.handler()).create();

        let handler = source.detach().unwrap();
        assert_eq!(source.state(), DataSourceState::Idle);
        gate.resolve(0, vec![1]);
        run_pending_tasks().await;
        assert!(source.rows().is_empty());

        source.attach_source(handler).unwrap();
        source.refresh().unwrap();
        gate.resolve(1, vec![2]);
        source.settled().await;
        assert_eq!(source.rows().to_vec(), vec![2]);
    }

    #[tokio::test]
    async fn test_dropping_source_while_fetching() {
        init_logging();
        let gate = Gate::default();
        let source = DataSource::builder().on_trigger(gate.handler()).create();
        drop(source);

        gate.resolve(0, vec![1]);
        run_pending_tasks().await;
    }
}

// =============================================================================
// Racing fetches on a multi-threaded runtime
// =============================================================================

mod racing {
    use super::*;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_latest_fetch_wins_across_workers() {
        init_logging();
        let source = DataSource::builder()
            .skip_initial_trigger()
            .on_trigger(|request: TriggerRequest<u32>| {
                let generation = request.generation.get() as u32;
                let delay = Duration::from_millis(u64::from(generation * 7 % 5));
                Fetch::pending(async move {
                    tokio::time::sleep(delay).await;
                    Ok::<_, ProviderError>(Collection::new(vec![generation]))
                })
            })
            .create();

        for _ in 0..20 {
            source.refresh().unwrap();
        }
        tokio::time::timeout(Duration::from_secs(5), source.settled())
            .await
            .expect("latest fetch never settled");
        // Older fetches finishing after the latest must not overwrite it.
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(source.state(), DataSourceState::Ready);
        assert_eq!(
            source.rows().to_vec(),
            vec![source.generation().get() as u32]
        );
    }
}

// =============================================================================
// Async handler trait
// =============================================================================

mod async_handler {
    use super::*;

    struct PagedBackend {
        rows: Vec<u32>,
    }

    #[async_trait]
    impl AsyncTriggerHandler<u32> for PagedBackend {
        async fn fetch(
            &self,
            request: TriggerRequest<u32>,
        ) -> Result<Option<Collection<u32>>, ProviderError> {
            tokio::task::yield_now().await;
            let page = request.page.unwrap_or(PageRequest::first(4));
            let rows = self
                .rows
                .iter()
                .copied()
                .skip(page.index * page.size)
                .take(page.size)
                .collect::<Vec<_>>();
            Ok(Some(
                Collection::new(rows).with_total_count(self.rows.len()),
            ))
        }
    }

    #[tokio::test]
    async fn test_async_handler_serves_pages() {
        init_logging();
        let source = DataSource::<u32>::builder()
            .custom_triggers([TriggerKind::Page])
            .on_trigger_async(PagedBackend {
                rows: (0..10).collect(),
            })
            .create();
        source.settled().await;
        assert_eq!(source.rows().to_vec(), vec![0, 1, 2, 3]);

        source.set_page(PageRequest::new(2, 4)).unwrap();
        source.settled().await;
        assert_eq!(source.rows().to_vec(), vec![8, 9]);

        let info = source.page_info();
        assert_eq!(info.index, 2);
        assert_eq!(info.total_rows, 10);
        assert_eq!(info.page_count, 3);
    }
}
