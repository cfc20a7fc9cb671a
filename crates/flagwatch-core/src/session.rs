//! Session management.
//!
//! At most one session is active. A session is a background task bound to
//! one network: it runs the initial pagination sweep, publishing a fresh
//! snapshot after every page, then re-queries the recent window on a fixed
//! interval. Selecting another network aborts the task and bumps the
//! generation counter; every publish checks the counter under the write
//! lock, so a late page from an abandoned session can never overwrite a
//! newer one.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use flagwatch_shared::constants::{
    DEFAULT_PAGE_SIZE, DEFAULT_REFRESH_INTERVAL_SECS, DEFAULT_WINDOW_DAYS,
};
use flagwatch_shared::Timestamp;
use flagwatch_source::{Connector, EventSource, NetworkRegistry};

use crate::aggregate::VoteDedupe;
use crate::driver::{start_bound, DriverState, PaginationDriver};
use crate::error::{DriverError, SessionError};
use crate::event_set::EventSet;
use crate::snapshot::{SessionStatus, Snapshot};

#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub page_size: usize,
    /// Days before today (UTC midnight) where every sweep starts.
    pub window_days: u32,
    pub refresh_interval: Duration,
    pub dedupe: VoteDedupe,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            window_days: DEFAULT_WINDOW_DAYS,
            refresh_interval: Duration::from_secs(DEFAULT_REFRESH_INTERVAL_SECS),
            dedupe: VoteDedupe::default(),
        }
    }
}

/// The currently published snapshot and the generation allowed to replace it.
struct Published {
    generation: u64,
    snapshot: Arc<Snapshot>,
}

/// Replace the published snapshot if it belongs to the current generation.
async fn publish(published: &RwLock<Published>, snapshot: Snapshot) -> bool {
    let mut guard = published.write().await;
    if guard.generation != snapshot.generation {
        return false;
    }
    guard.snapshot = Arc::new(snapshot);
    true
}

struct ActiveSession {
    network: String,
    generation: u64,
    task: JoinHandle<()>,
}

impl Drop for ActiveSession {
    fn drop(&mut self) {
        self.task.abort();
        debug!(network = %self.network, generation = self.generation, "Session task aborted");
    }
}

pub struct SessionManager {
    registry: NetworkRegistry,
    connector: Arc<dyn Connector>,
    settings: SessionSettings,
    published: Arc<RwLock<Published>>,
    active: Mutex<Option<ActiveSession>>,
}

impl SessionManager {
    pub fn new(
        registry: NetworkRegistry,
        connector: Arc<dyn Connector>,
        settings: SessionSettings,
    ) -> Self {
        let network = registry.default_network().name.clone();
        Self {
            registry,
            connector,
            settings,
            published: Arc::new(RwLock::new(Published {
                generation: 0,
                snapshot: Arc::new(Snapshot::empty(network, 0, 0)),
            })),
            active: Mutex::new(None),
        }
    }

    pub fn registry(&self) -> &NetworkRegistry {
        &self.registry
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    /// Make the resolved network the active session and return its latest
    /// snapshot. Re-selecting the active network does nothing; any other
    /// selection discards the current session and starts a new one.
    pub async fn select(&self, requested: Option<&str>) -> Result<Arc<Snapshot>, SessionError> {
        let network = self.registry.select(requested).clone();
        let mut active = self.active.lock().await;

        if active.as_ref().is_some_and(|s| s.network == network.name) {
            return Ok(self.snapshot().await);
        }

        let source = self
            .connector
            .connect(&network)
            .map_err(|source| SessionError::Connect {
                network: network.name.clone(),
                source,
            })?;

        if let Some(old) = active.take() {
            info!(
                from = %old.network,
                to = %network.name,
                generation = old.generation,
                "Switching network, discarding session"
            );
        }

        let start = start_bound(Utc::now(), self.settings.window_days);
        let generation = {
            let mut published = self.published.write().await;
            published.generation += 1;
            published.snapshot = Arc::new(Snapshot::empty(
                network.name.clone(),
                published.generation,
                start,
            ));
            published.generation
        };

        let task = SessionTask {
            published: self.published.clone(),
            source,
            network: network.name.clone(),
            generation,
            start,
            settings: self.settings.clone(),
        };
        info!(network = %network.name, generation, start, "Starting session");

        *active = Some(ActiveSession {
            network: network.name,
            generation,
            task: tokio::spawn(task.run()),
        });
        drop(active);

        Ok(self.snapshot().await)
    }

    /// Latest published snapshot of the active session.
    pub async fn snapshot(&self) -> Arc<Snapshot> {
        self.published.read().await.snapshot.clone()
    }

    pub async fn active_network(&self) -> Option<String> {
        self.active.lock().await.as_ref().map(|s| s.network.clone())
    }

    /// Tear down the active session and its refresh timer.
    pub async fn shutdown(&self) {
        if let Some(session) = self.active.lock().await.take() {
            info!(network = %session.network, "Shutting down session");
            self.published.write().await.generation += 1;
        }
    }
}

struct SessionTask {
    published: Arc<RwLock<Published>>,
    source: Arc<dyn EventSource>,
    network: String,
    generation: u64,
    start: Timestamp,
    settings: SessionSettings,
}

impl SessionTask {
    async fn run(self) {
        let Some(mut current) = self.initial_sweep().await else {
            debug!(network = %self.network, generation = self.generation, "Superseded during initial sweep");
            return;
        };

        let period = self.settings.refresh_interval;
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut refreshes = 0u64;

        loop {
            interval.tick().await;
            let start = start_bound(Utc::now(), self.settings.window_days);
            let mut driver =
                PaginationDriver::new(self.source.clone(), start, self.settings.page_size);

            let snapshot = match driver.run().await {
                Ok(()) => {
                    refreshes += 1;
                    let status = status_of(&driver, None, refreshes);
                    current = driver.into_events();
                    info!(
                        network = %self.network,
                        events = current.len(),
                        refreshes,
                        "Refresh complete"
                    );
                    self.snapshot(current.clone(), status)
                }
                Err(e) => {
                    warn!(network = %self.network, error = %e, "Refresh failed, keeping previous data");
                    let mut status = status_of(&driver, Some(&e), refreshes);
                    status.state = DriverState::Failed;
                    self.snapshot(current.clone(), status)
                }
            };

            if !publish(&self.published, snapshot).await {
                debug!(network = %self.network, generation = self.generation, "Superseded during refresh");
                return;
            }
        }
    }

    /// Page through the window, publishing after every page. Returns the
    /// collected events, or `None` once the session has been superseded.
    async fn initial_sweep(&self) -> Option<EventSet> {
        let mut driver =
            PaginationDriver::new(self.source.clone(), self.start, self.settings.page_size);
        loop {
            let result = driver.step().await;
            let status = status_of(&driver, result.as_ref().err(), 0);
            let snapshot = self.snapshot(driver.events().clone(), status);
            if !publish(&self.published, snapshot).await {
                return None;
            }
            if driver.state().is_terminal() {
                return Some(driver.into_events());
            }
        }
    }

    fn snapshot(&self, events: EventSet, status: SessionStatus) -> Snapshot {
        Snapshot::build(
            self.network.clone(),
            self.generation,
            events,
            status,
            self.settings.dedupe,
        )
    }
}

fn status_of(
    driver: &PaginationDriver,
    error: Option<&DriverError>,
    refreshes: u64,
) -> SessionStatus {
    SessionStatus {
        state: driver.state(),
        pages_fetched: driver.requests(),
        start: driver.start(),
        cursor: driver.cursor(),
        event_count: driver.events().len(),
        last_error: error.map(ToString::to_string),
        updated_at: None,
        refreshes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use flagwatch_shared::{Actor, Flag};
    use flagwatch_source::{MemoryConnector, MemorySource, NetworkConfig, SourceError};

    fn recent_flags(n: i64) -> Vec<Flag> {
        let now = Utc::now().timestamp();
        (0..n)
            .map(|i| {
                Flag::new(
                    format!("flag-{i}"),
                    now - 3600 * (n - i),
                    Actor::new(format!("flagger-{}", i % 3)),
                    Actor::new("target"),
                )
            })
            .collect()
    }

    fn manager(source: MemorySource, page_size: usize) -> (SessionManager, Arc<MemorySource>) {
        let source = Arc::new(source);
        let settings = SessionSettings {
            page_size,
            window_days: 7,
            refresh_interval: Duration::from_secs(300),
            dedupe: VoteDedupe::default(),
        };
        let manager = SessionManager::new(
            NetworkRegistry::builtin(),
            Arc::new(MemoryConnector::new(source.clone())),
            settings,
        );
        (manager, source)
    }

    async fn wait_for<F>(manager: &SessionManager, pred: F) -> Arc<Snapshot>
    where
        F: Fn(&Snapshot) -> bool,
    {
        for _ in 0..10_000 {
            let snapshot = manager.snapshot().await;
            if pred(&snapshot) {
                return snapshot;
            }
            tokio::task::yield_now().await;
        }
        panic!("condition not reached");
    }

    #[tokio::test(start_paused = true)]
    async fn test_initial_sweep_publishes_complete_snapshot() {
        let (manager, source) = manager(MemorySource::new("mem", recent_flags(5)), 2);
        let first = manager.select(None).await.unwrap();
        assert_eq!(first.network, "mumbai");
        assert_eq!(first.generation, 1);

        let done = wait_for(&manager, |s| s.status.state == DriverState::Complete).await;
        assert_eq!(done.events.len(), 5);
        assert_eq!(done.status.pages_fetched, 3);
        assert_eq!(done.views.daily.total(), 5);
        assert_eq!(done.views.flagger_ranking.len(), 3);
        assert!(!done.status.has_error());
        assert_eq!(source.request_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reselecting_same_network_keeps_session() {
        let (manager, _) = manager(MemorySource::new("mem", recent_flags(1)), 10);
        manager.select(Some("mumbai")).await.unwrap();
        let again = manager.select(Some("unknown-net")).await.unwrap();
        assert_eq!(again.generation, 1);
        assert_eq!(manager.active_network().await.as_deref(), Some("mumbai"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_switching_network_starts_new_generation() {
        let (manager, _) = manager(MemorySource::new("mem", recent_flags(4)), 10);
        manager.select(None).await.unwrap();
        wait_for(&manager, |s| s.status.state == DriverState::Complete).await;

        let switched = manager.select(Some("polygon")).await.unwrap();
        assert_eq!(switched.generation, 2);
        assert_eq!(switched.network, "polygon");
        assert!(switched.events.is_empty());

        let done = wait_for(&manager, |s| s.status.state == DriverState::Complete).await;
        assert_eq!(done.network, "polygon");
        assert_eq!(done.events.len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_keeps_partial_events() {
        let source = MemorySource::new("mem", recent_flags(6)).failing_on_request(2);
        let (manager, _) = manager(source, 2);
        manager.select(None).await.unwrap();

        let failed = wait_for(&manager, |s| s.status.state == DriverState::Failed).await;
        assert_eq!(failed.events.len(), 2);
        assert!(failed.status.has_error());
        assert_eq!(failed.status.pages_fetched, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_periodic_refresh_requeries() {
        let (manager, source) = manager(MemorySource::new("mem", recent_flags(3)), 10);
        manager.select(None).await.unwrap();
        wait_for(&manager, |s| s.status.state == DriverState::Complete).await;
        assert_eq!(source.request_count(), 1);

        tokio::time::advance(Duration::from_secs(301)).await;
        let refreshed = wait_for(&manager, |s| s.status.refreshes == 1).await;
        assert_eq!(refreshed.events.len(), 3);
        assert_eq!(source.request_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_refresh_keeps_previous_data() {
        let source = MemorySource::new("mem", recent_flags(3)).failing_on_request(2);
        let (manager, _) = manager(source, 10);
        manager.select(None).await.unwrap();
        wait_for(&manager, |s| s.status.state == DriverState::Complete).await;

        tokio::time::advance(Duration::from_secs(301)).await;
        let failed = wait_for(&manager, |s| s.status.state == DriverState::Failed).await;
        assert_eq!(failed.events.len(), 3);
        assert_eq!(failed.views.daily.total(), 3);
        assert!(failed.status.has_error());
        assert_eq!(failed.status.refreshes, 0);
    }

    #[tokio::test]
    async fn test_stale_generation_cannot_publish() {
        let published = RwLock::new(Published {
            generation: 2,
            snapshot: Arc::new(Snapshot::empty("polygon", 2, 0)),
        });
        let stale = Snapshot::empty("mumbai", 1, 0);
        assert!(!publish(&published, stale).await);
        assert_eq!(published.read().await.snapshot.network, "polygon");

        let current = Snapshot::empty("polygon", 2, 99);
        assert!(publish(&published, current).await);
        assert_eq!(published.read().await.snapshot.status.start, 99);
    }

    /// Delays every page before answering from an in-memory list.
    struct SlowSource {
        delay: Duration,
        inner: MemorySource,
    }

    #[async_trait]
    impl EventSource for SlowSource {
        async fn fetch_page(
            &self,
            since: Timestamp,
            page_size: usize,
        ) -> Result<Vec<Flag>, SourceError> {
            tokio::time::sleep(self.delay).await;
            self.inner.fetch_page(since, page_size).await
        }

        fn name(&self) -> &str {
            self.inner.name()
        }
    }

    struct PerNetwork {
        mumbai: Arc<dyn EventSource>,
        polygon: Arc<dyn EventSource>,
    }

    impl Connector for PerNetwork {
        fn connect(&self, network: &NetworkConfig) -> Result<Arc<dyn EventSource>, SourceError> {
            match network.name.as_str() {
                "mumbai" => Ok(self.mumbai.clone()),
                "polygon" => Ok(self.polygon.clone()),
                other => Err(SourceError::Unavailable(format!("no source for {other}"))),
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_page_from_abandoned_network_is_dropped() {
        let now = Utc::now().timestamp();
        let flags = |prefix: &str, n: i64| -> Vec<Flag> {
            (0..n)
                .map(|i| {
                    Flag::new(
                        format!("{prefix}-{i}"),
                        now - 60 * (n - i),
                        Actor::new(prefix),
                        Actor::new("t"),
                    )
                })
                .collect()
        };
        let connector = PerNetwork {
            mumbai: Arc::new(SlowSource {
                delay: Duration::from_secs(10),
                inner: MemorySource::new("mumbai", flags("m", 3)),
            }),
            polygon: Arc::new(MemorySource::new("polygon", flags("p", 2))),
        };
        let manager = SessionManager::new(
            NetworkRegistry::builtin(),
            Arc::new(connector),
            SessionSettings {
                page_size: 10,
                ..SessionSettings::default()
            },
        );

        manager.select(Some("mumbai")).await.unwrap();
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        manager.select(Some("polygon")).await.unwrap();
        wait_for(&manager, |s| s.status.state == DriverState::Complete).await;

        tokio::time::advance(Duration::from_secs(11)).await;
        for _ in 0..100 {
            tokio::task::yield_now().await;
        }

        let last = manager.snapshot().await;
        assert_eq!(last.network, "polygon");
        assert_eq!(last.generation, 2);
        let ids: Vec<_> = last.events.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, ["p-0", "p-1"]);
        assert_eq!(last.views.ranking(crate::ActorRole::Flagger)[0].actor_id, "p");
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_clears_session() {
        let (manager, _) = manager(MemorySource::new("mem", recent_flags(2)), 10);
        manager.select(None).await.unwrap();
        manager.shutdown().await;
        assert_eq!(manager.active_network().await, None);
    }
}
