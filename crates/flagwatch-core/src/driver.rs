//! Pagination driver.
//!
//! Repeatedly asks the source for flags strictly after the cursor. A full
//! page means there may be more: the cursor moves to the page's last
//! timestamp and the driver fetches again. A short (or empty) page ends
//! the sweep. A source failure stops the sweep and keeps whatever was
//! already appended.
//!
//! ```text
//! Idle ──▶ Fetching ──▶ Draining ──▶ Fetching   (full page)
//!              │             └─────▶ Complete   (short page)
//!              └───────────────────▶ Failed     (source error)
//! ```

use std::sync::Arc;

use chrono::{DateTime, Days, NaiveTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use flagwatch_shared::Timestamp;
use flagwatch_source::EventSource;

use crate::error::DriverError;
use crate::event_set::EventSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DriverState {
    Idle,
    Fetching,
    Draining,
    Complete,
    Failed,
}

impl DriverState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Failed)
    }
}

/// Start of the sweep window: `window_days` before `now`, at UTC midnight.
pub fn start_bound(now: DateTime<Utc>, window_days: u32) -> Timestamp {
    now.date_naive()
        .checked_sub_days(Days::new(u64::from(window_days)))
        .map(|day| day.and_time(NaiveTime::MIN).and_utc().timestamp())
        .unwrap_or(0)
}

pub struct PaginationDriver {
    source: Arc<dyn EventSource>,
    page_size: usize,
    start: Timestamp,
    cursor: Timestamp,
    state: DriverState,
    requests: usize,
    events: EventSet,
}

impl PaginationDriver {
    pub fn new(source: Arc<dyn EventSource>, start: Timestamp, page_size: usize) -> Self {
        Self {
            source,
            page_size: page_size.max(1),
            start,
            cursor: start,
            state: DriverState::Idle,
            requests: 0,
            events: EventSet::new(),
        }
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    /// Timestamp of the last appended page's final flag, or the start bound.
    pub fn cursor(&self) -> Timestamp {
        self.cursor
    }

    pub fn start(&self) -> Timestamp {
        self.start
    }

    /// Number of page requests issued so far.
    pub fn requests(&self) -> usize {
        self.requests
    }

    pub fn events(&self) -> &EventSet {
        &self.events
    }

    pub fn into_events(self) -> EventSet {
        self.events
    }

    /// Fetch and absorb one page. Calling this in a terminal state is a
    /// no-op that returns the state.
    pub async fn step(&mut self) -> Result<DriverState, DriverError> {
        if self.state.is_terminal() {
            return Ok(self.state);
        }

        self.state = DriverState::Fetching;
        self.requests += 1;

        let page = match self.source.fetch_page(self.cursor, self.page_size).await {
            Ok(page) => page,
            Err(e) => {
                self.state = DriverState::Failed;
                warn!(
                    network = %self.source.name(),
                    cursor = self.cursor,
                    request = self.requests,
                    error = %e,
                    "Page fetch failed, keeping partial data"
                );
                return Err(e.into());
            }
        };

        self.state = DriverState::Draining;
        let full = page.len() >= self.page_size;
        let previous = self.cursor;
        let fetched = page.len();
        let added = self.events.append(page);

        if let Some(last) = self.events.last_timestamp() {
            self.cursor = last;
        }

        debug!(
            network = %self.source.name(),
            request = self.requests,
            fetched,
            added,
            cursor = self.cursor,
            "Absorbed page"
        );

        if full && self.cursor <= previous {
            self.state = DriverState::Failed;
            warn!(network = %self.source.name(), cursor = previous, "Cursor stalled");
            return Err(DriverError::CursorStalled { cursor: previous });
        }

        self.state = if full {
            DriverState::Fetching
        } else {
            info!(
                network = %self.source.name(),
                requests = self.requests,
                events = self.events.len(),
                "Sweep complete"
            );
            DriverState::Complete
        };
        Ok(self.state)
    }

    /// Step until the sweep completes or fails.
    pub async fn run(&mut self) -> Result<(), DriverError> {
        while !self.step().await?.is_terminal() {}
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use chrono::TimeZone;
    use flagwatch_shared::{Actor, Flag};
    use flagwatch_source::{MemorySource, SourceError};

    fn flag(id: &str, ts: Timestamp) -> Flag {
        Flag::new(id, ts, Actor::new("f"), Actor::new("t"))
    }

    fn flags(range: std::ops::Range<i64>) -> Vec<Flag> {
        range.map(|ts| flag(&format!("f{ts}"), ts)).collect()
    }

    #[test]
    fn test_start_bound_truncates_to_midnight() {
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 15, 42, 7).unwrap();
        let expected = Utc.with_ymd_and_hms(2024, 3, 3, 0, 0, 0).unwrap().timestamp();
        assert_eq!(start_bound(now, 7), expected);
        let today = Utc.with_ymd_and_hms(2024, 3, 10, 0, 0, 0).unwrap().timestamp();
        assert_eq!(start_bound(now, 0), today);
    }

    #[tokio::test]
    async fn test_short_first_page_single_request() {
        let source = Arc::new(MemorySource::new("mem", flags(1..4)));
        let mut driver = PaginationDriver::new(source.clone(), 0, 10);
        driver.run().await.unwrap();

        assert_eq!(driver.state(), DriverState::Complete);
        assert_eq!(source.request_count(), 1);
        assert_eq!(driver.events().len(), 3);
        assert_eq!(driver.cursor(), 3);
    }

    #[tokio::test]
    async fn test_full_pages_then_empty() {
        let source = Arc::new(MemorySource::new("mem", flags(1..7)));
        let mut driver = PaginationDriver::new(source.clone(), 0, 3);

        assert_eq!(driver.step().await.unwrap(), DriverState::Fetching);
        assert_eq!(driver.cursor(), 3);
        assert_eq!(driver.step().await.unwrap(), DriverState::Fetching);
        assert_eq!(driver.cursor(), 6);
        assert_eq!(driver.step().await.unwrap(), DriverState::Complete);
        assert_eq!(driver.cursor(), 6);

        assert_eq!(source.requested_cursors(), vec![0, 3, 6]);
        assert_eq!(driver.events().len(), 6);
        assert_eq!(driver.step().await.unwrap(), DriverState::Complete);
        assert_eq!(driver.requests(), 3);
    }

    #[tokio::test]
    async fn test_empty_source_keeps_start_cursor() {
        let source = Arc::new(MemorySource::new("mem", Vec::new()));
        let mut driver = PaginationDriver::new(source, 500, 10);
        driver.run().await.unwrap();
        assert_eq!(driver.cursor(), 500);
        assert!(driver.events().is_empty());
    }

    #[tokio::test]
    async fn test_failure_preserves_partial_data() {
        let source = Arc::new(MemorySource::new("mem", flags(1..8)).failing_on_request(2));
        let mut driver = PaginationDriver::new(source, 0, 3);

        let err = driver.run().await.unwrap_err();
        assert!(matches!(err, DriverError::Source(SourceError::Unavailable(_))));
        assert_eq!(driver.state(), DriverState::Failed);
        let ids: Vec<_> = driver.events().iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, ["f1", "f2", "f3"]);
        assert_eq!(driver.cursor(), 3);
    }

    struct StuckSource;

    #[async_trait]
    impl EventSource for StuckSource {
        async fn fetch_page(
            &self,
            since: Timestamp,
            page_size: usize,
        ) -> Result<Vec<Flag>, SourceError> {
            Ok((0..page_size).map(|i| flag(&format!("s{i}"), since)).collect())
        }

        fn name(&self) -> &str {
            "stuck"
        }
    }

    #[tokio::test]
    async fn test_stalled_cursor_fails_instead_of_looping() {
        let mut driver = PaginationDriver::new(Arc::new(StuckSource), 100, 2);
        let err = driver.run().await.unwrap_err();
        assert!(matches!(err, DriverError::CursorStalled { cursor: 100 }));
        assert_eq!(driver.requests(), 1);
    }
}
