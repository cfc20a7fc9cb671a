//! Immutable published state of a session.

use chrono::{DateTime, Utc};
use serde::Serialize;

use flagwatch_shared::Timestamp;

use crate::aggregate::{DerivedViews, VoteDedupe};
use crate::driver::DriverState;
use crate::event_set::EventSet;

/// Progress of the session's most recent sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionStatus {
    pub state: DriverState,
    /// Page requests issued by the sweep that produced this snapshot.
    pub pages_fetched: usize,
    pub start: Timestamp,
    pub cursor: Timestamp,
    pub event_count: usize,
    /// Set when the last sweep stopped on an error.
    pub last_error: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
    /// Completed periodic refreshes.
    pub refreshes: u64,
}

impl SessionStatus {
    pub fn idle(start: Timestamp) -> Self {
        Self {
            state: DriverState::Idle,
            pages_fetched: 0,
            start,
            cursor: start,
            event_count: 0,
            last_error: None,
            updated_at: None,
            refreshes: 0,
        }
    }

    pub fn has_error(&self) -> bool {
        self.last_error.is_some()
    }
}

/// Everything a reader needs: the flags, their derived views, and status.
/// Views always correspond to exactly these events.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub network: String,
    pub generation: u64,
    pub events: EventSet,
    pub views: DerivedViews,
    pub status: SessionStatus,
}

impl Snapshot {
    pub fn empty(network: impl Into<String>, generation: u64, start: Timestamp) -> Self {
        Self {
            network: network.into(),
            generation,
            events: EventSet::new(),
            views: DerivedViews::default(),
            status: SessionStatus::idle(start),
        }
    }

    /// Build a snapshot, recomputing every view from `events`.
    pub fn build(
        network: impl Into<String>,
        generation: u64,
        events: EventSet,
        mut status: SessionStatus,
        policy: VoteDedupe,
    ) -> Self {
        let views = DerivedViews::compute(&events, policy);
        status.event_count = events.len();
        status.updated_at = Some(Utc::now());
        Self {
            network: network.into(),
            generation,
            events,
            views,
            status,
        }
    }
}
