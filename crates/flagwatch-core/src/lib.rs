//! # flagwatch-core
//!
//! The data-acquisition and aggregation pipeline behind the dashboard.
//!
//! - [`PaginationDriver`] walks the flag log page by page, advancing a
//!   timestamp cursor until a short page or a source failure.
//! - [`EventSet`] is the ordered, id-deduplicated store it fills.
//! - [`aggregate`] derives the daily histogram, vote alignment, weighted
//!   kick fraction, and actor rankings, recomputed in full on every change.
//! - [`SessionManager`] owns the single active session: one background task
//!   per network selection, with a cancelable periodic refresh and a
//!   generation counter guarding every publish.

pub mod aggregate;
pub mod driver;
pub mod event_set;
pub mod session;
pub mod snapshot;

mod error;

pub use aggregate::{ActorRank, ActorRole, DerivedViews, KickFraction, VoteDedupe};
pub use driver::{start_bound, DriverState, PaginationDriver};
pub use error::{DriverError, SessionError};
pub use event_set::EventSet;
pub use session::{SessionManager, SessionSettings};
pub use snapshot::{SessionStatus, Snapshot};
