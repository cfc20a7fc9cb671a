//! # flagwatch-shared
//!
//! Domain types shared by every flagwatch crate: flags, votes, actors,
//! arbitrary-precision vote weights, and the record-level error type used
//! when a single field fails to parse.

pub mod constants;
pub mod error;
pub mod types;
pub mod weight;

pub use error::RecordError;
pub use types::{Actor, Flag, FlagResult, Timestamp, Vote};
pub use weight::Weight;
