use thiserror::Error;

use flagwatch_shared::Timestamp;
use flagwatch_source::SourceError;

/// Why a pagination sweep stopped early.
#[derive(Error, Debug)]
pub enum DriverError {
    #[error("Source unavailable: {0}")]
    Source(#[from] SourceError),

    /// The source returned a full page whose last event is not after the
    /// cursor. Timestamps need not be unique, but any run sharing one
    /// timestamp must fit in a single page.
    #[error("Cursor stalled at {cursor}: full page did not advance past it")]
    CursorStalled { cursor: Timestamp },
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Failed to connect to network {network}: {source}")]
    Connect {
        network: String,
        #[source]
        source: SourceError,
    },
}
