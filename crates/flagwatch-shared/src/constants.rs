/// Application name
pub const APP_NAME: &str = "flagwatch";

/// Maximum page size accepted by the subgraph (`first` argument)
pub const DEFAULT_PAGE_SIZE: usize = 1000;

/// Interval between full re-queries of the recent window (5 minutes)
pub const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 300;

/// How many days before today the pagination sweep starts
pub const DEFAULT_WINDOW_DAYS: u32 = 30;

/// Number of actors shown on a leaderboard
pub const DEFAULT_TOP_K: usize = 5;

/// Vote weights are integers scaled by 10^WEIGHT_DECIMALS
pub const WEIGHT_DECIMALS: usize = 18;

/// Default HTTP API port
pub const DEFAULT_HTTP_PORT: u16 = 8080;

/// HTTP request timeout against the query endpoint, in seconds
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Network selected when the request names none or an unknown one
pub const DEFAULT_NETWORK: &str = "mumbai";
