/// Application name
pub const APP_NAME: &str = "Parley";

/// Maximum message text length, in characters
pub const MAX_TEXT_LENGTH: usize = 2000;

/// Default number of messages per page
pub const DEFAULT_PAGE_SIZE: usize = 25;

/// Delay between delta polls when the remote reported no more changes (ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2000;

/// Delay between delta polls while the remote is still paging (ms)
pub const DEFAULT_CATCH_UP_INTERVAL_MS: u64 = 500;

/// Delay before re-opening the delta stream after a remote failure (ms)
pub const DEFAULT_RETRY_INTERVAL_MS: u64 = 5000;
