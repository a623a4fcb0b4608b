pub static DEFAULT_SYNC_ENDPOINT: &str = "https://jsonplaceholder.typicode.com/posts";
pub static DEFAULT_SYNC_INTERVAL_SECS: u64 = 60;
pub static DEFAULT_SYNC_LIMIT: usize = 10;
pub static DEFAULT_SYNC_TIMEOUT_SECS: u64 = 10;
