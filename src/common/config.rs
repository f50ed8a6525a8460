use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Default size of a page in bytes (4 KB)
pub const DEFAULT_PAGE_SIZE: usize = 4096;

/// Default buffer pool capacity (number of cached pages)
pub const DEFAULT_POOL_SIZE: usize = 50;

/// Default bound on a single lock acquisition before the transaction aborts
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(10);

/// Number of buckets allocated per histogram by the statistics layer
pub const NUM_HIST_BUCKETS: usize = 100;

static PAGE_SIZE: AtomicUsize = AtomicUsize::new(DEFAULT_PAGE_SIZE);

/// Returns the current page size in bytes.
///
/// Pages already in memory keep the size they were built with; mixing sizes
/// within one heap file is undefined. The size should only change at process
/// start or between test cases.
pub fn page_size() -> usize {
    PAGE_SIZE.load(Ordering::Relaxed)
}

/// Overrides the page size. Intended for tests only.
pub fn set_page_size(size: usize) {
    PAGE_SIZE.store(size, Ordering::Relaxed);
}

/// Restores the default page size. Intended for tests only.
pub fn reset_page_size() {
    PAGE_SIZE.store(DEFAULT_PAGE_SIZE, Ordering::Relaxed);
}
