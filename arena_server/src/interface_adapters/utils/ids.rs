use std::sync::atomic::{AtomicU64, Ordering};

/// Returns a process-unique, monotonically increasing connection id.
///
/// Only used to correlate log lines; player ids come from the engine.
pub fn next_connection_id() -> u64 {
    static COUNTER: AtomicU64 = AtomicU64::new(1);
    COUNTER.fetch_add(1, Ordering::Relaxed)
}
