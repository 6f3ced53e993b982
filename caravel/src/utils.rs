//! Shared utilities

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

/// Injectable sleep function used by the polling and retry loops.
///
/// Production code wraps `tokio::time::sleep`; tests substitute an
/// instant sleep that records the requested delays.
pub type SleepFn = Arc<dyn Fn(Duration) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// The default sleep backed by the tokio timer.
pub fn default_sleep() -> SleepFn {
    Arc::new(|wait| {
        let fut: Pin<Box<dyn Future<Output = ()> + Send>> = Box::pin(tokio::time::sleep(wait));
        fut
    })
}
