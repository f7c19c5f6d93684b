//! A single extension trait for bounding any future with a deadline.

use std::future::Future;
use std::time::Duration;

pub use tokio::time::error::Elapsed;

/// Adds [`with_timeout`](FutureExt::with_timeout) to every future.
pub trait FutureExt: Future + Sized {
    /// Runs `self` to completion, or returns `Err(Elapsed)` if `duration` passes first.
    fn with_timeout(self, duration: Duration) -> impl Future<Output = Result<Self::Output, Elapsed>> {
        tokio::time::timeout(duration, self)
    }
}

impl<F: Future> FutureExt for F {}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::FutureExt;

    #[tokio::test]
    async fn resolves_before_deadline() {
        let result = async { 7 }.with_timeout(Duration::from_millis(100)).await;
        assert_eq!(result, Ok(7));
    }

    #[tokio::test]
    async fn times_out_past_deadline() {
        let result = tokio::time::sleep(Duration::from_secs(10))
            .with_timeout(Duration::from_millis(10))
            .await;
        assert!(result.is_err());
    }
}
