use std::sync::atomic::AtomicBool;

/// use total ordering for the atomic operations so neither the
/// compiler nor the CPU reorders a cancellation request past the
/// loads that look for it. A relaxed ordering would probably do for
/// a single latch flag but the cost difference is marginal here.
const ORDERING: std::sync::atomic::Ordering = std::sync::atomic::Ordering::SeqCst;

/// Cooperative cancellation latch.
///
/// Shared (behind an [`Arc`]) between the caller, the coordinator and
/// both endpoint threads. [`cancel`] latches the token; there is no way
/// to reset it. The endpoints only look at the token between blocking
/// operations, so the reaction latency is bounded by whatever timeout
/// bounds those operations (the receive timeout, the send cadence or
/// the handshake poll interval).
///
/// [`Arc`]: std::sync::Arc
/// [`cancel`]: CancelToken::cancel
#[derive(Debug, Default)]
pub struct CancelToken(AtomicBool);

impl CancelToken {
    pub fn new() -> Self {
        Self(AtomicBool::new(false))
    }

    /// Request cancellation. Idempotent.
    #[inline]
    pub fn cancel(&self) {
        self.0.store(true, ORDERING)
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(ORDERING)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    // allow bool assert comparison because we want to highlight
    // what we are actually expecting to have
    #[allow(clippy::bool_assert_comparison)]
    #[test]
    fn starts_unset() {
        assert_eq!(CancelToken::new().is_cancelled(), false);
        assert_eq!(CancelToken::default().is_cancelled(), false);
    }

    // allow bool assert comparison because we want to highlight
    // what we are actually expecting to have
    #[allow(clippy::bool_assert_comparison)]
    #[test]
    fn cancel_latches() {
        let token = CancelToken::new();

        assert_eq!(token.is_cancelled(), false);
        token.cancel();
        assert_eq!(token.is_cancelled(), true);
        // no reset: cancelling twice keeps the latch set
        token.cancel();
        assert_eq!(token.is_cancelled(), true);
    }

    #[test]
    fn visible_across_threads() {
        let token = Arc::new(CancelToken::new());

        let watcher = {
            let token = Arc::clone(&token);
            std::thread::spawn(move || {
                while !token.is_cancelled() {
                    std::thread::yield_now();
                }
            })
        };

        token.cancel();
        watcher.join().unwrap();
    }
}
