//! Polling primitives shared by every wait-aware operation.
//!
//! Waiting is tight-loop polling at a configurable interval, not event
//! subscription: evaluate the condition, return on true, sleep, repeat until
//! the timeout budget is spent. The polling loops in this module are the only
//! suspension points in the crate; everything else is a single awaited driver
//! call.
//!
//! There is no cooperative cancellation: a wait ends only by the condition
//! becoming true or by timeout expiry.

// ============================================================================
// Imports
// ============================================================================

use std::future::Future;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::time::sleep;

use crate::error::Result;

// ============================================================================
// WaitOpts
// ============================================================================

/// Per-call overrides for a node's timeout and polling interval.
///
/// `None` fields fall back to the node's own configuration, which in turn
/// comes from the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitOpts {
    /// Maximum total wait in milliseconds.
    pub timeout_ms: Option<u64>,

    /// Polling cadence in milliseconds.
    pub interval_ms: Option<u64>,
}

impl WaitOpts {
    /// Creates empty options (node defaults apply).
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            timeout_ms: None,
            interval_ms: None,
        }
    }

    /// Sets the timeout override.
    #[inline]
    #[must_use]
    pub const fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    /// Sets the interval override.
    #[inline]
    #[must_use]
    pub const fn with_interval_ms(mut self, interval_ms: u64) -> Self {
        self.interval_ms = Some(interval_ms);
        self
    }
}

// ============================================================================
// Polling
// ============================================================================

/// Polls `cond` until it returns `true` or `timeout` elapses.
///
/// Returns `Ok(true)` when the condition held, `Ok(false)` on timeout. The
/// condition is always evaluated at least once, so a zero timeout still
/// succeeds for an already-true condition. Errors from the condition
/// propagate immediately.
///
/// This single primitive backs both blocking modes: `wait` callers turn
/// `Ok(false)` into a [`WaitTimeout`](crate::Error::WaitTimeout) carrying
/// their own expected/actual diff, `eventually` callers return it as the
/// answer. The raise lives at the call site because only the caller knows
/// the condition's name and diff.
pub async fn poll<F, Fut>(timeout: Duration, interval: Duration, mut cond: F) -> Result<bool>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool>>,
{
    let deadline = Instant::now() + timeout;

    loop {
        if cond().await? {
            return Ok(true);
        }

        if Instant::now() >= deadline {
            return Ok(false);
        }

        sleep(interval).await;
    }
}

// ============================================================================
// Tests
// ============================================================================
