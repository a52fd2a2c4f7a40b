//! Deadline enforcement for capability calls.
//!
//! # Responsibilities
//! - Give every call its own deadline and cancellation token
//! - Race the capability against the deadline
//! - Cancel the token when the deadline wins
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - Cancellation is cooperative: the future is dropped and the token is
//!   cancelled, but in-flight external work is not forcibly killed
//! - Timeout is distinct from every other failure

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};

/// Cancellation scope threaded through a capability invocation.
#[derive(Debug, Clone)]
pub struct ToolContext {
    deadline: Instant,
    timeout: Duration,
    cancel: CancellationToken,
}

impl ToolContext {
    pub fn new(timeout: Duration) -> Self {
        Self {
            deadline: Instant::now() + timeout,
            timeout,
            cancel: CancellationToken::new(),
        }
    }

    /// Resolves once the deadline has passed and the call was abandoned.
    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.cancel.cancelled()
    }
}

/// The deadline passed before the call finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("deadline of {}ms exceeded", .0.as_millis())]
pub struct DeadlineExceeded(pub Duration);

/// Run `fut` until it completes or `ctx`'s deadline passes.
pub async fn run_with_deadline<F>(ctx: &ToolContext, fut: F) -> Result<F::Output, DeadlineExceeded>
where
    F: Future,
{
    match tokio::time::timeout_at(ctx.deadline, fut).await {
        Ok(output) => Ok(output),
        Err(_) => {
            ctx.cancel.cancel();
            Err(DeadlineExceeded(ctx.timeout))
        }
    }
}
