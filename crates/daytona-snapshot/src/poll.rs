use daytona_common::{CancelCause, OpContext};
use std::future::Future;
use std::time::Duration;
use tracing::info;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Polling configuration shared by every wait loop.
///
/// No retry limit and no overall timeout; the deadline belongs to the
/// caller's [`OpContext`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub interval: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl PollSettings {
    pub fn with_interval(interval: Duration) -> Self {
        Self { interval }
    }
}

/// Result of one probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Probe<T> {
    Ready(T),
    Pending,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollError<E> {
    Cancelled(CancelCause),
    Failed(E),
}

/// Runs `probe` every `settings.interval` until it is ready or fails.
///
/// The context is checked at the top of every iteration, raced against each
/// probe and raced against the sleep, so cancellation surfaces within one
/// interval.
pub async fn poll_until<T, E, F, Fut>(
    ctx: &OpContext,
    settings: &PollSettings,
    waiting_message: &str,
    mut probe: F,
) -> Result<T, PollError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Probe<T>, E>>,
{
    loop {
        if let Some(cause) = ctx.cancelled() {
            return Err(PollError::Cancelled(cause));
        }

        let outcome = tokio::select! {
            cause = ctx.done() => return Err(PollError::Cancelled(cause)),
            outcome = probe() => outcome,
        };

        match outcome {
            Ok(Probe::Ready(value)) => return Ok(value),
            Ok(Probe::Pending) => {}
            Err(e) => return Err(PollError::Failed(e)),
        }

        info!("{}", waiting_message);
        ctx.sleep(settings.interval)
            .await
            .map_err(PollError::Cancelled)?;
    }
}
