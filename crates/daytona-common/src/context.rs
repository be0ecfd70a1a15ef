//! Per-operation cancellation.
//!
//! Every lifecycle operation runs under an [`OpContext`]. The context carries
//! an optional deadline and a cancel flag; polling loops consult it at the top
//! of each iteration and while sleeping.

use std::fmt;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelCause {
    DeadlineExceeded,
    Cancelled,
}

impl fmt::Display for CancelCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CancelCause::DeadlineExceeded => write!(f, "context deadline exceeded"),
            CancelCause::Cancelled => write!(f, "context canceled"),
        }
    }
}

#[derive(Clone)]
pub struct OpContext {
    deadline: Option<Instant>,
    cancel_rx: watch::Receiver<bool>,
}

/// Owner side of an [`OpContext`]; dropping it does not cancel.
#[derive(Clone)]
pub struct CancelHandle {
    cancel_tx: std::sync::Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.cancel_tx.send_replace(true);
    }
}

impl OpContext {
    /// A context that never expires and cannot be cancelled.
    pub fn background() -> Self {
        let (_tx, rx) = watch::channel(false);
        Self {
            deadline: None,
            cancel_rx: rx,
        }
    }

    pub fn with_cancel() -> (Self, CancelHandle) {
        let (tx, rx) = watch::channel(false);
        (
            Self {
                deadline: None,
                cancel_rx: rx,
            },
            CancelHandle {
                cancel_tx: std::sync::Arc::new(tx),
            },
        )
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Tightens the deadline; an earlier existing deadline is kept.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(existing) if existing < deadline => existing,
            _ => deadline,
        });
        self
    }

    /// Returns the cause if the context is already done.
    pub fn cancelled(&self) -> Option<CancelCause> {
        if *self.cancel_rx.borrow() {
            return Some(CancelCause::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(CancelCause::DeadlineExceeded),
            _ => None,
        }
    }

    /// Resolves once the context is done.
    pub async fn done(&self) -> CancelCause {
        let mut rx = self.cancel_rx.clone();
        let cancelled = async move {
            loop {
                if *rx.borrow_and_update() {
                    return;
                }
                if rx.changed().await.is_err() {
                    // sender gone without cancelling: never fires
                    std::future::pending::<()>().await;
                }
            }
        };

        match self.deadline {
            Some(deadline) => tokio::select! {
                _ = cancelled => CancelCause::Cancelled,
                _ = tokio::time::sleep_until(deadline) => CancelCause::DeadlineExceeded,
            },
            None => {
                cancelled.await;
                CancelCause::Cancelled
            }
        }
    }

    /// Sleeps for `period` unless the context finishes first.
    pub async fn sleep(&self, period: Duration) -> Result<(), CancelCause> {
        tokio::select! {
            cause = self.done() => Err(cause),
            _ = tokio::time::sleep(period) => Ok(()),
        }
    }
}

impl fmt::Debug for OpContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpContext")
            .field("deadline", &self.deadline)
            .field("cancelled", &*self.cancel_rx.borrow())
            .finish()
    }
}
