//! Cancellation and deadline signal shared by every task of a run.

use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{sleep_until, Instant};

/// A cloneable signal that fires when the run's deadline elapses or when
/// [`CancelHandle::cancel`] is called, whichever comes first.
#[derive(Debug, Clone)]
pub struct RunContext {
    deadline: Option<Instant>,
    cancel_rx: watch::Receiver<bool>,
}

/// The owning side of a [`RunContext`]. Dropping it does not cancel the run.
#[derive(Debug)]
pub struct CancelHandle {
    cancel_tx: watch::Sender<bool>,
}

impl CancelHandle {
    /// Fires the signal for every clone of the associated context.
    pub fn cancel(&self) {
        self.cancel_tx.send_replace(true);
    }
}

impl RunContext {
    /// Creates a context without a deadline. It only fires on explicit cancel.
    pub fn new() -> (Self, CancelHandle) {
        Self::build(None)
    }

    /// Creates a context that fires once `timeout` has elapsed from now.
    pub fn with_timeout(timeout: Duration) -> (Self, CancelHandle) {
        Self::build(Some(Instant::now() + timeout))
    }

    fn build(deadline: Option<Instant>) -> (Self, CancelHandle) {
        let (cancel_tx, cancel_rx) = watch::channel(false);
        (
            Self {
                deadline,
                cancel_rx,
            },
            CancelHandle { cancel_tx },
        )
    }

    /// Returns `true` if the signal has already fired.
    pub fn is_cancelled(&self) -> bool {
        *self.cancel_rx.borrow() || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Completes once the signal fires. Never completes for a context with no
    /// deadline whose handle was dropped without cancelling.
    pub async fn cancelled(&self) {
        let mut cancel_rx = self.cancel_rx.clone();
        let explicit = async move {
            if cancel_rx.wait_for(|cancelled| *cancelled).await.is_err() {
                std::future::pending::<()>().await;
            }
        };

        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    _ = sleep_until(deadline) => {}
                    _ = explicit => {}
                }
            }
            None => explicit.await,
        }
    }
}
