//! Caller-initiated cancellation and deadlines for retrying operations

use std::future::pending;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

/// Trigger side of a [`Cancellation`]
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    /// Abort the associated operation at its next suspension point
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

/// Observer side: resolves when cancelled or when the deadline passes
///
/// Dropping the [`CancelHandle`] without calling `cancel` never cancels.
#[derive(Debug, Clone, Default)]
pub struct Cancellation {
    rx: Option<watch::Receiver<bool>>,
    deadline: Option<Instant>,
}

impl Cancellation {
    /// A signal that never fires
    pub fn never() -> Self {
        Self::default()
    }

    /// A signal fired through the returned handle
    pub fn new() -> (CancelHandle, Self) {
        let (tx, rx) = watch::channel(false);
        (
            CancelHandle { tx },
            Self {
                rx: Some(rx),
                deadline: None,
            },
        )
    }

    /// A signal that fires once `timeout` has elapsed
    pub fn after(timeout: Duration) -> Self {
        Self::never().with_timeout(timeout)
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(existing) => existing.min(deadline),
            None => deadline,
        });
        self
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn is_cancelled(&self) -> bool {
        let signalled = self.rx.as_ref().is_some_and(|rx| *rx.borrow());
        let expired = self.deadline.is_some_and(|d| Instant::now() >= d);
        signalled || expired
    }

    /// Wait until the operation should stop
    pub async fn cancelled(&self) {
        let signal = async {
            match &self.rx {
                Some(rx) => {
                    let mut rx = rx.clone();
                    loop {
                        if *rx.borrow_and_update() {
                            return;
                        }
                        if rx.changed().await.is_err() {
                            pending::<()>().await;
                        }
                    }
                }
                None => pending::<()>().await,
            }
        };

        let deadline = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => pending::<()>().await,
            }
        };

        tokio::select! {
            _ = signal => {}
            _ = deadline => {}
        }
    }
}
