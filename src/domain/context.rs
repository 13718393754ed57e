//! Cancellation and deadline propagation for every blocking operation

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;

use super::DomainError;

/// Carries cancellation and an optional deadline through retrievers, synthesizers,
/// engines and agents. Cloning is cheap; clones observe the same cancellation.
#[derive(Debug, Clone, Default)]
pub struct QueryContext {
    cancel: Option<watch::Receiver<bool>>,
    deadline: Option<Instant>,
}

/// Cancels every context cloned from the one it was created with
#[derive(Debug, Clone)]
pub struct CancelHandle {
    sender: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.sender.borrow()
    }
}

impl QueryContext {
    /// A context that is never cancelled and has no deadline
    pub fn background() -> Self {
        Self::default()
    }

    pub fn with_cancel() -> (Self, CancelHandle) {
        let (sender, receiver) = watch::channel(false);

        (
            Self {
                cancel: Some(receiver),
                deadline: None,
            },
            CancelHandle {
                sender: Arc::new(sender),
            },
        )
    }

    /// Tightens the deadline; an earlier existing deadline is kept
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

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel_requested() || self.deadline_passed()
    }

    /// Fails with `Cancelled` if the context is already done
    pub fn check(&self) -> Result<(), DomainError> {
        if self.is_cancelled() {
            return Err(self.cancellation_error());
        }
        Ok(())
    }

    /// Resolves once the context is cancelled or its deadline passes
    pub async fn cancelled(&self) {
        let signal = async {
            match self.cancel.clone() {
                Some(mut receiver) => {
                    let closed = receiver.wait_for(|cancelled| *cancelled).await.is_err();
                    if closed {
                        std::future::pending::<()>().await;
                    }
                }
                None => std::future::pending::<()>().await,
            }
        };

        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    _ = signal => {}
                    _ = tokio::time::sleep_until(deadline) => {}
                }
            }
            None => signal.await,
        }
    }

    /// Races `future` against cancellation
    pub async fn run<F, T>(&self, future: F) -> Result<T, DomainError>
    where
        F: Future<Output = Result<T, DomainError>>,
    {
        self.check()?;

        tokio::select! {
            biased;
            _ = self.cancelled() => Err(self.cancellation_error()),
            result = future => result,
        }
    }

    /// Cancellable sleep
    pub async fn sleep(&self, duration: Duration) -> Result<(), DomainError> {
        self.check()?;

        tokio::select! {
            biased;
            _ = self.cancelled() => Err(self.cancellation_error()),
            _ = tokio::time::sleep(duration) => Ok(()),
        }
    }

    fn cancel_requested(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|receiver| *receiver.borrow())
    }

    fn deadline_passed(&self) -> bool {
        self.deadline
            .is_some_and(|deadline| Instant::now() >= deadline)
    }

    fn cancellation_error(&self) -> DomainError {
        if self.cancel_requested() {
            DomainError::cancelled("operation cancelled")
        } else {
            DomainError::cancelled("deadline exceeded")
        }
    }
}
