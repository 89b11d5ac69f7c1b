use std::future::Future;

use log::{debug, warn};
use tokio::sync::watch;

use crate::error::{ReasonCode, ToolkitError};

/// Observable lifecycle of one user-triggered workflow.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum OperationState<T> {
    #[default]
    Idle,
    Pending,
    Succeeded(T),
    Failed { code: ReasonCode, message: String },
}

impl<T> OperationState<T> {
    pub fn is_pending(&self) -> bool {
        matches!(self, OperationState::Pending)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OperationState::Succeeded(_) | OperationState::Failed { .. }
        )
    }
}

impl<T> From<&ToolkitError> for OperationState<T> {
    fn from(err: &ToolkitError) -> Self {
        OperationState::Failed {
            code: err.reason_code(),
            message: err.to_string(),
        }
    }
}

/// Single-flight driver for a workflow.
///
/// While a run is pending, further runs return [`ToolkitError::Busy`] and the
/// published state is left alone. Every transition is published on a watch
/// channel so front-ends can render progress.
pub struct OperationSlot<T> {
    state: watch::Sender<OperationState<T>>,
}

impl<T: Clone + Send + Sync + 'static> OperationSlot<T> {
    pub fn new() -> Self {
        let (state, _) = watch::channel(OperationState::Idle);
        Self { state }
    }

    pub fn subscribe(&self) -> watch::Receiver<OperationState<T>> {
        self.state.subscribe()
    }

    pub fn state(&self) -> OperationState<T> {
        self.state.borrow().clone()
    }

    pub fn is_pending(&self) -> bool {
        self.state.borrow().is_pending()
    }

    /// Drive `operation` to completion, publishing Pending then its outcome.
    ///
    /// Dropping the returned future before it finishes publishes an
    /// `Internal` failure so the slot can be run again.
    pub async fn run<F>(&self, operation: F) -> Result<T, ToolkitError>
    where
        F: Future<Output = Result<T, ToolkitError>>,
    {
        let claimed = self.state.send_if_modified(|state| {
            if state.is_pending() {
                false
            } else {
                *state = OperationState::Pending;
                true
            }
        });
        if !claimed {
            debug!("operation already pending, rejecting");
            return Err(ToolkitError::Busy);
        }

        let guard = PendingGuard {
            state: &self.state,
            completed: false,
        };
        let outcome = operation.await;
        let next = match &outcome {
            Ok(value) => OperationState::Succeeded(value.clone()),
            Err(err) => OperationState::from(err),
        };
        guard.complete(next);
        outcome
    }

    /// Return to Idle unless a run is in flight.
    pub fn reset(&self) {
        self.state.send_if_modified(|state| {
            if state.is_pending() || matches!(state, OperationState::Idle) {
                false
            } else {
                *state = OperationState::Idle;
                true
            }
        });
    }
}

/// Releases a claimed slot if the run is abandoned mid-flight.
struct PendingGuard<'a, T> {
    state: &'a watch::Sender<OperationState<T>>,
    completed: bool,
}

impl<T> PendingGuard<'_, T> {
    fn complete(mut self, next: OperationState<T>) {
        self.state.send_replace(next);
        self.completed = true;
    }
}

impl<T> Drop for PendingGuard<'_, T> {
    fn drop(&mut self) {
        if self.completed {
            return;
        }
        warn!("operation dropped while pending");
        self.state.send_replace(OperationState::from(&ToolkitError::Internal(
            "operation was cancelled before it finished".into(),
        )));
    }
}

impl<T: Clone + Send + Sync + 'static> Default for OperationSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;
    use std::time::Duration;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn success_is_published() {
        let slot = OperationSlot::new();
        let mut rx = slot.subscribe();

        let value = slot.run(async { Ok::<_, ToolkitError>(7u32) }).await.unwrap();
        assert_eq!(value, 7);
        assert_eq!(slot.state(), OperationState::Succeeded(7));
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), OperationState::Succeeded(7));
    }

    #[tokio::test]
    async fn failure_carries_reason_code() {
        let slot: OperationSlot<u32> = OperationSlot::new();
        let err = slot
            .run(async { Err(ValidationError::EmptyMessage.into()) })
            .await
            .unwrap_err();

        assert_eq!(err, ToolkitError::Validation(ValidationError::EmptyMessage));
        assert_eq!(
            slot.state(),
            OperationState::Failed {
                code: ReasonCode::Validation,
                message: "Please enter a message to sign".into()
            }
        );
    }

    #[tokio::test]
    async fn second_run_while_pending_is_busy() {
        let slot: OperationSlot<u32> = OperationSlot::new();
        let (release, gate) = oneshot::channel::<()>();

        let first = slot.run(async move {
            gate.await.ok();
            Ok(1)
        });
        let second = async {
            tokio::task::yield_now().await;
            assert!(slot.is_pending());
            let err = slot.run(async { Ok(2) }).await.unwrap_err();
            assert_eq!(err, ToolkitError::Busy);
            assert!(slot.is_pending());
            release.send(()).ok();
        };

        let (first, ()) = tokio::join!(first, second);
        assert_eq!(first.unwrap(), 1);
        assert_eq!(slot.state(), OperationState::Succeeded(1));
    }

    #[tokio::test]
    async fn slot_is_reusable_after_terminal_state() {
        let slot: OperationSlot<u32> = OperationSlot::new();
        slot.run(async { Err(ToolkitError::Internal("boom".into())) })
            .await
            .ok();
        assert!(slot.state().is_terminal());

        slot.reset();
        assert_eq!(slot.state(), OperationState::Idle);
        assert_eq!(slot.run(async { Ok(3) }).await.unwrap(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn abandoned_run_releases_the_slot() {
        let slot: OperationSlot<u32> = OperationSlot::new();

        let abandoned = tokio::time::timeout(
            Duration::from_millis(10),
            slot.run(std::future::pending()),
        )
        .await;
        assert!(abandoned.is_err());
        assert!(!slot.is_pending());
        match slot.state() {
            OperationState::Failed { code, .. } => assert_eq!(code, ReasonCode::Internal),
            other => panic!("unexpected state {other:?}"),
        }

        assert_eq!(slot.run(async { Ok(5) }).await.unwrap(), 5);
        assert_eq!(slot.state(), OperationState::Succeeded(5));
    }
}
