//! Bounded admission of interpreter processes.

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::debug;

use crate::context::CallContext;
use crate::error::ExecError;

/// Fixed pool of execution slots shared by every call made through one runner.
#[derive(Debug, Clone)]
pub struct ConcurrencyGate {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

/// One held slot. Dropping it returns the slot, including on panic or cancellation.
#[derive(Debug)]
pub struct Slot {
    _permit: OwnedSemaphorePermit,
}

impl ConcurrencyGate {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self { semaphore: Arc::new(Semaphore::new(capacity)), capacity }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Waits for a free slot, giving up without one if the caller is cancelled first.
    pub async fn acquire(&self, ctx: &CallContext) -> Result<Slot, ExecError> {
        ctx.check().map_err(ExecError::Cancelled)?;

        let permit = tokio::select! {
            biased;
            reason = ctx.done() => return Err(ExecError::Cancelled(reason)),
            permit = self.semaphore.clone().acquire_owned() => {
                permit.map_err(|_| ExecError::GateClosed)?
            }
        };
        debug!(available = self.available(), capacity = self.capacity, "slot acquired");
        Ok(Slot { _permit: permit })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;
    use crate::context::CancelReason;

    #[tokio::test]
    async fn slot_is_returned_on_drop() {
        let gate = ConcurrencyGate::new(2);
        let slot = gate.acquire(&CallContext::new()).await.unwrap();
        assert_eq!(gate.available(), 1);
        drop(slot);
        assert_eq!(gate.available(), 2);
    }

    #[tokio::test]
    async fn zero_capacity_is_clamped() {
        assert_eq!(ConcurrencyGate::new(0).capacity(), 1);
    }

    #[tokio::test]
    async fn waiting_caller_gives_up_at_deadline_without_a_slot() {
        let gate = ConcurrencyGate::new(1);
        let _held = gate.acquire(&CallContext::new()).await.unwrap();

        let ctx = CallContext::with_timeout(Duration::from_millis(30));
        let err = gate.acquire(&ctx).await.unwrap_err();
        assert!(matches!(err, ExecError::Cancelled(CancelReason::DeadlineExceeded)));
        assert_eq!(gate.available(), 0);
    }

    #[tokio::test]
    async fn cancelled_context_never_acquires() {
        let gate = ConcurrencyGate::new(1);
        let ctx = CallContext::new();
        ctx.cancel();
        let err = gate.acquire(&ctx).await.unwrap_err();
        assert!(matches!(err, ExecError::Cancelled(CancelReason::Cancelled)));
        assert_eq!(gate.available(), 1);
    }

    #[tokio::test]
    async fn panicking_holder_releases_slot() {
        let gate = ConcurrencyGate::new(1);
        let inner = gate.clone();
        let joined = tokio::spawn(async move {
            let _slot = inner.acquire(&CallContext::new()).await.unwrap();
            panic!("holder failed");
        })
        .await;
        assert!(joined.is_err());
        assert_eq!(gate.available(), 1);
    }

    #[tokio::test]
    async fn never_more_than_capacity_holders() {
        let gate = ConcurrencyGate::new(3);
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = (0..12)
            .map(|_| {
                let gate = gate.clone();
                let running = running.clone();
                let peak = peak.clone();
                tokio::spawn(async move {
                    let _slot = gate.acquire(&CallContext::new()).await.unwrap();
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    running.fetch_sub(1, Ordering::SeqCst);
                })
            })
            .collect();
        for t in futures::future::join_all(tasks).await {
            t.unwrap();
        }

        assert_eq!(peak.load(Ordering::SeqCst), 3);
        assert_eq!(gate.available(), 3);
    }
}
