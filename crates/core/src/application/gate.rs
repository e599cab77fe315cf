// Concurrency Gate
// Counting semaphore with a FIFO wait queue and direct slot hand-off

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::domain::DomainError;

/// Bounds how many invocations may run at once
///
/// Cloning is cheap and every clone shares the same slots. Slots are held by
/// [`GatePermit`]s and returned when the permit is dropped, so a slot is
/// released exactly once on every exit path.
///
/// When a slot frees up while callers are queued, it is handed straight to
/// the oldest waiter: `running` never dips, so a concurrent `acquire` cannot
/// jump the queue.
#[derive(Clone)]
pub struct ConcurrencyGate {
    inner: Arc<GateInner>,
}

struct GateInner {
    max_concurrency: usize,
    state: Mutex<GateState>,
}

struct GateState {
    running: usize,
    waiters: VecDeque<oneshot::Sender<()>>,
}

impl ConcurrencyGate {
    /// Create a gate admitting at most `max_concurrency` holders
    ///
    /// A bound of zero would never admit anyone and is raised to 1.
    pub fn new(max_concurrency: usize) -> Self {
        if max_concurrency == 0 {
            warn!("Gate max_concurrency of 0 would deadlock, using 1");
        }
        Self::build(max_concurrency.max(1))
    }

    /// Like `new`, but rejects a zero bound
    pub fn try_new(max_concurrency: usize) -> Result<Self, DomainError> {
        if max_concurrency == 0 {
            return Err(DomainError::InvalidConcurrency(max_concurrency));
        }
        Ok(Self::build(max_concurrency))
    }

    fn build(max_concurrency: usize) -> Self {
        Self {
            inner: Arc::new(GateInner {
                max_concurrency,
                state: Mutex::new(GateState {
                    running: 0,
                    waiters: VecDeque::new(),
                }),
            }),
        }
    }

    pub fn max_concurrency(&self) -> usize {
        self.inner.max_concurrency
    }

    /// Number of holders currently admitted
    pub fn running(&self) -> usize {
        self.lock().running
    }

    /// Number of callers queued for a slot
    pub fn waiting(&self) -> usize {
        self.lock()
            .waiters
            .iter()
            .filter(|tx| !tx.is_closed())
            .count()
    }

    /// Wait for a slot
    ///
    /// Never fails. Callers are admitted strictly in arrival order. Dropping
    /// the returned future while queued gives up the place in line (and the
    /// slot, if it was already handed over).
    pub async fn acquire(&self) -> GatePermit {
        loop {
            let rx = {
                let mut state = self.lock();
                if state.running < self.inner.max_concurrency {
                    state.running += 1;
                    debug!(running = state.running, "Gate slot acquired");
                    return self.permit();
                }
                let (tx, rx) = oneshot::channel();
                state.waiters.push_back(tx);
                debug!(
                    running = state.running,
                    waiting = state.waiters.len(),
                    "Gate saturated, queueing"
                );
                rx
            };

            let mut waiter = Waiter {
                rx,
                gate: self,
                granted: false,
            };
            if (&mut waiter.rx).await.is_ok() {
                waiter.granted = true;
                debug!("Gate slot handed over from previous holder");
                return self.permit();
            }
            // Sender dropped without a grant; queue again
            waiter.granted = true;
        }
    }

    /// Take a slot only if one is free right now
    pub fn try_acquire(&self) -> Option<GatePermit> {
        let mut state = self.lock();
        if state.running < self.inner.max_concurrency {
            state.running += 1;
            Some(self.permit())
        } else {
            None
        }
    }

    fn permit(&self) -> GatePermit {
        GatePermit { gate: self.clone() }
    }

    /// Return a slot; only reachable through `GatePermit::drop`
    fn release(&self) {
        let mut state = self.lock();
        debug_assert!(state.running > 0, "gate released more often than acquired");

        while let Some(next) = state.waiters.pop_front() {
            // The slot moves to the waiter, `running` is unchanged
            if next.send(()).is_ok() {
                debug!(
                    running = state.running,
                    waiting = state.waiters.len(),
                    "Gate slot transferred to next waiter"
                );
                return;
            }
        }

        state.running = state.running.saturating_sub(1);
        debug!(running = state.running, "Gate slot released");
    }

    fn lock(&self) -> MutexGuard<'_, GateState> {
        // Plain counters stay consistent even if a holder panicked
        self.inner
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl std::fmt::Debug for ConcurrencyGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("ConcurrencyGate")
            .field("max_concurrency", &self.inner.max_concurrency)
            .field("running", &state.running)
            .field("waiting", &state.waiters.len())
            .finish()
    }
}

/// A held gate slot, released on drop
#[must_use = "the slot is released as soon as the permit is dropped"]
pub struct GatePermit {
    gate: ConcurrencyGate,
}

impl Drop for GatePermit {
    fn drop(&mut self) {
        self.gate.release();
    }
}

impl std::fmt::Debug for GatePermit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatePermit").finish_non_exhaustive()
    }
}

/// Queued acquire; hands back a slot granted to a cancelled caller
struct Waiter<'a> {
    rx: oneshot::Receiver<()>,
    gate: &'a ConcurrencyGate,
    granted: bool,
}

impl Drop for Waiter<'_> {
    fn drop(&mut self) {
        if self.granted {
            return;
        }
        self.rx.close();
        if self.rx.try_recv().is_ok() {
            self.gate.release();
        }
    }
}
