//! Sweep Coordination
//!
//! `SweepGate` lets at most one eviction sweep run at a time. A caller that
//! arrives while a sweep is in flight blocks until it finishes and is then
//! told it was coalesced, so it reports no work of its own.
//!
//! `SweepContext` is the cancellation signal a sweep checks while walking
//! the index.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

// == Sweep Gate ==
#[derive(Debug, Default)]
struct GateState {
    running: bool,
    /// Bumped every time a sweep finishes
    generation: u64,
}

/// Admits one sweep at a time and parks everyone else until it ends.
#[derive(Debug, Default)]
pub struct SweepGate {
    state: Mutex<GateState>,
    finished: Condvar,
}

impl SweepGate {
    pub fn new() -> Self {
        Self::default()
    }

    // == Enter ==
    /// Claims the gate.
    ///
    /// Returns a permit if no sweep was running. Otherwise blocks until the
    /// running sweep drops its permit and returns `None`.
    pub fn enter(&self) -> Option<SweepPermit<'_>> {
        let mut state = self.lock();

        if !state.running {
            state.running = true;
            return Some(SweepPermit { gate: self });
        }

        let waiting_on = state.generation;
        while state.running && state.generation == waiting_on {
            state = self
                .finished
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
        None
    }

    /// Returns true while a sweep holds the gate.
    pub fn is_running(&self) -> bool {
        self.lock().running
    }

    fn lock(&self) -> MutexGuard<'_, GateState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// == Sweep Permit ==
/// Proof that the holder is the only sweep running. Releases the gate on drop.
#[derive(Debug)]
pub struct SweepPermit<'a> {
    gate: &'a SweepGate,
}

impl Drop for SweepPermit<'_> {
    fn drop(&mut self) {
        let mut state = self.gate.lock();
        state.running = false;
        state.generation = state.generation.wrapping_add(1);
        drop(state);
        self.gate.finished.notify_all();
    }
}

// == Sweep Context ==
/// Cancellation signal honoured by the index walk of a sweep.
///
/// Clones share the cancellation flag, so one handle can be given to the
/// sweeping thread and another kept to call [`SweepContext::cancel`].
#[derive(Debug, Clone, Default)]
pub struct SweepContext {
    deadline: Option<Instant>,
    cancelled: Arc<AtomicBool>,
}

impl SweepContext {
    /// A context that never fires on its own.
    pub fn background() -> Self {
        Self::default()
    }

    /// A context that fires once `deadline` has passed.
    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
            cancelled: Arc::default(),
        }
    }

    /// A context that fires `timeout` from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    /// Fires the context for every clone sharing it.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Returns true once cancelled or past the deadline.
    pub fn is_done(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
            || self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }
}
