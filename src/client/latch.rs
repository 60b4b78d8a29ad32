// src/client/latch.rs

use std::sync::atomic::{AtomicU8, Ordering};

const IDLE: u8 = 0;
const DISPATCHING: u8 = 1;
const DONE: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LatchState {
    Idle,
    Dispatching,
    Done,
}

/// Single-dispatch guard for submissions: `idle -> dispatching -> done`.
///
/// `try_acquire` is one compare-and-set, so whichever trigger (user click or
/// timeout) gets there first wins and every other caller is turned away
/// before any request is issued. A failed or abandoned dispatch goes back to idle.
#[derive(Debug, Default)]
pub struct SubmitLatch(AtomicU8);

impl SubmitLatch {
    pub const fn new() -> Self {
        Self(AtomicU8::new(IDLE))
    }

    /// Claims the right to dispatch. Returns `false` if a dispatch is in
    /// flight or has already succeeded.
    pub fn try_acquire(&self) -> bool {
        self.0
            .compare_exchange(IDLE, DISPATCHING, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Returns an in-flight dispatch to idle so it can be retried.
    pub fn release(&self) -> bool {
        self.0
            .compare_exchange(DISPATCHING, IDLE, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Marks the in-flight dispatch as final.
    pub fn complete(&self) -> bool {
        self.0
            .compare_exchange(DISPATCHING, DONE, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Like [`try_acquire`](Self::try_acquire), but the claim is released
    /// again if the returned guard is dropped before it is completed.
    pub fn acquire(&self) -> Option<DispatchGuard<'_>> {
        self.try_acquire().then_some(DispatchGuard {
            latch: self,
            armed: true,
        })
    }

    pub fn state(&self) -> LatchState {
        match self.0.load(Ordering::Acquire) {
            IDLE => LatchState::Idle,
            DISPATCHING => LatchState::Dispatching,
            _ => LatchState::Done,
        }
    }
}

/// An in-flight dispatch. Dropping it without [`complete`](Self::complete)
/// puts the latch back to idle, so an abandoned request never blocks a retry.
#[derive(Debug)]
pub struct DispatchGuard<'a> {
    latch: &'a SubmitLatch,
    armed: bool,
}

impl DispatchGuard<'_> {
    pub fn complete(mut self) {
        self.armed = false;
        self.latch.complete();
    }
}

impl Drop for DispatchGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.latch.release();
        }
    }
}
