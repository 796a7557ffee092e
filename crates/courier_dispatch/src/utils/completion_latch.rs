use std::{
    sync::atomic::{AtomicBool, Ordering},
    time::Duration,
};

use parking_lot::{Condvar, Mutex};

/// Countdown latch released once every worker signalled its completion.
///
/// Workers check [`CompletionLatch::is_cancelled`] to stop early when the
/// waiting side gave up.
pub struct CompletionLatch {
    remaining: Mutex<usize>,
    cvar: Condvar,
    cancelled: AtomicBool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LatchResult {
    Completed,
    TimedOut,
}

impl CompletionLatch {
    pub fn new(workers: usize) -> Self {
        Self {
            remaining: Mutex::new(workers),
            cvar: Condvar::new(),
            cancelled: AtomicBool::new(false),
        }
    }

    /// Returns a guard that counts the latch down when dropped, which also happens
    /// while unwinding from a panic.
    pub fn signal_on_drop(&self) -> CompletionSignal<'_> {
        CompletionSignal { latch: self }
    }

    fn count_down(&self) {
        let mut remaining = self.remaining.lock();
        *remaining = remaining.saturating_sub(1);
        if *remaining == 0 {
            self.cvar.notify_all();
        }
    }

    pub fn wait(&self, timeout: Option<Duration>) -> LatchResult {
        let mut remaining = self.remaining.lock();

        match timeout {
            Some(timeout) => {
                let result = self
                    .cvar
                    .wait_while_for(&mut remaining, |remaining| *remaining > 0, timeout);
                if result.timed_out() && *remaining > 0 {
                    LatchResult::TimedOut
                } else {
                    LatchResult::Completed
                }
            }
            None => {
                self.cvar.wait_while(&mut remaining, |remaining| *remaining > 0);
                LatchResult::Completed
            }
        }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

pub struct CompletionSignal<'a> {
    latch: &'a CompletionLatch,
}

impl Drop for CompletionSignal<'_> {
    fn drop(&mut self) {
        self.latch.count_down();
    }
}
