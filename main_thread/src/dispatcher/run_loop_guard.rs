// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Gate ensuring at most one run-loop is active in the process at a time.
//!
//! - [`RunLoopClaim::try_claim()`] marks a run-loop as active (fails if already set)
//! - Dropping the [`RunLoopClaim`] resets it, allowing the next run-loop

use super::DispatcherError;
use std::sync::atomic::{AtomicBool, Ordering};

/// Tracks whether a run-loop is currently active.
///
/// # Why [`AtomicBool`] instead of [`Mutex<bool>`]?
///
/// The claim is released from [`Drop`], which also runs while a panic from a queued
/// closure unwinds through [`Dispatcher::run()`]. A [`Mutex`] locked during that
/// unwinding would be poisoned. `AtomicBool::swap()` has no lock to poison.
///
/// [`Dispatcher::run()`]: super::Dispatcher::run
/// [`Mutex<bool>`]: std::sync::Mutex
/// [`Mutex`]: std::sync::Mutex
static RUN_LOOP_ACTIVE: AtomicBool = AtomicBool::new(false);

/// [RAII] claim on the process-wide "run-loop active" flag.
///
/// [RAII]: https://en.wikipedia.org/wiki/Resource_acquisition_is_initialization
#[derive(Debug)]
pub struct RunLoopClaim {
    _private: (),
}

impl RunLoopClaim {
    /// Claims the flag.
    ///
    /// # Errors
    ///
    /// Returns [`DispatcherError::RunLoopAlreadyActive`] if another claim is alive.
    pub fn try_claim() -> Result<Self, DispatcherError> {
        // swap() returns the OLD value - false means there is no preexisting run-loop.
        let already_active = RUN_LOOP_ACTIVE.swap(true, Ordering::SeqCst);
        if already_active {
            Err(DispatcherError::RunLoopAlreadyActive)
        } else {
            Ok(Self { _private: () })
        }
    }
}

impl Drop for RunLoopClaim {
    fn drop(&mut self) { RUN_LOOP_ACTIVE.store(false, Ordering::SeqCst); }
}

/// Checks whether any run-loop is active in the process.
#[must_use]
pub fn is_run_loop_active() -> bool { RUN_LOOP_ACTIVE.load(Ordering::SeqCst) }
