// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Process-wide, irrevocable binding of "the main thread". See
//! [`bind_current_thread()`].

use super::DispatcherError;
use std::{sync::OnceLock,
          thread::{self, ThreadId}};

/// The thread that was designated as the main thread. Write-once for the lifetime of
/// the process.
///
/// # Why [`OnceLock`]?
///
/// Native UI and graphics APIs care about *the* thread that created their resources,
/// and that never changes while the process lives. A write-once cell expresses this
/// exactly: the first [`bind_current_thread()`] wins, there is no API to unset it, and
/// reads after initialization are lock-free.
static MAIN_THREAD_ID: OnceLock<ThreadId> = OnceLock::new();

/// Proof that the calling thread is the bound main thread. Returned by
/// [`bind_current_thread()`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MainThreadId(pub ThreadId);

/// Designates the calling thread as the main thread for the rest of the process.
///
/// Call this as early as possible, before any concurrent work begins.
/// [`Dispatcher::new()`] calls it for you.
///
/// | Binding state            | Result                                        |
/// | :----------------------- | :-------------------------------------------- |
/// | Unbound                  | Binds the calling thread, `Ok`                |
/// | Bound to calling thread  | No-op, `Ok` (idempotent)                      |
/// | Bound to another thread  | [`DispatcherError::MainThreadAlreadyBound`]   |
///
/// # Errors
///
/// Returns [`DispatcherError::MainThreadAlreadyBound`] if some other thread already
/// claimed the binding.
///
/// [`Dispatcher::new()`]: super::Dispatcher::new
pub fn bind_current_thread() -> Result<MainThreadId, DispatcherError> {
    let current = thread::current().id();
    let bound = *MAIN_THREAD_ID.get_or_init(|| current);
    if bound == current {
        Ok(MainThreadId(bound))
    } else {
        Err(DispatcherError::MainThreadAlreadyBound { bound, current })
    }
}

/// Returns the bound main thread, or [`None`] if nothing is bound yet.
#[must_use]
pub fn main_thread_id() -> Option<ThreadId> { MAIN_THREAD_ID.get().copied() }

/// Checks whether the calling thread is the bound main thread.
#[must_use]
pub fn is_main_thread() -> bool {
    main_thread_id().is_some_and(|id| id == thread::current().id())
}
