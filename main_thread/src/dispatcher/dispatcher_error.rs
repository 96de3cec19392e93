// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

// cspell:words taskthreads

//! Error type for the main thread dispatcher. See [`DispatcherError`] for details.

use std::thread::ThreadId;

/// Errors surfaced by the [`Dispatcher`] itself.
///
/// Application errors returned by submitted closures never show up here; they are
/// carried verbatim to the caller of [`call_err()`] or [`call_val()`].
///
/// There are two kinds of variants:
///
/// | Kind        | Variants                                                                                                      | How it surfaces           |
/// | :---------- | :------------------------------------------------------------------------------------------------------------ | :------------------------ |
/// | Recoverable | [`InvalidQueueCapacity`], [`MainThreadAlreadyBound`], [`NotOnMainThread`], [`RunLoopAlreadyActive`], [`EntryThreadSpawn`], [`EntryRoutinePanicked`] | `Err(..)` from a function |
/// | Fatal       | [`RunLoopNotActive`], [`QueueFullOnMainThread`], [`CallDroppedAtShutdown`]                                   | [`panic!`] on the caller  |
///
/// The fatal ones are programming errors: submitting work with no active run-loop, or
/// relying on work that was submitted after the entry routine already returned. They
/// are never retried.
///
/// [`CallDroppedAtShutdown`]: Self::CallDroppedAtShutdown
/// [`Dispatcher`]: super::Dispatcher
/// [`EntryRoutinePanicked`]: Self::EntryRoutinePanicked
/// [`EntryThreadSpawn`]: Self::EntryThreadSpawn
/// [`InvalidQueueCapacity`]: Self::InvalidQueueCapacity
/// [`MainThreadAlreadyBound`]: Self::MainThreadAlreadyBound
/// [`NotOnMainThread`]: Self::NotOnMainThread
/// [`QueueFullOnMainThread`]: Self::QueueFullOnMainThread
/// [`RunLoopAlreadyActive`]: Self::RunLoopAlreadyActive
/// [`RunLoopNotActive`]: Self::RunLoopNotActive
/// [`call_err()`]: super::MainThreadHandle::call_err
/// [`call_val()`]: super::MainThreadHandle::call_val
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum DispatcherError {
    /// The configured queue capacity can't back a bounded channel.
    #[error("Invalid call queue capacity: {capacity}")]
    #[diagnostic(
        code(r3bl_main_thread::config::invalid_queue_capacity),
        help("The call queue capacity must be at least 1. The default is 16.")
    )]
    InvalidQueueCapacity { capacity: usize },

    /// The process main thread was already bound to some other thread.
    #[error("Main thread is already bound to {bound:?}, can't rebind to {current:?}")]
    #[diagnostic(
        code(r3bl_main_thread::binding::already_bound),
        help(
            "The main thread binding is irrevocable for the lifetime of the process. \
             Create the Dispatcher on the same thread every time, ideally first thing \
             in `fn main()`."
        )
    )]
    MainThreadAlreadyBound { bound: ThreadId, current: ThreadId },

    /// [`Dispatcher::run()`] was invoked on a thread that isn't the bound main thread.
    ///
    /// [`Dispatcher::run()`]: super::Dispatcher::run
    #[error("Run-loop must be started on the bound main thread {bound:?}, not {current:?}")]
    #[diagnostic(code(r3bl_main_thread::binding::not_on_main_thread))]
    NotOnMainThread { bound: ThreadId, current: ThreadId },

    /// Another run-loop is currently active in this process.
    #[error("A main thread run-loop is already active in this process")]
    #[diagnostic(
        code(r3bl_main_thread::run_loop::already_active),
        help("Only one run-loop may be active at a time. Wait for it to return first.")
    )]
    RunLoopAlreadyActive,

    /// [`std::thread::Builder::spawn()`] failed for the entry routine thread.
    #[error("Failed to spawn the entry routine thread")]
    #[diagnostic(code(r3bl_main_thread::run_loop::entry_thread_spawn))]
    #[cfg_attr(
        target_os = "linux",
        diagnostic(help(
            "The system may have reached its thread limit - \
             check `ulimit -u` for per-user limit, \
             `cat /proc/sys/kernel/threads-max` for system-wide limit"
        ))
    )]
    #[cfg_attr(
        target_os = "macos",
        diagnostic(help(
            "The system may have reached its thread limit - \
             check `ulimit -u` for per-user limit, \
             `sysctl kern.num_taskthreads` for per-process limit"
        ))
    )]
    EntryThreadSpawn(#[source] std::io::Error),

    /// The entry routine panicked. The run-loop was torn down normally.
    #[error("Entry routine panicked: {message}")]
    #[diagnostic(code(r3bl_main_thread::run_loop::entry_panicked))]
    EntryRoutinePanicked { message: String },

    /// A submission was made while no run-loop is active (before [`run()`] started,
    /// or after it returned).
    ///
    /// [`run()`]: super::Dispatcher::run
    #[error("mainthread: did not call run (no active run-loop)")]
    #[diagnostic(
        code(r3bl_main_thread::submit::run_loop_not_active),
        help(
            "Move the rest of your application into the entry routine passed to \
             Dispatcher::run(), and only submit work from there."
        )
    )]
    RunLoopNotActive,

    /// [`call_non_block()`] was made from the main thread while the queue is full.
    /// Waiting would deadlock, since only the main thread drains the queue.
    ///
    /// [`call_non_block()`]: super::MainThreadHandle::call_non_block
    #[error("Call queue is full and call_non_block() was made from the main thread")]
    #[diagnostic(
        code(r3bl_main_thread::submit::queue_full_on_main_thread),
        help("Increase DispatcherConfig::queue_capacity, or run the work inline.")
    )]
    QueueFullOnMainThread,

    /// A blocking call lost the race with shutdown: it was enqueued after the entry
    /// routine returned, and was dropped without running.
    #[error("Call was dropped because the run-loop shut down before executing it")]
    #[diagnostic(
        code(r3bl_main_thread::submit::call_dropped_at_shutdown),
        help(
            "Work submitted after the entry routine returns is not guaranteed to run. \
             Join your worker threads before the entry routine returns."
        )
    )]
    CallDroppedAtShutdown,
}

/// Extracts a printable message from a panic payload.
///
/// Payloads created by [`panic!`] are either `&'static str` or [`String`]. Anything
/// else is reported generically.
#[must_use]
pub fn panic_payload_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(it) = payload.downcast_ref::<&'static str>() {
        (*it).to_string()
    } else if let Some(it) = payload.downcast_ref::<String>() {
        it.clone()
    } else {
        "Box<dyn Any>".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_panic_payload_message_str_and_string() {
        let payload = std::panic::catch_unwind(|| panic!("boom")).unwrap_err();
        assert_eq!(panic_payload_message(payload.as_ref()), "boom");

        let value = 42;
        let payload = std::panic::catch_unwind(|| panic!("boom {value}")).unwrap_err();
        assert_eq!(panic_payload_message(payload.as_ref()), "boom 42");

        let payload = std::panic::catch_unwind(|| std::panic::panic_any(7_u8)).unwrap_err();
        assert_eq!(panic_payload_message(payload.as_ref()), "Box<dyn Any>");
    }

    #[test]
    fn test_run_loop_not_active_message() {
        assert_eq!(
            DispatcherError::RunLoopNotActive.to_string(),
            "mainthread: did not call run (no active run-loop)"
        );
    }
}
