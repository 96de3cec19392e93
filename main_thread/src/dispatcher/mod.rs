// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Run closures on the process main thread, from any other thread.
//!
//! # The problem
//!
//! Some platform APIs (windowing systems, graphics contexts, input event pumps) only
//! work when every call comes from one specific OS thread, usually the thread that
//! started the process. Rust gives you no control over which thread a worker or a
//! [`tokio`] task lands on, so you need a way to *send* work to that thread.
//!
//! # The solution
//!
//! 1. [`Dispatcher::new()`] binds the current thread as "the main thread".
//! 2. [`Dispatcher::run()`] moves the rest of your program (the entry routine) to a
//!    new thread, and turns the main thread into a loop that executes queued
//!    closures one at a time, in FIFO order.
//! 3. Any thread submits closures through a [`MainThreadHandle`], either
//!    fire-and-forget or waiting for a result.
//! 4. When the entry routine returns, the loop stops and [`Dispatcher::run()`]
//!    returns (or the process exits, see [`LoopExitPolicy`]).
//!
//! | Module                   | Responsibility                                         |
//! | :----------------------- | :----------------------------------------------------- |
//! | [`main_thread_binding`]  | Write-once identity of the main thread                 |
//! | [`run_loop_guard`]       | At most one active run-loop per process                |
//! | [`dispatcher_struct`]    | The run-loop itself, and its teardown                  |
//! | [`main_thread_handle`]   | The submission API                                     |
//! | [`loop_message`]         | What travels through the call queue                    |
//! | [`response_slot`]        | Pooled rendezvous that carries results back to callers |
//! | [`slot_pool_registry`]   | One slot pool per result type                          |
//!
//! # Ordering guarantees
//!
//! - Calls execute one at a time, never concurrently with each other.
//! - Calls enqueued by a single thread execute in the order they were enqueued.
//! - Every call that was fully enqueued before the entry routine returned executes
//!   before the loop stops. Anything enqueued later is dropped, see
//!   [`DispatcherError::CallDroppedAtShutdown`].

/// Set to `true` to get [`tracing::debug!`] output about the run-loop lifecycle.
pub const DEBUG_MAIN_THREAD: bool = true;

// Attach sources.
pub mod dispatcher_config;
pub mod dispatcher_error;
pub mod dispatcher_struct;
pub mod loop_message;
pub mod main_thread_binding;
pub mod main_thread_handle;
pub mod response_slot;
pub mod run_loop_guard;
pub mod slot_pool_registry;

// Re-export.
pub use dispatcher_config::*;
pub use dispatcher_error::*;
pub use dispatcher_struct::*;
pub use loop_message::*;
pub use main_thread_binding::*;
pub use main_thread_handle::*;
pub use response_slot::*;
pub use run_loop_guard::*;
pub use slot_pool_registry::*;

#[cfg(test)]
mod tests;

// Benchmarks need nightly.
#[cfg(all(test, feature = "bench"))]
mod dispatcher_bench;
