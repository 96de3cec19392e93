// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! # r3bl_main_thread
//!
//! Run closures on the process main thread, from any other thread or [`tokio`] task.
//!
//! Many native UI and graphics APIs (windowing, OpenGL contexts, macOS AppKit, input
//! event pumps) only tolerate calls from the thread that created them. This crate
//! designates one thread as "the main thread", moves the rest of your program onto
//! another thread, and turns the main thread into a FIFO run-loop that executes the
//! closures you submit.
//!
//! ```no_run
//! use r3bl_main_thread::{Dispatcher, DispatcherConfig};
//!
//! fn main() -> miette::Result<()> {
//!     // 1. Bind the main thread, as early as possible.
//!     let dispatcher = Dispatcher::new(DispatcherConfig::default())?;
//!     let handle = dispatcher.handle();
//!
//!     // 2. Move the rest of the app into the entry routine.
//!     let report = dispatcher.run(move || {
//!         // Fire and forget.
//!         handle.call_non_block(|| println!("on the main thread, eventually"));
//!
//!         // Wait for it.
//!         handle.call(|| println!("on the main thread, right now"));
//!
//!         // Get a value or an error back.
//!         let answer = handle.call_val(|| 6 * 7);
//!         let result = handle.call_err(|| std::fs::metadata("Cargo.toml").map(|_| ()));
//!         println!("{answer} {result:?}");
//!     })?;
//!
//!     // 3. The entry routine returned, and everything it queued has run.
//!     println!("{report:?}");
//!     Ok(())
//! }
//! ```
//!
//! | Submission                            | Blocks the caller          | Returns                |
//! | :------------------------------------ | :------------------------- | :--------------------- |
//! | [`MainThreadHandle::call_non_block()`] | only while the queue is full | nothing              |
//! | [`MainThreadHandle::call()`]          | until the closure ran      | nothing                |
//! | [`MainThreadHandle::call_err()`]      | until the closure ran      | the closure's `Result` |
//! | [`MainThreadHandle::call_val()`]      | until the closure ran      | the closure's value    |
//!
//! Each has an `_async` flavor for use inside [`tokio`] tasks. See the [`dispatcher`]
//! module for the full story, and [`log`] to see the dispatcher's [`tracing`] output.

// Enable benchmarking for nightly Rust: `cargo +nightly bench --features bench`.
#![cfg_attr(all(test, feature = "bench"), feature(test))]
// Enforce strict error handling in production library code only. Tests are allowed to
// use .unwrap() (workspace `Cargo.toml` config allows it).
#![cfg_attr(not(test), deny(clippy::unwrap_in_result))]

// Attach modules.
pub mod dispatcher;
pub mod log;

// Re-export.
pub use dispatcher::*;
pub use log::*;
