// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Optional [`tracing`] setup for apps and tests that use the dispatcher.
//!
//! The dispatcher only *emits* events. Nothing is printed unless a subscriber is
//! installed, eg:
//!
//! ```no_run
//! use r3bl_main_thread::{DisplayPreference, TracingConfig};
//! use tracing_core::LevelFilter;
//!
//! # fn main() -> miette::Result<()> {
//! TracingConfig::new_display(DisplayPreference::Stderr)
//!     .with_level_filter(LevelFilter::DEBUG)
//!     .install_global()?;
//! # Ok(())
//! # }
//! ```

// Attach sources.
pub mod tracing_config;
pub mod tracing_init;

// Re-export.
pub use tracing_config::*;
pub use tracing_init::*;
