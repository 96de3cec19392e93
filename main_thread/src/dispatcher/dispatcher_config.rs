// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Configuration for the [`Dispatcher`]. See [`DispatcherConfig`].
//!
//! [`Dispatcher`]: super::Dispatcher

use super::DispatcherError;

/// Capacity of the call queue, and of each response slot pool.
///
/// This is how many calls to [`call_non_block()`] can be outstanding before callers
/// experience backpressure (they block until the main thread catches up). `16` is
/// plenty for the usual "a handful of workers poking a UI toolkit" setup.
///
/// [`call_non_block()`]: super::MainThreadHandle::call_non_block
pub const DEFAULT_QUEUE_CAPACITY: usize = 16;

/// What happens when the run-loop stops (the entry routine returned).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoopExitPolicy {
    /// [`Dispatcher::run()`] returns a [`RunLoopReport`] to its caller.
    ///
    /// [`Dispatcher::run()`]: super::Dispatcher::run
    /// [`RunLoopReport`]: super::RunLoopReport
    #[default]
    ReturnToCaller,

    /// The process exits right after teardown, with status `0`, or `101` if the entry
    /// routine panicked. [`Dispatcher::run()`] never returns.
    ///
    /// [`Dispatcher::run()`]: super::Dispatcher::run
    ExitProcess,
}

/// Tunables for a [`Dispatcher`].
///
/// ```
/// use r3bl_main_thread::{DispatcherConfig, LoopExitPolicy};
///
/// let config = DispatcherConfig::default()
///     .with_queue_capacity(64)
///     .with_loop_exit_policy(LoopExitPolicy::ReturnToCaller);
/// assert!(config.validate().is_ok());
/// ```
///
/// [`Dispatcher`]: super::Dispatcher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatcherConfig {
    /// See [`DEFAULT_QUEUE_CAPACITY`].
    pub queue_capacity: usize,
    pub loop_exit_policy: LoopExitPolicy,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            loop_exit_policy: LoopExitPolicy::default(),
        }
    }
}

impl DispatcherConfig {
    #[must_use]
    pub fn with_queue_capacity(mut self, queue_capacity: usize) -> Self {
        self.queue_capacity = queue_capacity;
        self
    }

    #[must_use]
    pub fn with_loop_exit_policy(mut self, loop_exit_policy: LoopExitPolicy) -> Self {
        self.loop_exit_policy = loop_exit_policy;
        self
    }

    /// # Errors
    ///
    /// Returns [`DispatcherError::InvalidQueueCapacity`] for a capacity of `0`. A
    /// bounded [`tokio::sync::mpsc`] channel needs at least one slot.
    pub fn validate(&self) -> Result<(), DispatcherError> {
        if self.queue_capacity == 0 {
            return Err(DispatcherError::InvalidQueueCapacity {
                capacity: self.queue_capacity,
            });
        }
        Ok(())
    }
}
