// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Submission API for running closures on the main thread. See [`MainThreadHandle`].

use super::{ActiveRunLoop, DEBUG_MAIN_THREAD, DispatcherError, DispatcherShared,
            LoopMessage, PendingCall, SlotOutcome, is_main_thread};
use std::{panic::{self, AssertUnwindSafe},
          sync::Arc};
use tokio::sync::{mpsc::error::TrySendError, oneshot};

/// Cheap, cloneable handle used to submit closures to a [`Dispatcher`]'s main thread.
/// Get one from [`Dispatcher::handle()`] and move clones into any thread or task.
///
/// | Method                       | Waits for the closure | Returns                  |
/// | :--------------------------- | :-------------------- | :----------------------- |
/// | [`call_non_block()`]         | no                    | nothing                  |
/// | [`call()`]                   | yes                   | nothing                  |
/// | [`call_err()`]               | yes                   | the closure's `Result`   |
/// | [`call_val()`]               | yes                   | the closure's value      |
/// | [`call_non_block_async()`]   | no                    | nothing                  |
/// | [`call_async()`]             | yes                   | nothing                  |
/// | [`call_val_async()`]         | yes                   | the closure's value      |
///
/// The synchronous methods block the calling OS thread, so never use them from inside
/// a tokio task. Use the `_async` variants there instead.
///
/// # Fatal errors
///
/// Every method panics with [`DispatcherError::RunLoopNotActive`] when no run-loop is
/// active (before [`Dispatcher::run()`] starts, or after it returns). See
/// [`DispatcherError`] for the other fatal cases.
///
/// # Calls from the main thread
///
/// A blocking call made on the main thread itself (from inside a closure that is
/// already running there) executes inline. Queueing it would deadlock.
///
/// [`Dispatcher`]: super::Dispatcher
/// [`Dispatcher::handle()`]: super::Dispatcher::handle
/// [`Dispatcher::run()`]: super::Dispatcher::run
/// [`call()`]: Self::call
/// [`call_async()`]: Self::call_async
/// [`call_err()`]: Self::call_err
/// [`call_non_block()`]: Self::call_non_block
/// [`call_non_block_async()`]: Self::call_non_block_async
/// [`call_val()`]: Self::call_val
/// [`call_val_async()`]: Self::call_val_async
#[derive(Debug, Clone)]
pub struct MainThreadHandle {
    shared: Arc<DispatcherShared>,
}

impl MainThreadHandle {
    pub(crate) fn new(shared: Arc<DispatcherShared>) -> Self { Self { shared } }

    /// Whether a run-loop is currently servicing this handle's queue.
    #[must_use]
    pub fn is_active(&self) -> bool { self.shared.active().is_some() }

    #[must_use]
    pub fn queue_capacity(&self) -> usize { self.shared.config.queue_capacity }

    #[track_caller]
    fn active_or_fatal(&self) -> ActiveRunLoop {
        match self.shared.active() {
            Some(active) => active,
            None => fatal(DispatcherError::RunLoopNotActive),
        }
    }

    /// Queues `f` to run on the main thread and returns as soon as it is queued.
    ///
    /// When the queue is full this waits for room (backpressure), except on the main
    /// thread itself, where a full queue is fatal
    /// ([`DispatcherError::QueueFullOnMainThread`]).
    ///
    /// A panic inside `f` is logged by the run-loop and otherwise ignored.
    #[track_caller]
    pub fn call_non_block(&self, f: impl FnOnce() + Send + 'static) {
        let active = self.active_or_fatal();
        let message = LoopMessage::Call(Box::new(f));

        if is_main_thread() {
            match active.queue_tx.try_send(message) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    fatal(DispatcherError::QueueFullOnMainThread)
                }
                Err(TrySendError::Closed(_)) => fatal(DispatcherError::RunLoopNotActive),
            }
            return;
        }

        if active.queue_tx.blocking_send(message).is_err() {
            fatal(DispatcherError::RunLoopNotActive);
        }
    }

    /// Runs `f` on the main thread and waits for it to finish. A panic inside `f` is
    /// resumed on the calling thread.
    #[track_caller]
    pub fn call(&self, f: impl FnOnce() + Send + 'static) { self.call_val(f) }

    /// Runs `f` on the main thread, waits for it, and returns its error (if any)
    /// unchanged.
    ///
    /// # Errors
    ///
    /// Whatever `f` returned.
    #[track_caller]
    pub fn call_err<E: Send + 'static>(
        &self,
        f: impl FnOnce() -> Result<(), E> + Send + 'static,
    ) -> Result<(), E> {
        self.call_val(f)
    }

    /// Runs `f` on the main thread, waits for it, and returns its value. An absent
    /// value (`None`, `()`) comes back just as faithfully as any other.
    ///
    /// The caller parks on a pooled response slot; see [`ResponseSlotPool`].
    ///
    /// [`ResponseSlotPool`]: super::ResponseSlotPool
    #[track_caller]
    pub fn call_val<T: Send + 'static>(&self, f: impl FnOnce() -> T + Send + 'static) -> T {
        let active = self.active_or_fatal();

        if is_main_thread() {
            log_inline_call();
            return f();
        }

        let loan = active.slot_pools.pool_for::<T>().acquire();
        let writer = loan.writer();
        let wrapper: PendingCall = Box::new(move || {
            writer.send(panic::catch_unwind(AssertUnwindSafe(f)));
        });

        if active.queue_tx.blocking_send(LoopMessage::Call(wrapper)).is_err() {
            fatal(DispatcherError::RunLoopNotActive);
        }
        drop(active);

        match loan.wait_and_take() {
            SlotOutcome::Completed(value) => value,
            SlotOutcome::Panicked(payload) => panic::resume_unwind(payload),
            SlotOutcome::Abandoned => fatal(DispatcherError::CallDroppedAtShutdown),
        }
    }

    /// Async flavor of [`call_non_block()`]. Waits for room in the queue without
    /// blocking the executor thread.
    ///
    /// [`call_non_block()`]: Self::call_non_block
    pub async fn call_non_block_async(&self, f: impl FnOnce() + Send + 'static) {
        let active = self.active_or_fatal();
        if active
            .queue_tx
            .send(LoopMessage::Call(Box::new(f)))
            .await
            .is_err()
        {
            fatal(DispatcherError::RunLoopNotActive);
        }
    }

    /// Async flavor of [`call()`].
    ///
    /// [`call()`]: Self::call
    pub async fn call_async(&self, f: impl FnOnce() + Send + 'static) {
        self.call_val_async(f).await;
    }

    /// Async flavor of [`call_val()`]. Each call waits on its own
    /// [`tokio::sync::oneshot`] channel rather than a pooled slot.
    ///
    /// [`call_val()`]: Self::call_val
    pub async fn call_val_async<T: Send + 'static>(
        &self,
        f: impl FnOnce() -> T + Send + 'static,
    ) -> T {
        let active = self.active_or_fatal();

        if is_main_thread() {
            log_inline_call();
            return f();
        }

        let (result_tx, result_rx) = oneshot::channel();
        let wrapper: PendingCall = Box::new(move || {
            // The receiver is only gone if the awaiting task was cancelled.
            drop(result_tx.send(panic::catch_unwind(AssertUnwindSafe(f))));
        });

        if active
            .queue_tx
            .send(LoopMessage::Call(wrapper))
            .await
            .is_err()
        {
            fatal(DispatcherError::RunLoopNotActive);
        }
        drop(active);

        match result_rx.await {
            Ok(Ok(value)) => value,
            Ok(Err(payload)) => panic::resume_unwind(payload),
            Err(_) => fatal(DispatcherError::CallDroppedAtShutdown),
        }
    }
}

fn log_inline_call() {
    DEBUG_MAIN_THREAD.then(|| {
        tracing::debug!(message = "🧵 blocking call on the main thread, running inline");
    });
}

/// Logs and raises a fatal [`DispatcherError`]. These are programming errors, so they
/// panic instead of being returned.
#[track_caller]
fn fatal(error: DispatcherError) -> ! {
    tracing::error!(message = "🧵 fatal main thread dispatcher error", error = %error);
    panic!("{error}");
}
