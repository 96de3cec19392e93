// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! The run-loop that owns the main thread. See [`Dispatcher`] for details.

use super::{DEBUG_MAIN_THREAD, DispatcherConfig, DispatcherError, EntryCompletionGuard,
            LoopExitPolicy, LoopMessage, MainThreadHandle, MainThreadId, PendingCall,
            RunLoopClaim, SlotPoolRegistry, bind_current_thread, panic_payload_message};
use std::{marker::PhantomData,
          panic::{self, AssertUnwindSafe},
          sync::{Arc, PoisonError, RwLock},
          thread};
use tokio::sync::mpsc::Sender;

/// Name of the thread that runs the entry routine.
pub const ENTRY_THREAD_NAME: &str = "main-thread-entry";

/// Process exit status used by [`LoopExitPolicy::ExitProcess`] when the entry routine
/// panicked. Matches the status Rust uses for a panicking `fn main()`.
pub const EXIT_CODE_ENTRY_PANICKED: i32 = 101;

/// The resources that only exist while a run-loop is active.
#[derive(Debug, Clone)]
pub(crate) struct ActiveRunLoop {
    pub queue_tx: Sender<LoopMessage>,
    pub slot_pools: Arc<SlotPoolRegistry>,
}

/// State shared between a [`Dispatcher`] and every [`MainThreadHandle`] made from it.
///
/// Lifecycle of [`active`]:
/// - `None` until [`Dispatcher::run()`] starts (uninitialized)
/// - `Some` while the run-loop is active
/// - `None` again once the run-loop exits (torn down; the queue and the pools are
///   gone)
///
/// [`active`]: Self::active
#[derive(Debug)]
pub(crate) struct DispatcherShared {
    pub config: DispatcherConfig,
    active: RwLock<Option<ActiveRunLoop>>,
}

impl DispatcherShared {
    fn new(config: DispatcherConfig) -> Self {
        Self {
            config,
            active: RwLock::new(None),
        }
    }

    /// Snapshot of the active run-loop's resources. The lock is released before the
    /// caller does anything that might block.
    pub fn active(&self) -> Option<ActiveRunLoop> {
        self.active
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn replace_active(&self, it: Option<ActiveRunLoop>) {
        *self.active.write().unwrap_or_else(PoisonError::into_inner) = it;
    }
}

/// [RAII] guard that publishes the [`ActiveRunLoop`] for the duration of one run, and
/// tears it down on [`Drop`] (including when unwinding).
///
/// [RAII]: https://en.wikipedia.org/wiki/Resource_acquisition_is_initialization
struct ActiveRunLoopGuard<'a> {
    shared: &'a DispatcherShared,
}

impl<'a> ActiveRunLoopGuard<'a> {
    fn install(shared: &'a DispatcherShared, active: ActiveRunLoop) -> Self {
        shared.replace_active(Some(active));
        Self { shared }
    }
}

impl Drop for ActiveRunLoopGuard<'_> {
    fn drop(&mut self) { self.shared.replace_active(None); }
}

/// Summary of one completed run-loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunLoopReport {
    /// Queued calls that the main thread executed.
    pub executed_calls: usize,
    /// Calls that were still queued behind the completion signal, and were dropped
    /// without running.
    pub dropped_calls: usize,
}

/// A dispatcher pinned to the process main thread.
///
/// Many native UI and graphics APIs only tolerate calls from the thread that created
/// them. [`Dispatcher`] designates one thread as "the main thread", runs your
/// application (the entry routine) on a *different* thread, and services a bounded
/// FIFO queue of closures on the main thread until the entry routine returns.
///
/// ```text
/// ┌──────────────────────────────┐            ┌─────────────────────────────────┐
/// │ main thread (Dispatcher)     │            │ entry thread + any workers      │
/// │                              │            │                                 │
/// │ run(entry) ─► spawn ─────────┼───────────►│ entry()                         │
/// │                              │            │   handle.call(|| ..)            │
/// │ loop {                       │  call      │   handle.call_val(|| 42)        │
/// │   recv() ◄───────────────────┼── queue ◄──┤   handle.call_non_block(|| ..)  │
/// │   Call(f)       => f()       │ (bounded,  │                                 │
/// │   EntryFinished => break     │   FIFO)    │ return ─► EntryFinished         │
/// │ }                            │            │                                 │
/// │ teardown ─► RunLoopReport    │            │                                 │
/// └──────────────────────────────┘            └─────────────────────────────────┘
/// ```
///
/// # Thread binding
///
/// [`Dispatcher::new()`] binds the calling thread as the main thread via
/// [`bind_current_thread()`]. That binding is irrevocable for the process lifetime.
/// [`Dispatcher`] is `!Send` and `!Sync`, so it can't leave that thread either.
///
/// # Example
///
/// ```no_run
/// use r3bl_main_thread::{Dispatcher, DispatcherConfig};
///
/// fn main() -> miette::Result<()> {
///     let dispatcher = Dispatcher::new(DispatcherConfig::default())?;
///     let handle = dispatcher.handle();
///     dispatcher.run(move || {
///         handle.call(|| println!("i'm printing from the main thread"));
///         let answer = handle.call_val(|| 42);
///         assert_eq!(answer, 42);
///     })?;
///     Ok(())
/// }
/// ```
pub struct Dispatcher {
    shared: Arc<DispatcherShared>,
    main_thread: MainThreadId,
    _not_send_not_sync: PhantomData<*const ()>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("config", &self.shared.config)
            .field("main_thread", &self.main_thread)
            .field("is_active", &self.shared.active().is_some())
            .finish()
    }
}

impl Dispatcher {
    /// Validates `config` and binds the calling thread as the main thread.
    ///
    /// # Errors
    ///
    /// - [`DispatcherError::InvalidQueueCapacity`] if the config is invalid.
    /// - [`DispatcherError::MainThreadAlreadyBound`] if another thread is already the
    ///   main thread.
    pub fn new(config: DispatcherConfig) -> Result<Self, DispatcherError> {
        config.validate()?;
        let main_thread = bind_current_thread()?;
        Ok(Self {
            shared: Arc::new(DispatcherShared::new(config)),
            main_thread,
            _not_send_not_sync: PhantomData,
        })
    }

    /// Returns a handle for submitting work to this dispatcher's main thread. Handles
    /// are cheap to clone, and can be created before [`run()`] is called.
    ///
    /// [`run()`]: Self::run
    #[must_use]
    pub fn handle(&self) -> MainThreadHandle {
        MainThreadHandle::new(Arc::clone(&self.shared))
    }

    #[must_use]
    pub fn config(&self) -> DispatcherConfig { self.shared.config }

    #[must_use]
    pub fn main_thread(&self) -> MainThreadId { self.main_thread }

    /// Runs `entry` on a new thread, and services the call queue on the calling (main)
    /// thread until `entry` returns.
    ///
    /// # Lifecycle
    ///
    /// 1. Claim the process-wide "run-loop active" flag.
    /// 2. Allocate the call queue and the response slot pools (capacity
    ///    [`DispatcherConfig::queue_capacity`]), publish them to every handle.
    /// 3. Spawn the entry routine on the [`ENTRY_THREAD_NAME`] thread.
    /// 4. Execute queued calls one at a time, in FIFO order, until the completion
    ///    signal is dequeued.
    /// 5. Tear down: unpublish the queue (handles now fail fast), drop anything still
    ///    queued, join the entry thread.
    /// 6. Apply the [`LoopExitPolicy`].
    ///
    /// A panic inside a queued closure never takes the loop down. For blocking calls
    /// it is resumed on the caller's thread; for [`call_non_block()`] it is logged.
    ///
    /// # Errors
    ///
    /// - [`DispatcherError::NotOnMainThread`] if called off the bound main thread.
    /// - [`DispatcherError::RunLoopAlreadyActive`] if another run-loop is active.
    /// - [`DispatcherError::EntryThreadSpawn`] if the entry thread can't be spawned.
    /// - [`DispatcherError::EntryRoutinePanicked`] if `entry` panicked (the loop is
    ///   still torn down normally).
    ///
    /// [`call_non_block()`]: MainThreadHandle::call_non_block
    pub fn run(
        &self,
        entry: impl FnOnce() + Send + 'static,
    ) -> Result<RunLoopReport, DispatcherError> {
        let current = thread::current().id();
        if current != self.main_thread.0 {
            return Err(DispatcherError::NotOnMainThread {
                bound: self.main_thread.0,
                current,
            });
        }

        let claim = RunLoopClaim::try_claim()?;

        let capacity = self.shared.config.queue_capacity;
        let (queue_tx, mut queue_rx) = tokio::sync::mpsc::channel(capacity);
        let slot_pools = Arc::new(SlotPoolRegistry::new(capacity));
        // The unit pool backs every `call()`, so pre-fill it now.
        drop(slot_pools.pool_for::<()>());

        let active_guard = ActiveRunLoopGuard::install(
            &self.shared,
            ActiveRunLoop {
                queue_tx: queue_tx.clone(),
                slot_pools,
            },
        );

        DEBUG_MAIN_THREAD.then(|| {
            // % is Display, ? is Debug.
            tracing::debug!(
                message = "🧵 main thread run-loop started",
                queue_capacity = %capacity,
                main_thread = ?current,
            );
        });

        let entry_handle = thread::Builder::new()
            .name(ENTRY_THREAD_NAME.into())
            .spawn(move || {
                let _completion = EntryCompletionGuard::new(queue_tx);
                entry();
            })
            .map_err(DispatcherError::EntryThreadSpawn)?;

        DEBUG_MAIN_THREAD.then(|| {
            tracing::debug!(
                message = "🧵 entry routine spawned",
                thread_name = ENTRY_THREAD_NAME,
                thread_id = ?entry_handle.thread().id(),
            );
        });

        let mut executed_calls = 0;
        while let Some(LoopMessage::Call(pending_call)) = queue_rx.blocking_recv() {
            executed_calls += 1;
            run_pending_call(pending_call);
        }

        // Teardown. Unpublish first so new submissions fail fast instead of queueing
        // behind a loop that will never run them.
        drop(active_guard);
        queue_rx.close();
        let mut dropped_calls = 0;
        while let Ok(message) = queue_rx.try_recv() {
            if matches!(message, LoopMessage::Call(_)) {
                dropped_calls += 1;
            }
        }

        let report = RunLoopReport {
            executed_calls,
            dropped_calls,
        };

        if dropped_calls > 0 {
            tracing::warn!(
                message = "🧵 calls submitted after the entry routine returned were dropped",
                dropped_calls = %dropped_calls,
            );
        }

        let result = match entry_handle.join() {
            Ok(()) => Ok(report),
            Err(payload) => Err(DispatcherError::EntryRoutinePanicked {
                message: panic_payload_message(payload.as_ref()),
            }),
        };

        drop(claim);

        DEBUG_MAIN_THREAD.then(|| {
            tracing::debug!(
                message = "🧵 main thread run-loop stopped",
                report = ?report,
                entry_panicked = %result.is_err(),
            );
        });

        if self.shared.config.loop_exit_policy == LoopExitPolicy::ExitProcess {
            let exit_code = if result.is_ok() {
                0
            } else {
                EXIT_CODE_ENTRY_PANICKED
            };
            std::process::exit(exit_code);
        }

        result
    }
}

/// Executes one queued closure on the main thread.
///
/// Blocking-call wrappers catch their own panics and ship them to the caller, so a
/// panic that reaches this point came from [`call_non_block()`]. There is nobody to
/// hand it to, so it is logged and the loop carries on.
///
/// [`call_non_block()`]: MainThreadHandle::call_non_block
fn run_pending_call(pending_call: PendingCall) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(pending_call)) {
        tracing::error!(
            message = "🧵 call_non_block() closure panicked on the main thread",
            panic = %panic_payload_message(payload.as_ref()),
        );
    }
}
