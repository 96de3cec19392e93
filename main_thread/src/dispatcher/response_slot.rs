// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Single-value rendezvous used to carry a result from the main thread back to a
//! blocked caller, plus the bounded pool that recycles them. See [`ResponseSlot`] and
//! [`ResponseSlotPool`].

use std::{any::Any,
          sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError}};

/// The result of running a closure on the main thread: its value, or the payload of
/// the panic it raised.
pub type CallResult<T> = std::thread::Result<T>;

/// What a blocked caller finds in its [`ResponseSlot`] once it wakes up.
#[derive(Debug)]
pub enum SlotOutcome<T> {
    /// The closure ran and returned this value.
    Completed(T),
    /// The closure ran and panicked. Resume the panic on the caller's thread.
    Panicked(Box<dyn Any + Send>),
    /// The closure never ran: its [`SlotWriter`] was dropped unused (the run-loop shut
    /// down with the call still queued).
    Abandoned,
}

enum SlotState<T> {
    Empty,
    Filled(CallResult<T>),
    Abandoned,
}

/// Everything guarded by the slot's lock. `outstanding_writers` counts the
/// [`SlotWriter`]s that have not yet filled or abandoned the slot.
struct SlotInner<T> {
    state: SlotState<T>,
    outstanding_writers: usize,
}

/// A reusable, single-value rendezvous between the main thread (writer) and one
/// blocked caller (reader).
///
/// ```text
///          ┌──────── fill() / abandon() ────────┐
///          │                                    ▼
///       ┌──┴──┐                          ┌─────────────┐
///  ───► │Empty│ ◄──── wait_and_take() ── │Filled or    │
///       └─────┘                          │Abandoned    │
///                                        └─────────────┘
/// ```
///
/// The reader parks on a [`Condvar`] while the slot is empty, so a blocked caller
/// consumes no CPU. Taking the value resets the slot to empty, which is what allows
/// [`ResponseSlotPool`] to hand it out again.
pub struct ResponseSlot<T> {
    inner: Mutex<SlotInner<T>>,
    ready: Condvar,
}

impl<T> std::fmt::Debug for ResponseSlot<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match self.lock_inner().state {
            SlotState::Empty => "Empty",
            SlotState::Filled(_) => "Filled",
            SlotState::Abandoned => "Abandoned",
        };
        f.debug_struct("ResponseSlot").field("state", &state).finish()
    }
}

impl<T> Default for ResponseSlot<T> {
    fn default() -> Self { Self::new() }
}

impl<T> ResponseSlot<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(SlotInner {
                state: SlotState::Empty,
                outstanding_writers: 0,
            }),
            ready: Condvar::new(),
        }
    }

    // No user code ever runs while this lock is held, so a poisoned lock still holds a
    // consistent state.
    fn lock_inner(&self) -> MutexGuard<'_, SlotInner<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn register_writer(&self) { self.lock_inner().outstanding_writers += 1; }

    fn fill(&self, result: CallResult<T>) {
        let mut inner = self.lock_inner();
        inner.state = SlotState::Filled(result);
        inner.outstanding_writers = inner.outstanding_writers.saturating_sub(1);
        drop(inner);
        self.ready.notify_one();
    }

    fn abandon(&self) {
        let mut inner = self.lock_inner();
        if matches!(inner.state, SlotState::Empty) {
            inner.state = SlotState::Abandoned;
        }
        inner.outstanding_writers = inner.outstanding_writers.saturating_sub(1);
        drop(inner);
        self.ready.notify_one();
    }

    /// Blocks until the slot is filled or abandoned, then takes the outcome and resets
    /// the slot to empty.
    pub fn wait_and_take(&self) -> SlotOutcome<T> {
        let inner = self.lock_inner();
        let mut inner = self
            .ready
            .wait_while(inner, |it| matches!(it.state, SlotState::Empty))
            .unwrap_or_else(PoisonError::into_inner);
        match std::mem::replace(&mut inner.state, SlotState::Empty) {
            SlotState::Filled(Ok(value)) => SlotOutcome::Completed(value),
            SlotState::Filled(Err(payload)) => SlotOutcome::Panicked(payload),
            // wait_while() only returns once the state is not Empty.
            SlotState::Abandoned | SlotState::Empty => SlotOutcome::Abandoned,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool { matches!(self.lock_inner().state, SlotState::Empty) }

    /// Empty, and no [`SlotWriter`] can write into it any more. Only such a slot may be
    /// handed to another caller.
    #[must_use]
    pub fn is_reusable(&self) -> bool {
        let inner = self.lock_inner();
        inner.outstanding_writers == 0 && matches!(inner.state, SlotState::Empty)
    }
}

/// Write end of a [`ResponseSlot`], moved into the closure that runs on the main
/// thread.
///
/// Dropping it without calling [`send()`] abandons the slot, which wakes the reader
/// with [`SlotOutcome::Abandoned`] instead of leaving it blocked forever.
///
/// [`send()`]: Self::send
#[derive(Debug)]
pub struct SlotWriter<T> {
    slot: Option<Arc<ResponseSlot<T>>>,
}

impl<T> SlotWriter<T> {
    #[must_use]
    pub fn new(slot: Arc<ResponseSlot<T>>) -> Self {
        slot.register_writer();
        Self { slot: Some(slot) }
    }

    pub fn send(mut self, result: CallResult<T>) {
        if let Some(slot) = self.slot.take() {
            slot.fill(result);
        }
    }
}

impl<T> Drop for SlotWriter<T> {
    fn drop(&mut self) {
        if let Some(slot) = self.slot.take() {
            slot.abandon();
        }
    }
}

/// A bounded pool of [`ResponseSlot`]s, pre-filled at construction.
///
/// This bounds allocation under heavy concurrent blocking-call load: at most
/// `capacity` slots of a given type ever exist. When every slot is in flight,
/// [`acquire()`] blocks until one is returned.
///
/// # Invariants
///
/// - A slot is held by at most one in-flight call at a time.
/// - A slot goes back to the pool only after its single value was consumed. A slot
///   that an outstanding [`SlotWriter`] could still write into is retired and replaced
///   by a fresh one, so the pool size stays constant.
///
/// [`acquire()`]: Self::acquire
pub struct ResponseSlotPool<T> {
    free: Mutex<Vec<Arc<ResponseSlot<T>>>>,
    available: Condvar,
    capacity: usize,
}

impl<T> std::fmt::Debug for ResponseSlotPool<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseSlotPool")
            .field("capacity", &self.capacity)
            .field("available", &self.available())
            .finish()
    }
}

impl<T> ResponseSlotPool<T> {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let free = (0..capacity)
            .map(|_| Arc::new(ResponseSlot::new()))
            .collect::<Vec<_>>();
        Self {
            free: Mutex::new(free),
            available: Condvar::new(),
            capacity,
        }
    }

    fn lock_free(&self) -> MutexGuard<'_, Vec<Arc<ResponseSlot<T>>>> {
        self.free.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Takes a slot out of the pool, blocking while none is free.
    pub fn acquire(self: &Arc<Self>) -> PooledResponseSlot<T> {
        let free = self.lock_free();
        let mut free = self
            .available
            .wait_while(free, |it| it.is_empty())
            .unwrap_or_else(PoisonError::into_inner);
        let slot = free
            .pop()
            .unwrap_or_else(|| Arc::new(ResponseSlot::new()));
        PooledResponseSlot {
            slot,
            pool: Arc::clone(self),
        }
    }

    fn release(&self, slot: Arc<ResponseSlot<T>>) {
        self.lock_free().push(slot);
        self.available.notify_one();
    }

    /// Number of slots currently sitting in the pool.
    #[must_use]
    pub fn available(&self) -> usize { self.lock_free().len() }

    #[must_use]
    pub fn capacity(&self) -> usize { self.capacity }
}

/// [RAII] loan of a [`ResponseSlot`] from a [`ResponseSlotPool`]. Returns the slot on
/// [`Drop`].
///
/// [RAII]: https://en.wikipedia.org/wiki/Resource_acquisition_is_initialization
#[derive(Debug)]
pub struct PooledResponseSlot<T> {
    slot: Arc<ResponseSlot<T>>,
    pool: Arc<ResponseSlotPool<T>>,
}

impl<T> PooledResponseSlot<T> {
    #[must_use]
    pub fn writer(&self) -> SlotWriter<T> { SlotWriter::new(Arc::clone(&self.slot)) }

    pub fn wait_and_take(&self) -> SlotOutcome<T> { self.slot.wait_and_take() }
}

impl<T> Drop for PooledResponseSlot<T> {
    fn drop(&mut self) {
        // A writer may still hold an `Arc` to a slot it already filled. That is fine,
        // it can't touch the slot again.
        if self.slot.is_reusable() {
            self.pool.release(Arc::clone(&self.slot));
        } else {
            self.pool.release(Arc::new(ResponseSlot::new()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::{sync::mpsc, thread, time::Duration};

    #[test]
    fn test_slot_carries_value_then_resets() {
        let slot = Arc::new(ResponseSlot::<i32>::new());
        SlotWriter::new(Arc::clone(&slot)).send(Ok(42));
        assert!(matches!(slot.wait_and_take(), SlotOutcome::Completed(42)));
        assert!(slot.is_empty());

        SlotWriter::new(Arc::clone(&slot)).send(Ok(7));
        assert!(matches!(slot.wait_and_take(), SlotOutcome::Completed(7)));
    }

    #[test]
    fn test_slot_preserves_absent_value() {
        let slot = Arc::new(ResponseSlot::<Option<String>>::new());
        SlotWriter::new(Arc::clone(&slot)).send(Ok(None));
        assert!(matches!(slot.wait_and_take(), SlotOutcome::Completed(None)));
    }

    #[test]
    fn test_dropped_writer_abandons_slot() {
        let slot = Arc::new(ResponseSlot::<()>::new());
        drop(SlotWriter::new(Arc::clone(&slot)));
        assert!(matches!(slot.wait_and_take(), SlotOutcome::Abandoned));
        assert!(slot.is_empty());
    }

    #[test]
    fn test_slot_carries_panic_payload() {
        let slot = Arc::new(ResponseSlot::<()>::new());
        SlotWriter::new(Arc::clone(&slot)).send(Err(Box::new("boom")));
        match slot.wait_and_take() {
            SlotOutcome::Panicked(payload) => {
                assert_eq!(payload.downcast_ref::<&str>(), Some(&"boom"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_reader_blocks_until_writer_sends() {
        let slot = Arc::new(ResponseSlot::<u8>::new());
        let writer = SlotWriter::new(Arc::clone(&slot));
        let (done_tx, done_rx) = mpsc::channel();

        let reader_slot = Arc::clone(&slot);
        let reader = thread::spawn(move || {
            let outcome = reader_slot.wait_and_take();
            done_tx.send(()).unwrap();
            outcome
        });

        // The reader must still be parked.
        assert!(done_rx.recv_timeout(Duration::from_millis(100)).is_err());

        writer.send(Ok(9));
        assert!(matches!(reader.join().unwrap(), SlotOutcome::Completed(9)));
    }

    #[test]
    fn test_pool_is_prefilled_and_recycles() {
        let pool = Arc::new(ResponseSlotPool::<u32>::new(4));
        assert_eq!(pool.capacity(), 4);
        assert_eq!(pool.available(), 4);

        let loan = pool.acquire();
        assert_eq!(pool.available(), 3);

        loan.writer().send(Ok(1));
        assert!(matches!(loan.wait_and_take(), SlotOutcome::Completed(1)));
        drop(loan);
        assert_eq!(pool.available(), 4);
    }

    #[test]
    fn test_pool_acquire_blocks_when_exhausted() {
        let pool = Arc::new(ResponseSlotPool::<()>::new(1));
        let loan = pool.acquire();
        assert_eq!(pool.available(), 0);

        let (acquired_tx, acquired_rx) = mpsc::channel();
        let pool_clone = Arc::clone(&pool);
        let waiter = thread::spawn(move || {
            let _second = pool_clone.acquire();
            acquired_tx.send(()).unwrap();
        });

        assert!(acquired_rx.recv_timeout(Duration::from_millis(100)).is_err());

        drop(loan);
        acquired_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        waiter.join().unwrap();
        assert_eq!(pool.available(), 1);
    }

    #[test]
    fn test_pool_retires_slot_with_outstanding_writer() {
        let pool = Arc::new(ResponseSlotPool::<i32>::new(2));
        let loan = pool.acquire();
        let writer = loan.writer();
        drop(loan);

        // Pool size is preserved, with a fresh slot in place of the loaned one.
        assert_eq!(pool.available(), 2);

        // The late writer can't leak a value into a slot that someone else now holds.
        writer.send(Ok(5));
        let first = pool.acquire();
        let second = pool.acquire();
        first.writer().send(Ok(1));
        second.writer().send(Ok(2));
        assert!(matches!(first.wait_and_take(), SlotOutcome::Completed(1)));
        assert!(matches!(second.wait_and_take(), SlotOutcome::Completed(2)));
    }

    #[test]
    fn test_slot_is_not_reusable_until_its_writer_finishes() {
        let slot = Arc::new(ResponseSlot::<i32>::new());
        assert!(slot.is_reusable());

        let writer = SlotWriter::new(Arc::clone(&slot));
        assert!(slot.is_empty());
        assert!(!slot.is_reusable());

        writer.send(Ok(3));
        assert!(!slot.is_reusable());
        assert!(matches!(slot.wait_and_take(), SlotOutcome::Completed(3)));
        assert!(slot.is_reusable());

        drop(SlotWriter::new(Arc::clone(&slot)));
        assert!(matches!(slot.wait_and_take(), SlotOutcome::Abandoned));
        assert!(slot.is_reusable());
    }

    /// The writer runs on another thread and may still hold its `Arc` when the reader
    /// wakes up and returns the loan. The pooled slot must be recycled every time.
    #[test]
    fn test_pool_recycles_slot_filled_from_another_thread() {
        const ROUND_TRIPS: usize = 5_000;

        let pool = Arc::new(ResponseSlotPool::<u64>::new(1));
        let pooled_slot = Arc::as_ptr(&pool.acquire().slot);

        let (writer_tx, writer_rx) = mpsc::channel::<SlotWriter<u64>>();
        let filler = thread::spawn(move || {
            for writer in writer_rx {
                writer.send(Ok(1));
            }
        });

        let mut retired = 0;
        for _ in 0..ROUND_TRIPS {
            let loan = pool.acquire();
            if Arc::as_ptr(&loan.slot) != pooled_slot {
                retired += 1;
            }
            writer_tx.send(loan.writer()).unwrap();
            assert!(matches!(loan.wait_and_take(), SlotOutcome::Completed(1)));
            drop(loan);
        }

        drop(writer_tx);
        filler.join().unwrap();
        assert_eq!(retired, 0);
        assert_eq!(pool.available(), 1);
    }
}
