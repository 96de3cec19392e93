// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Messages carried by the call queue, and the [RAII] guard that raises the completion
//! signal. See [`LoopMessage`] and [`EntryCompletionGuard`].
//!
//! [RAII]: https://en.wikipedia.org/wiki/Resource_acquisition_is_initialization

use tokio::sync::mpsc::Sender;

/// A deferred, zero-argument unit of work. Consumed exactly once, on the main thread.
pub type PendingCall = Box<dyn FnOnce() + Send + 'static>;

/// What the run-loop can pull off the call queue.
///
/// The completion signal travels through the same FIFO queue as the calls, so every
/// call whose enqueue finished before the entry routine returned sits ahead of
/// [`EntryFinished`] and is executed before the loop stops:
///
/// ```text
///  entry thread:  call_non_block(a) ─► call_non_block(b) ─► return
///                        │                   │                 │
///                        ▼                   ▼                 ▼
///  call queue:   [ Call(a) ][ Call(b) ][ EntryFinished ][ Call(late) ]
///                                                             │
///  main thread:  a() ─► b() ─► stop ─► teardown drops ────────┘
/// ```
///
/// [`EntryFinished`]: Self::EntryFinished
pub enum LoopMessage {
    /// Run this closure on the main thread.
    Call(PendingCall),
    /// The entry routine returned (or unwound). Stop the loop.
    EntryFinished,
}

impl std::fmt::Debug for LoopMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoopMessage::Call(_) => write!(f, "Call(..)"),
            LoopMessage::EntryFinished => write!(f, "EntryFinished"),
        }
    }
}

/// [RAII] guard owned by the entry routine thread. Raises the completion signal when
/// the entry routine returns, and also while a panic unwinds out of it.
///
/// [RAII]: https://en.wikipedia.org/wiki/Resource_acquisition_is_initialization
#[derive(Debug)]
pub struct EntryCompletionGuard {
    queue_tx: Sender<LoopMessage>,
}

impl EntryCompletionGuard {
    #[must_use]
    pub fn new(queue_tx: Sender<LoopMessage>) -> Self { Self { queue_tx } }
}

impl Drop for EntryCompletionGuard {
    /// Waits for room in the queue if it's full. A send error means the run-loop is
    /// already gone, so there's nobody left to tell.
    fn drop(&mut self) { drop(self.queue_tx.blocking_send(LoopMessage::EntryFinished)); }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_guard_signals_on_normal_return() {
        let (tx, mut rx) = tokio::sync::mpsc::channel(4);
        std::thread::spawn(move || {
            let _guard = EntryCompletionGuard::new(tx);
        })
        .join()
        .unwrap();
        assert!(matches!(rx.blocking_recv(), Some(LoopMessage::EntryFinished)));
    }

    #[test]
    fn test_guard_signals_while_unwinding() {
        let (tx, mut rx) = tokio::sync::mpsc::channel(4);
        let result = std::thread::spawn(move || {
            let _guard = EntryCompletionGuard::new(tx);
            panic!("entry routine blew up");
        })
        .join();
        assert!(result.is_err());
        assert!(matches!(rx.blocking_recv(), Some(LoopMessage::EntryFinished)));
    }

    #[test]
    fn test_signal_is_queued_behind_earlier_calls() {
        let (tx, mut rx) = tokio::sync::mpsc::channel(4);
        let call_tx = tx.clone();
        std::thread::spawn(move || {
            let _guard = EntryCompletionGuard::new(tx);
            call_tx.blocking_send(LoopMessage::Call(Box::new(|| {}))).unwrap();
        })
        .join()
        .unwrap();

        let order = [rx.blocking_recv(), rx.blocking_recv()]
            .iter()
            .map(|it| format!("{it:?}"))
            .collect::<Vec<_>>();
        assert_eq!(order, vec!["Some(Call(..))", "Some(EntryFinished)"]);
    }
}
