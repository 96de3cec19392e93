// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Benchmarks for the blocking round trip: submit a closure from a worker thread, run
//! it on the main thread, and hand the result back.
//!
//! Run them on nightly with:
//!
//! ```text
//! cargo +nightly bench --features bench -p r3bl_main_thread
//! ```
//!
//! What they compare:
//! - `bench_call`, `bench_call_err`, `bench_call_val`: full round trips through the
//!   queue and a pooled response slot, one per result type.
//! - `bench_call_non_block`: enqueue cost only, for reference against the blocking
//!   calls.
//! - `bench_pooled_slot_round_trip` vs `bench_fresh_slot_round_trip`: the response
//!   slot hand-off alone, with and without the pool, to see what pooling saves.
//!
//! The main thread binding and the "run-loop active" flag are process-wide, so every
//! benchmark shares one dedicated thread that is bound as the main thread, and takes
//! turns running a run-loop on it.

#[cfg(test)]
mod dispatcher_benchmarks {
    extern crate test;
    use crate::{Dispatcher, DispatcherConfig, MainThreadHandle, ResponseSlot,
                ResponseSlotPool, SlotOutcome, SlotWriter};
    use std::{sync::{Arc, Mutex, OnceLock, mpsc},
              thread};
    use test::Bencher;

    /// One run-loop: the entry routine reports that the loop is up via `started_tx`,
    /// then keeps it alive until `finished_rx` disconnects.
    struct BenchRun {
        started_tx: mpsc::Sender<()>,
        finished_rx: mpsc::Receiver<()>,
    }

    struct BenchMainThread {
        handle: MainThreadHandle,
        run_tx: mpsc::Sender<BenchRun>,
    }

    static BENCH_MAIN_THREAD: OnceLock<Mutex<BenchMainThread>> = OnceLock::new();

    fn bench_main_thread() -> &'static Mutex<BenchMainThread> {
        BENCH_MAIN_THREAD.get_or_init(|| {
            let (run_tx, run_rx) = mpsc::channel::<BenchRun>();
            let (handle_tx, handle_rx) = mpsc::channel();
            thread::Builder::new()
                .name("bench-main-thread".into())
                .spawn(move || {
                    let dispatcher = Dispatcher::new(DispatcherConfig::default()).unwrap();
                    handle_tx.send(dispatcher.handle()).unwrap();
                    for run in run_rx {
                        dispatcher
                            .run(move || {
                                drop(run.started_tx.send(()));
                                drop(run.finished_rx.recv());
                            })
                            .unwrap();
                    }
                })
                .unwrap();
            Mutex::new(BenchMainThread {
                handle: handle_rx.recv().unwrap(),
                run_tx,
            })
        })
    }

    /// Runs `f` on the calling (worker) thread while a run-loop is active.
    fn with_active_run_loop(f: impl FnOnce(&MainThreadHandle)) {
        let bench_main_thread = bench_main_thread()
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let (started_tx, started_rx) = mpsc::channel();
        let (finished_tx, finished_rx) = mpsc::channel::<()>();
        bench_main_thread
            .run_tx
            .send(BenchRun {
                started_tx,
                finished_rx,
            })
            .unwrap();
        started_rx.recv().unwrap();

        f(&bench_main_thread.handle);

        drop(finished_tx);
    }

    #[bench]
    fn bench_call(b: &mut Bencher) {
        with_active_run_loop(|handle| {
            b.iter(|| handle.call(|| {}));
        });
    }

    #[bench]
    fn bench_call_err(b: &mut Bencher) {
        with_active_run_loop(|handle| {
            b.iter(|| handle.call_err(|| Err::<(), _>("some error")));
        });
    }

    #[bench]
    fn bench_call_val(b: &mut Bencher) {
        with_active_run_loop(|handle| {
            b.iter(|| handle.call_val(|| test::black_box(42_u64)));
        });
    }

    #[bench]
    fn bench_call_non_block(b: &mut Bencher) {
        with_active_run_loop(|handle| {
            b.iter(|| handle.call_non_block(|| {}));
            // Wait for the backlog, so it isn't dropped when the run-loop stops.
            handle.call(|| {});
        });
    }

    #[bench]
    fn bench_pooled_slot_round_trip(b: &mut Bencher) {
        let pool = Arc::new(ResponseSlotPool::<u64>::new(1));
        b.iter(|| {
            let loan = pool.acquire();
            loan.writer().send(Ok(7));
            match loan.wait_and_take() {
                SlotOutcome::Completed(value) => test::black_box(value),
                other => panic!("unexpected outcome: {other:?}"),
            }
        });
    }

    #[bench]
    fn bench_fresh_slot_round_trip(b: &mut Bencher) {
        b.iter(|| {
            let slot = Arc::new(ResponseSlot::<u64>::new());
            SlotWriter::new(Arc::clone(&slot)).send(Ok(7));
            match slot.wait_and_take() {
                SlotOutcome::Completed(value) => test::black_box(value),
                other => panic!("unexpected outcome: {other:?}"),
            }
        });
    }
}
