// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Demo of the main thread dispatcher. Each scenario prints what it observes on
//! stdout; logs go to stderr. This is also the binary under test for
//! `tests/main_thread_demo_test.rs`, since only a real `fn main()` runs on the
//! process's genuine main thread.
//!
//! ```text
//! cargo run --bin main_thread_demo -- --scenario print
//! cargo run --bin main_thread_demo -- --scenario saturate --queue-capacity 4
//! cargo run --bin main_thread_demo -- --scenario exit-process --log-level debug
//! ```

use clap::{Parser, ValueEnum};
use r3bl_main_thread::{DEFAULT_QUEUE_CAPACITY, DisplayPreference, Dispatcher,
                       DispatcherConfig, LoopExitPolicy, MainThreadHandle, TracingConfig};
use std::{io,
          sync::{Arc,
                 atomic::{AtomicUsize, Ordering},
                 mpsc},
          thread,
          time::Duration};
use tracing_core::LevelFilter;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Which scenario to run.
    #[arg(long, value_enum, default_value_t = Scenario::Print)]
    scenario: Scenario,

    /// Capacity of the call queue and of each response slot pool.
    #[arg(long, default_value_t = DEFAULT_QUEUE_CAPACITY)]
    queue_capacity: usize,

    /// Log level for the stderr log output.
    #[arg(long, value_enum, default_value_t = LogLevel::Warn)]
    log_level: LogLevel,

    /// Panic in the entry routine after the scenario finishes.
    #[arg(long)]
    panic_in_entry: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Scenario {
    /// `call()` a closure that prints once.
    Print,
    /// `call_val()` round trips.
    Value,
    /// `call_err()` round trips.
    Error,
    /// Saturate the queue with `call_non_block()` from worker threads.
    Saturate,
    /// Queue work and return right away; everything queued still runs.
    Drain,
    /// Like `print`, but the process exits when the run-loop stops.
    ExitProcess,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(it: LogLevel) -> Self {
        match it {
            LogLevel::Off => LevelFilter::OFF,
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

fn main() -> miette::Result<()> {
    let cli = Cli::parse();

    TracingConfig::new_display(DisplayPreference::Stderr)
        .with_level_filter(cli.log_level.into())
        .install_global()?;

    let loop_exit_policy = if cli.scenario == Scenario::ExitProcess {
        LoopExitPolicy::ExitProcess
    } else {
        LoopExitPolicy::ReturnToCaller
    };
    let config = DispatcherConfig::default()
        .with_queue_capacity(cli.queue_capacity)
        .with_loop_exit_policy(loop_exit_policy);

    // Bind the genuine process main thread, before any other thread exists.
    let dispatcher = Dispatcher::new(config)?;
    let handle = dispatcher.handle();

    let scenario = cli.scenario;
    let panic_in_entry = cli.panic_in_entry;
    let report = dispatcher.run(move || {
        match scenario {
            Scenario::Print | Scenario::ExitProcess => run_print(&handle),
            Scenario::Value => run_value(&handle),
            Scenario::Error => run_error(&handle),
            Scenario::Saturate => run_saturate(&handle),
            Scenario::Drain => run_drain(&handle),
        }
        if panic_in_entry {
            panic!("entry routine panicked on request");
        }
    })?;

    println!(
        "run-loop stopped: executed_calls={} dropped_calls={}",
        report.executed_calls, report.dropped_calls
    );

    Ok(())
}

fn run_print(handle: &MainThreadHandle) {
    handle.call(|| println!("i'm printing from the main thread"));
}

fn run_value(handle: &MainThreadHandle) {
    let answer = handle.call_val(|| 42);
    println!("call_val returned {answer}");

    let nothing = handle.call_val(|| None::<String>);
    println!("call_val returned {nothing:?}");
}

fn run_error(handle: &MainThreadHandle) {
    match handle.call_err(|| Err(io::Error::other("some error"))) {
        Ok(()) => println!("call_err returned ok"),
        Err(error) => println!("call_err returned error: {error}"),
    }

    match handle.call_err(|| Ok::<(), io::Error>(())) {
        Ok(()) => println!("call_err returned ok"),
        Err(error) => println!("call_err returned error: {error}"),
    }
}

/// Occupies the main thread, then has `capacity + 1` workers each submit one slow
/// [`call_non_block()`]. Only `capacity` of them fit in the queue.
///
/// [`call_non_block()`]: MainThreadHandle::call_non_block
fn run_saturate(handle: &MainThreadHandle) {
    let capacity = handle.queue_capacity();
    let executed = Arc::new(AtomicUsize::new(0));

    let (started_tx, started_rx) = mpsc::channel();
    let (gate_tx, gate_rx) = mpsc::channel::<()>();
    handle.call_non_block(move || {
        drop(started_tx.send(()));
        drop(gate_rx.recv());
    });
    if started_rx.recv().is_err() {
        return;
    }

    let (submitted_tx, submitted_rx) = mpsc::channel();
    let workers = (0..=capacity)
        .map(|_| {
            let handle = handle.clone();
            let executed = Arc::clone(&executed);
            let submitted_tx = submitted_tx.clone();
            thread::spawn(move || {
                handle.call_non_block(move || {
                    thread::sleep(Duration::from_millis(5));
                    executed.fetch_add(1, Ordering::SeqCst);
                });
                drop(submitted_tx.send(()));
            })
        })
        .collect::<Vec<_>>();

    let mut queued_without_blocking = 0;
    while submitted_rx.recv_timeout(Duration::from_millis(500)).is_ok() {
        queued_without_blocking += 1;
    }
    println!(
        "queued {queued_without_blocking} of {} submissions without blocking",
        capacity + 1
    );

    drop(gate_tx.send(()));
    let unblocked = submitted_rx.recv_timeout(Duration::from_secs(5)).is_ok();
    println!("last submission unblocked after a slot freed: {unblocked}");

    for worker in workers {
        drop(worker.join());
    }
    handle.call(|| {});
    println!("executed {} saturating calls", executed.load(Ordering::SeqCst));
}

fn run_drain(handle: &MainThreadHandle) {
    let executed = Arc::new(AtomicUsize::new(0));
    handle.call_non_block(|| thread::sleep(Duration::from_millis(50)));
    for _ in 0..10 {
        let executed = Arc::clone(&executed);
        handle.call_non_block(move || {
            let count = executed.fetch_add(1, Ordering::SeqCst) + 1;
            println!("drained call {count}");
        });
    }
}
