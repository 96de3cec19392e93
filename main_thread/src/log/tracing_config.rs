// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use super::try_create_layers;
use tracing::dispatcher::DefaultGuard;
use tracing_core::LevelFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Configure where the dispatcher's (and your app's) [`tracing`] events go, and at what
/// level. You can display the logs to:
/// 1. a file,
/// 2. stdout or stderr,
/// 3. both.
///
/// Then install it with [`install_global()`] (apps) or [`install_thread_local()`]
/// (tests).
///
/// [`install_global()`]: Self::install_global
/// [`install_thread_local()`]: Self::install_thread_local
#[derive(Debug, Clone)]
pub struct TracingConfig {
    pub writer_config: WriterConfig,
    pub level_filter: LevelFilter,
}

/// - `DisplayPreference`: [`DisplayPreference`] is the preferred display to use for
///   logging.
/// - `String`: is the path to the log file. Eg: `/tmp/main_thread_demo.log`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriterConfig {
    None,
    Display(DisplayPreference),
    File(String /* tracing_log_file_path */),
    DisplayAndFile(DisplayPreference, String /* tracing_log_file_path */),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayPreference {
    Stdout,
    Stderr,
}

/// Used when a file writer is requested without a path.
pub const DEFAULT_LOG_FILE_PATH: &str = "main_thread_log.log";

impl TracingConfig {
    #[must_use]
    pub fn new_display(display_preference: DisplayPreference) -> Self {
        Self {
            writer_config: WriterConfig::Display(display_preference),
            level_filter: LevelFilter::DEBUG,
        }
    }

    #[must_use]
    pub fn new_file(file_path: Option<String>) -> Self {
        Self {
            writer_config: WriterConfig::File(
                file_path.unwrap_or_else(|| DEFAULT_LOG_FILE_PATH.to_string()),
            ),
            level_filter: LevelFilter::DEBUG,
        }
    }

    #[must_use]
    pub fn new_file_and_display(
        file_path: Option<String>,
        display_preference: DisplayPreference,
    ) -> Self {
        Self {
            writer_config: WriterConfig::DisplayAndFile(
                display_preference,
                file_path.unwrap_or_else(|| DEFAULT_LOG_FILE_PATH.to_string()),
            ),
            level_filter: LevelFilter::DEBUG,
        }
    }

    #[must_use]
    pub fn with_level_filter(mut self, level_filter: LevelFilter) -> Self {
        self.level_filter = level_filter;
        self
    }

    #[must_use]
    pub fn get_writer_config(&self) -> WriterConfig { self.writer_config.clone() }

    #[must_use]
    pub fn get_level_filter(&self) -> LevelFilter { self.level_filter }

    /// Installs a global default subscriber, which once set, can't be unset or changed.
    /// This is what apps want.
    ///
    /// Does nothing for [`WriterConfig::None`] or [`LevelFilter::OFF`].
    ///
    /// # Errors
    ///
    /// - The log file can't be created.
    /// - A global default subscriber is already installed.
    pub fn install_global(self) -> miette::Result<()> {
        if self.is_disabled() {
            return Ok(());
        }
        let layers = try_create_layers(self)?;
        tracing_subscriber::registry()
            .with(layers)
            .try_init()
            .map_err(|error| miette::miette!("Can't install global subscriber: {error}"))
    }

    /// Installs a subscriber for the current thread only, until the returned guard is
    /// dropped. This is what tests want, since each test can use its own.
    ///
    /// Returns [`None`] for [`WriterConfig::None`] or [`LevelFilter::OFF`].
    ///
    /// # Errors
    ///
    /// The log file can't be created.
    pub fn install_thread_local(self) -> miette::Result<Option<DefaultGuard>> {
        if self.is_disabled() {
            return Ok(None);
        }
        let layers = try_create_layers(self)?;
        Ok(Some(tracing_subscriber::registry().with(layers).set_default()))
    }

    fn is_disabled(&self) -> bool {
        self.writer_config == WriterConfig::None || self.level_filter == LevelFilter::OFF
    }
}
