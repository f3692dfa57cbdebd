#![deny(missing_docs)]
//! Shared logging utilities for the uploader workspace.
//!
//! This crate provides the `upl_*` logging macros used across the codebase
//! and a minimal test initializer for the global logger. Every line is
//! prefixed with the view id recorded on the logging thread. Only the UI
//! dispatch thread records one; engine worker threads log as view 0.

use std::cell::Cell;

#[doc(hidden)]
pub use log;

thread_local! {
    /// Id of the view currently being dispatched on this thread (0 = none).
    static ACTIVE_VIEW: Cell<u64> = const { Cell::new(0) };
}

/// Records the view id the current thread is working on behalf of.
/// The dispatch loop calls this around every `update`.
pub fn set_active_view(view_id: u64) {
    ACTIVE_VIEW.with(|v| v.set(view_id));
}

/// Returns the view id recorded for this thread, or 0 if none was set.
pub fn active_view() -> u64 {
    ACTIVE_VIEW.with(|v| v.get())
}

/// Logs a trace-level message tagged with the active view.
#[macro_export]
macro_rules! upl_trace {
    ($($arg:tt)*) => {{
        $crate::log::trace!("[view {}] {}", $crate::active_view(), format_args!($($arg)*));
    }};
}

/// Logs a debug-level message tagged with the active view.
#[macro_export]
macro_rules! upl_debug {
    ($($arg:tt)*) => {{
        $crate::log::debug!("[view {}] {}", $crate::active_view(), format_args!($($arg)*));
    }};
}

/// Logs an info-level message tagged with the active view.
#[macro_export]
macro_rules! upl_info {
    ($($arg:tt)*) => {{
        $crate::log::info!("[view {}] {}", $crate::active_view(), format_args!($($arg)*));
    }};
}

/// Logs a warn-level message tagged with the active view.
#[macro_export]
macro_rules! upl_warn {
    ($($arg:tt)*) => {{
        $crate::log::warn!("[view {}] {}", $crate::active_view(), format_args!($($arg)*));
    }};
}

/// Logs an error-level message tagged with the active view.
#[macro_export]
macro_rules! upl_error {
    ($($arg:tt)*) => {{
        $crate::log::error!("[view {}] {}", $crate::active_view(), format_args!($($arg)*));
    }};
}

/// Initializes a simple terminal logger for use in tests.
///
/// This safely no-ops if another logger has already been initialized.
pub fn initialize_for_tests() {
    use simplelog::{ColorChoice, CombinedLogger, Config, TermLogger, TerminalMode};

    let level = if cfg!(debug_assertions) {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    // Another test may already own the global logger.
    let _ = CombinedLogger::init(vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}
