//! Logging abstraction layer
//!
//! Navigation decisions are logged through these macros so the crate works with
//! either the `log` or the `tracing` ecosystem. Every record is emitted under the
//! `pjax_navigator` target, which makes it easy to filter router chatter:
//!
//! ```text
//! RUST_LOG=pjax_navigator=debug
//! ```
//!
//! # Features
//!
//! - `log` (default) - Uses the standard `log` crate
//! - `tracing` - Uses the `tracing` crate for structured logging
//!
//! Choose one feature at compile time. They are mutually exclusive.
//!
//! # Usage
//!
//! ```ignore
//! use pjax_navigator::{debug_log, trace_log, warn_log};
//!
//! trace_log!("click ignored: {}", reason);
//! debug_log!("routing to {}", url);
//! warn_log!("dropping response for {} with status {}", url, status);
//! ```

/// Log target shared by every record the crate emits.
pub const LOG_TARGET: &str = "pjax_navigator";

/// Trace-level logging
///
/// Per-click eligibility decisions and cache lookups.
#[macro_export]
macro_rules! trace_log {
    ($($arg:tt)*) => {
        #[cfg(feature = "tracing")]
        ::tracing::trace!(target: "pjax_navigator", $($arg)*);
        #[cfg(feature = "log")]
        ::log::trace!(target: $crate::logging::LOG_TARGET, $($arg)*);
    };
}

/// Debug-level logging
///
/// Routing pipeline steps and history pushes.
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {
        #[cfg(feature = "tracing")]
        ::tracing::debug!(target: "pjax_navigator", $($arg)*);
        #[cfg(feature = "log")]
        ::log::debug!(target: $crate::logging::LOG_TARGET, $($arg)*);
    };
}

/// Info-level logging
#[macro_export]
macro_rules! info_log {
    ($($arg:tt)*) => {
        #[cfg(feature = "tracing")]
        ::tracing::info!(target: "pjax_navigator", $($arg)*);
        #[cfg(feature = "log")]
        ::log::info!(target: $crate::logging::LOG_TARGET, $($arg)*);
    };
}

/// Warn-level logging
///
/// Dropped responses and transport failures end up here, since neither is
/// surfaced to subscribers.
#[macro_export]
macro_rules! warn_log {
    ($($arg:tt)*) => {
        #[cfg(feature = "tracing")]
        ::tracing::warn!(target: "pjax_navigator", $($arg)*);
        #[cfg(feature = "log")]
        ::log::warn!(target: $crate::logging::LOG_TARGET, $($arg)*);
    };
}

/// Error-level logging
#[macro_export]
macro_rules! error_log {
    ($($arg:tt)*) => {
        #[cfg(feature = "tracing")]
        ::tracing::error!(target: "pjax_navigator", $($arg)*);
        #[cfg(feature = "log")]
        ::log::error!(target: $crate::logging::LOG_TARGET, $($arg)*);
    };
}
