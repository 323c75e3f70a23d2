//! Logging macros that stay quiet unless the calling module opts in.
//!
//! Per-stroke code paths (preprocessing, gating) run on every pointer update,
//! so they declare a module-level switch and log through these macros:
//!
//! ```rust,ignore
//! const ENABLE_LOGS: bool = false;
//!
//! use crate::log_debug;
//! log_debug!("ink mass {}", mass);
//! ```

#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::debug!($($arg)*);
        }
    };
}

/// Warnings and errors go through the same switch; a module that disables
/// logging still reports failures through the notices it returns.
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::warn!($($arg)*);
        }
    };
}
