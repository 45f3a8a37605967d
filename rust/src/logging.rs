//! Logging macros for the CTG scheduler with verbosity level control.
//!
//! Messages go through the `log` facade, so the embedding application picks
//! the backend. The macros reach `log` through this crate, so callers need
//! no `log` dependency of their own. Verbosity gates them before they reach `log` at all:
//! - 0: SILENT (warnings only)
//! - 1: CHANGES (schedule decisions, strategy selection)
//! - 2: CHECKS (per-CUT budget computation, skip reasons)
//! - 3: DEBUG (dependency sort internals, graph queries)

/// Verbosity level constants.
pub const VERBOSITY_SILENT: u8 = 0;
pub const VERBOSITY_CHANGES: u8 = 1;
pub const VERBOSITY_CHECKS: u8 = 2;
pub const VERBOSITY_DEBUG: u8 = 3;

/// Log at CHANGES level (verbosity >= 1).
///
/// Used for: chosen strategy, number of jobs produced, fallback decisions.
#[macro_export]
macro_rules! log_changes {
    ($verbosity:expr, $($arg:tt)*) => {
        if $verbosity >= $crate::logging::VERBOSITY_CHANGES {
            $crate::__log::info!($($arg)*);
        }
    };
}

/// Log at CHECKS level (verbosity >= 2).
///
/// Used for: per-CUT budgets, skipped CUTs, dependency sets.
#[macro_export]
macro_rules! log_checks {
    ($verbosity:expr, $($arg:tt)*) => {
        if $verbosity >= $crate::logging::VERBOSITY_CHECKS {
            $crate::__log::debug!($($arg)*);
        }
    };
}

/// Log at DEBUG level (verbosity >= 3).
///
/// Used for: postponed jobs, redistribution rounds.
#[macro_export]
macro_rules! log_debug {
    ($verbosity:expr, $($arg:tt)*) => {
        if $verbosity >= $crate::logging::VERBOSITY_DEBUG {
            $crate::__log::trace!($($arg)*);
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_levels_are_ordered() {
        assert!(VERBOSITY_SILENT < VERBOSITY_CHANGES);
        assert!(VERBOSITY_CHANGES < VERBOSITY_CHECKS);
        assert!(VERBOSITY_CHECKS < VERBOSITY_DEBUG);
    }

    #[test]
    fn test_log_macros_expand_at_every_level() {
        for verbosity in [VERBOSITY_SILENT, VERBOSITY_DEBUG] {
            log_changes!(verbosity, "jobs {}", 1);
            log_checks!(verbosity, "cut {}", "a.B");
            log_debug!(verbosity, "round {}", 3);
        }
    }

    // A local `log` module shadows the `log` crate for bare `log::` paths
    mod shadowed {
        #[allow(dead_code)]
        mod log {}

        pub fn emit(verbosity: u8) {
            crate::log_changes!(verbosity, "jobs {}", 1);
            crate::log_checks!(verbosity, "cut {}", "a.B");
            crate::log_debug!(verbosity, "round {}", 3);
        }
    }

    #[test]
    fn test_macros_do_not_need_log_in_scope() {
        shadowed::emit(VERBOSITY_DEBUG);
    }
}
