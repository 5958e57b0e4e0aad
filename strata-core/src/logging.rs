//! Logging setup for applications embedding Strata.
//!
//! The library itself only emits `tracing` events: generated SQL at DEBUG,
//! validation actions at INFO, failed statements at WARN. Embedders call
//! [`init_logging`] once, or install their own subscriber.

use crate::Result;
use crate::error::PersistenceError;
use tracing_subscriber::EnvFilter;

/// Environment variable whose directives replace the computed filter.
pub const LOG_ENV: &str = "STRATA_LOG";

/// Filter directives for a verbosity/quiet pair.
///
/// Strata's own crates follow the requested level; every other target
/// stays at WARN so driver chatter does not drown out generated SQL.
fn default_directives(verbose: u8, quiet: bool) -> String {
    let level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "info",
        (false, 1) => "debug",
        (false, _) => "trace",
    };
    let others = if quiet { "error" } else { "warn" };
    format!("{},strata_core={},strata_schema={}", others, level, level)
}

/// Installs a global fmt subscriber.
///
/// `verbose` counts `-v` flags (0 = INFO, 1 = DEBUG, 2+ = TRACE) and
/// `quiet` limits output to errors. A set `STRATA_LOG` wins over both.
///
/// # Errors
/// `Configuration` if `STRATA_LOG` cannot be parsed or a global subscriber
/// is already installed.
///
/// # Example
/// ```rust,no_run
/// use strata_core::logging::init_logging;
///
/// // DEBUG shows every generated statement
/// init_logging(1, false)?;
/// # Ok::<(), strata_core::PersistenceError>(())
/// ```
pub fn init_logging(verbose: u8, quiet: bool) -> Result<()> {
    let filter = match std::env::var(LOG_ENV) {
        Ok(directives) => EnvFilter::try_new(&directives).map_err(|e| {
            PersistenceError::configuration(format!("invalid {} '{}': {}", LOG_ENV, directives, e))
        })?,
        Err(_) => EnvFilter::new(default_directives(verbose, quiet)),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbose > 1)
        .try_init()
        .map_err(|e| PersistenceError::configuration(format!("logging already initialized: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directives_per_verbosity() {
        assert_eq!(
            default_directives(0, false),
            "warn,strata_core=info,strata_schema=info"
        );
        assert_eq!(
            default_directives(1, false),
            "warn,strata_core=debug,strata_schema=debug"
        );
        assert_eq!(
            default_directives(7, false),
            "warn,strata_core=trace,strata_schema=trace"
        );
        assert_eq!(
            default_directives(3, true),
            "error,strata_core=error,strata_schema=error"
        );
    }

    #[test]
    fn test_directives_parse() {
        for (verbose, quiet) in [(0, false), (1, false), (2, false), (0, true)] {
            assert!(EnvFilter::try_new(default_directives(verbose, quiet)).is_ok());
        }
    }
}
