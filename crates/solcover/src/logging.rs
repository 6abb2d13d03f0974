//! Tracing subscriber setup

use crate::config::Verbosity;
use tracing_subscriber::EnvFilter;

/// Environment variable that overrides the verbosity-derived filter
pub const LOG_ENV: &str = "SOLCOVER_LOG";

/// Install the global subscriber, writing to stderr
///
/// `SOLCOVER_LOG` (then `RUST_LOG`) takes precedence over `verbosity`.
/// Returns `false` if a subscriber was already installed.
pub fn init(verbosity: Verbosity, json: bool) -> bool {
    let filter = filter_for(verbosity);
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    if json {
        builder.json().try_init().is_ok()
    } else {
        builder.try_init().is_ok()
    }
}

fn filter_for(verbosity: Verbosity) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(verbosity.filter_directive()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_reports_false() {
        let _ = init(Verbosity::Quiet, false);
        assert!(!init(Verbosity::Debug, true));
    }
}
