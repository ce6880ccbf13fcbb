use color_eyre::eyre::{Result, eyre};
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

const LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// Shifts `base` up by `verbose` steps and down by `quiet` steps, clamped to
/// the known levels. Unknown names count as "warn".
pub fn effective_level(base: &str, verbose: u8, quiet: u8) -> &'static str {
    let base = LEVELS
        .iter()
        .position(|l| l.eq_ignore_ascii_case(base.trim()))
        .unwrap_or(1) as i32;
    let shifted = (base + i32::from(verbose) - i32::from(quiet)).clamp(0, LEVELS.len() as i32 - 1);
    LEVELS[shifted as usize]
}

/// Installs the global subscriber writing to stderr. `RUST_LOG` wins over the
/// configured level when set.
pub fn init_tracing(config: &LoggingConfig, verbose: u8, quiet: u8) -> Result<()> {
    let level = effective_level(&config.level, verbose, quiet);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    let installed = if config.format.eq_ignore_ascii_case("json") {
        builder.json().try_init()
    } else {
        builder.without_time().try_init()
    };

    installed.map_err(|e| eyre!("failed to set tracing subscriber: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_moves_level() {
        assert_eq!(effective_level("warn", 0, 0), "warn");
        assert_eq!(effective_level("warn", 1, 0), "info");
        assert_eq!(effective_level("warn", 5, 0), "trace");
        assert_eq!(effective_level("warn", 0, 3), "error");
        assert_eq!(effective_level("INFO", 1, 1), "info");
        assert_eq!(effective_level("bogus", 0, 0), "warn");
    }
}
