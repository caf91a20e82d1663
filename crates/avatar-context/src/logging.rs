//! Tracing setup.
//!
//! The library itself only emits `tracing` events; hosts that do not install
//! their own subscriber can call [`init_logging`].

use std::str::FromStr;

use tracing::Level;

/// Parse a level name, falling back to `INFO`.
pub fn parse_level(level: &str) -> Level {
    Level::from_str(level.trim()).unwrap_or(Level::INFO)
}

/// Install a global `fmt` subscriber at the given level, writing to stderr.
///
/// Returns `false` if a global subscriber was already set.
pub fn init_logging(level: &str) -> bool {
    tracing_subscriber::fmt()
        .with_max_level(parse_level(level))
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("debug"), Level::DEBUG);
        assert_eq!(parse_level(" WARN "), Level::WARN);
        assert_eq!(parse_level("chatty"), Level::INFO);
    }

    #[test]
    fn test_init_logging_is_idempotent() {
        let _ = init_logging("info");
        assert!(!init_logging("debug"));
    }
}
