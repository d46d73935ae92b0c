use clap::{builder::ValueParser, Arg, ArgAction, Command};
use tracing::Level;

pub const ARG_VERBOSITY: &str = "verbosity";

/// Level names in verbosity order; a count of 0 keeps the ERROR default.
const LEVEL_NAMES: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// Parses `OTPGATE_LOG_LEVEL`: a level name or the matching `-v` count.
#[must_use]
pub fn validator_log_level() -> ValueParser {
    ValueParser::from(|level: &str| -> Result<u8, String> {
        let level = level.trim();
        let count = match level.parse::<u8>() {
            Ok(count) => usize::from(count),
            Err(_) => LEVEL_NAMES
                .iter()
                .position(|name| name.eq_ignore_ascii_case(level))
                .ok_or_else(|| {
                    format!(
                        "unknown log level '{level}', expected one of {}",
                        LEVEL_NAMES.join(", ")
                    )
                })?,
        };
        u8::try_from(count.min(LEVEL_NAMES.len() - 1)).map_err(|err| err.to_string())
    })
}

/// Tracing level for a verbosity count; `None` leaves the subscriber default.
#[must_use]
pub const fn verbosity_level(verbosity: u8) -> Option<Level> {
    match verbosity {
        0 => None,
        1 => Some(Level::WARN),
        2 => Some(Level::INFO),
        3 => Some(Level::DEBUG),
        _ => Some(Level::TRACE),
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command.arg(
        Arg::new(ARG_VERBOSITY)
            .short('v')
            .long("verbose")
            .help("Raise log verbosity: -v warn, -vv info (shows issued codes), -vvv debug, -vvvv trace")
            .env("OTPGATE_LOG_LEVEL")
            .global(true)
            .action(ArgAction::Count)
            .value_parser(validator_log_level()),
    )
}
