use clap::{builder::ValueParser, Arg, ArgAction, Command};

pub const ARG_VERBOSITY: &str = "verbosity";

/// Level names indexed by verbosity count; `-vvvv` is the most verbose.
pub const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// Accept a level name (any case) or its numeric verbosity.
fn parse_log_level(level: &str) -> Result<u8, String> {
    let level = level.trim();
    let position = match level.parse::<usize>() {
        Ok(count) if count < LOG_LEVELS.len() => Some(count),
        Ok(_) => None,
        Err(_) => LOG_LEVELS
            .iter()
            .position(|name| name.eq_ignore_ascii_case(level)),
    };

    position
        .and_then(|count| u8::try_from(count).ok())
        .ok_or_else(|| format!("invalid log level, expected one of {}", LOG_LEVELS.join(", ")))
}

#[must_use]
pub fn validator_log_level() -> ValueParser {
    ValueParser::from(parse_log_level)
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command.arg(
        Arg::new(ARG_VERBOSITY)
            .short('v')
            .long("verbose")
            .help("Verbosity level: ERROR, WARN, INFO, DEBUG, TRACE (default: ERROR)")
            .env("LEARNFLOW_LOG_LEVEL")
            .global(true)
            .action(ArgAction::Count)
            .value_parser(validator_log_level()),
    )
}
