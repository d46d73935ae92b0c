use clap::{Arg, Command};

use crate::clock::MAX_TTL_SECONDS;

pub const ARG_SESSION_TTL_SECONDS: &str = "session-ttl-seconds";
pub const ARG_REGISTRATION_MODE: &str = "registration-mode";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_SESSION_TTL_SECONDS)
                .long(ARG_SESSION_TTL_SECONDS)
                .help("Bearer session TTL in seconds")
                .env("OTPGATE_SESSION_TTL_SECONDS")
                .default_value("43200")
                .value_parser(clap::value_parser!(i64).range(1..=MAX_TTL_SECONDS)),
        )
        .arg(
            Arg::new(ARG_REGISTRATION_MODE)
                .long(ARG_REGISTRATION_MODE)
                .help("Registration paths to enable: both, otp, simple")
                .env("OTPGATE_REGISTRATION_MODE")
                .default_value("both")
                .value_parser(["both", "otp", "simple"])
                .ignore_case(true),
        )
}
