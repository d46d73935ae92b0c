use clap::{Arg, Command};

use crate::clock::MAX_TTL_SECONDS;

pub const ARG_OTP_TTL_SECONDS: &str = "otp-ttl-seconds";
pub const ARG_OTP_MAX_ATTEMPTS: &str = "otp-max-attempts";
pub const ARG_OTP_VERIFIED_TTL_SECONDS: &str = "otp-verified-ttl-seconds";
pub const ARG_OTP_REAPER_INTERVAL_SECONDS: &str = "otp-reaper-interval-seconds";
pub const ARG_NOTIFY_MAX_ATTEMPTS: &str = "notify-max-attempts";
pub const ARG_NOTIFY_BACKOFF_BASE_SECONDS: &str = "notify-backoff-base-seconds";
pub const ARG_NOTIFY_BACKOFF_MAX_SECONDS: &str = "notify-backoff-max-seconds";

#[must_use]
pub fn with_args(command: Command) -> Command {
    let command = with_code_args(command);
    with_notify_args(command)
}

fn with_code_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_OTP_TTL_SECONDS)
                .long(ARG_OTP_TTL_SECONDS)
                .help("Seconds a one-time code stays valid")
                .env("OTPGATE_OTP_TTL_SECONDS")
                .default_value("300")
                .value_parser(clap::value_parser!(i64).range(1..=MAX_TTL_SECONDS)),
        )
        .arg(
            Arg::new(ARG_OTP_MAX_ATTEMPTS)
                .long(ARG_OTP_MAX_ATTEMPTS)
                .help("Wrong guesses allowed before a code is invalidated, 0 for no cap")
                .env("OTPGATE_OTP_MAX_ATTEMPTS")
                .default_value("5")
                .value_parser(clap::value_parser!(u32)),
        )
        .arg(
            Arg::new(ARG_OTP_VERIFIED_TTL_SECONDS)
                .long(ARG_OTP_VERIFIED_TTL_SECONDS)
                .help("Seconds a verified code can still be used to register or reset")
                .env("OTPGATE_OTP_VERIFIED_TTL_SECONDS")
                .default_value("900")
                .value_parser(clap::value_parser!(i64).range(1..=MAX_TTL_SECONDS)),
        )
        .arg(
            Arg::new(ARG_OTP_REAPER_INTERVAL_SECONDS)
                .long(ARG_OTP_REAPER_INTERVAL_SECONDS)
                .help("Seconds between sweeps of expired codes and sessions, 0 disables the sweep")
                .env("OTPGATE_OTP_REAPER_INTERVAL_SECONDS")
                .default_value("60")
                .value_parser(clap::value_parser!(u64)),
        )
}

fn with_notify_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_NOTIFY_MAX_ATTEMPTS)
                .long(ARG_NOTIFY_MAX_ATTEMPTS)
                .help("Delivery attempts per code notification")
                .env("OTPGATE_NOTIFY_MAX_ATTEMPTS")
                .default_value("3")
                .value_parser(clap::value_parser!(u32)),
        )
        .arg(
            Arg::new(ARG_NOTIFY_BACKOFF_BASE_SECONDS)
                .long(ARG_NOTIFY_BACKOFF_BASE_SECONDS)
                .help("Base delay for notification retry backoff")
                .env("OTPGATE_NOTIFY_BACKOFF_BASE_SECONDS")
                .default_value("2")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new(ARG_NOTIFY_BACKOFF_MAX_SECONDS)
                .long(ARG_NOTIFY_BACKOFF_MAX_SECONDS)
                .help("Max delay for notification retry backoff")
                .env("OTPGATE_NOTIFY_BACKOFF_MAX_SECONDS")
                .default_value("30")
                .value_parser(clap::value_parser!(u64)),
        )
}
