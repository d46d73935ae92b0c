use crate::{
    account::RegistrationMode,
    api::AuthConfig,
    cli::{
        actions::{server::Args, Action},
        commands::{self, auth, otp},
    },
    otp::{NotifyWorkerConfig, OtpConfig},
};
use anyhow::{Context, Result};
use std::time::Duration;

fn required<T: Clone + Send + Sync + 'static>(matches: &clap::ArgMatches, id: &str) -> Result<T> {
    matches
        .get_one::<T>(id)
        .cloned()
        .with_context(|| format!("missing required argument: --{id}"))
}

/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches
        .get_one::<u16>(commands::ARG_PORT)
        .copied()
        .unwrap_or(3000);
    let cors_origin = matches.get_one::<String>(commands::ARG_CORS_ORIGIN).cloned();

    let otp_config = OtpConfig::new()
        .with_ttl_seconds(required(matches, otp::ARG_OTP_TTL_SECONDS)?)
        .with_max_attempts(required(matches, otp::ARG_OTP_MAX_ATTEMPTS)?)
        .with_verified_ttl_seconds(required(matches, otp::ARG_OTP_VERIFIED_TTL_SECONDS)?);

    let registration_mode = required::<String>(matches, auth::ARG_REGISTRATION_MODE)?
        .parse::<RegistrationMode>()
        .context("invalid --registration-mode")?;

    let auth_config = AuthConfig::new()
        .with_otp(otp_config)
        .with_reaper_interval_seconds(required(matches, otp::ARG_OTP_REAPER_INTERVAL_SECONDS)?)
        .with_session_ttl_seconds(required(matches, auth::ARG_SESSION_TTL_SECONDS)?)
        .with_registration_mode(registration_mode);

    let notify_config = NotifyWorkerConfig::new()
        .with_max_attempts(required(matches, otp::ARG_NOTIFY_MAX_ATTEMPTS)?)
        .with_backoff_base_seconds(required(matches, otp::ARG_NOTIFY_BACKOFF_BASE_SECONDS)?)
        .with_backoff_max(Duration::from_secs(required(
            matches,
            otp::ARG_NOTIFY_BACKOFF_MAX_SECONDS,
        )?))
        .normalize();

    Ok(Action::Server(Args {
        port,
        cors_origin,
        auth_config,
        notify_config,
    }))
}
