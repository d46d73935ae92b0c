use crate::{
    api::{self, AuthComponents, AuthConfig, AuthState},
    otp::{spawn_outbox, LogNotifier, NotifyWorkerConfig},
};
use anyhow::Result;
use std::sync::Arc;
use tracing::info;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub cors_origin: Option<String>,
    pub auth_config: AuthConfig,
    pub notify_config: NotifyWorkerConfig,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    log_startup_args(&args);

    let (outbox, _worker) = spawn_outbox(Arc::new(LogNotifier), args.notify_config);
    let components = AuthComponents::new().with_notifier(Arc::new(outbox));
    let auth_state = Arc::new(AuthState::new(args.auth_config, components));

    api::new(args.port, auth_state, args.cors_origin.as_deref()).await
}

fn log_startup_args(args: &Args) {
    let otp = args.auth_config.otp();
    info!(
        port = args.port,
        cors_origin = args.cors_origin.as_deref().unwrap_or("*"),
        otp_ttl_seconds = otp.ttl_seconds(),
        otp_max_attempts = otp.max_attempts(),
        registration_mode = %args.auth_config.registration_mode(),
        notify_max_attempts = args.notify_config.max_attempts(),
        "Starting otpgate"
    );
}
