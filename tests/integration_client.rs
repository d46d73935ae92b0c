//! End-to-end tests: the real router served on an ephemeral port, driven
//! through the client flows.

use anyhow::{Context, Result};
use otpgate::{
    account::{Argon2Hasher, ContactKind},
    api::{self, AuthComponents, AuthConfig, AuthState},
    client::{
        ApiClient, ClientCategory, ClientError, ContactUpdateFlow, FlowKind, FlowStep, LoginFlow,
        MemorySessionCache, OtpFlow, SessionStorage,
    },
    otp::{FixedCodeGenerator, Purpose},
    ErrorCategory,
};
use secrecy::SecretString;
use std::sync::Arc;
use tokio::net::TcpListener;

const CODE: &str = "482913";
const WRONG_CODE: &str = "000000";

fn secret(value: &str) -> SecretString {
    SecretString::from(value.to_string())
}

async fn spawn_server() -> Result<String> {
    let components = AuthComponents::new()
        .with_code_generator(Arc::new(FixedCodeGenerator::new(CODE)))
        .with_hasher(Arc::new(Argon2Hasher::with_params(8, 1, 1)?));
    let state = Arc::new(AuthState::new(
        AuthConfig::new().with_reaper_interval_seconds(0),
        components,
    ));
    let app = api::app(state, None)?;

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .context("Failed to bind ephemeral port")?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app.into_make_service()).await;
    });

    Ok(format!("http://{addr}"))
}

fn login_flow(api: &ApiClient) -> (LoginFlow, SessionStorage) {
    let storage = SessionStorage::new(Arc::new(MemorySessionCache::new()));
    (LoginFlow::new(api.clone(), storage.clone()), storage)
}

async fn register(api: &ApiClient, identifier: &str, password: &str) -> Result<()> {
    let flow = OtpFlow::new(api.clone(), FlowKind::Register);
    flow.send_code(identifier).await?;
    flow.submit_code(CODE).await?;
    flow.finish_registration(secret(password), "Alice", None)
        .await?;
    Ok(())
}

#[tokio::test]
async fn register_flow_recovers_from_wrong_code() -> Result<()> {
    let api = ApiClient::new(&spawn_server().await?)?;
    let flow = OtpFlow::new(api.clone(), FlowKind::Register);

    let countdown = flow.send_code("Alice@Example.com").await?;
    assert!(countdown.seconds_left() > 290);
    assert_eq!(flow.step(), FlowStep::Code);

    let err = flow.submit_code(WRONG_CODE).await.err();
    assert_eq!(err.as_ref().and_then(ClientError::code), Some("CodeMismatch"));
    assert_eq!(
        err.map(|err| err.category()),
        Some(ClientCategory::Server(ErrorCategory::Mismatch))
    );
    assert_eq!(flow.step(), FlowStep::Code);
    assert_eq!(flow.entered_code(), "");

    assert_eq!(flow.submit_code(CODE).await?, Purpose::Register);
    assert_eq!(flow.step(), FlowStep::Credential);

    let user = flow
        .finish_registration(secret("secret1"), "Alice", Some("0912 345 678"))
        .await?;
    assert_eq!(user.id, 1);
    assert_eq!(user.identifier, "alice@example.com");
    assert_eq!(user.contact_phone, "0912345678");
    assert_eq!(flow.step(), FlowStep::Complete);

    let health = api.health().await?;
    assert_eq!(health.accounts, 1);
    Ok(())
}

#[tokio::test]
async fn login_persists_and_logout_clears() -> Result<()> {
    let api = ApiClient::new(&spawn_server().await?)?;
    register(&api, "alice@example.com", "secret1").await?;
    let (login, storage) = login_flow(&api);

    let err = login
        .login("alice@example.com", &secret("wrong-secret"))
        .await
        .err();
    assert_eq!(err.as_ref().and_then(ClientError::status), Some(401));
    assert!(!storage.is_logged_in()?);

    let user = login.login("alice@example.com", &secret("secret1")).await?;
    assert!(storage.is_logged_in()?);
    assert_eq!(storage.user()?.map(|stored| stored.id), Some(user.id));
    assert_eq!(storage.token()?, api.token());

    let profile = api.profile().await?;
    assert_eq!(profile.user.display_name, "Alice");

    login.logout().await?;
    assert!(!storage.is_logged_in()?);
    assert_eq!(api.token(), None);

    let err = api.profile().await.err();
    assert_eq!(err.as_ref().and_then(ClientError::status), Some(401));
    Ok(())
}

#[tokio::test]
async fn restored_session_authenticates_a_new_client() -> Result<()> {
    let base = spawn_server().await?;
    let api = ApiClient::new(&base)?;
    register(&api, "alice@example.com", "secret1").await?;
    let (login, storage) = login_flow(&api);
    login.login("alice@example.com", &secret("secret1")).await?;

    let fresh = ApiClient::new(&base)?;
    let restored = LoginFlow::new(fresh.clone(), storage);
    assert!(restored.restore()?);
    assert_eq!(fresh.profile().await?.user.id, 1);
    Ok(())
}

#[tokio::test]
async fn contact_update_changes_login_identifier() -> Result<()> {
    let api = ApiClient::new(&spawn_server().await?)?;
    register(&api, "alice@example.com", "secret1").await?;
    let (login, _storage) = login_flow(&api);
    login.login("alice@example.com", &secret("secret1")).await?;

    let flow = ContactUpdateFlow::new(api.clone(), ContactKind::Email);
    flow.request("alice.new@example.com").await?;
    assert_eq!(flow.step(), FlowStep::Code);

    let err = flow.submit_code(WRONG_CODE).await.err();
    assert_eq!(err.as_ref().and_then(ClientError::code), Some("CodeMismatch"));
    assert_eq!(flow.step(), FlowStep::Code);

    let user = flow.submit_code(CODE).await?;
    assert_eq!(user.identifier, "alice.new@example.com");
    assert_eq!(flow.step(), FlowStep::Complete);

    let (relogin, _) = login_flow(&api);
    relogin
        .login("alice.new@example.com", &secret("secret1"))
        .await?;
    let err = relogin
        .login("alice@example.com", &secret("secret1"))
        .await
        .err();
    assert_eq!(err.as_ref().and_then(ClientError::status), Some(401));
    Ok(())
}

#[tokio::test]
async fn phone_update_sets_contact_phone() -> Result<()> {
    let api = ApiClient::new(&spawn_server().await?)?;
    register(&api, "alice@example.com", "secret1").await?;
    api.login("alice@example.com", &secret("secret1")).await?;

    let flow = ContactUpdateFlow::new(api.clone(), ContactKind::Phone);
    flow.request("+84 912-345-678").await?;
    let user = flow.submit_code(CODE).await?;
    assert_eq!(user.contact_phone, "+84912345678");
    assert_eq!(user.identifier, "alice@example.com");
    Ok(())
}

#[tokio::test]
async fn forgot_password_revokes_existing_sessions() -> Result<()> {
    let api = ApiClient::new(&spawn_server().await?)?;
    register(&api, "alice@example.com", "secret1").await?;
    api.login("alice@example.com", &secret("secret1")).await?;
    assert!(api.profile().await.is_ok());

    let anonymous = ApiClient::new(api.base_url().as_str())?;
    let flow = OtpFlow::new(anonymous.clone(), FlowKind::ForgotPassword);
    flow.send_code("alice@example.com").await?;
    assert_eq!(flow.submit_code(CODE).await?, Purpose::ForgotPassword);

    // a registration cannot be finished with a recovery code
    let err = flow
        .finish_registration(secret("secret2"), "Mallory", None)
        .await
        .err();
    assert!(matches!(err, Some(ClientError::InvalidStep(FlowStep::Credential))));

    flow.finish_reset(&secret("secret2")).await?;
    assert_eq!(flow.step(), FlowStep::Complete);

    let err = api.profile().await.err();
    assert_eq!(err.as_ref().and_then(ClientError::status), Some(401));

    anonymous
        .login("alice@example.com", &secret("secret2"))
        .await?;
    Ok(())
}

#[tokio::test]
async fn forgot_password_for_unknown_identifier_is_not_found() -> Result<()> {
    let api = ApiClient::new(&spawn_server().await?)?;
    let flow = OtpFlow::new(api, FlowKind::ForgotPassword);

    let err = flow.send_code("nobody@example.com").await.err();
    assert_eq!(
        err.map(|err| err.category()),
        Some(ClientCategory::Server(ErrorCategory::NotFound))
    );
    assert_eq!(flow.step(), FlowStep::Identifier);
    Ok(())
}

#[tokio::test]
async fn concurrent_submission_is_busy() -> Result<()> {
    let api = ApiClient::new(&spawn_server().await?)?;
    let flow = OtpFlow::new(api, FlowKind::Register);

    let (first, second) = tokio::join!(
        flow.send_code("alice@example.com"),
        flow.send_code("alice@example.com")
    );
    assert!(first.is_ok());
    assert!(matches!(second, Err(ClientError::Busy)));
    assert_eq!(flow.step(), FlowStep::Code);
    Ok(())
}

#[tokio::test]
async fn unreachable_server_is_a_transport_error() -> Result<()> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    drop(listener);

    let api = ApiClient::new(&format!("http://{addr}"))?;
    let err = api.health().await.err();
    assert!(err.as_ref().is_some_and(ClientError::is_transport));
    assert_eq!(err.map(|err| err.category()), Some(ClientCategory::Transport));
    Ok(())
}
