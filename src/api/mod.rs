//! HTTP surface.
//!
//! All routes live under `/api` and answer with the `{success, message}`
//! envelope. Request ids (`x-request-id`, ULID) are set when missing and
//! echoed back; each request gets an `http.request` span.

use anyhow::{anyhow, Context, Result};
use axum::{
    body::Body,
    extract::MatchedPath,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderName, HeaderValue, Method, Request,
    },
    routing::options,
    Extension, Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::PropagateRequestIdLayer,
    set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{error, info, info_span, Span};
use ulid::Ulid;
use url::Url;
use utoipa_axum::router::OpenApiRouter;

pub mod handlers;
mod openapi;
pub mod types;


pub use handlers::auth::{AuthComponents, AuthConfig, AuthState};
pub use openapi::openapi;

use crate::reaper::spawn_reaper;
use handlers::health;

/// Build the API router with all documented routes registered.
#[must_use]
pub fn router() -> OpenApiRouter {
    openapi::api_router()
}

/// Build the full application: documented routes, the `OPTIONS` health probe,
/// and the request-id/trace/CORS layers.
///
/// # Errors
/// Returns an error if `cors_origin` is not a valid origin URL.
pub fn app(auth_state: Arc<AuthState>, cors_origin: Option<&str>) -> Result<Router> {
    let cors = cors_layer(cors_origin)?;

    let (router, _openapi) = router().split_for_parts();
    let app = router.route("/api/health", options(health::health)).layer(
        ServiceBuilder::new()
            .layer(SetRequestHeaderLayer::if_not_present(
                HeaderName::from_static("x-request-id"),
                |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
            ))
            .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                "x-request-id",
            )))
            .layer(TraceLayer::new_for_http().make_span_with(make_span))
            .layer(cors)
            .layer(Extension(auth_state)),
    );

    Ok(app)
}

/// Start the server
/// # Errors
/// Return error if failed to start the server
pub async fn new(port: u16, auth_state: Arc<AuthState>, cors_origin: Option<&str>) -> Result<()> {
    let app = app(Arc::clone(&auth_state), cors_origin)?;

    // Expiry is enforced lazily; the reaper only bounds memory.
    if let Some(every) = auth_state.config().reaper_interval() {
        let workflow = auth_state.workflow();
        spawn_reaper(
            Arc::clone(workflow.registry()),
            Arc::clone(workflow.sessions()),
            every,
        );
    }

    let listener = TcpListener::bind(format!("::0:{port}"))
        .await
        .with_context(|| format!("Failed to bind port {port}"))?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {err}");
        std::future::pending::<()>().await;
    }
    info!("Gracefully shutdown");
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}

fn cors_layer(cors_origin: Option<&str>) -> Result<CorsLayer> {
    let cors = CorsLayer::new()
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS]);

    // Bearer tokens travel in a header, so no credentialed CORS is needed.
    Ok(match cors_origin {
        Some(origin) => cors.allow_origin(AllowOrigin::exact(origin_header(origin)?)),
        None => cors.allow_origin(AllowOrigin::any()),
    })
}

fn origin_header(origin: &str) -> Result<HeaderValue> {
    let parsed = Url::parse(origin).with_context(|| format!("Invalid CORS origin: {origin}"))?;
    let host = parsed
        .host_str()
        .ok_or_else(|| anyhow!("CORS origin must include a valid host: {origin}"))?;
    let port = parsed
        .port()
        .map_or_else(String::new, |port| format!(":{port}"));
    let origin = format!("{}://{}{}", parsed.scheme(), host, port);
    HeaderValue::from_str(&origin).context("Failed to build CORS origin header")
}
