use crate::{
    auth::{AuthService, IdentityStore, PgIdentityStore},
    cli::globals::GlobalArgs,
    session::{PgSessionStore, SessionConfig, Sessions},
    vault::{self, kv::AppSecrets},
};
use anyhow::{Context, Result};
use axum::{
    Extension,
    body::Body,
    extract::MatchedPath,
    http::{HeaderName, HeaderValue, Request},
    routing::get,
};
use secrecy::ExposeSecret;
use sqlx::postgres::PgPoolOptions;
use std::{sync::Arc, time::Duration};
use tokio::{net::TcpListener, sync::mpsc};
use tower::ServiceBuilder;
use tower_http::{
    request_id::PropagateRequestIdLayer, set_header::SetRequestHeaderLayer, trace::TraceLayer,
};
use tracing::{Span, info, info_span};
use ulid::Ulid;
use utoipa_axum::router::OpenApiRouter;

pub(crate) mod handlers;
// OpenAPI router wiring and route registration live in openapi.rs.
mod openapi;

pub use openapi::openapi;

/// Build the API router with all documented routes registered.
#[must_use]
pub fn router() -> OpenApiRouter {
    openapi::api_router()
}

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub static APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

/// Start the server
/// # Errors
/// Return error if failed to start the server
pub async fn new(
    port: u16,
    secrets: AppSecrets,
    globals: &GlobalArgs,
    lease_duration: u64,
    config: SessionConfig,
) -> Result<()> {
    // Renew vault token in the background, gracefully shutdown if it fails
    let (tx, mut rx) = mpsc::unbounded_channel();

    vault::renew::try_renew(globals, lease_duration, tx).await?;

    // Connect to the identity database
    let users_pool = PgPoolOptions::new()
        .min_connections(1)
        .max_connections(5)
        .max_lifetime(Duration::from_secs(60 * 2))
        .test_before_acquire(true)
        .connect(secrets.database_url.expose_secret())
        .await
        .context("Failed to connect to database")?;

    // The session store is shared across all instances and may live on
    // a different server than the identity database
    let sessions_pool = PgPoolOptions::new()
        .min_connections(1)
        .max_connections(5)
        .max_lifetime(Duration::from_secs(60 * 2))
        .test_before_acquire(true)
        .connect(secrets.session_store_url.expose_secret())
        .await
        .context("Failed to connect to session store")?;

    let identities: Arc<dyn IdentityStore> = Arc::new(PgIdentityStore::new(users_pool));
    let sessions = Arc::new(Sessions::new(
        Arc::new(PgSessionStore::new(sessions_pool)),
        identities.clone(),
        secrets.secret_key,
        config,
    ));
    let auth = Arc::new(AuthService::new(identities));

    // Build the router from OpenAPI-wired routes, then extend it with
    // the undocumented index route.
    let (router, _openapi) = router().split_for_parts();
    let app = router.route("/", get(handlers::root)).layer(
        ServiceBuilder::new()
            .layer(SetRequestHeaderLayer::if_not_present(
                HeaderName::from_static("x-request-id"),
                |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
            ))
            .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                "x-request-id",
            )))
            .layer(TraceLayer::new_for_http().make_span_with(make_span))
            .layer(Extension(auth))
            .layer(Extension(sessions)),
    );

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async move {
            rx.recv().await;
            info!("Gracefully shutdown");
        })
        .await?;

    Ok(())
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
