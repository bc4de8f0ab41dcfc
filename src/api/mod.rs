use crate::{
    gate::{
        middleware::{issue_csrf, require_admin, require_identity, resolve_identity, verify_csrf},
        AdminGate, CsrfConfig, GateConfig, IdentityResolver, DIAGNOSTIC_PATH,
    },
    services::{postgres::PgStore, ForumStore, ProfileStore},
};
use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::MatchedPath,
    http::{HeaderName, HeaderValue, Request},
    middleware,
    routing::{get, post},
    Extension, Router,
};
use handlers::{admin, csrf, forum_api, health, pages};
use secrecy::{ExposeSecret, SecretString};
use sqlx::postgres::PgPoolOptions;
use std::{sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::PropagateRequestIdLayer, set_header::SetRequestHeaderLayer, trace::TraceLayer,
};
use tracing::{info, info_span, Span};
use ulid::Ulid;
use utoipa_swagger_ui::SwaggerUi;

pub mod handlers;
mod openapi;

pub use openapi::openapi;


/// Shared, immutable per-process state handed to the router.
#[derive(Clone)]
pub struct AppState {
    pub gate: Arc<AdminGate>,
    pub csrf: Arc<CsrfConfig>,
    pub identity: Arc<dyn IdentityResolver>,
    pub forum: Arc<dyn ForumStore>,
    pub profiles: Arc<dyn ProfileStore>,
}

/// Build the application router.
///
/// Gated routes run through identity resolution and CSRF issuance; admin
/// routes add the admin gate, authenticated API routes add the identity
/// check. `/health` and the API docs sit outside the gate.
pub fn router(state: AppState) -> Router {
    let admin_routes = Router::new()
        .route("/admin", get(admin::dashboard))
        .route("/admin/users", get(admin::users))
        .route("/admin/forums", get(admin::forums))
        .route("/admin/forums/topic/:id/pin", post(admin::pin_topic))
        .route(DIAGNOSTIC_PATH, get(admin::debug))
        .route_layer(middleware::from_fn_with_state(
            state.gate.clone(),
            require_admin,
        ));

    let authenticated_api = Router::new()
        .route("/api/me", get(forum_api::me))
        .route("/api/forum/topics", post(forum_api::create_topic))
        .route_layer(middleware::from_fn(require_identity));

    let gated = Router::new()
        .route("/", get(pages::home))
        .route("/forums", get(pages::forums))
        .route("/forums/tag/:tag", get(pages::forums_by_tag))
        .route("/forums/category/:id", get(pages::forums_by_category))
        .route("/forums/topic/:id", get(pages::topic))
        .route("/profile", get(pages::profile))
        .route("/api/csrf/init", get(csrf::init))
        .route("/api/csrf/refresh", get(csrf::refresh))
        .merge(admin_routes)
        .merge(authenticated_api)
        .layer(middleware::from_fn(verify_csrf))
        .layer(middleware::from_fn_with_state(state.csrf.clone(), issue_csrf))
        .layer(middleware::from_fn_with_state(
            state.identity.clone(),
            resolve_identity,
        ));

    gated
        .route("/health", get(health::health))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi()))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(Extension(state.gate))
                .layer(Extension(state.csrf))
                .layer(Extension(state.forum))
                .layer(Extension(state.profiles)),
        )
}

/// Start the server
/// # Errors
/// Return error if failed to start the server
pub async fn new(port: u16, dsn: &SecretString, config: &GateConfig) -> Result<()> {
    // Connect to database
    let pool = PgPoolOptions::new()
        .min_connections(1)
        .max_connections(5)
        .max_lifetime(Duration::from_secs(60 * 2))
        .test_before_acquire(true)
        .connect(dsn.expose_secret())
        .await
        .context("Failed to connect to database")?;

    let store = Arc::new(PgStore::new(pool.clone()));
    let state = AppState {
        gate: Arc::new(config.admin_gate()),
        csrf: Arc::new(config.csrf_config()?),
        identity: store.clone(),
        forum: store.clone(),
        profiles: store,
    };

    info!(
        admin_entries = state.gate.allow_list().len(),
        secure_cookie = state.csrf.secure(),
        "Gate configured"
    );

    let app = router(state).layer(Extension(pool));

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {err}");
            }
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
