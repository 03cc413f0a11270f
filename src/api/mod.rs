use crate::{
    api::handlers::{health, root},
    auth::{AuthConfig, Authenticator, rate_limit::RateLimiter},
    store::PgStore,
};
use anyhow::{Context, Result, anyhow};
use axum::{
    Extension,
    body::Body,
    extract::MatchedPath,
    http::{
        HeaderName, HeaderValue, Method, Request,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    routing::{get, options},
};
use sqlx::postgres::PgPoolOptions;
use std::{sync::Arc, time::Duration};
use tokio::{net::TcpListener, signal, sync::mpsc};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::PropagateRequestIdLayer,
    set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{Span, error, info, info_span};
use ulid::Ulid;
use url::Url;
use utoipa_axum::router::OpenApiRouter;
use utoipa_swagger_ui::SwaggerUi;

// Keep these internal to the crate while allowing CLI/server wiring to reference them.
pub(crate) mod error;
pub(crate) mod handlers;
pub(crate) mod maintenance;
pub(crate) mod state;
// OpenAPI router wiring and route registration live in openapi.rs.
mod openapi;

pub use openapi::openapi;

/// Build the API router with all documented routes registered.
#[must_use]
pub fn router() -> OpenApiRouter {
    openapi::api_router()
}

/// Start the server
/// # Errors
/// Return error if failed to start the server
pub async fn new(
    port: u16,
    dsn: String,
    origin: Option<String>,
    auth_config: AuthConfig,
    maintenance_config: maintenance::MaintenanceConfig,
    rate_limiter: Arc<dyn RateLimiter>,
) -> Result<()> {
    // Listen for SIGINT/SIGTERM, gracefully shutdown when one arrives
    let (tx, mut rx) = mpsc::unbounded_channel();

    spawn_shutdown_listener(tx);

    // Connect to database
    let pool = PgPoolOptions::new()
        .min_connections(1)
        .max_connections(5)
        .max_lifetime(Duration::from_secs(60 * 2))
        .test_before_acquire(true)
        .connect(&dsn)
        .await
        .context("Failed to connect to database")?;

    let store = Arc::new(PgStore::new(pool.clone()));
    let auth = Authenticator::new(store.clone(), store.clone(), store.clone(), &auth_config)?;
    let state = Arc::new(state::ApiState::new(Arc::new(auth), rate_limiter));

    // Background workers: drop expired sessions and log audit counts per action.
    maintenance::spawn_session_purge(store, maintenance_config);
    maintenance::spawn_security_stats(pool.clone(), maintenance_config);

    let cors = match origin.as_deref() {
        Some(origin) => {
            let origin = allowed_origin(origin)?;
            Some(
                CorsLayer::new()
                    .allow_headers([CONTENT_TYPE, AUTHORIZATION])
                    .allow_methods([Method::GET, Method::POST, Method::DELETE])
                    .allow_origin(AllowOrigin::exact(origin))
                    .allow_credentials(true),
            )
        }
        None => None,
    };

    // Build the router from OpenAPI-wired routes, then extend it with non-doc routes like `/` and
    // preflight-only `OPTIONS /health`. The spec stays in openapi.rs for the `openapi` binary.
    let (router, api) = router().split_for_parts();
    let app = router
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", api))
        .route("/", get(root::root))
        .route("/health", options(health::health))
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
                .layer(Extension(state))
                .layer(Extension(pool)),
        );

    // CORS is opt-in: without --origin the API only serves same-origin callers.
    let app = match cors {
        Some(cors) => app.layer(cors),
        None => app,
    };

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

fn spawn_shutdown_listener(tx: mpsc::UnboundedSender<()>) {
    tokio::spawn(async move {
        let ctrl_c = async {
            if let Err(err) = signal::ctrl_c().await {
                error!("Failed to install Ctrl+C handler: {err}");
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                Ok(mut stream) => {
                    stream.recv().await;
                }
                Err(err) => {
                    error!("Failed to install signal handler: {err}");
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {
                info!("Received Ctrl+C, shutting down");
            },
            _ = terminate => {
                info!("Received TERM signal, shutting down");
            },
        }

        let _ = tx.send(());
    });
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

fn allowed_origin(origin: &str) -> Result<HeaderValue> {
    let parsed =
        Url::parse(origin).with_context(|| format!("Invalid CORS origin: {origin}"))?;
    let host = parsed
        .host_str()
        .ok_or_else(|| anyhow!("CORS origin must include a valid host: {origin}"))?;
    let port = parsed
        .port()
        .map_or_else(String::new, |port| format!(":{port}"));
    let origin = format!("{}://{}{}", parsed.scheme(), host, port);
    HeaderValue::from_str(&origin).context("Failed to build CORS origin header")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allowed_origin_normalizes_url() {
        let origin = allowed_origin("http://localhost:5173/app").unwrap();
        assert_eq!(origin, HeaderValue::from_static("http://localhost:5173"));

        let origin = allowed_origin("https://console.example.com").unwrap();
        assert_eq!(
            origin,
            HeaderValue::from_static("https://console.example.com")
        );
    }

    #[test]
    fn allowed_origin_rejects_invalid_input() {
        assert!(allowed_origin("not a url").is_err());
        assert!(allowed_origin("data:text/plain,hello").is_err());
    }
}
