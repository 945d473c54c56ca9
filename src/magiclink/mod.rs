pub mod client;
pub mod events;
pub mod handlers;
pub mod openapi;
pub mod outcome;
pub mod page;

use crate::cli::globals::{GlobalArgs, DEFAULT_API_KEY};
use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::Extension,
    http::{HeaderName, HeaderValue, Request},
    routing::{get, post},
    Router,
};
use client::MideyeClient;
use events::EventLog;
use handlers::{admin, admin::ConfigView, login, AdminToken};
use secrecy::ExposeSecret;
use std::{net::SocketAddr, sync::Arc};
use tokio::{net::TcpListener, signal};
use tower::ServiceBuilder;
use tower_http::{
    request_id::PropagateRequestIdLayer, set_header::SetRequestHeaderLayer, trace::TraceLayer,
};
use tracing::{debug_span, error, info, Span};
use ulid::Ulid;

const REQUEST_ID: &str = "x-request-id";

/// Build the application router.
///
/// `GET /` (and any other non-POST method) renders the form, `POST /` runs an
/// authentication attempt. The admin API is only mounted when an admin token
/// is configured.
///
/// # Errors
/// Returns an error if the Mideye client cannot be built from `globals`.
pub fn router(globals: &GlobalArgs, events: Arc<EventLog>) -> Result<Router> {
    let client = MideyeClient::new(globals)?;

    let mut app = Router::new()
        .route("/", post(login::submit).fallback(login::show_form))
        .route(
            "/health",
            get(handlers::health).options(handlers::health),
        )
        .route("/api-docs/openapi.json", get(openapi::openapi_json));

    if let Some(token) = &globals.admin_token {
        let view = Arc::new(config_view(globals, &client, &events));

        let admin_api = Router::new()
            .route("/api/events", get(admin::events))
            .route("/api/export/events", get(admin::export_events))
            .route("/api/stats", get(admin::stats))
            .route("/api/stats/reset", post(admin::reset_stats))
            .route("/api/config", get(admin::config))
            .route("/api/top-phones", get(admin::top_phones))
            .layer(Extension(Arc::new(AdminToken(token.clone()))))
            .layer(Extension(view));

        app = app.merge(admin_api);
    } else {
        info!("admin API disabled, set MIDEYE_ADMIN_TOKEN to enable it");
    }

    Ok(app.layer(
        ServiceBuilder::new()
            .layer(SetRequestHeaderLayer::if_not_present(
                HeaderName::from_static(REQUEST_ID),
                |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
            ))
            .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                REQUEST_ID,
            )))
            .layer(TraceLayer::new_for_http().make_span_with(make_span))
            .layer(Extension(client))
            .layer(Extension(events)),
    ))
}

/// Bind `addr` and serve until Ctrl-C / SIGTERM.
///
/// # Errors
/// Returns an error if the listener cannot be bound or the server fails.
pub async fn new(addr: SocketAddr, globals: &GlobalArgs) -> Result<()> {
    let events = Arc::new(EventLog::new(
        globals.event_log_max_size,
        globals.event_ttl,
    ));

    let app = router(globals, events)?;

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    info!("Listening on {}", addr);
    info!(
        "API endpoint: {}",
        client::endpoint_url(&globals.mideye_url)
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    Ok(())
}

fn config_view(globals: &GlobalArgs, client: &MideyeClient, events: &EventLog) -> ConfigView {
    let api_key = globals.api_key.expose_secret();

    ConfigView {
        mideye_url: globals.mideye_url.to_string(),
        endpoint: client.endpoint().to_string(),
        api_key_configured: !api_key.is_empty() && api_key != DEFAULT_API_KEY,
        timeout_seconds: globals.timeout.as_secs(),
        connect_timeout_seconds: globals.connect_timeout.as_secs(),
        skip_tls_verify: globals.skip_tls_verify,
        event_log_max_size: events.max_size(),
        event_ttl_hours: events.ttl().as_secs() / 3600,
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!("Failed to install Ctrl-C handler: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                error!("Failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Gracefully shutdown");
}

// span
fn make_span(request: &Request<Body>) -> Span {
    let method = request.method();
    let path = request.uri().path();
    let request_id = request
        .headers()
        .get(REQUEST_ID)
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");

    debug_span!("http-request", %method, path, request_id)
}
