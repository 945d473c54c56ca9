use crate::magiclink::{
    events::{AuthEvent, EventKind, Stats},
    handlers::{
        admin::{self, ConfigView, PhoneCount},
        health::{self, Health},
    },
};
use axum::response::Json;
use utoipa::OpenApi;

/// JSON surface of the service. The login page itself is HTML and not listed.
#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        admin::events,
        admin::export_events,
        admin::stats,
        admin::reset_stats,
        admin::config,
        admin::top_phones,
    ),
    components(schemas(Health, AuthEvent, EventKind, Stats, ConfigView, PhoneCount)),
    tags(
        (name = "health", description = "Liveness and build information"),
        (name = "admin", description = "Event log and statistics, bearer token required"),
    )
)]
pub struct ApiDoc;

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

// axum handler for /api-docs/openapi.json
pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(openapi())
}
