//! Read-only view of the event log, a CSV export and a counter reset.
//!
//! Every handler here requires `Authorization: Bearer <admin token>`; the
//! routes are not mounted at all when no admin token is configured.

use crate::magiclink::{
    events::{AuthEvent, EventLog, Stats},
    handlers::require_admin,
};
use axum::{
    extract::{Extension, Query},
    http::{
        header::{CONTENT_DISPOSITION, CONTENT_TYPE},
        HeaderMap, StatusCode,
    },
    response::{IntoResponse, Json, Response},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use utoipa::{IntoParams, ToSchema};

pub const DEFAULT_LIMIT: usize = 500;
pub const DEFAULT_TOP_LIMIT: usize = 20;
pub const MAX_TOP_LIMIT: usize = 100;
pub const MAX_EXPORT_LIMIT: usize = 5000;

const CSV_HEADER: &str =
    "ID,Timestamp (ms),Phone Number,Outcome,Response Code,IP Address,Duration (ms),Error\n";

/// A limit of zero or above `max` falls back to `default`.
fn resolve_limit(limit: Option<usize>, max: usize, default: usize) -> usize {
    limit
        .filter(|limit| (1..=max).contains(limit))
        .unwrap_or(default)
}

fn escape_csv(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// One line per event, newest first, with a header row.
#[must_use]
pub fn events_csv(events: &[AuthEvent]) -> String {
    let mut csv = String::from(CSV_HEADER);
    for event in events {
        let row = [
            event.id.clone(),
            event.timestamp_ms.to_string(),
            escape_csv(&event.phone),
            event.outcome.as_str().to_string(),
            escape_csv(event.response_code.as_deref().unwrap_or_default()),
            escape_csv(event.client_ip.as_deref().unwrap_or_default()),
            event.duration_ms.to_string(),
            escape_csv(event.error.as_deref().unwrap_or_default()),
        ];
        csv.push_str(&row.join(","));
        csv.push('\n');
    }
    csv
}

#[derive(Clone, Debug)]
pub struct AdminToken(pub SecretString);

#[derive(Deserialize, Debug, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LimitQuery {
    /// Maximum number of entries to return.
    limit: Option<usize>,
}

/// Non-secret view of the running configuration.
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ConfigView {
    pub mideye_url: String,
    pub endpoint: String,
    pub api_key_configured: bool,
    pub timeout_seconds: u64,
    pub connect_timeout_seconds: u64,
    pub skip_tls_verify: bool,
    pub event_log_max_size: usize,
    pub event_ttl_hours: u64,
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PhoneCount {
    pub phone: String,
    pub attempts: u64,
}

#[utoipa::path(
    get,
    path = "/api/events",
    params(LimitQuery),
    responses(
        (status = 200, description = "Recent authentication events, newest first", body = [AuthEvent]),
        (status = 401, description = "Missing or invalid admin token"),
    ),
    tag = "admin"
)]
pub async fn events(
    headers: HeaderMap,
    admin: Extension<Arc<AdminToken>>,
    log: Extension<Arc<EventLog>>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<AuthEvent>>, StatusCode> {
    require_admin(&headers, &admin)?;

    let max = log.max_size();
    let limit = resolve_limit(query.limit, max, DEFAULT_LIMIT.min(max));

    Ok(Json(log.recent(limit)))
}

#[utoipa::path(
    get,
    path = "/api/export/events",
    params(LimitQuery),
    responses(
        (status = 200, description = "Recent authentication events as CSV", body = String, content_type = "text/csv"),
        (status = 401, description = "Missing or invalid admin token"),
    ),
    tag = "admin"
)]
pub async fn export_events(
    headers: HeaderMap,
    admin: Extension<Arc<AdminToken>>,
    log: Extension<Arc<EventLog>>,
    Query(query): Query<LimitQuery>,
) -> Result<Response, StatusCode> {
    require_admin(&headers, &admin)?;

    let limit = resolve_limit(query.limit, MAX_EXPORT_LIMIT, MAX_EXPORT_LIMIT);
    let events = log.recent(limit);

    info!("exporting {} events as CSV", events.len());

    Ok((
        [
            (CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                CONTENT_DISPOSITION,
                r#"attachment; filename="magic-link-events.csv""#,
            ),
        ],
        events_csv(&events),
    )
        .into_response())
}

#[utoipa::path(
    get,
    path = "/api/stats",
    responses(
        (status = 200, description = "Attempt counters by outcome", body = Stats),
        (status = 401, description = "Missing or invalid admin token"),
    ),
    tag = "admin"
)]
pub async fn stats(
    headers: HeaderMap,
    admin: Extension<Arc<AdminToken>>,
    log: Extension<Arc<EventLog>>,
) -> Result<Json<Stats>, StatusCode> {
    require_admin(&headers, &admin)?;

    Ok(Json(log.stats()))
}

#[utoipa::path(
    post,
    path = "/api/stats/reset",
    responses(
        (status = 204, description = "Counters reset"),
        (status = 401, description = "Missing or invalid admin token"),
    ),
    tag = "admin"
)]
pub async fn reset_stats(
    headers: HeaderMap,
    admin: Extension<Arc<AdminToken>>,
    log: Extension<Arc<EventLog>>,
) -> Result<StatusCode, StatusCode> {
    require_admin(&headers, &admin)?;

    info!("statistics reset requested through the admin API");
    log.reset_stats();

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/config",
    responses(
        (status = 200, description = "Running configuration without secrets", body = ConfigView),
        (status = 401, description = "Missing or invalid admin token"),
    ),
    tag = "admin"
)]
pub async fn config(
    headers: HeaderMap,
    admin: Extension<Arc<AdminToken>>,
    view: Extension<Arc<ConfigView>>,
) -> Result<Json<ConfigView>, StatusCode> {
    require_admin(&headers, &admin)?;

    Ok(Json(ConfigView::clone(&view)))
}

#[utoipa::path(
    get,
    path = "/api/top-phones",
    params(LimitQuery),
    responses(
        (status = 200, description = "Masked phone numbers with the most attempts", body = [PhoneCount]),
        (status = 401, description = "Missing or invalid admin token"),
    ),
    tag = "admin"
)]
pub async fn top_phones(
    headers: HeaderMap,
    admin: Extension<Arc<AdminToken>>,
    log: Extension<Arc<EventLog>>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<PhoneCount>>, StatusCode> {
    require_admin(&headers, &admin)?;

    let top = log
        .top_phones(resolve_limit(query.limit, MAX_TOP_LIMIT, DEFAULT_TOP_LIMIT))
        .into_iter()
        .map(|(phone, attempts)| PhoneCount { phone, attempts })
        .collect();

    Ok(Json(top))
}
