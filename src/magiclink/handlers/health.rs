use crate::GIT_COMMIT_HASH;
use axum::{
    http::{HeaderMap, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use tracing::debug;
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Health {
    commit: String,
    name: String,
    version: String,
}

impl Health {
    fn current() -> Self {
        Self {
            commit: GIT_COMMIT_HASH.to_string(),
            name: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// `name:version:shortcommit`, the commit part is empty for builds outside git.
    fn x_app(&self) -> Option<HeaderValue> {
        let short = self.commit.get(..7).unwrap_or_default();
        HeaderValue::from_str(&format!("{}:{}:{}", self.name, self.version, short))
            .map_err(|err| debug!("Failed to build X-App header: {}", err))
            .ok()
    }
}

#[utoipa::path(
    get,
    path= "/health",
    responses (
        (status = 200, description = "Service is up", body = Health)
    ),
    tag = "health",
)]
// axum handler for health, OPTIONS gets the headers only
pub async fn health(method: Method) -> Response {
    let health = Health::current();

    let mut headers = HeaderMap::new();
    if let Some(value) = health.x_app() {
        headers.insert("X-App", value);
    }

    if method == Method::GET {
        (headers, Json(health)).into_response()
    } else {
        (StatusCode::OK, headers).into_response()
    }
}
