use crate::magiclink::{
    client::MideyeClient,
    events::{mask_phone, AuthEvent, EventKind, EventLog},
    handlers::client_ip,
    outcome::AuthOutcome,
    page,
};
use axum::{
    extract::{ConnectInfo, Extension, Form},
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse},
};
use serde::Deserialize;
use std::{net::SocketAddr, sync::Arc, time::Instant};
use tracing::{error, info, instrument, warn};

#[derive(Deserialize, Debug)]
pub struct LoginForm {
    phone: String,
}

// axum handler for every non-POST request on `/`
pub async fn show_form() -> impl IntoResponse {
    Html(page::render(None, ""))
}

// axum handler for POST /
#[instrument(skip_all)]
pub async fn submit(
    client: Extension<MideyeClient>,
    events: Extension<Arc<EventLog>>,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    payload: Option<Form<LoginForm>>,
) -> impl IntoResponse {
    let Some(Form(form)) = payload else {
        warn!("login form submitted without a phone field");
        return (StatusCode::BAD_REQUEST, Html(page::render(None, "")));
    };

    let masked = mask_phone(&form.phone);
    info!("initiating authentication for phone {}", masked);

    let started = Instant::now();
    let result = client.authenticate(&form.phone).await;
    let elapsed = started.elapsed();

    let timed_out = matches!(&result, Err(err) if err.is_timeout());
    let detail = result.as_ref().err().map(ToString::to_string);
    let outcome = AuthOutcome::from(result);

    match &outcome {
        AuthOutcome::Accepted => {
            info!("authentication ACCEPTED for phone {} ({} ms)", masked, elapsed.as_millis());
        }
        AuthOutcome::Rejected(code) => {
            warn!(
                "authentication REJECTED for phone {} (code: {}, {} ms)",
                masked,
                code,
                elapsed.as_millis()
            );
        }
        AuthOutcome::TransportError(_) | AuthOutcome::ParseError => {
            error!(
                "error calling magic link API for phone {} ({} ms): {}",
                masked,
                elapsed.as_millis(),
                detail.as_deref().unwrap_or("empty response code")
            );
        }
    }

    let kind = EventKind::classify(&outcome, timed_out);
    events.record(AuthEvent::new(
        &form.phone,
        &outcome,
        kind,
        client_ip(&headers, peer.map(|ConnectInfo(addr)| addr)),
        elapsed,
        detail,
    ));

    (StatusCode::OK, Html(page::render(Some(&outcome), &form.phone)))
}
