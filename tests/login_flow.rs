use anyhow::Result;
use axum::{
    body::{to_bytes, Body},
    http::{header::CONTENT_TYPE, HeaderMap, Request, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use magiclink::{
    cli::globals::GlobalArgs,
    magiclink::{events::EventLog, router},
};
use secrecy::SecretString;
use std::{
    net::SocketAddr,
    sync::{Arc, Mutex},
    time::Duration,
};
use tokio::net::TcpListener;
use tower::ServiceExt;
use url::Url;

const API_KEY: &str = "test-api-key";
const ADMIN_TOKEN: &str = "admin-token";

#[derive(Clone)]
enum Reply {
    Code(&'static str),
    Raw(&'static str),
    Status(StatusCode),
    Stall(Duration),
}

#[derive(Debug, Clone)]
struct Call {
    query: Option<String>,
    api_key: Option<String>,
}

#[derive(Clone, Default)]
struct Calls(Arc<Mutex<Vec<Call>>>);

impl Calls {
    fn all(&self) -> Vec<Call> {
        self.0.lock().unwrap().clone()
    }
}

/// Fake Mideye Server answering every `/api/sfwa/auth` call with `reply`.
async fn mideye(reply: Reply) -> Result<(Url, Calls)> {
    let calls = Calls::default();
    let seen = calls.clone();

    let app = Router::new().route(
        "/api/sfwa/auth",
        get(move |uri: Uri, headers: HeaderMap| {
            let reply = reply.clone();
            let seen = seen.clone();
            async move {
                seen.0.lock().unwrap().push(Call {
                    query: uri.query().map(str::to_string),
                    api_key: headers
                        .get("api-key")
                        .and_then(|v| v.to_str().ok())
                        .map(str::to_string),
                });

                match reply {
                    Reply::Code(code) => {
                        axum::Json(serde_json::json!({ "code": code })).into_response()
                    }
                    Reply::Raw(body) => body.into_response(),
                    Reply::Status(status) => (status, "unavailable").into_response(),
                    Reply::Stall(delay) => {
                        tokio::time::sleep(delay).await;
                        axum::Json(serde_json::json!({ "code": "TOUCH_ACCEPTED" }))
                            .into_response()
                    }
                }
            }
        }),
    );

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    Ok((Url::parse(&format!("http://{addr}"))?, calls))
}

fn globals(mideye_url: Url) -> GlobalArgs {
    let mut globals = GlobalArgs::new(mideye_url);
    globals.set_api_key(SecretString::from(API_KEY.to_string()));
    globals.timeout = Duration::from_secs(5);
    globals.admin_token = Some(SecretString::from(ADMIN_TOKEN.to_string()));
    globals
}

fn event_log() -> Arc<EventLog> {
    Arc::new(EventLog::new(100, Duration::from_secs(3600)))
}

fn login(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/")
        .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(app: Router, request: Request<Body>) -> Result<(StatusCode, String)> {
    let response: Response = app.oneshot(request).await?;
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await?;
    Ok((status, String::from_utf8(body.to_vec())?))
}

#[tokio::test]
async fn test_get_renders_form_without_calling_mideye() -> Result<()> {
    let (url, calls) = mideye(Reply::Code("TOUCH_ACCEPTED")).await?;
    let app = router(&globals(url), event_log())?;

    let request = Request::builder().uri("/").body(Body::empty())?;
    let (status, html) = send(app, request).await?;

    assert_eq!(status, StatusCode::OK);
    assert!(html.contains(r#"<input type="tel" id="phone" name="phone""#));
    assert!(calls.all().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_accepted() -> Result<()> {
    let (url, calls) = mideye(Reply::Code("TOUCH_ACCEPTED")).await?;
    let events = event_log();
    let app = router(&globals(url), events.clone())?;

    let (status, html) = send(app, login("phone=%2B46701234567")).await?;

    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("Authentication successful"));
    assert!(!html.contains("<form"));

    let calls = calls.all();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].query.as_deref(), Some("msisdn=%2B46701234567"));
    assert_eq!(calls[0].api_key.as_deref(), Some(API_KEY));

    assert_eq!(events.stats().success, 1);
    assert_eq!(events.recent(10)[0].phone, "***4567");
    Ok(())
}

#[tokio::test]
async fn test_rejected_shows_code_and_retry_form() -> Result<()> {
    let (url, calls) = mideye(Reply::Code("TOUCH_DENIED")).await?;
    let events = event_log();
    let app = router(&globals(url), events.clone())?;

    let (status, html) = send(app, login("phone=0701234567")).await?;

    assert_eq!(status, StatusCode::OK);
    assert!(html.contains(r#"<div class="result failure">&#x274C; TOUCH_DENIED</div>"#));
    assert!(html.contains(r#"<input type="hidden" name="phone" value="0701234567">"#));
    assert_eq!(calls.all().len(), 1);
    assert_eq!(events.stats().rejected, 1);
    Ok(())
}

#[tokio::test]
async fn test_phone_is_escaped_and_encoded() -> Result<()> {
    let (url, calls) = mideye(Reply::Code("TOUCH_REJECTED")).await?;
    let app = router(&globals(url), event_log())?;

    // phone = "<script>&"
    let (_, html) = send(app, login("phone=%3Cscript%3E%26")).await?;

    assert!(!html.contains("<script>"));
    assert!(html.contains(r#"value="&lt;script&gt;&amp;""#));
    assert_eq!(
        calls.all()[0].query.as_deref(),
        Some("msisdn=%3Cscript%3E%26")
    );
    Ok(())
}

#[tokio::test]
async fn test_unparseable_response() -> Result<()> {
    let (url, _calls) = mideye(Reply::Raw("<html>maintenance</html>")).await?;
    let events = event_log();
    let app = router(&globals(url), events.clone())?;

    let (status, html) = send(app, login("phone=0701234567")).await?;

    assert_eq!(status, StatusCode::OK);
    assert!(html.contains(r#"<div class="result failure">&#x274C; PARSE_ERROR</div>"#));
    assert_eq!(events.stats().parse_errors, 1);
    Ok(())
}

#[tokio::test]
async fn test_http_error_status() -> Result<()> {
    let (url, _calls) = mideye(Reply::Status(StatusCode::SERVICE_UNAVAILABLE)).await?;
    let events = event_log();
    let app = router(&globals(url), events.clone())?;

    let (_, html) = send(app, login("phone=0701234567")).await?;

    assert!(html.contains("&#x274C; ERROR: HTTP 503"));
    assert_eq!(events.stats().errors, 1);
    Ok(())
}

#[tokio::test]
async fn test_timeout() -> Result<()> {
    let (url, _calls) = mideye(Reply::Stall(Duration::from_secs(10))).await?;
    let mut globals = globals(url);
    globals.timeout = Duration::from_secs(1);
    let events = event_log();
    let app = router(&globals, events.clone())?;

    let (status, html) = send(app, login("phone=0701234567")).await?;

    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("&#x274C; ERROR: "));
    assert!(html.contains(r#"<input type="hidden" name="phone" value="0701234567">"#));
    assert_eq!(events.stats().timeout, 1);
    Ok(())
}

#[tokio::test]
async fn test_connection_refused() -> Result<()> {
    let addr: SocketAddr = {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        listener.local_addr()?
    };
    let events = event_log();
    let app = router(
        &globals(Url::parse(&format!("http://{addr}"))?),
        events.clone(),
    )?;

    let (status, html) = send(app, login("phone=0701234567")).await?;

    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("&#x274C; ERROR: "));
    assert_eq!(events.stats().errors, 1);
    assert!(events.recent(1)[0].error.is_some());
    Ok(())
}

#[tokio::test]
async fn test_missing_phone_is_bad_request() -> Result<()> {
    let (url, calls) = mideye(Reply::Code("TOUCH_ACCEPTED")).await?;
    let app = router(&globals(url), event_log())?;

    let (status, html) = send(app, login("name=alice")).await?;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(html.contains(r#"name="phone""#));
    assert!(calls.all().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_admin_api() -> Result<()> {
    let (url, _calls) = mideye(Reply::Code("TOUCH_ACCEPTED")).await?;
    let events = event_log();
    let app = router(&globals(url), events)?;

    send(app.clone(), login("phone=0701234567")).await?;
    send(app.clone(), login("phone=0709999999")).await?;
    send(app.clone(), login("phone=0701234567")).await?;

    let request = Request::builder().uri("/api/stats").body(Body::empty())?;
    let (status, _) = send(app.clone(), request).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let request = Request::builder()
        .uri("/api/stats")
        .header("authorization", "Bearer wrong")
        .body(Body::empty())?;
    let (status, _) = send(app.clone(), request).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let request = Request::builder()
        .uri("/api/stats")
        .header("authorization", format!("Bearer {ADMIN_TOKEN}"))
        .body(Body::empty())?;
    let (status, body) = send(app.clone(), request).await?;
    assert_eq!(status, StatusCode::OK);
    let stats: serde_json::Value = serde_json::from_str(&body)?;
    assert_eq!(stats["total_attempts"], 3);
    assert_eq!(stats["success"], 3);

    let request = Request::builder()
        .uri("/api/events?limit=2")
        .header("authorization", format!("Bearer {ADMIN_TOKEN}"))
        .body(Body::empty())?;
    let (_, body) = send(app.clone(), request).await?;
    let recent: serde_json::Value = serde_json::from_str(&body)?;
    assert_eq!(recent.as_array().map(Vec::len), Some(2));
    assert_eq!(recent[0]["phone"], "***4567");
    assert_eq!(recent[0]["outcome"], "success");
    assert!(!body.contains("0701234567"));

    let request = Request::builder()
        .uri("/api/top-phones")
        .header("authorization", format!("Bearer {ADMIN_TOKEN}"))
        .body(Body::empty())?;
    let (_, body) = send(app.clone(), request).await?;
    let top: serde_json::Value = serde_json::from_str(&body)?;
    assert_eq!(top[0]["phone"], "***4567");
    assert_eq!(top[0]["attempts"], 2);

    let request = Request::builder()
        .uri("/api/config")
        .header("authorization", format!("Bearer {ADMIN_TOKEN}"))
        .body(Body::empty())?;
    let (_, body) = send(app.clone(), request).await?;
    assert!(!body.contains(API_KEY));
    assert!(!body.contains(ADMIN_TOKEN));
    let config: serde_json::Value = serde_json::from_str(&body)?;
    assert_eq!(config["api_key_configured"], true);

    let request = Request::builder()
        .method("POST")
        .uri("/api/stats/reset")
        .header("authorization", format!("Bearer {ADMIN_TOKEN}"))
        .body(Body::empty())?;
    let (status, _) = send(app.clone(), request).await?;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let request = Request::builder()
        .uri("/api/stats")
        .header("authorization", format!("Bearer {ADMIN_TOKEN}"))
        .body(Body::empty())?;
    let (_, body) = send(app, request).await?;
    let stats: serde_json::Value = serde_json::from_str(&body)?;
    assert_eq!(stats["total_attempts"], 0);
    Ok(())
}

fn admin_get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("authorization", format!("Bearer {ADMIN_TOKEN}"))
        .body(Body::empty())
        .unwrap()
}

async fn json_len(app: Router, uri: &str) -> Result<usize> {
    let (status, body) = send(app, admin_get(uri)).await?;
    assert_eq!(status, StatusCode::OK, "{uri}");
    let value: serde_json::Value = serde_json::from_str(&body)?;
    Ok(value.as_array().map_or(0, Vec::len))
}

#[tokio::test]
async fn test_admin_limits_fall_back_to_defaults() -> Result<()> {
    let (url, _calls) = mideye(Reply::Code("TOUCH_ACCEPTED")).await?;
    let app = router(&globals(url), event_log())?;

    for phone in ["0701111111", "0702222222", "0703333333"] {
        send(app.clone(), login(&format!("phone={phone}"))).await?;
    }

    assert_eq!(json_len(app.clone(), "/api/events?limit=1").await?, 1);
    assert_eq!(json_len(app.clone(), "/api/events?limit=0").await?, 3);
    assert_eq!(json_len(app.clone(), "/api/events?limit=100000").await?, 3);

    assert_eq!(json_len(app.clone(), "/api/top-phones?limit=2").await?, 2);
    assert_eq!(json_len(app.clone(), "/api/top-phones?limit=0").await?, 3);
    assert_eq!(json_len(app, "/api/top-phones?limit=101").await?, 3);
    Ok(())
}

#[tokio::test]
async fn test_export_events_csv() -> Result<()> {
    let (url, _calls) = mideye(Reply::Code("TOUCH_DENIED")).await?;
    let app = router(&globals(url), event_log())?;

    send(app.clone(), login("phone=0701234567")).await?;

    let request = Request::builder()
        .uri("/api/export/events")
        .body(Body::empty())?;
    let (status, _) = send(app.clone(), request).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let response = app.oneshot(admin_get("/api/export/events?limit=0")).await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[CONTENT_TYPE],
        "text/csv; charset=utf-8"
    );
    assert_eq!(
        response.headers()["content-disposition"],
        r#"attachment; filename="magic-link-events.csv""#
    );

    let body = to_bytes(response.into_body(), usize::MAX).await?;
    let csv = String::from_utf8(body.to_vec())?;
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("ID,Timestamp (ms),Phone Number,Outcome"));
    assert!(lines[1].contains(",***4567,rejected,TOUCH_DENIED,"));
    assert!(!csv.contains("0701234567"));
    Ok(())
}

#[tokio::test]
async fn test_stats_report_event_log_state() -> Result<()> {
    let (url, _calls) = mideye(Reply::Code("TOUCH_ACCEPTED")).await?;
    let app = router(&globals(url), event_log())?;

    send(app.clone(), login("phone=0701234567")).await?;

    let (_, body) = send(app, admin_get("/api/stats")).await?;
    let stats: serde_json::Value = serde_json::from_str(&body)?;
    assert_eq!(stats["event_log_size"], 1);
    assert_eq!(stats["event_log_max_size"], 100);
    assert_eq!(stats["event_ttl_hours"], 1);
    Ok(())
}
