use std::sync::Arc;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use rocket::data::{Data, ToByteUnit};
use rocket::http::{ContentType, Status};
use rocket::serde::json::Json;
use rocket::{get, post, routes, Build, Rocket, State};
use serde::Serialize;

use common::ServerConfig;

use crate::intake::{InvocationResponse, ReviewIntake};

/// Request body cap for the review routes when `[server] body_limit_bytes` is unset.
pub const DEFAULT_BODY_LIMIT: u64 = 1024 * 1024;

/// Application state stored inside Rocket managed state.
#[derive(Clone)]
pub struct AppState {
    pub started_at: DateTime<Utc>,
    pub intake: Arc<ReviewIntake>,
    pub store_table: String,
    pub scorer: &'static str,
    pub body_limit: u64,
}

impl AppState {
    pub fn new(intake: Arc<ReviewIntake>, store_table: impl Into<String>, scorer: &'static str) -> Self {
        Self {
            started_at: Utc::now(),
            intake,
            store_table: store_table.into(),
            scorer,
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }

    pub fn with_body_limit(mut self, bytes: u64) -> Self {
        self.body_limit = bytes;
        self
    }
}

/// Response structure for `/api/v1/status`.
#[derive(Serialize)]
struct StatusResponse {
    status: &'static str,
    uptime_seconds: i64,
    store_table: String,
    scorer: &'static str,
    notifications_enabled: bool,
}

#[get("/health")]
async fn health() -> &'static str {
    "OK"
}

/// Status endpoint returning uptime and how the intake is wired.
#[get("/api/v1/status")]
async fn status(state: &State<AppState>) -> Json<StatusResponse> {
    let uptime = (Utc::now() - state.started_at).num_seconds();
    Json(StatusResponse {
        status: "ok",
        uptime_seconds: uptime,
        store_table: state.store_table.clone(),
        scorer: state.scorer,
        notifications_enabled: state.intake.notifications_enabled(),
    })
}

/// Read the whole body as UTF-8 text. Bodies over the limit, truncated reads and
/// invalid UTF-8 come back as `None` after being logged as malformed input.
async fn read_body(data: Data<'_>, limit: u64) -> Option<String> {
    match data.open(limit.bytes()).into_string().await {
        Ok(body) if body.is_complete() => Some(body.into_inner()),
        Ok(body) => {
            tracing::error!(
                kind = "MalformedInput",
                limit,
                read = body.len(),
                "request body exceeds the configured limit"
            );
            None
        }
        Err(e) => {
            tracing::error!(kind = "MalformedInput", error = %e, "request body is not readable UTF-8");
            None
        }
    }
}

/// Gateway-style invocation: the request body is the event, the response is the
/// proxy envelope (logical status inside `statusCode`).
#[post("/invoke", data = "<data>")]
async fn invoke(state: &State<AppState>, data: Data<'_>) -> Json<InvocationResponse> {
    let response = match read_body(data, state.body_limit).await {
        Some(raw) => state.intake.handle_raw_event(&raw).await,
        None => InvocationResponse::failure(),
    };
    Json(response)
}

/// Plain HTTP submission: the body is the review, the envelope is unwrapped onto the HTTP response.
#[post("/api/v1/reviews", data = "<data>")]
async fn submit_review(state: &State<AppState>, data: Data<'_>) -> (Status, (ContentType, String)) {
    let response = match read_body(data, state.body_limit).await {
        Some(body) => state.intake.handle_body(&body).await,
        None => InvocationResponse::failure(),
    };
    let status = Status::from_code(response.status_code).unwrap_or(Status::InternalServerError);
    (status, (ContentType::JSON, response.body))
}

/// Build the Rocket instance with managed state, applying `[server]` bind/port when present.
pub fn build_rocket(state: AppState, server: Option<&ServerConfig>) -> Rocket<Build> {
    let mut fig = rocket::Config::figment();
    if let Some(server) = server {
        if let Some(bind) = &server.bind {
            fig = fig.merge(("address", bind.clone()));
        }
        if let Some(port) = server.port {
            fig = fig.merge(("port", port));
        }
    }

    rocket::custom(fig)
        .manage(state)
        .mount("/", routes![health, status, invoke, submit_review])
}

pub async fn launch_rocket(state: AppState, server: Option<&ServerConfig>) -> Result<()> {
    tracing::info!("Starting Rocket HTTP server");
    build_rocket(state, server)
        .launch()
        .await
        .map_err(|e| anyhow!("Rocket failed: {}", e))?;

    tracing::info!("Rocket HTTP server has shut down");
    Ok(())
}
