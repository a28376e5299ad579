//! HTTP surface: the Telegram webhook plus the small public read API.
//!
//! The webhook acknowledges immediately and dispatches in a background task
//! so the chat provider never retries a slow handler. Public endpoints only
//! ever project public tracks and are served with `no-store` caching.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpListener;
use tracing::warn;

use greenroom_console::{ConsoleConfig, ConsoleDispatcher};
use greenroom_core::{current_unix_timestamp_ms, fnv1a_32_hex};
use greenroom_store::{
    AccessWindow, FsBlobStore, FsKeyValueStore, KeyValueStore, MetricsLedger, TrackCatalog,
    TrackRecord, TrackStatus,
};
use greenroom_telegram::{InboundUpdate, TelegramApiClient};

use crate::cli_args::Cli;

const WEBHOOK_SECRET_HEADER: &str = "x-telegram-bot-api-secret-token";
const RECENT_TRACKS_DEFAULT: usize = 10;
const RECENT_TRACKS_MAX: usize = 50;

pub struct AppState {
    dispatcher: Arc<ConsoleDispatcher>,
    kv: Arc<dyn KeyValueStore>,
    catalog: TrackCatalog,
    metrics: MetricsLedger,
    webhook_secret: Option<String>,
}

/// Wires up stores and the console engine from CLI configuration.
pub fn build_state(cli: &Cli) -> Result<Arc<AppState>> {
    let kv: Arc<dyn KeyValueStore> = Arc::new(
        FsKeyValueStore::open(cli.state_dir.join("kv")).context("failed to open state store")?,
    );
    let media_dir = cli
        .media_dir
        .clone()
        .unwrap_or_else(|| cli.state_dir.join("media"));
    let blob = Arc::new(
        FsBlobStore::open(media_dir, cli.media_public_base.clone())
            .context("failed to open media store")?,
    );
    let telegram = TelegramApiClient::new(
        &cli.telegram_api_base,
        &cli.bot_token,
        cli.telegram_timeout_ms,
    )
    .context("failed to construct telegram client")?;
    let dispatcher = Arc::new(ConsoleDispatcher::new(
        telegram,
        kv.clone(),
        blob,
        ConsoleConfig {
            admin_user_id: cli.admin_user_id,
            webapp_url: cli.webapp_url.clone(),
            media_public_base_display: cli
                .media_public_base
                .clone()
                .unwrap_or_else(|| "(local media dir)".to_string()),
        },
    ));
    Ok(Arc::new(AppState {
        dispatcher,
        catalog: TrackCatalog::new(kv.clone()),
        metrics: MetricsLedger::new(kv.clone()),
        kv,
        webhook_secret: cli
            .webhook_secret
            .clone()
            .map(|secret| secret.trim().to_string())
            .filter(|secret| !secret.is_empty()),
    }))
}

/// Run the HTTP server until ctrl-c.
pub async fn run_server(cli: Cli) -> Result<()> {
    let bind_addr: SocketAddr = cli
        .bind
        .parse()
        .with_context(|| format!("invalid --bind '{}': expected host:port", cli.bind))?;
    let state = build_state(&cli)?;

    let listener = TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind on {bind_addr}"))?;
    let local_addr = listener
        .local_addr()
        .context("failed to resolve listen address")?;
    println!(
        "greenroom server listening: addr={} state_dir={} admin={}",
        local_addr,
        cli.state_dir.display(),
        cli.admin_user_id
    );

    let app = build_router(state);
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .context("server exited unexpectedly")?;
    Ok(())
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(handle_health))
        .route("/webhooks/telegram", post(handle_telegram_webhook))
        .route("/status", get(handle_status))
        .route("/hit", post(handle_hit))
        .route("/tracks/current", get(handle_current_track))
        .route("/tracks/recent", get(handle_recent_tracks))
        .with_state(state)
}

fn error_response(status: StatusCode, code: &str, message: &str) -> Response {
    (
        status,
        Json(json!({
            "error": {
                "code": code,
                "message": message,
            }
        })),
    )
        .into_response()
}

fn json_no_store(payload: serde_json::Value) -> Response {
    (
        StatusCode::OK,
        [(header::CACHE_CONTROL, "no-store")],
        Json(payload),
    )
        .into_response()
}

async fn handle_health() -> Response {
    (StatusCode::OK, Json(json!({"status": "ready"}))).into_response()
}

async fn handle_telegram_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if let Some(expected) = &state.webhook_secret {
        let provided = headers
            .get(WEBHOOK_SECRET_HEADER)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("");
        if provided != expected {
            return error_response(
                StatusCode::UNAUTHORIZED,
                "webhook_secret_mismatch",
                "missing or wrong webhook secret token",
            );
        }
    }

    let update: InboundUpdate = match serde_json::from_slice(&body) {
        Ok(update) => update,
        Err(error) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                "webhook_invalid_payload",
                &error.to_string(),
            );
        }
    };

    // ack first; the chat provider retries slow or failed webhooks
    let dispatcher = state.dispatcher.clone();
    tokio::spawn(async move {
        if let Err(error) = dispatcher.handle_update(&update).await {
            warn!(%error, update_id = update.update_id, "webhook dispatch failed");
        }
    });
    (StatusCode::OK, Json(json!({"ok": true}))).into_response()
}

async fn handle_status(State(state): State<Arc<AppState>>) -> Response {
    let window = match AccessWindow::load(state.kv.as_ref()) {
        Ok(window) => window,
        Err(error) => {
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "state_read_failed",
                &error.to_string(),
            );
        }
    };
    let now_ms = current_unix_timestamp_ms();
    json_no_store(json!({
        "ok": true,
        "open": window.is_open(now_ms),
        "open_until": window.open_until_ms,
        "now": now_ms,
    }))
}

#[derive(Debug, Deserialize, Default)]
struct HitBody {
    #[serde(default)]
    path: Option<String>,
}

async fn handle_hit(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let hit: HitBody = serde_json::from_slice(&body).unwrap_or_default();
    let path = hit
        .path
        .as_deref()
        .map(str::trim)
        .filter(|path| !path.is_empty())
        .unwrap_or("/");

    let ip = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or("unknown");
    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("");
    let fingerprint = fnv1a_32_hex(&format!("{ip}|{user_agent}"));

    if let Err(error) = state.metrics.record_web_hit(&fingerprint, path) {
        return error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "metrics_write_failed",
            &error.to_string(),
        );
    }
    (StatusCode::OK, Json(json!({"ok": true}))).into_response()
}

/// Listener-facing projection of a track record. Status and the current
/// marker stay internal to the console.
fn public_track_json(track: &TrackRecord) -> serde_json::Value {
    json!({
        "id": track.id,
        "title": track.title,
        "url": track.url,
        "description": track.description,
        "chapters": track.chapters,
        "created_at_ms": track.created_at_ms,
    })
}

async fn handle_current_track(State(state): State<Arc<AppState>>) -> Response {
    let current = match state.catalog.current() {
        Ok(current) => current,
        Err(error) => {
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "state_read_failed",
                &error.to_string(),
            );
        }
    };
    let track = current
        .filter(|track| track.status == TrackStatus::Public)
        .map(|track| public_track_json(&track));
    json_no_store(json!({ "track": track }))
}

#[derive(Debug, Deserialize)]
struct RecentQuery {
    limit: Option<usize>,
}

async fn handle_recent_tracks(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RecentQuery>,
) -> Response {
    let limit = query
        .limit
        .unwrap_or(RECENT_TRACKS_DEFAULT)
        .clamp(1, RECENT_TRACKS_MAX);
    let tracks = match recent_public_tracks(&state.catalog, limit) {
        Ok(tracks) => tracks,
        Err(error) => {
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "state_read_failed",
                &error.to_string(),
            );
        }
    };
    let tracks: Vec<serde_json::Value> = tracks.iter().map(public_track_json).collect();
    json_no_store(json!({ "tracks": tracks }))
}

/// Most-recent-first public tracks. Drafts never count against the limit.
fn recent_public_tracks(catalog: &TrackCatalog, limit: usize) -> Result<Vec<TrackRecord>> {
    let ids = catalog.index()?;
    let mut tracks = Vec::new();
    for id in ids.iter().rev() {
        if tracks.len() >= limit {
            break;
        }
        if let Some(track) = catalog.get(id)? {
            if track.status == TrackStatus::Public {
                tracks.push(track);
            }
        }
    }
    Ok(tracks)
}

#[cfg(test)]
mod tests;
