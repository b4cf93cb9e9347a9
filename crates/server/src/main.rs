use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    http::{header, StatusCode},
    response::{Html, IntoResponse},
    routing::{get, post},
    Form, Json, Router,
};
use frame_sync::{ClientAttachment, FrameSync, SyncContext};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use shared::error::{ApiError, ErrorCode};
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};
use tower_http::limit::RequestBodyLimitLayer;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

mod app_state;
mod config;
mod host;

use app_state::AppState;
use config::load_settings;
use host::{spawn_render_loop, DemoHost};

const INDEX_HTML: &str = include_str!("../assets/index.html");
/// Transport ceiling for one inbound socket message. Anything above this
/// closes the connection; commands above `max_command_bytes` are only dropped.
const SOCKET_MESSAGE_CAP: usize = 64 * 1024;

#[derive(Debug, Deserialize)]
struct PowerForm {
    on: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BrightnessForm {
    b: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let settings = load_settings();
    let host = DemoHost::new(
        settings.layout.clone(),
        settings.initial_brightness,
        settings.initial_power,
    );
    let ctx = SyncContext::new(host.status_hooks());
    ctx.attach_layout(host.layout().clone(), host.buffers())
        .context("configured layout was rejected")?;

    let sync = Arc::new(FrameSync::new(
        ctx,
        settings.frame_channel_capacity,
        settings.set_broadcast,
    ));
    let _render_loop = spawn_render_loop(
        host,
        Arc::clone(&sync),
        Duration::from_millis(settings.render_interval_ms),
    );

    let state = AppState {
        sync,
        max_command_bytes: settings.max_command_bytes,
    };
    let app = build_router(Arc::new(state));

    let addr: SocketAddr = settings
        .server_bind
        .parse()
        .with_context(|| format!("invalid bind address '{}'", settings.server_bind))?;
    info!(%addr, policy = ?settings.set_broadcast, "server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/healthz", get(healthz))
        .route("/ws", get(ws_handler))
        .route("/api/state", get(api_state))
        .route("/api/power", post(api_power))
        .route("/api/brightness", post(api_brightness))
        .layer(RequestBodyLimitLayer::new(state.max_command_bytes))
        .with_state(state)
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn healthz() -> &'static str {
    "ok"
}

async fn api_state(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/json")],
        state.sync.current_frame().to_string(),
    )
}

async fn api_power(
    State(state): State<Arc<AppState>>,
    form: Option<Form<PowerForm>>,
) -> Result<&'static str, (StatusCode, Json<ApiError>)> {
    let raw = form
        .and_then(|Form(form)| form.on)
        .ok_or_else(|| missing_field("missing on=0/1"))?;
    state.sync.set_power(parse_leading_int(&raw) != 0);
    Ok("ok")
}

async fn api_brightness(
    State(state): State<Arc<AppState>>,
    form: Option<Form<BrightnessForm>>,
) -> Result<&'static str, (StatusCode, Json<ApiError>)> {
    let raw = form
        .and_then(|Form(form)| form.b)
        .ok_or_else(|| missing_field("missing b=0..255"))?;
    state.sync.set_brightness(parse_leading_int(&raw) as u8);
    Ok("ok")
}

fn missing_field(message: &str) -> (StatusCode, Json<ApiError>) {
    (
        StatusCode::BAD_REQUEST,
        Json(ApiError::new(ErrorCode::Validation, message)),
    )
}

/// Integer prefix of a form value: optional sign then digits, 0 when absent.
fn parse_leading_int(raw: &str) -> i64 {
    let raw = raw.trim_start();
    let (negative, digits) = match raw.as_bytes().first() {
        Some(b'-') => (true, &raw[1..]),
        Some(b'+') => (false, &raw[1..]),
        _ => (false, raw),
    };
    let value = digits
        .bytes()
        .take_while(u8::is_ascii_digit)
        .fold(0i64, |acc, digit| {
            acc.wrapping_mul(10).wrapping_add(i64::from(digit - b'0'))
        });
    if negative {
        value.wrapping_neg()
    } else {
        value
    }
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ws.max_message_size(SOCKET_MESSAGE_CAP.max(state.max_command_bytes))
        .on_upgrade(move |socket| ws_connection(state, socket))
}

async fn ws_connection(state: Arc<AppState>, socket: WebSocket) {
    let (mut sender, mut receiver) = socket.split();
    let ClientAttachment { initial, frames } = state.sync.attach_client();
    if sender.send(Message::Text(initial.to_string())).await.is_err() {
        return;
    }

    let mut frames = BroadcastStream::new(frames);
    let send_task = tokio::spawn(async move {
        while let Some(frame) = frames.next().await {
            let frame = match frame {
                Ok(frame) => frame,
                Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                    debug!(skipped, "client lagging, dropping superseded frames");
                    continue;
                }
            };
            if sender.send(Message::Text(frame.to_string())).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(msg)) = receiver.next().await {
        match msg {
            Message::Text(text) if text.len() > state.max_command_bytes => {
                debug!(
                    len = text.len(),
                    limit = state.max_command_bytes,
                    "dropping oversized command"
                );
            }
            Message::Text(text) => {
                state.sync.handle_client_message(text.as_bytes());
            }
            Message::Close(_) => break,
            _ => {}
        }
    }

    send_task.abort();
    info!("client detached");
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
