use super::*;
use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::{
    extract::{
        ws::{Message as AxumMessage, WebSocket},
        State, WebSocketUpgrade,
    },
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Form, Json, Router,
};
use shared::error::ErrorCode;
use tokio::{
    net::TcpListener,
    sync::{mpsc, Mutex},
    time::timeout,
};

const STATE_FRAME: &str = r##"{"type":"frame","b":77,"on":false,"colors":["#FF0000","#00FF00"]}"##;

#[derive(Clone)]
struct MockState {
    forms: Arc<Mutex<Vec<(String, String)>>>,
    commands: mpsc::UnboundedSender<String>,
}

async fn record_power(
    State(state): State<MockState>,
    Form(fields): Form<Vec<(String, String)>>,
) -> impl IntoResponse {
    record(state, fields, "on", "missing on=0/1").await
}

async fn record_brightness(
    State(state): State<MockState>,
    Form(fields): Form<Vec<(String, String)>>,
) -> impl IntoResponse {
    record(state, fields, "b", "missing b=0..255").await
}

async fn record(
    state: MockState,
    fields: Vec<(String, String)>,
    key: &str,
    missing: &str,
) -> Result<&'static str, (StatusCode, Json<ApiError>)> {
    if !fields.iter().any(|(name, _)| name == key) {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ApiError::new(ErrorCode::Validation, missing)),
        ));
    }
    state.forms.lock().await.extend(fields);
    Ok("ok")
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<MockState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| mock_socket(state, socket))
}

async fn mock_socket(state: MockState, mut socket: WebSocket) {
    for text in [STATE_FRAME, r#"{"type":"noise"}"#, r#"{"type":"frame","colors":[]}"#] {
        if socket.send(AxumMessage::Text(text.into())).await.is_err() {
            return;
        }
    }
    while let Some(Ok(message)) = socket.recv().await {
        if let AxumMessage::Text(text) = message {
            let _ = state.commands.send(text);
            let _ = socket.send(AxumMessage::Close(None)).await;
            return;
        }
    }
}

async fn spawn_mock_controller() -> (
    SocketAddr,
    Arc<Mutex<Vec<(String, String)>>>,
    mpsc::UnboundedReceiver<String>,
) {
    let (commands, received) = mpsc::unbounded_channel();
    let forms = Arc::new(Mutex::new(Vec::new()));
    let state = MockState {
        forms: Arc::clone(&forms),
        commands,
    };
    let app = Router::new()
        .route("/api/state", get(|| async { STATE_FRAME }))
        .route("/api/power", post(record_power))
        .route("/api/brightness", post(record_brightness))
        .route("/ws", get(ws_handler))
        .with_state(state);
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (addr, forms, received)
}

#[test]
fn rejects_non_http_urls() {
    assert!(LedClient::new("ftp://tree.local").is_err());
    assert!(LedClient::new("not a url").is_err());
}

#[test]
fn ws_url_follows_http_scheme() {
    let plain = LedClient::new("http://tree.local:8080").expect("client");
    assert_eq!(plain.ws_url().expect("url").as_str(), "ws://tree.local:8080/ws");

    let secure = LedClient::new("https://tree.local/panel/").expect("client");
    assert_eq!(secure.ws_url().expect("url").as_str(), "wss://tree.local/ws");
}

#[test]
fn parse_frame_rejects_other_payloads() {
    let frame = parse_frame(STATE_FRAME).expect("frame");
    assert_eq!(frame.colors, vec!["#FF0000", "#00FF00"]);
    assert!(parse_frame(r#"{"type":"set","on":true}"#).is_err());
}

#[tokio::test]
async fn fetches_state_and_posts_status_forms() {
    let (addr, forms, _commands) = spawn_mock_controller().await;
    let client = LedClient::new(&format!("http://{addr}")).expect("client");

    let frame = client.fetch_state().await.expect("state");
    assert_eq!(frame.b, Some(77));
    assert_eq!(frame.on, Some(false));

    client.set_power(true).await.expect("power");
    client.set_brightness(230).await.expect("brightness");
    client.set_power(false).await.expect("power off");

    let forms = forms.lock().await.clone();
    assert_eq!(
        forms,
        vec![
            ("on".to_string(), "1".to_string()),
            ("b".to_string(), "230".to_string()),
            ("on".to_string(), "0".to_string()),
        ]
    );
}

#[tokio::test]
async fn rejected_request_surfaces_server_message() {
    let (addr, _forms, _commands) = spawn_mock_controller().await;
    let client = LedClient::new(&format!("http://{addr}")).expect("client");

    let response = client
        .http
        .post(client.endpoint("/api/power").expect("url"))
        .form(&[("b", "1")])
        .send()
        .await
        .expect("send");
    let err = expect_ok(response).await.expect_err("rejected");
    match err.downcast_ref::<ClientError>() {
        Some(ClientError::Rejected { status, message }) => {
            assert_eq!(*status, 400);
            assert_eq!(message, "missing on=0/1");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn frame_stream_skips_noise_and_sends_set() {
    let (addr, _forms, mut commands) = spawn_mock_controller().await;
    let client = LedClient::new(&format!("http://{addr}")).expect("client");
    let mut stream = client.connect().await.expect("connect");

    let first = stream.next_frame().await.expect("read").expect("frame");
    assert_eq!(first.colors.len(), 2);
    let second = stream.next_frame().await.expect("read").expect("frame");
    assert!(second.colors.is_empty());
    assert!(second.meta.is_none());

    stream
        .send_set(SetRequest {
            on: Some(true),
            b: None,
        })
        .await
        .expect("send");
    let command = timeout(Duration::from_secs(2), commands.recv())
        .await
        .expect("command in time")
        .expect("command");
    assert_eq!(command, r#"{"type":"set","on":true}"#);

    let end = timeout(Duration::from_secs(2), stream.next_frame())
        .await
        .expect("close in time")
        .expect("clean close");
    assert!(end.is_none());
}
