use anyhow::{anyhow, Context, Result};
use futures::{SinkExt, StreamExt};
use reqwest::{Client, Response};
use shared::{
    error::ApiError,
    protocol::{ClientMessage, Frame, ServerMessage, SetRequest},
};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};
use url::Url;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("controller rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("unexpected reply from controller: {0}")]
    UnexpectedReply(String),
}

/// HTTP access to the controller's auxiliary endpoints plus the frame socket.
#[derive(Debug, Clone)]
pub struct LedClient {
    http: Client,
    base_url: Url,
}

impl LedClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url =
            Url::parse(base_url).with_context(|| format!("invalid controller url: {base_url}"))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(anyhow!("controller url must start with http:// or https://"));
        }
        Ok(Self {
            http: Client::new(),
            base_url,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .with_context(|| format!("failed to build url for {path}"))
    }

    pub async fn fetch_state(&self) -> Result<Frame> {
        let text = self
            .http
            .get(self.endpoint("/api/state")?)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        parse_frame(&text)
    }

    pub async fn set_power(&self, on: bool) -> Result<()> {
        let value = if on { "1" } else { "0" };
        let response = self
            .http
            .post(self.endpoint("/api/power")?)
            .form(&[("on", value)])
            .send()
            .await?;
        expect_ok(response).await
    }

    pub async fn set_brightness(&self, level: u8) -> Result<()> {
        let response = self
            .http
            .post(self.endpoint("/api/brightness")?)
            .form(&[("b", level.to_string())])
            .send()
            .await?;
        expect_ok(response).await
    }

    pub fn ws_url(&self) -> Result<Url> {
        let mut url = self.endpoint("/ws")?;
        let scheme = if url.scheme() == "https" { "wss" } else { "ws" };
        url.set_scheme(scheme)
            .map_err(|()| anyhow!("cannot switch {url} to {scheme}"))?;
        Ok(url)
    }

    pub async fn connect(&self) -> Result<FrameStream> {
        let url = self.ws_url()?;
        let (socket, _) = connect_async(url.as_str())
            .await
            .with_context(|| format!("failed to connect websocket: {url}"))?;
        info!(%url, "frame stream connected");
        Ok(FrameStream { socket })
    }
}

async fn expect_ok(response: Response) -> Result<()> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ApiError>(&body)
        .map(|error| error.message)
        .unwrap_or(body);
    Err(ClientError::Rejected {
        status: status.as_u16(),
        message,
    }
    .into())
}

pub fn parse_frame(text: &str) -> Result<Frame> {
    match serde_json::from_str::<ServerMessage>(text) {
        Ok(ServerMessage::Frame(frame)) => Ok(frame),
        Err(err) => Err(ClientError::UnexpectedReply(err.to_string()).into()),
    }
}

/// Live frame feed from `/ws`.
pub struct FrameStream {
    socket: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl FrameStream {
    /// Next frame, or `None` once the controller closes the socket. Payloads
    /// that are not frames are skipped.
    pub async fn next_frame(&mut self) -> Result<Option<Frame>> {
        while let Some(message) = self.socket.next().await {
            match message.context("frame stream failed")? {
                Message::Text(text) => match parse_frame(&text) {
                    Ok(frame) => return Ok(Some(frame)),
                    Err(err) => warn!("skipping unreadable frame: {err}"),
                },
                Message::Close(_) => break,
                other => debug!(?other, "ignoring non-text message"),
            }
        }
        Ok(None)
    }

    pub async fn send_set(&mut self, request: SetRequest) -> Result<()> {
        let text = serde_json::to_string(&ClientMessage::Set(request))?;
        self.socket
            .send(Message::Text(text))
            .await
            .context("failed to send set command")
    }

    pub async fn close(mut self) -> Result<()> {
        self.socket
            .close(None)
            .await
            .context("failed to close frame stream")
    }
}

#[cfg(test)]
#[path = "tests/client_tests.rs"]
mod tests;
