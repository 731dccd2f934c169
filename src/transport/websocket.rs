//! WebSocket connector backed by tokio-tungstenite.
//!
//! # Handshake
//!
//! Every connection request carries:
//!
//! | Header | Value |
//! |--------|-------|
//! | `Authorization` | `Bearer <token>` |
//! | `User-Agent` | client user agent |
//!
//! A handshake answered with HTTP 400, 401 or 403 maps to
//! [`Error::Authentication`]; any other failure is retriable.

// ============================================================================
// Imports
// ============================================================================

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Error as WsError;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::http::{HeaderValue, header};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, trace, warn};

use crate::error::{Error, Result};

use super::socket::{Connector, Inbound, Transport};

// ============================================================================
// Constants
// ============================================================================

/// Handshake statuses that mean the token was rejected.
const AUTH_REJECT_STATUSES: [u16; 3] = [400, 401, 403];

// ============================================================================
// WsConnector
// ============================================================================

/// Opens gateway connections over WebSocket.
#[derive(Clone)]
pub struct WsConnector {
    /// Gateway URL.
    url: String,
    /// Bot token.
    token: String,
    /// User-Agent header value.
    user_agent: String,
}

impl WsConnector {
    /// Creates a connector for `url`.
    #[must_use]
    pub fn new(
        url: impl Into<String>,
        token: impl Into<String>,
        user_agent: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            token: token.into(),
            user_agent: user_agent.into(),
        }
    }

    /// Returns the gateway URL.
    #[inline]
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Builds the handshake request with auth headers.
    fn build_request(&self) -> Result<Request> {
        let mut request = self.url.as_str().into_client_request()?;

        let authorization = HeaderValue::from_str(&format!("Bearer {}", self.token))
            .map_err(|_| Error::config("Token contains characters not allowed in a header"))?;
        let user_agent = HeaderValue::from_str(&self.user_agent)
            .map_err(|_| Error::config("User agent contains characters not allowed in a header"))?;

        let headers = request.headers_mut();
        headers.insert(header::AUTHORIZATION, authorization);
        headers.insert(header::USER_AGENT, user_agent);

        Ok(request)
    }
}

impl std::fmt::Debug for WsConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WsConnector")
            .field("url", &self.url)
            .field("user_agent", &self.user_agent)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self) -> Result<Box<dyn Transport>> {
        let request = self.build_request()?;
        debug!(url = %self.url, "Opening gateway connection");

        match connect_async(request).await {
            Ok((stream, response)) => {
                debug!(status = response.status().as_u16(), "Gateway handshake completed");
                Ok(Box::new(WsTransport { stream }))
            }
            Err(e) => {
                let err = classify_handshake_error(e);
                warn!(error = %err, "Gateway handshake failed");
                Err(err)
            }
        }
    }
}

/// Maps a handshake failure onto the crate error taxonomy.
pub(crate) fn classify_handshake_error(err: WsError) -> Error {
    let status = match &err {
        WsError::Http(response) => Some(response.status().as_u16()),
        _ => None,
    };

    match status {
        Some(status) if AUTH_REJECT_STATUSES.contains(&status) => Error::authentication(status),
        Some(status) => Error::connection(format!("Handshake rejected with HTTP {status}")),
        None => Error::WebSocket(err),
    }
}

// ============================================================================
// WsTransport
// ============================================================================

/// An open tungstenite stream.
struct WsTransport {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl Transport for WsTransport {
    async fn recv(&mut self) -> Option<Result<Inbound>> {
        loop {
            let message = match self.stream.next().await? {
                Ok(message) => message,
                Err(e) => return Some(Err(Error::WebSocket(e))),
            };

            match message {
                Message::Text(text) => return Some(Ok(Inbound::Text(text.as_str().to_owned()))),
                Message::Pong(payload) => return Some(Ok(Inbound::Pong(payload.to_vec()))),
                Message::Close(frame) => {
                    let (code, reason) = match frame {
                        Some(frame) => (Some(u16::from(frame.code)), frame.reason.as_str().to_owned()),
                        None => (None, String::new()),
                    };
                    return Some(Ok(Inbound::Close { code, reason }));
                }
                // Pings are answered by tungstenite.
                other => trace!(kind = message_kind(&other), "Ignored frame"),
            }
        }
    }

    async fn send_ping(&mut self, payload: Vec<u8>) -> Result<()> {
        self.stream.send(Message::Ping(payload.into())).await?;
        Ok(())
    }

    async fn close(&mut self) {
        if let Err(e) = self.stream.close(None).await {
            trace!(error = %e, "Error while closing gateway socket");
        }
    }
}

/// Short name of a frame kind for logs.
fn message_kind(message: &Message) -> &'static str {
    match message {
        Message::Text(_) => "text",
        Message::Binary(_) => "binary",
        Message::Ping(_) => "ping",
        Message::Pong(_) => "pong",
        Message::Close(_) => "close",
        Message::Frame(_) => "frame",
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use parking_lot::Mutex;
    use tokio::net::TcpListener;
    use tokio_tungstenite::tungstenite::handshake::server::{
        ErrorResponse, Request as ServerRequest, Response as ServerResponse,
    };
    use tokio_tungstenite::tungstenite::http::{Response, StatusCode};

    async fn bind() -> (TcpListener, String) {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = listener.local_addr().expect("addr").port();
        (listener, format!("ws://127.0.0.1:{port}"))
    }

    #[test]
    fn test_build_request_sets_headers() {
        let connector = WsConnector::new("ws://127.0.0.1:1", "secret", "Guilded-Bot/0.1.0 (Linux)");
        let request = connector.build_request().expect("request");

        assert_eq!(request.headers()[header::AUTHORIZATION], "Bearer secret");
        assert_eq!(request.headers()[header::USER_AGENT], "Guilded-Bot/0.1.0 (Linux)");
    }

    #[test]
    fn test_build_request_rejects_header_breaking_token() {
        let connector = WsConnector::new("ws://127.0.0.1:1", "bad\ntoken", "ua");
        assert!(matches!(connector.build_request(), Err(Error::Config { .. })));
    }

    #[test]
    fn test_debug_hides_token() {
        let connector = WsConnector::new("ws://127.0.0.1:1", "secret", "ua");
        assert!(!format!("{connector:?}").contains("secret"));
    }

    #[test]
    fn test_classify_non_http_error_is_retriable() {
        let err = classify_handshake_error(WsError::ConnectionClosed);
        assert!(err.is_retriable());
    }

    #[tokio::test]
    async fn test_handshake_401_is_authentication_error() {
        let (listener, url) = bind().await;

        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.expect("accept");
            let reject = |_: &ServerRequest, _: ServerResponse| -> std::result::Result<ServerResponse, ErrorResponse> {
                let mut response = Response::new(Some("invalid token".to_string()));
                *response.status_mut() = StatusCode::UNAUTHORIZED;
                Err(response)
            };
            let _ = tokio_tungstenite::accept_hdr_async(stream, reject).await;
        });

        let connector = WsConnector::new(url, "bad", "ua");
        let err = connector.connect().await.err().expect("handshake must fail");

        assert!(matches!(err, Error::Authentication { status: 401 }));
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_connect_receives_text_and_pong() {
        let (listener, url) = bind().await;
        let seen_auth = Arc::new(Mutex::new(None::<String>));
        let seen = Arc::clone(&seen_auth);

        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.expect("accept");
            let capture = move |request: &ServerRequest,
                                response: ServerResponse|
                  -> std::result::Result<ServerResponse, ErrorResponse> {
                *seen.lock() = request
                    .headers()
                    .get(header::AUTHORIZATION)
                    .and_then(|value| value.to_str().ok())
                    .map(str::to_owned);
                Ok(response)
            };
            let mut ws = tokio_tungstenite::accept_hdr_async(stream, capture)
                .await
                .expect("server handshake");

            ws.send(Message::Text(r#"{"op":1,"d":null}"#.into()))
                .await
                .expect("server send");

            // Reading answers pings until the client goes away.
            while let Some(Ok(_)) = ws.next().await {}
        });

        let connector = WsConnector::new(url, "token-1", "ua");
        let mut transport = connector.connect().await.expect("connect");

        let first = transport.recv().await.expect("frame").expect("ok");
        assert_eq!(first, Inbound::Text(r#"{"op":1,"d":null}"#.to_string()));

        transport.send_ping(b"beat".to_vec()).await.expect("ping");
        let pong = transport.recv().await.expect("frame").expect("ok");
        assert_eq!(pong, Inbound::Pong(b"beat".to_vec()));

        transport.close().await;
        assert_eq!(seen_auth.lock().as_deref(), Some("Bearer token-1"));
    }
}
