//! WebSocket transport implementation.
//!
//! Maps WebSocket data frames one-to-one onto transport messages:
//! - Text frames <-> `MessageKind::Text`
//! - Binary frames <-> `MessageKind::Binary`
//! - Ping/pong frames are answered by the protocol layer and never surfaced
//! - A close frame (or end of stream) is reported as `TransportError::Closed`
//!
//! **Connection Lifecycle:**
//! 1. Client connects, optionally requesting a subprotocol
//! 2. Server accepts, rejecting clients that do not request its subprotocol (if configured)
//! 3. Both sides exchange messages through [`WebSocketTransport`]
//! 4. Either side calls [`WebSocketTransport::close`]

use crate::{Error, Result};
use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use msgstream_core::{Message, MessageKind, MessageTransport, TransportError};
use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio_tungstenite::{
    accept_hdr_async_with_config, connect_async_with_config,
    tungstenite::{
        self,
        client::IntoClientRequest,
        handshake::server::{Callback, ErrorResponse, Request, Response},
        http::{HeaderValue, StatusCode},
        protocol::{Message as WsMessage, WebSocketConfig as ProtocolConfig},
    },
    MaybeTlsStream, WebSocketStream,
};
use tracing::{debug, warn};


const SUBPROTOCOL_HEADER: &str = "Sec-WebSocket-Protocol";

/// Default maximum size of a single message (64 MiB).
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 64 << 20;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// WebSocket endpoint configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebSocketConfig {
    /// Subprotocol requested by clients and required by servers.
    pub subprotocol: Option<String>,
    /// Maximum size of an incoming message in bytes.
    pub max_message_size: usize,
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            subprotocol: None,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
        }
    }
}

impl WebSocketConfig {
    /// Require (server) or request (client) a subprotocol.
    pub fn with_subprotocol(mut self, subprotocol: impl Into<String>) -> Self {
        self.subprotocol = Some(subprotocol.into());
        self
    }

    /// Set the maximum incoming message size.
    pub fn with_max_message_size(mut self, max_message_size: usize) -> Self {
        self.max_message_size = max_message_size;
        self
    }

    fn protocol_config(&self) -> ProtocolConfig {
        let mut config = ProtocolConfig::default();
        config.max_message_size = Some(self.max_message_size);
        config.max_frame_size = Some(self.max_message_size);
        config
    }

    fn subprotocol_header(&self) -> Result<Option<HeaderValue>> {
        self.subprotocol
            .as_deref()
            .map(|p| {
                HeaderValue::from_str(p)
                    .map_err(|e| Error::InvalidConfig(format!("Invalid subprotocol: {}", e)))
            })
            .transpose()
    }
}

/// Handshake callback that enforces the configured subprotocol.
struct SubprotocolCallback {
    required: Option<HeaderValue>,
}

impl Callback for SubprotocolCallback {
    fn on_request(
        self,
        request: &Request,
        response: Response,
    ) -> std::result::Result<Response, ErrorResponse> {
        let Some(required) = self.required else {
            return Ok(response);
        };
        let wanted = required.to_str().unwrap_or_default();

        let offered = request
            .headers()
            .get(SUBPROTOCOL_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");

        if !offered.split(',').any(|p| p.trim() == wanted) {
            let mut rejection = ErrorResponse::new(Some(format!(
                "Client must request subprotocol '{}'",
                wanted
            )));
            *rejection.status_mut() = StatusCode::BAD_REQUEST;
            return Err(rejection);
        }

        let mut response = response;
        response.headers_mut().insert(SUBPROTOCOL_HEADER, required);
        Ok(response)
    }
}

/// WebSocket transport endpoint (client or server).
///
/// # Example
///
/// ```no_run
/// use msgstream_transport::websocket::WebSocketEndpoint;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// // Server
/// let server = WebSocketEndpoint::server("127.0.0.1:8080").await?;
/// let conn = server.accept().await?;
///
/// // Client
/// let client = WebSocketEndpoint::client()?;
/// let conn = client.connect("ws://127.0.0.1:8080").await?;
/// # Ok(())
/// # }
/// ```
pub struct WebSocketEndpoint {
    listener: Option<TcpListener>,
    mode: EndpointMode,
    config: WebSocketConfig,
}

/// Endpoint mode (client or server).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EndpointMode {
    Client,
    Server,
}

impl WebSocketEndpoint {
    /// Create a client endpoint with default configuration.
    ///
    /// # Errors
    ///
    /// Returns error if endpoint creation fails.
    pub fn client() -> Result<Self> {
        Self::client_with_config(WebSocketConfig::default())
    }

    /// Create a client endpoint with custom configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the configured subprotocol is not a valid header value.
    pub fn client_with_config(config: WebSocketConfig) -> Result<Self> {
        config.subprotocol_header()?;
        Ok(Self {
            listener: None,
            mode: EndpointMode::Client,
            config,
        })
    }

    /// Create a server endpoint with default configuration.
    ///
    /// # Arguments
    ///
    /// * `addr` - Socket address to bind to (e.g., "0.0.0.0:8080")
    ///
    /// # Errors
    ///
    /// Returns error if the address is invalid or binding fails.
    pub async fn server(addr: &str) -> Result<Self> {
        Self::server_with_config(addr, WebSocketConfig::default()).await
    }

    /// Create a server endpoint with custom configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the address or configuration is invalid, or binding fails.
    pub async fn server_with_config(addr: &str, config: WebSocketConfig) -> Result<Self> {
        config.subprotocol_header()?;

        let addr: SocketAddr = addr
            .parse()
            .map_err(|e| Error::ConnectionFailed(format!("Invalid address: {}", e)))?;

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| Error::ConnectionFailed(format!("Server bind failed: {}", e)))?;

        Ok(Self {
            listener: Some(listener),
            mode: EndpointMode::Server,
            config,
        })
    }

    /// Get the local address this endpoint is bound to.
    ///
    /// # Errors
    ///
    /// Returns error if endpoint is not bound (client mode).
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener
            .as_ref()
            .ok_or_else(|| Error::ConnectionFailed("Client has no local address".into()))?
            .local_addr()
            .map_err(|e| Error::ConnectionFailed(format!("No local address: {}", e)))
    }

    /// Connect to a remote server (client only).
    ///
    /// # Arguments
    ///
    /// * `url` - WebSocket URL (e.g., "ws://192.168.1.100:8080")
    ///
    /// # Errors
    ///
    /// Returns error if not a client, the handshake fails, or the server does
    /// not confirm the requested subprotocol.
    pub async fn connect(&self, url: &str) -> Result<WebSocketTransport> {
        if self.mode != EndpointMode::Client {
            return Err(Error::ConnectionFailed("Only client can connect".into()));
        }

        let mut request = url
            .into_client_request()
            .map_err(|e| Error::ConnectionFailed(format!("Invalid URL: {}", e)))?;

        let subprotocol = self.config.subprotocol_header()?;
        if let Some(value) = &subprotocol {
            request
                .headers_mut()
                .insert(SUBPROTOCOL_HEADER, value.clone());
        }

        let (ws_stream, response) =
            connect_async_with_config(request, Some(self.config.protocol_config()), false)
                .await
                .map_err(|e| {
                    Error::ConnectionFailed(format!("WebSocket handshake failed: {}", e))
                })?;

        if let Some(expected) = subprotocol {
            let confirmed = response.headers().get(SUBPROTOCOL_HEADER);
            if confirmed != Some(&expected) {
                return Err(Error::ConnectionFailed(format!(
                    "Server did not accept subprotocol {:?}, got: {:?}",
                    expected, confirmed
                )));
            }
        }

        debug!(url, "websocket connected");
        Ok(WebSocketTransport::new(ws_stream))
    }

    /// Accept an incoming connection (server only).
    ///
    /// # Errors
    ///
    /// Returns error if not a server, or the TCP accept or handshake fails.
    pub async fn accept(&self) -> Result<WebSocketTransport> {
        if self.mode != EndpointMode::Server {
            return Err(Error::ConnectionFailed("Only server can accept".into()));
        }

        let listener = self
            .listener
            .as_ref()
            .ok_or_else(|| Error::ConnectionFailed("No listener".into()))?;

        let (tcp_stream, peer) = listener
            .accept()
            .await
            .map_err(|e| Error::ConnectionFailed(format!("TCP accept failed: {}", e)))?;

        let callback = SubprotocolCallback {
            required: self.config.subprotocol_header()?,
        };
        let ws_stream = accept_hdr_async_with_config(
            MaybeTlsStream::Plain(tcp_stream),
            callback,
            Some(self.config.protocol_config()),
        )
        .await
        .map_err(|e| Error::ConnectionFailed(format!("WebSocket handshake failed: {}", e)))?;

        debug!(%peer, "websocket accepted");
        Ok(WebSocketTransport::new(ws_stream))
    }
}

/// Message transport over an established WebSocket connection.
///
/// The write and read halves are locked independently, so one
/// `send_message` and one `receive_message` can run concurrently.
pub struct WebSocketTransport {
    sink: Mutex<SplitSink<WsStream, WsMessage>>,
    stream: Mutex<SplitStream<WsStream>>,
}

impl WebSocketTransport {
    fn new(ws_stream: WsStream) -> Self {
        let (sink, stream) = ws_stream.split();
        Self {
            sink: Mutex::new(sink),
            stream: Mutex::new(stream),
        }
    }

    /// Send a close frame to the peer.
    ///
    /// # Errors
    ///
    /// Returns error if the close frame cannot be sent.
    pub async fn close(&self) -> Result<()> {
        let mut sink = self.sink.lock().await;
        match sink.close().await {
            Ok(()) | Err(tungstenite::Error::ConnectionClosed) => Ok(()),
            Err(e) => Err(Error::Transport(map_ws_error(e))),
        }
    }
}

#[async_trait]
impl MessageTransport for WebSocketTransport {
    async fn send_message(
        &self,
        kind: MessageKind,
        payload: &[u8],
    ) -> std::result::Result<(), TransportError> {
        let message = match kind {
            MessageKind::Text => {
                let text = std::str::from_utf8(payload).map_err(|e| {
                    TransportError::Protocol(format!("Text message is not valid UTF-8: {}", e))
                })?;
                WsMessage::Text(text.to_owned())
            }
            MessageKind::Binary => WsMessage::Binary(payload.to_vec()),
        };

        let mut sink = self.sink.lock().await;
        sink.send(message).await.map_err(map_ws_error)
    }

    async fn receive_message(&self) -> std::result::Result<Message, TransportError> {
        let mut stream = self.stream.lock().await;
        loop {
            let frame = stream
                .next()
                .await
                .ok_or(TransportError::Closed)?
                .map_err(map_ws_error)?;

            match frame {
                WsMessage::Text(text) => return Ok(Message::text(text)),
                WsMessage::Binary(data) => return Ok(Message::binary(data)),
                WsMessage::Close(close) => {
                    debug!(?close, "websocket closed by peer");
                    return Err(TransportError::Closed);
                }
                WsMessage::Ping(_) | WsMessage::Pong(_) => continue,
                WsMessage::Frame(_) => {
                    warn!("unexpected raw frame on websocket");
                    continue;
                }
            }
        }
    }
}

fn map_ws_error(err: tungstenite::Error) -> TransportError {
    match err {
        tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed => {
            TransportError::Closed
        }
        tungstenite::Error::Io(io) => TransportError::Io(io),
        tungstenite::Error::Protocol(e) => TransportError::Protocol(e.to_string()),
        tungstenite::Error::Capacity(e) => TransportError::Protocol(e.to_string()),
        tungstenite::Error::Utf8 => {
            TransportError::Protocol("Text message is not valid UTF-8".into())
        }
        other => TransportError::Other(Box::new(other)),
    }
}
