//! Integration test helpers.
//!
//! Provides reusable utilities for:
//! - WebSocket connection pair setup (client + server)
//! - Adapter construction over either transport
//! - Timeout protection

#![allow(dead_code)]

use msgstream_core::{MessageTransport, Scope, StreamAdapter};
use msgstream_transport::websocket::{WebSocketConfig, WebSocketEndpoint, WebSocketTransport};
use std::time::Duration;

/// Default timeout for test operations (10 seconds).
pub const TEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Install a tracing subscriber once; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Connected WebSocket transports.
pub struct ConnectionPair {
    /// Client side.
    pub client: WebSocketTransport,
    /// Server side.
    pub server: WebSocketTransport,
}

/// Setup a WebSocket client/server pair on loopback.
pub async fn setup_websocket_pair(config: WebSocketConfig) -> ConnectionPair {
    init_tracing();

    let server = WebSocketEndpoint::server_with_config("127.0.0.1:0", config.clone())
        .await
        .expect("Server creation failed");
    let addr = server.local_addr().expect("Failed to get server address");

    let server_task =
        tokio::spawn(async move { server.accept().await.expect("Server accept failed") });

    let client = WebSocketEndpoint::client_with_config(config).expect("Client creation failed");
    let client = client
        .connect(&format!("ws://{}", addr))
        .await
        .expect("Client connection failed");

    let server = server_task.await.expect("Server task panicked");
    ConnectionPair { client, server }
}

/// Scopes an adapter was built from.
pub struct Scopes {
    /// Connection-wide scope.
    pub parent: Scope,
    /// Request scope.
    pub request: Scope,
}

/// Wrap `transport` in an adapter with fresh scopes.
pub fn adapter<T: MessageTransport>(id: &str, transport: T) -> (StreamAdapter<T>, Scopes) {
    let parent = Scope::new();
    let request = Scope::new();
    let adapter = StreamAdapter::new(&parent, &request, id, transport);
    (adapter, Scopes { parent, request })
}

/// Execute an async operation with timeout.
///
/// Returns `Ok(T)` on success, `Err(msg)` on timeout.
pub async fn with_timeout<F, T>(operation_name: &str, future: F) -> Result<T, String>
where
    F: std::future::Future<Output = T>,
{
    match tokio::time::timeout(TEST_TIMEOUT, future).await {
        Ok(result) => Ok(result),
        Err(_) => Err(format!(
            "{} timed out after {:?}",
            operation_name, TEST_TIMEOUT
        )),
    }
}
