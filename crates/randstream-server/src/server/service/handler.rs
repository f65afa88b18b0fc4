//! The single WebSocket route.
//!
//! The handler resolves the admission key from the proxy headers and the peer
//! address, upgrades the connection, and hands the socket to the shared
//! [`StreamService`]. Admission, streaming and cleanup all happen in the core;
//! this module only feeds session events into telemetry.

use crate::server::{
    config::ServerConfig,
    streaming::channel::WsChannel,
    telemetry::{
        increment_connections, increment_numbers_generated, increment_rejections,
        increment_session_errors, record_session_duration,
    },
};
use axum::{
    Router,
    extract::{ConnectInfo, State, WebSocketUpgrade, ws::WebSocket},
    http::HeaderMap,
    response::Response,
    routing::get,
};
use randstream::{
    Address, ConnectionRegistry, FORWARDED_FOR_HEADER, NumberPool, REAL_IP_HEADER, ServeOutcome,
    SessionEnd, SessionObserver, StreamService, ThreadRandom,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

/// State shared by every request.
#[derive(Clone)]
pub struct AppState {
    service: StreamService,
    config: Arc<ServerConfig>,
}

impl AppState {
    /// Builds a fresh registry and number pool for `config`.
    pub fn new(config: ServerConfig) -> Self {
        let service = StreamService::new(
            Arc::new(ConnectionRegistry::new()),
            Arc::new(NumberPool::with_capacity(ThreadRandom, config.seen_capacity)),
        );
        Self::with_service(service, config)
    }

    pub fn with_service(service: StreamService, config: ServerConfig) -> Self {
        Self {
            service,
            config: Arc::new(config),
        }
    }

    pub fn service(&self) -> &StreamService {
        &self.service
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

/// Routes the configured path to the stream handler. Nothing else is served.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(&state.config.ws_path, get(stream_numbers))
        .with_state(state)
}

async fn stream_numbers(
    ws: WebSocketUpgrade,
    headers: HeaderMap,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    State(state): State<AppState>,
) -> Response {
    let address = resolve_address(&headers, peer);
    let AppState { service, config } = state;

    ws.read_buffer_size(config.read_buffer_size)
        .write_buffer_size(config.write_buffer_size)
        .max_message_size(config.max_message_size)
        .on_failed_upgrade(move |err| {
            tracing::warn!(%peer, "WebSocket upgrade failed: {err}");
        })
        .on_upgrade(move |socket| drive_socket(service, socket, address))
}

/// Reads `X-Real-Ip`, then `X-Forwarded-For`, then falls back to the peer.
/// Header values that are not valid UTF-8 count as absent.
pub fn resolve_address(headers: &HeaderMap, peer: SocketAddr) -> Address {
    let header = |name: &str| headers.get(name).and_then(|value| value.to_str().ok());
    Address::resolve(header(REAL_IP_HEADER), header(FORWARDED_FOR_HEADER), peer)
}

/// Feeds session events into the live counters.
struct SessionMetrics;

impl SessionObserver for SessionMetrics {
    fn on_admitted(&self, _address: &Address) {
        increment_connections();
    }

    fn on_rejected(&self, _address: &Address) {
        increment_rejections();
    }

    fn on_value_sent(&self, _address: &Address) {
        increment_numbers_generated(1);
    }
}

async fn drive_socket(service: StreamService, socket: WebSocket, address: Address) {
    let start = Instant::now();

    let outcome = service
        .serve_observed(WsChannel::new(socket), address, &SessionMetrics)
        .await;
    if let ServeOutcome::Completed(report) = outcome {
        let duration_ms = start.elapsed().as_millis() as f64;
        record_session_duration(duration_ms);
        if report.end != SessionEnd::Disconnected {
            increment_session_errors();
        }

        tracing::info!(
            address = %report.address,
            sent = report.sent,
            end = ?report.end,
            duration_ms,
            "Session closed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn peer() -> SocketAddr {
        SocketAddr::from(([9, 9, 9, 9], 1234))
    }

    #[test]
    fn header_lookup_is_case_insensitive() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("1.2.3.4:9999"));
        headers.insert("x-forwarded-for", HeaderValue::from_static("5.6.7.8"));
        assert_eq!(resolve_address(&headers, peer()).as_str(), "1.2.3.4");
    }

    #[test]
    fn forwarded_for_then_peer() {
        let mut headers = HeaderMap::new();
        assert_eq!(resolve_address(&headers, peer()).as_str(), "9.9.9.9");

        headers.insert("x-forwarded-for", HeaderValue::from_static("5.6.7.8"));
        assert_eq!(resolve_address(&headers, peer()).as_str(), "5.6.7.8");
    }

    #[test]
    fn non_utf8_header_is_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_bytes(b"\xff\xfe").unwrap());
        headers.insert("x-forwarded-for", HeaderValue::from_static("5.6.7.8"));
        assert_eq!(resolve_address(&headers, peer()).as_str(), "5.6.7.8");
    }
}
