//! Adapts axum WebSockets to the transport-agnostic session core.

pub mod channel;
