//! # Presentation Layer
//!
//! HTTP routes and the WebSocket realtime core.

pub mod http;
pub mod middleware;
pub mod websocket;
