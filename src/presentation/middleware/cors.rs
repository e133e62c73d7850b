//! CORS Middleware Configuration

use tower_http::cors::{Any, CorsLayer};

/// Create a permissive CORS layer for the gateway and health endpoints.
///
/// The browser client connects from the support portal's origin; the
/// WebSocket handshake itself is guarded by the credential token, not CORS.
pub fn create_cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}
