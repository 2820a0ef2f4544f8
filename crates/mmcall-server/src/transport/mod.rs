//! Transport adapters (HTTP request/response and WebSocket).
//!
//! Both share one entry point mounted at `{api_prefix}/:version`. The version
//! segment selects the wire codec; unknown versions are left to the fallback
//! (404) so unrelated traffic is ignored.

pub mod codec;
pub mod http;
pub mod native;
pub mod ws;

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Path, Request, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use mmcall_core::protocol::ProtocolVersion;

use crate::app_state::AppState;

pub use native::{HttpRequest, NativeRequest, SocketHandle};

pub async fn entry(
    State(app): State<AppState>,
    Path(version): Path<String>,
    ws: Option<WebSocketUpgrade>,
    req: Request,
) -> Response {
    let Some(version) = ProtocolVersion::from_segment(&version) else {
        return StatusCode::NOT_FOUND.into_response();
    };

    match ws {
        Some(ws) => ws::upgrade(app, version, req.uri().to_string(), ws),
        None => http::handle(app, version, req).await,
    }
}
