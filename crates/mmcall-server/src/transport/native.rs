//! Native transport objects handed to raw endpoints.

use axum::body::Body;
use axum::extract::ws::Message;
use axum::http::{HeaderMap, Method, Uri};
use tokio::sync::mpsc;

use mmcall_core::error::{MmError, Result};
use mmcall_core::protocol::{Envelope, ProtocolVersion};

/// Pass-through request for raw endpoints (uploads, streaming).
pub enum NativeRequest {
    Http(HttpRequest),
    Socket(SocketHandle),
}

/// HTTP request with its body left unread.
pub struct HttpRequest {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    pub body: Body,
}

/// Handle to the persistent socket a call arrived on.
#[derive(Clone)]
pub struct SocketHandle {
    version: ProtocolVersion,
    url: String,
    outbound: mpsc::Sender<Message>,
}

impl SocketHandle {
    pub(crate) fn new(version: ProtocolVersion, url: String, outbound: mpsc::Sender<Message>) -> Self {
        Self {
            version,
            url,
            outbound,
        }
    }

    pub fn version(&self) -> ProtocolVersion {
        self.version
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Push an extra frame on the connection, encoded with its pinned codec.
    pub async fn push(&self, env: &Envelope) -> Result<()> {
        let frame = (self.version.codec().encode_frame)(env);
        self.outbound
            .send(Message::Text(frame))
            .await
            .map_err(|_| MmError::call("connection closed"))
    }
}
