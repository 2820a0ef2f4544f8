//! WebSocket adapter.
//!
//! Responsibilities:
//! - Upgrade HTTP -> WS on a versioned URL; the version is pinned for the
//!   connection's lifetime
//! - Lifecycle: ping + idle timeout
//! - One task per inbound frame: a slow call never blocks a fast one, replies
//!   are correlated by id rather than arrival order
//! - Replies that find the connection gone are logged and discarded

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::{Duration, Instant};
use tracing::Instrument;

use mmcall_core::protocol::{DecodeError, ProtocolVersion};

use crate::app_state::AppState;
use crate::dispatch::Inbound;
use crate::transport::codec::{classify, SocketFrame};
use crate::transport::native::{NativeRequest, SocketHandle};

const OUTBOUND_QUEUE: usize = 1024;

pub fn upgrade(app: AppState, version: ProtocolVersion, url: String, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| async move {
        let span = tracing::info_span!("ws_session", %version, %url);
        run_session(app, version, url, socket).instrument(span).await;
    })
}

async fn run_session(app: AppState, version: ProtocolVersion, url: String, socket: WebSocket) {
    let (out_tx, mut out_rx) = mpsc::channel::<Message>(OUTBOUND_QUEUE);
    let (mut ws_tx, mut ws_rx) = socket.split();

    let srv = &app.cfg().server;
    let ping_every = Duration::from_millis(srv.ping_interval_ms);
    let idle_timeout = Duration::from_millis(srv.idle_timeout_ms);

    let mut ping_tick = tokio::time::interval(ping_every);
    ping_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    let mut last_activity = Instant::now();

    tracing::debug!("session opened");

    loop {
        tokio::select! {
            // outbound writer
            maybe_out = out_rx.recv() => {
                let Some(m) = maybe_out else { break; };
                if ws_tx.send(m).await.is_err() {
                    tracing::warn!("socket write failed; closing session");
                    break;
                }
            }

            // inbound reader
            incoming = ws_rx.next() => {
                let Some(Ok(msg)) = incoming else { break; };
                last_activity = Instant::now();

                match classify(msg) {
                    SocketFrame::Call(text) => spawn_call(&app, version, &url, &out_tx, text),
                    SocketFrame::Undecodable(error) => {
                        let decoded = Err(DecodeError { error, id: None });
                        spawn_reply(&app, version, &out_tx, Inbound::new(decoded));
                    }
                    SocketFrame::Ping | SocketFrame::Pong => {}
                    SocketFrame::Close => break,
                }
            }

            // ping; never block the writer on its own queue
            _ = ping_tick.tick() => {
                let _ = out_tx.try_send(Message::Ping(Vec::new()));
            }

            // idle timeout
            _ = tokio::time::sleep(Duration::from_millis(250)) => {
                if last_activity.elapsed() >= idle_timeout {
                    tracing::debug!("idle timeout");
                    break;
                }
            }
        }
    }

    tracing::debug!("session closed");
}

fn spawn_call(app: &AppState, version: ProtocolVersion, url: &str, out_tx: &mpsc::Sender<Message>, text: String) {
    let limits = app.limits();
    let decoded = (version.codec().decode_frame)(&text, &limits);
    let handle = SocketHandle::new(version, url.to_string(), out_tx.clone());
    let inbound = Inbound::new(decoded).with_native(NativeRequest::Socket(handle));
    spawn_reply(app, version, out_tx, inbound);
}

fn spawn_reply(app: &AppState, version: ProtocolVersion, out_tx: &mpsc::Sender<Message>, inbound: Inbound) {
    let dispatcher = app.dispatcher();
    let tx = out_tx.clone();
    tokio::spawn(
        async move {
            let Some(frame) = dispatcher.respond(version, inbound).await else {
                return;
            };
            if tx.send(Message::Text(frame)).await.is_err() {
                tracing::warn!("connection gone before reply; response discarded");
            }
        }
        .in_current_span(),
    );
}
