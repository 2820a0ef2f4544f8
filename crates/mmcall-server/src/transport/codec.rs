//! Socket message classification, before any protocol decode.
//!
//! - Text frames => frame text
//! - Binary frames => frame text when valid UTF-8
//! - Ping/Pong/Close are surfaced for lifecycle management

use axum::extract::ws::Message;
use mmcall_core::error::MmError;

#[derive(Debug)]
pub enum SocketFrame {
    Call(String),
    /// Binary payload that is not UTF-8; answered with a decode error.
    Undecodable(MmError),
    Ping,
    Pong,
    Close,
}

pub fn classify(msg: Message) -> SocketFrame {
    match msg {
        Message::Text(s) => SocketFrame::Call(s),
        Message::Binary(b) => match String::from_utf8(b) {
            Ok(s) => SocketFrame::Call(s),
            Err(e) => SocketFrame::Undecodable(MmError::RequestDecode(format!("binary frame is not utf-8: {e}"))),
        },
        Message::Ping(_) => SocketFrame::Ping,
        Message::Pong(_) => SocketFrame::Pong,
        Message::Close(_) => SocketFrame::Close,
    }
}
