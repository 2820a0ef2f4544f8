//! Protocol version table.
//!
//! A version is selected once per connection (sockets) or per exchange
//! (request/response) from a URL segment such as `/api/v1`, then pinned.

use std::fmt;

use serde_json::Value;

use crate::error::MmError;
use crate::protocol::envelope::Envelope;
use crate::protocol::v1::{self, DecodeError, Limits};

/// Function table implementing one wire format.
pub struct WireCodec {
    pub decode_frame: fn(&str, &Limits) -> Result<Envelope, DecodeError>,
    pub decode_value: fn(&str, &Limits) -> Result<Option<Value>, MmError>,
    pub encode_frame: fn(&Envelope) -> String,
}

static V1_CODEC: WireCodec = WireCodec {
    decode_frame: v1::decode_frame,
    decode_value: v1::decode_value,
    encode_frame: v1::encode_frame,
};

/// Supported protocol versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProtocolVersion {
    V1,
}

impl ProtocolVersion {
    /// Parse a URL segment: `v1` or `1`.
    pub fn from_segment(seg: &str) -> Option<Self> {
        let n = seg.strip_prefix('v').unwrap_or(seg);
        match n {
            "1" => Some(ProtocolVersion::V1),
            _ => None,
        }
    }

    pub fn number(self) -> u8 {
        match self {
            ProtocolVersion::V1 => 1,
        }
    }

    pub fn codec(self) -> &'static WireCodec {
        match self {
            ProtocolVersion::V1 => &V1_CODEC,
        }
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.number())
    }
}
