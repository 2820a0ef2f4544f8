//! Protocol modules (envelope + versioned wire codecs).
//!
//! - `envelope`: canonical call/response representation.
//! - `v1`: positional JSON array framing.
//! - `version`: version table mapping URL segments to codec function tables.
//!
//! All parsers are panic-free: malformed input is reported as `MmError`
//! instead of panicking or indexing raw arrays, keeping the server resilient
//! to hostile traffic.

pub mod envelope;
pub mod v1;
pub mod version;

pub use envelope::{CorrelationId, Envelope, Head};
pub use v1::{DecodeError, Limits};
pub use version::{ProtocolVersion, WireCodec};
