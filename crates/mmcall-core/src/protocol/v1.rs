//! Protocol v1 wire codec: positional JSON arrays (panic-free).
//!
//! Frame shape: `[call, payload?, meta?, id?]`.
//!
//! Parsing rules:
//! - Size is checked before any parse attempt.
//! - Missing trailing members decode as absent, never as errors.
//! - An empty string `""` in a slot followed by a later member is a
//!   placeholder and decodes as absent. A trailing `""` payload is a real
//!   empty string.
//! - Never index (`arr[3]`); always `get()`.

use serde_json::Value;

use crate::error::{MmError, WireError};
use crate::protocol::envelope::{CorrelationId, Envelope, Head};

/// Decode-side limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Maximum raw message size in bytes; `None` disables the check.
    pub max_bytes: Option<usize>,
}

impl Limits {
    pub fn new(max_bytes: usize) -> Self {
        Self {
            max_bytes: Some(max_bytes),
        }
    }

    pub fn unbounded() -> Self {
        Self { max_bytes: None }
    }

    pub fn check(&self, len: usize) -> Result<(), MmError> {
        match self.max_bytes {
            Some(limit) if len > limit => Err(MmError::RequestTooLarge { limit }),
            _ => Ok(()),
        }
    }
}

/// Decode failure with whatever correlation id could be salvaged.
#[derive(Debug, Clone)]
pub struct DecodeError {
    pub error: MmError,
    pub id: Option<CorrelationId>,
}

impl DecodeError {
    fn bare(error: MmError) -> Self {
        Self { error, id: None }
    }
}

impl From<MmError> for DecodeError {
    fn from(error: MmError) -> Self {
        Self::bare(error)
    }
}

const PLACEHOLDER: &str = "";

/// Decode one raw frame into an envelope.
pub fn decode_frame(raw: &str, limits: &Limits) -> Result<Envelope, DecodeError> {
    limits.check(raw.len())?;
    let value: Value =
        serde_json::from_str(raw).map_err(|e| MmError::RequestDecode(e.to_string()))?;
    from_wire(value)
}

/// Value-only mode: the raw text is the payload itself, no positional
/// unwrapping. An empty input yields an absent payload.
pub fn decode_value(raw: &str, limits: &Limits) -> Result<Option<Value>, MmError> {
    limits.check(raw.len())?;
    if raw.is_empty() {
        return Ok(None);
    }
    serde_json::from_str(raw)
        .map(Some)
        .map_err(|e| MmError::RequestDecode(e.to_string()))
}

/// Positional array -> envelope.
pub fn from_wire(value: Value) -> Result<Envelope, DecodeError> {
    let Value::Array(mut slots) = value else {
        return Err(MmError::RequestDecode("frame must be an array".into()).into());
    };
    // extra members beyond the id slot are ignored
    slots.truncate(4);
    let len = slots.len();
    let mut slots = slots.into_iter();

    let head = slots.next();
    let payload = slots.next();
    let meta = slots.next();
    let id = slots.next();

    // id first so later failures can still be correlated
    let id = match id.map(decode_id).transpose() {
        Ok(id) => id.flatten(),
        Err(e) => return Err(DecodeError::bare(e)),
    };

    let call = match head {
        Some(Value::String(s)) => Head::Method(s),
        Some(Value::Object(map)) => {
            let err: WireError = serde_json::from_value(Value::Object(map)).map_err(|e| DecodeError {
                error: MmError::RequestDecode(format!("invalid error head: {e}")),
                id: id.clone(),
            })?;
            Head::Error(err)
        }
        Some(_) => {
            return Err(DecodeError {
                error: MmError::RequestDecode("call must be a string".into()),
                id,
            })
        }
        None => {
            return Err(DecodeError {
                error: MmError::RequestDecode("empty frame".into()),
                id,
            })
        }
    };

    Ok(Envelope {
        call,
        payload: slot(payload, 1, len),
        meta: slot(meta, 2, len),
        id,
        raw: false,
    })
}

fn slot(v: Option<Value>, pos: usize, len: usize) -> Option<Value> {
    match v {
        Some(Value::String(s)) if s == PLACEHOLDER && pos + 1 < len => None,
        other => other,
    }
}

fn decode_id(v: Value) -> Result<Option<CorrelationId>, MmError> {
    match v {
        Value::Null => Ok(None),
        Value::String(s) if s.is_empty() => Ok(None),
        Value::String(s) => Ok(Some(CorrelationId::Text(s))),
        Value::Number(n) => Ok(Some(CorrelationId::Number(n))),
        _ => Err(MmError::RequestDecode("id must be a string or number".into())),
    }
}

/// Envelope -> positional array.
///
/// Absent members that precede a present one are filled with `""` so the
/// peer's positional decode stays unambiguous; trailing absent members are
/// omitted.
pub fn to_wire(env: &Envelope) -> Value {
    let head = match &env.call {
        Head::Method(m) => Value::String(m.clone()),
        Head::Error(e) => serde_json::to_value(e).unwrap_or(Value::Null),
    };

    let mut slots = vec![
        Some(head),
        env.payload.clone(),
        env.meta.clone(),
        env.id.as_ref().map(CorrelationId::to_value),
    ];
    while matches!(slots.last(), Some(None)) {
        slots.pop();
    }

    Value::Array(
        slots
            .into_iter()
            .map(|s| s.unwrap_or_else(|| Value::String(PLACEHOLDER.to_string())))
            .collect(),
    )
}

/// Encode an envelope as frame text.
///
/// Serialization failures never escape: they fall back to a `ResponseEncode`
/// error frame addressed to the same id.
pub fn encode_frame(env: &Envelope) -> String {
    match serde_json::to_string(&to_wire(env)) {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!(error = %e, "response encode failed; sending fallback frame");
            let fallback = Envelope::failure(env.id.clone(), &MmError::ResponseEncode(e.to_string()));
            serde_json::to_string(&to_wire(&fallback))
                .unwrap_or_else(|_| String::from("[{\"code\":4240,\"message\":\"Response encode error\"}]"))
        }
    }
}
