//! Canonical in-memory form of one call or one response.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

use crate::error::{MmError, WireError};

/// Caller-supplied correlation token (string or number on the wire).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CorrelationId {
    Number(Number),
    Text(String),
}

impl CorrelationId {
    pub fn to_value(&self) -> Value {
        match self {
            CorrelationId::Number(n) => Value::Number(n.clone()),
            CorrelationId::Text(s) => Value::String(s.clone()),
        }
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CorrelationId::Number(n) => write!(f, "{n}"),
            CorrelationId::Text(s) => f.write_str(s),
        }
    }
}

impl From<u64> for CorrelationId {
    fn from(v: u64) -> Self {
        CorrelationId::Number(v.into())
    }
}

impl From<&str> for CorrelationId {
    fn from(v: &str) -> Self {
        CorrelationId::Text(v.to_string())
    }
}

impl From<String> for CorrelationId {
    fn from(v: String) -> Self {
        CorrelationId::Text(v)
    }
}

/// Head slot: a method path on calls and successful responses,
/// an error object on failed responses.
#[derive(Debug, Clone, PartialEq)]
pub enum Head {
    /// `namespace.method`; empty on successful responses.
    Method(String),
    Error(WireError),
}

impl Head {
    pub fn method(&self) -> Option<&str> {
        match self {
            Head::Method(m) => Some(m),
            Head::Error(_) => None,
        }
    }

    pub fn error(&self) -> Option<&WireError> {
        match self {
            Head::Method(_) => None,
            Head::Error(e) => Some(e),
        }
    }
}

/// One decoded call or response.
///
/// `payload: None` (member absent) is distinct from `Some(Value::Null)`.
/// `raw` never travels on the wire; transports set it for pass-through
/// delivery.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub call: Head,
    pub payload: Option<Value>,
    pub meta: Option<Value>,
    pub id: Option<CorrelationId>,
    pub raw: bool,
}

impl Envelope {
    pub fn request(call: impl Into<String>, payload: Option<Value>) -> Self {
        Self {
            call: Head::Method(call.into()),
            payload,
            meta: None,
            id: None,
            raw: false,
        }
    }

    /// Successful response correlated to `id`.
    pub fn success(id: Option<CorrelationId>, body: Option<Value>) -> Self {
        Self {
            call: Head::Method(String::new()),
            payload: body,
            meta: None,
            id,
            raw: false,
        }
    }

    /// Failed response correlated to `id`. Never carries a body.
    pub fn failure(id: Option<CorrelationId>, err: &MmError) -> Self {
        Self {
            call: Head::Error(err.to_wire()),
            payload: None,
            meta: None,
            id,
            raw: false,
        }
    }

    pub fn with_meta(mut self, meta: Value) -> Self {
        self.meta = Some(meta);
        self
    }

    pub fn with_id(mut self, id: impl Into<CorrelationId>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn method(&self) -> Option<&str> {
        self.call.method()
    }

    pub fn is_error(&self) -> bool {
        matches!(self.call, Head::Error(_))
    }
}
