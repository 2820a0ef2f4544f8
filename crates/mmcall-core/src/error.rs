//! Shared error type across mmcall crates.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Client-facing numeric error codes (stable API).
///
/// Consumers branch on the number, never on the message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum ErrorCode {
    /// Generic error returned by business logic.
    Call = 4000,
    /// Missing or invalid credential on a protected method.
    Unauthorized = 4100,
    /// Auth provider unknown or inactive.
    ProviderNotFound = 4104,
    /// Credential was valid once but has expired.
    TokenExpired = 4110,
    /// Payload rejected by the request schema.
    RequestValidation = 4200,
    /// Handler result rejected by the response schema.
    ResponseValidation = 4210,
    /// Raw message larger than the configured limit.
    RequestTooLarge = 4220,
    /// Raw message could not be parsed.
    RequestDecode = 4230,
    /// Response could not be serialized.
    ResponseEncode = 4240,
    /// Body content type not understood by the transport.
    UnsupportedMedia = 4250,
    /// Call refused by server configuration.
    Forbidden = 4300,
    /// No endpoint registered under the requested name.
    MethodNotFound = 4400,
    /// Entity already exists.
    Duplicate = 4500,
    /// Entity does not exist.
    NotFound = 4540,
}

impl ErrorCode {
    pub fn as_u16(self) -> u16 {
        self as u16
    }

    /// Base message used as the prefix of every wire error message.
    pub fn base_message(self) -> &'static str {
        match self {
            ErrorCode::Call => "Error",
            ErrorCode::Unauthorized => "Unauthorized",
            ErrorCode::ProviderNotFound => "Auth provider not found",
            ErrorCode::TokenExpired => "Token expired",
            ErrorCode::RequestValidation => "Request validation failed",
            ErrorCode::ResponseValidation => "Response validation failed",
            ErrorCode::RequestTooLarge => "Request entity too large",
            ErrorCode::RequestDecode => "Request decode error",
            ErrorCode::ResponseEncode => "Response encode error",
            ErrorCode::UnsupportedMedia => "Unsupported media",
            ErrorCode::Forbidden => "Forbidden",
            ErrorCode::MethodNotFound => "Method not found",
            ErrorCode::Duplicate => "Duplicate entity",
            ErrorCode::NotFound => "Not found",
        }
    }

    pub fn from_u16(code: u16) -> Option<Self> {
        let code = match code {
            4000 => ErrorCode::Call,
            4100 => ErrorCode::Unauthorized,
            4104 => ErrorCode::ProviderNotFound,
            4110 => ErrorCode::TokenExpired,
            4200 => ErrorCode::RequestValidation,
            4210 => ErrorCode::ResponseValidation,
            4220 => ErrorCode::RequestTooLarge,
            4230 => ErrorCode::RequestDecode,
            4240 => ErrorCode::ResponseEncode,
            4250 => ErrorCode::UnsupportedMedia,
            4300 => ErrorCode::Forbidden,
            4400 => ErrorCode::MethodNotFound,
            4500 => ErrorCode::Duplicate,
            4540 => ErrorCode::NotFound,
            _ => return None,
        };
        Some(code)
    }
}

/// Error object carried in the head slot of a response frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WireError {
    pub code: u16,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl WireError {
    pub fn new(code: ErrorCode, detail: Option<&str>, data: Option<Value>) -> Self {
        let message = match detail {
            Some(d) if !d.is_empty() => format!("{}. {d}", code.base_message()),
            _ => code.base_message().to_string(),
        };
        Self {
            code: code.as_u16(),
            message,
            data,
        }
    }

    /// Known code, if the peer sent one of the stable values.
    pub fn known_code(&self) -> Option<ErrorCode> {
        ErrorCode::from_u16(self.code)
    }
}

/// One schema violation, reported inside validation error `data`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    /// JSON pointer into the offending value.
    pub path: String,
    pub message: String,
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, MmError>;

/// Unified error type used by core and server.
#[derive(Debug, Clone, Error)]
pub enum MmError {
    #[error("call failed: {message}")]
    Call { message: String, data: Option<Value> },
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("auth provider not found: {0}")]
    ProviderNotFound(String),
    #[error("token expired")]
    TokenExpired,
    #[error("request validation failed")]
    RequestValidation(Vec<ValidationIssue>),
    #[error("response validation failed")]
    ResponseValidation(Vec<ValidationIssue>),
    #[error("request too large (limit {limit} bytes)")]
    RequestTooLarge { limit: usize },
    #[error("request decode: {0}")]
    RequestDecode(String),
    #[error("response encode: {0}")]
    ResponseEncode(String),
    #[error("unsupported media: {0}")]
    UnsupportedMedia(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("method not found: {0}")]
    MethodNotFound(String),
    #[error("duplicate: {0}")]
    Duplicate(String),
    #[error("not found: {0}")]
    NotFound(String),
    /// Application-defined code outside the stable table.
    #[error("error {code}: {message}")]
    Custom {
        code: u16,
        message: String,
        data: Option<Value>,
    },
    /// Invalid configuration. Boot-time only.
    #[error("config: {0}")]
    Config(String),
    /// Registry or schema construction failure. Boot-time only.
    #[error("boot: {0}")]
    Boot(String),
}

impl MmError {
    /// Shorthand for a generic handler failure.
    pub fn call(message: impl Into<String>) -> Self {
        MmError::Call {
            message: message.into(),
            data: None,
        }
    }

    /// Map to the stable client-facing code.
    ///
    /// `Custom` errors whose number is not part of the table report `Call`;
    /// their own number still reaches the wire through [`MmError::to_wire`].
    pub fn code(&self) -> ErrorCode {
        match self {
            MmError::Call { .. } => ErrorCode::Call,
            MmError::Unauthorized(_) => ErrorCode::Unauthorized,
            MmError::ProviderNotFound(_) => ErrorCode::ProviderNotFound,
            MmError::TokenExpired => ErrorCode::TokenExpired,
            MmError::RequestValidation(_) => ErrorCode::RequestValidation,
            MmError::ResponseValidation(_) => ErrorCode::ResponseValidation,
            MmError::RequestTooLarge { .. } => ErrorCode::RequestTooLarge,
            MmError::RequestDecode(_) => ErrorCode::RequestDecode,
            MmError::ResponseEncode(_) => ErrorCode::ResponseEncode,
            MmError::UnsupportedMedia(_) => ErrorCode::UnsupportedMedia,
            MmError::Forbidden(_) => ErrorCode::Forbidden,
            MmError::MethodNotFound(_) => ErrorCode::MethodNotFound,
            MmError::Duplicate(_) => ErrorCode::Duplicate,
            MmError::NotFound(_) => ErrorCode::NotFound,
            MmError::Custom { code, .. } => ErrorCode::from_u16(*code).unwrap_or(ErrorCode::Call),
            MmError::Config(_) | MmError::Boot(_) => ErrorCode::Call,
        }
    }

    /// Error object for the head slot of a response frame.
    pub fn to_wire(&self) -> WireError {
        match self {
            MmError::Call { message, data } => {
                WireError::new(ErrorCode::Call, Some(message), data.clone())
            }
            MmError::Unauthorized(detail) => WireError::new(ErrorCode::Unauthorized, Some(detail), None),
            MmError::ProviderNotFound(name) => WireError::new(
                ErrorCode::ProviderNotFound,
                None,
                Some(Value::String(name.clone())),
            ),
            MmError::TokenExpired => WireError::new(ErrorCode::TokenExpired, None, None),
            MmError::RequestValidation(issues) => {
                WireError::new(ErrorCode::RequestValidation, None, Some(issues_value(issues)))
            }
            MmError::ResponseValidation(issues) => {
                WireError::new(ErrorCode::ResponseValidation, None, Some(issues_value(issues)))
            }
            MmError::RequestTooLarge { limit } => WireError::new(
                ErrorCode::RequestTooLarge,
                Some(&format!("limit is {limit} bytes")),
                None,
            ),
            MmError::RequestDecode(detail) => WireError::new(ErrorCode::RequestDecode, Some(detail), None),
            MmError::ResponseEncode(detail) => WireError::new(ErrorCode::ResponseEncode, Some(detail), None),
            MmError::UnsupportedMedia(detail) => {
                WireError::new(ErrorCode::UnsupportedMedia, Some(detail), None)
            }
            MmError::Forbidden(detail) => WireError::new(ErrorCode::Forbidden, Some(detail), None),
            MmError::MethodNotFound(call) => WireError::new(
                ErrorCode::MethodNotFound,
                None,
                Some(Value::String(call.clone())),
            ),
            MmError::Duplicate(detail) => WireError::new(ErrorCode::Duplicate, Some(detail), None),
            MmError::NotFound(detail) => WireError::new(ErrorCode::NotFound, Some(detail), None),
            MmError::Custom { code, message, data } => WireError {
                code: *code,
                message: message.clone(),
                data: data.clone(),
            },
            // never meant for the wire; keep internals out of the message
            MmError::Config(_) | MmError::Boot(_) => WireError::new(ErrorCode::Call, None, None),
        }
    }
}

fn issues_value(issues: &[ValidationIssue]) -> Value {
    serde_json::to_value(issues).unwrap_or(Value::Null)
}
