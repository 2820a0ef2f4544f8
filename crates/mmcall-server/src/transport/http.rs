//! Request/response adapter.
//!
//! Out-of-band fields:
//! - `X-MMCall`: method name. Without it the body (or `d`) must be a full
//!   positional frame.
//! - `X-MMHead`: meta; JSON when it parses, otherwise the raw string.
//! - `X-MMId`: correlation id; numeric only when it reads back unchanged
//!   (`12` is a number, `007` stays text).
//!
//! With `X-MMCall` the payload is decoded value-only: from the `d` query
//! parameter for GET, from the body otherwise. Multipart bodies and raw
//! endpoints are not read; the handler gets the native request instead.
//!
//! Dispatch runs on its own task so a client that disconnects mid-call does
//! not cancel a handler that already started.

use std::collections::HashMap;

use axum::body::{self, Body};
use axum::extract::{Query, Request};
use axum::http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use axum::http::{request::Parts, HeaderMap, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use http_body_util::LengthLimitError;
use serde_json::Value;

use mmcall_core::error::MmError;
use mmcall_core::protocol::{CorrelationId, DecodeError, Envelope, Limits, ProtocolVersion};

use crate::app_state::AppState;
use crate::dispatch::Inbound;
use crate::transport::native::{HttpRequest, NativeRequest};

pub const HEADER_CALL: &str = "x-mmcall";
pub const HEADER_META: &str = "x-mmhead";
pub const HEADER_ID: &str = "x-mmid";
pub const QUERY_PAYLOAD: &str = "d";

pub async fn handle(app: AppState, version: ProtocolVersion, req: Request) -> Response {
    if req.method() == Method::OPTIONS {
        return StatusCode::NO_CONTENT.into_response();
    }

    let inbound = extract(&app, version, req).await;
    let dispatcher = app.dispatcher();
    let task = tokio::spawn(async move { dispatcher.respond(version, inbound).await });

    match task.await {
        Ok(Some(frame)) => json_reply(frame),
        Ok(None) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "dispatch task failed");
            let env = Envelope::failure(None, &MmError::call("dispatch task failed"));
            json_reply((version.codec().encode_frame)(&env))
        }
    }
}

fn json_reply(frame: String) -> Response {
    (
        StatusCode::OK,
        [(CONTENT_TYPE, HeaderValue::from_static("application/json"))],
        frame,
    )
        .into_response()
}

/// Turn the native request into an inbound message. Extraction failures are
/// carried as decode errors so they still get a correlated reply.
async fn extract(app: &AppState, version: ProtocolVersion, req: Request) -> Inbound {
    let (parts, body) = req.into_parts();
    let limits = app.limits();

    let id = header_str(&parts.headers, HEADER_ID).map(correlation_id);
    let meta = header_str(&parts.headers, HEADER_META).map(parse_meta);
    let call = header_str(&parts.headers, HEADER_CALL).map(str::to_string);

    let fail = |error: MmError| Inbound::new(Err(DecodeError { error, id: id.clone() }));

    if let Some(call) = &call {
        if is_multipart(&parts.headers) || app.dispatcher().is_raw(call) {
            let mut env = Envelope::request(call.clone(), None);
            env.raw = true;
            env.meta = meta;
            env.id = id.clone();
            let native = NativeRequest::Http(HttpRequest {
                method: parts.method,
                uri: parts.uri,
                headers: parts.headers,
                body,
            });
            return Inbound::new(Ok(env)).with_native(native);
        }
    } else if is_multipart(&parts.headers) {
        return fail(MmError::RequestDecode(format!(
            "multipart requests need the {HEADER_CALL} header"
        )));
    }

    let text = match read_text(&parts, body, &limits).await {
        Ok(t) => t,
        Err(e) => return fail(e),
    };

    let codec = version.codec();
    let decoded = match call {
        Some(call) => (codec.decode_value)(&text, &limits)
            .map(|payload| {
                let mut env = Envelope::request(call, payload);
                env.meta = meta;
                env.id = id.clone();
                env
            })
            .map_err(DecodeError::from),
        None => (codec.decode_frame)(&text, &limits).map(|mut env| {
            // headers fill in what the frame left out
            if env.meta.is_none() {
                env.meta = meta;
            }
            if env.id.is_none() {
                env.id = id.clone();
            }
            env
        }),
    };

    match decoded {
        Ok(env) => Inbound::new(Ok(env)),
        Err(mut e) => {
            if e.id.is_none() {
                e.id = id;
            }
            Inbound::new(Err(e))
        }
    }
}

/// Raw payload text: the `d` query parameter for GET/HEAD, the body otherwise.
async fn read_text(parts: &Parts, body: Body, limits: &Limits) -> Result<String, MmError> {
    if parts.method == Method::GET || parts.method == Method::HEAD {
        let query = Query::<HashMap<String, String>>::try_from_uri(&parts.uri)
            .map_err(|e| MmError::RequestDecode(format!("bad query string: {e}")))?;
        return Ok(query.0.get(QUERY_PAYLOAD).cloned().unwrap_or_default());
    }

    if let Some(len) = header_str(&parts.headers, CONTENT_LENGTH.as_str()).and_then(|v| v.parse::<usize>().ok()) {
        limits.check(len)?;
    }

    let cap = limits.max_bytes.unwrap_or(usize::MAX);
    let bytes = body::to_bytes(body, cap).await.map_err(|e| {
        if hit_length_limit(&e) {
            MmError::RequestTooLarge { limit: cap }
        } else {
            MmError::RequestDecode(format!("body read failed: {e}"))
        }
    })?;
    if !bytes.is_empty() && !is_json(&parts.headers) {
        let ct = header_str(&parts.headers, CONTENT_TYPE.as_str()).unwrap_or_default();
        return Err(MmError::UnsupportedMedia(ct.to_string()));
    }
    utf8(bytes)
}

fn hit_length_limit(e: &(dyn std::error::Error + 'static)) -> bool {
    let mut cur = Some(e);
    while let Some(err) = cur {
        if err.is::<LengthLimitError>() {
            return true;
        }
        cur = err.source();
    }
    false
}

fn utf8(bytes: Bytes) -> Result<String, MmError> {
    String::from_utf8(bytes.to_vec()).map_err(|e| MmError::RequestDecode(format!("body is not utf-8: {e}")))
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn mime(headers: &HeaderMap) -> Option<String> {
    let ct = header_str(headers, CONTENT_TYPE.as_str())?;
    let essence = ct.split(';').next().unwrap_or_default().trim();
    Some(essence.to_ascii_lowercase())
}

fn is_multipart(headers: &HeaderMap) -> bool {
    matches!(
        mime(headers).as_deref(),
        Some("multipart/form-data") | Some("multipart/related")
    )
}

/// A missing content type is taken as JSON.
fn is_json(headers: &HeaderMap) -> bool {
    match mime(headers) {
        None => true,
        Some(m) => m == "application/json" || m.ends_with("+json"),
    }
}

fn parse_meta(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn correlation_id(raw: &str) -> CorrelationId {
    match raw.parse::<u64>() {
        Ok(n) if n.to_string() == raw => CorrelationId::from(n),
        _ => CorrelationId::from(raw),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meta_header_falls_back_to_string() {
        assert_eq!(parse_meta(r#"{"token":"t"}"#), serde_json::json!({"token": "t"}));
        assert_eq!(parse_meta("plain-token"), Value::String("plain-token".into()));
    }

    #[test]
    fn content_type_parameters_are_ignored() {
        let mut h = HeaderMap::new();
        h.insert(CONTENT_TYPE, HeaderValue::from_static("application/json; charset=utf-8"));
        assert!(is_json(&h));
        h.insert(CONTENT_TYPE, HeaderValue::from_static("multipart/form-data; boundary=x"));
        assert!(is_multipart(&h));
        assert!(!is_json(&h));
    }

    #[test]
    fn numeric_ids_stay_numeric() {
        assert_eq!(correlation_id("12"), CorrelationId::from(12u64));
        assert_eq!(correlation_id("abc"), CorrelationId::from("abc"));
        assert_eq!(correlation_id("007"), CorrelationId::from("007"));
        assert_eq!(correlation_id("+5"), CorrelationId::from("+5"));
    }
}
