use axum::body;
use serde_json::{json, Number, Value};

use mmcall_core::error::{MmError, Result};

use crate::registry::{handler, sync_handler, CallContext, MethodSpec, Resource};
use crate::transport::NativeRequest;

fn pair_schema() -> Value {
    json!({
        "type": "array",
        "items": { "type": "number" },
        "minItems": 2,
        "maxItems": 2
    })
}

pub fn resource() -> Resource {
    Resource::new("math")
        .method("add", |_| {
            Ok(MethodSpec::new()
                .title("Add")
                .description("Sum of two numbers.")
                .request(pair_schema())
                .response(json!({ "type": "number" }))
                .handler(sync_handler(add)))
        })
        .method("divide", |_| {
            Ok(MethodSpec::new()
                .request(pair_schema())
                .response(json!({ "type": "number" }))
                .handler(sync_handler(divide)))
        })
        .method("echo", |boot| {
            let limit = boot.config.codec.limit_bytes;
            Ok(MethodSpec::new()
                .description("Returns its input. Raw: HTTP bodies are read by the handler.")
                .raw()
                .handler(handler(move |ctx| echo(ctx, limit))))
        })
}

fn add(ctx: CallContext) -> Result<Number> {
    let [a, b]: [Number; 2] = ctx.payload_as()?;
    // integer inputs stay integers on the wire
    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        if let Some(sum) = x.checked_add(y) {
            return Ok(sum.into());
        }
    }
    float(a.as_f64().unwrap_or_default() + b.as_f64().unwrap_or_default())
}

fn divide(ctx: CallContext) -> Result<Number> {
    let [a, b]: [f64; 2] = ctx.payload_as()?;
    if b == 0.0 {
        return Err(MmError::Call {
            message: "division by zero".into(),
            data: Some(json!({ "divisor": 0 })),
        });
    }
    float(a / b)
}

fn float(v: f64) -> Result<Number> {
    Number::from_f64(v).ok_or_else(|| MmError::call("result is not a finite number"))
}

async fn echo(ctx: CallContext, limit: usize) -> Result<Value> {
    match ctx.native {
        Some(NativeRequest::Http(req)) => {
            let bytes = body::to_bytes(req.body, limit)
                .await
                .map_err(|_| MmError::RequestTooLarge { limit })?;
            if bytes.is_empty() {
                return Ok(Value::Null);
            }
            serde_json::from_slice(&bytes)
                .or_else(|_| Ok(Value::String(String::from_utf8_lossy(&bytes).into_owned())))
        }
        _ => Ok(ctx.payload.unwrap_or(Value::Null)),
    }
}
