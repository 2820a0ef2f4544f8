//! Discovery: the registry exposed as data.
//!
//! Addresses (after stripping the trailing `?`):
//! - `""`          -> namespace list
//! - `"ns"`        -> method list of `ns`
//! - `"ns.method"` -> endpoint descriptor

use serde_json::Value;

use mmcall_core::error::{MmError, Result};

use crate::registry::MethodRegistry;

/// Reserved suffix marking a discovery call.
pub const MARKER: char = '?';

/// Discovery address of `call`, if it is a discovery call.
pub fn target(call: &str) -> Option<&str> {
    call.strip_suffix(MARKER)
}

pub fn describe(registry: &MethodRegistry, address: &str) -> Result<Value> {
    if address.is_empty() {
        return Ok(strings(registry.namespaces()));
    }

    if let Some(methods) = registry.methods(address) {
        return Ok(strings(methods));
    }

    let (ns, method) = address
        .rsplit_once('.')
        .ok_or_else(|| MmError::MethodNotFound(address.to_string()))?;
    registry
        .descriptor(ns, method)
        .map(|d| d.to_value())
        .ok_or_else(|| MmError::MethodNotFound(address.to_string()))
}

fn strings<'a>(it: impl Iterator<Item = &'a str>) -> Value {
    Value::Array(it.map(|s| Value::String(s.to_string())).collect())
}
