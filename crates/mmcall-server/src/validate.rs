//! JSON Schema contracts for request/response payloads.
//!
//! Schemas are compiled once at boot under a unique id (`ns.method:request`,
//! `ns.method:response`). A duplicate id or a schema that fails to compile is
//! a deployment defect and aborts startup.

use std::collections::HashSet;
use std::sync::Arc;

use serde_json::Value;

use mmcall_core::error::{MmError, Result, ValidationIssue};

/// Compiled schema, tagged with its id for diagnostics.
pub struct CompiledSchema {
    id: String,
    validator: jsonschema::Validator,
}

impl CompiledSchema {
    /// Validate `value`; on failure return every violation found.
    pub fn check(&self, value: &Value) -> std::result::Result<(), Vec<ValidationIssue>> {
        let issues: Vec<ValidationIssue> = self
            .validator
            .iter_errors(value)
            .map(|e| ValidationIssue {
                path: e.instance_path.to_string(),
                message: e.to_string(),
            })
            .collect();
        if issues.is_empty() {
            Ok(())
        } else {
            Err(issues)
        }
    }
}

impl std::fmt::Debug for CompiledSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledSchema").field("id", &self.id).finish()
    }
}

/// Boot-time schema compiler; rejects duplicate ids.
#[derive(Default)]
pub struct SchemaCompiler {
    seen: HashSet<String>,
}

impl SchemaCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, id: impl Into<String>, schema: &Value) -> Result<Arc<CompiledSchema>> {
        let id = id.into();
        if !self.seen.insert(id.clone()) {
            return Err(MmError::Duplicate(format!("schema id {id}")));
        }
        let validator = jsonschema::validator_for(schema)
            .map_err(|e| MmError::Boot(format!("{id} {e}")))?;
        Ok(Arc::new(CompiledSchema { id, validator }))
    }
}
