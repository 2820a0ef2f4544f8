//! Method registry: immutable `namespace.method` -> [`Endpoint`] table built
//! once at boot from declared resources.

pub mod resource;

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde_json::{Map, Value};

use mmcall_core::error::{MmError, Result};

use crate::auth::AuthPolicy;
use crate::validate::{CompiledSchema, SchemaCompiler};

pub use resource::{
    handler, sync_handler, BootContext, CallContext, Handler, HandlerFuture, MethodSpec, Resource,
};

/// Registry entry binding a method name to its handler and policies.
pub struct Endpoint {
    pub name: String,
    pub handler: Handler,
    pub auth: AuthPolicy,
    pub request: Option<Arc<CompiledSchema>>,
    /// Only compiled when response validation is enabled.
    pub response: Option<Arc<CompiledSchema>>,
    pub raw: bool,
}

/// Discovery view of one method.
#[derive(Debug, Clone)]
pub struct Descriptor {
    pub auth: AuthPolicy,
    pub request: Option<Value>,
    pub response: Option<Value>,
    pub title: Option<String>,
    pub description: Option<String>,
}

impl Descriptor {
    pub fn to_value(&self) -> Value {
        let mut out = Map::new();
        let auth = if self.auth.is_none() {
            Value::Bool(false)
        } else {
            serde_json::to_value(&self.auth).unwrap_or(Value::Bool(false))
        };
        out.insert("auth".into(), auth);
        if let Some(r) = &self.request {
            out.insert("request".into(), r.clone());
        }
        if let Some(r) = &self.response {
            out.insert("response".into(), r.clone());
        }
        if let Some(t) = &self.title {
            out.insert("title".into(), Value::String(t.clone()));
        }
        if let Some(d) = &self.description {
            out.insert("description".into(), Value::String(d.clone()));
        }
        Value::Object(out)
    }
}

pub struct MethodRegistry {
    endpoints: HashMap<String, Arc<Endpoint>>,
    namespaces: BTreeMap<String, BTreeMap<String, Descriptor>>,
}

impl MethodRegistry {
    pub fn builder<'a>(ctx: BootContext<'a>, validate_responses: bool) -> RegistryBuilder<'a> {
        RegistryBuilder {
            ctx,
            validate_responses,
            compiler: SchemaCompiler::new(),
            endpoints: HashMap::new(),
            namespaces: BTreeMap::new(),
        }
    }

    pub fn resolve(&self, name: &str) -> Option<Arc<Endpoint>> {
        self.endpoints.get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    /// Registered namespaces, sorted.
    pub fn namespaces(&self) -> impl Iterator<Item = &str> {
        self.namespaces.keys().map(String::as_str)
    }

    /// Method names in `ns`, sorted; `None` for an unknown namespace.
    pub fn methods(&self, ns: &str) -> Option<impl Iterator<Item = &str>> {
        self.namespaces
            .get(ns)
            .map(|m| m.keys().map(String::as_str))
    }

    pub fn descriptor(&self, ns: &str, method: &str) -> Option<&Descriptor> {
        self.namespaces.get(ns)?.get(method)
    }
}

pub struct RegistryBuilder<'a> {
    ctx: BootContext<'a>,
    validate_responses: bool,
    compiler: SchemaCompiler,
    endpoints: HashMap<String, Arc<Endpoint>>,
    namespaces: BTreeMap<String, BTreeMap<String, Descriptor>>,
}

impl RegistryBuilder<'_> {
    /// Add every method of `resource`.
    ///
    /// A method without a handler is skipped with a warning. A spec function
    /// that fails, or a schema that does not compile, aborts the build.
    pub fn register(&mut self, resource: Resource) -> Result<&mut Self> {
        let ns = resource.namespace;
        if ns.is_empty() || ns.contains(['.', '?']) {
            return Err(MmError::Boot(format!("invalid namespace {ns:?}")));
        }
        if self.namespaces.contains_key(&ns) {
            return Err(MmError::Duplicate(format!("namespace {ns}")));
        }

        let mut methods = BTreeMap::new();
        for (method, spec_fn) in resource.methods {
            if method.is_empty() || method.contains(['.', '?']) {
                return Err(MmError::Boot(format!("invalid method name {ns}.{method:?}")));
            }
            let name = format!("{ns}.{method}");
            let spec = spec_fn(&self.ctx)
                .map_err(|e| MmError::Boot(format!("{name} schema error: {e}")))?;

            let Some(handler) = spec.handler else {
                tracing::warn!(method = %name, "declared method has no handler; skipped");
                continue;
            };

            let request = spec
                .request
                .as_ref()
                .map(|s| self.compiler.add(format!("{name}:request"), s))
                .transpose()?;
            let response = match (&spec.response, self.validate_responses) {
                (Some(s), true) => Some(self.compiler.add(format!("{name}:response"), s)?),
                _ => None,
            };

            methods.insert(
                method,
                Descriptor {
                    auth: spec.auth.clone(),
                    request: spec.request,
                    response: spec.response,
                    title: spec.title,
                    description: spec.description,
                },
            );
            self.endpoints.insert(
                name.clone(),
                Arc::new(Endpoint {
                    name,
                    handler,
                    auth: spec.auth,
                    request,
                    response,
                    raw: spec.raw,
                }),
            );
        }

        tracing::debug!(namespace = %ns, methods = methods.len(), "resource registered");
        self.namespaces.insert(ns, methods);
        Ok(self)
    }

    pub fn build(self) -> MethodRegistry {
        MethodRegistry {
            endpoints: self.endpoints,
            namespaces: self.namespaces,
        }
    }
}
