//! Resource declaration: a namespace plus, per method, a function producing
//! its [`MethodSpec`] at boot.

use std::future::Future;
use std::sync::Arc;

use futures_util::future::{self, BoxFuture, FutureExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use mmcall_core::error::{MmError, Result};
use mmcall_core::protocol::CorrelationId;

use crate::auth::{AuthGateway, AuthPolicy, Identity};
use crate::config::ServerConfig;
use crate::transport::NativeRequest;

/// Everything a handler gets for one call.
pub struct CallContext {
    pub call: String,
    pub id: Option<CorrelationId>,
    pub identity: Option<Identity>,
    /// Decoded payload; `None` when absent (or unread for raw HTTP bodies).
    pub payload: Option<Value>,
    /// Native transport object; only set for raw endpoints.
    pub native: Option<NativeRequest>,
}

impl CallContext {
    /// Deserialize the payload (absent reads as `null`).
    pub fn payload_as<T: DeserializeOwned>(&self) -> Result<T> {
        let v = self.payload.clone().unwrap_or(Value::Null);
        serde_json::from_value(v).map_err(|e| MmError::call(format!("invalid arguments: {e}")))
    }

    pub fn identity(&self) -> Result<&Identity> {
        self.identity
            .as_ref()
            .ok_or_else(|| MmError::Unauthorized("no identity".into()))
    }
}

pub type HandlerFuture = BoxFuture<'static, Result<Value>>;

/// Bound method implementation. Immediate and deferred completion look the
/// same to the dispatcher: both are futures.
pub type Handler = Arc<dyn Fn(CallContext) -> HandlerFuture + Send + Sync>;

/// Wrap an async fn returning any serializable value.
pub fn handler<F, Fut, T>(f: F) -> Handler
where
    F: Fn(CallContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T>> + Send + 'static,
    T: Serialize,
{
    Arc::new(move |ctx| {
        let fut = f(ctx);
        async move { fut.await.and_then(to_body) }.boxed()
    })
}

/// Wrap a plain fn that completes immediately.
pub fn sync_handler<F, T>(f: F) -> Handler
where
    F: Fn(CallContext) -> Result<T> + Send + Sync + 'static,
    T: Serialize,
{
    Arc::new(move |ctx| future::ready(f(ctx).and_then(to_body)).boxed())
}

fn to_body<T: Serialize>(out: T) -> Result<Value> {
    serde_json::to_value(out).map_err(|e| MmError::ResponseEncode(e.to_string()))
}

/// Declared contract of one method.
#[derive(Default)]
pub struct MethodSpec {
    pub(crate) handler: Option<Handler>,
    pub(crate) auth: AuthPolicy,
    pub(crate) request: Option<Value>,
    pub(crate) response: Option<Value>,
    pub(crate) raw: bool,
    pub(crate) title: Option<String>,
    pub(crate) description: Option<String>,
}

impl MethodSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handler(mut self, h: Handler) -> Self {
        self.handler = Some(h);
        self
    }

    pub fn auth(mut self, policy: AuthPolicy) -> Self {
        self.auth = policy;
        self
    }

    pub fn request(mut self, schema: Value) -> Self {
        self.request = Some(schema);
        self
    }

    pub fn response(mut self, schema: Value) -> Self {
        self.response = Some(schema);
        self
    }

    /// Handler receives the native transport object; request schema is not applied.
    pub fn raw(mut self) -> Self {
        self.raw = true;
        self
    }

    pub fn title(mut self, t: impl Into<String>) -> Self {
        self.title = Some(t.into());
        self
    }

    pub fn description(mut self, d: impl Into<String>) -> Self {
        self.description = Some(d.into());
        self
    }
}

/// Boot-time view handed to spec functions.
pub struct BootContext<'a> {
    pub config: &'a ServerConfig,
    pub auth: Arc<AuthGateway>,
}

pub type SpecFn = Box<dyn Fn(&BootContext<'_>) -> Result<MethodSpec> + Send + Sync>;

/// A namespace of methods collected at startup.
pub struct Resource {
    pub(crate) namespace: String,
    pub(crate) methods: Vec<(String, SpecFn)>,
}

impl Resource {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            methods: Vec::new(),
        }
    }

    pub fn method<F>(mut self, name: impl Into<String>, spec: F) -> Self
    where
        F: Fn(&BootContext<'_>) -> Result<MethodSpec> + Send + Sync + 'static,
    {
        self.methods.push((name.into(), Box::new(spec)));
        self
    }
}
