use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use serde_json::Value;

use mmcall_core::error::{MmError, Result};
use mmcall_core::protocol::{DecodeError, Envelope, Head, ProtocolVersion};

use crate::auth::{credential, AuthGateway, Identity};
use crate::discovery;
use crate::dispatch::throttle::Throttle;
use crate::registry::{CallContext, Endpoint, Handler, MethodRegistry};
use crate::transport::NativeRequest;

/// Pipeline stages, in order. Only used for tracing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Received,
    Decoded,
    AuthChecked,
    Validated,
    Invoked,
    ResultValidated,
    Sent,
    Dropped,
}

/// Policy switches resolved from config at boot.
#[derive(Debug, Clone, Copy)]
pub struct DispatchOptions {
    pub discovery: bool,
    pub validate_responses: bool,
    pub reject_invalid_optional_credentials: bool,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self {
            discovery: true,
            validate_responses: false,
            reject_invalid_optional_credentials: false,
        }
    }
}

/// One message as handed over by a transport adapter.
pub struct Inbound {
    pub decoded: std::result::Result<Envelope, DecodeError>,
    pub native: Option<NativeRequest>,
}

impl Inbound {
    pub fn new(decoded: std::result::Result<Envelope, DecodeError>) -> Self {
        Self {
            decoded,
            native: None,
        }
    }

    pub fn with_native(mut self, native: NativeRequest) -> Self {
        self.native = Some(native);
        self
    }
}

/// Terminal result of one dispatch.
#[derive(Debug)]
pub enum Outcome {
    Reply(Envelope),
    /// Unsolicited input; no response owed.
    Dropped,
}

/// Transport- and version-agnostic call pipeline.
///
/// Holds only read-only shared state, so one instance serves every task.
pub struct Dispatcher {
    registry: Arc<MethodRegistry>,
    auth: Arc<AuthGateway>,
    opts: DispatchOptions,
    throttle: Option<Throttle>,
}

impl Dispatcher {
    pub fn new(registry: Arc<MethodRegistry>, auth: Arc<AuthGateway>, opts: DispatchOptions) -> Self {
        Self {
            registry,
            auth,
            opts,
            throttle: None,
        }
    }

    pub fn with_throttle(mut self, throttle: Option<Throttle>) -> Self {
        self.throttle = throttle;
        self
    }

    pub fn registry(&self) -> &MethodRegistry {
        &self.registry
    }

    /// True when `call` resolves to a raw endpoint.
    pub fn is_raw(&self, call: &str) -> bool {
        self.registry.resolve(call).is_some_and(|e| e.raw)
    }

    /// Run the full pipeline and encode the reply with the pinned codec.
    /// `None` means the message was dropped.
    pub async fn respond(&self, version: ProtocolVersion, inbound: Inbound) -> Option<String> {
        let env = match self.dispatch(inbound).await {
            Outcome::Reply(env) => env,
            Outcome::Dropped => return None,
        };
        let frame = (version.codec().encode_frame)(&env);
        if let Some(t) = &self.throttle {
            t.pause().await;
        }
        tracing::debug!(stage = ?Stage::Sent, id = ?env.id, error = env.is_error(), "reply ready");
        Some(frame)
    }

    /// Decoded -> ... -> ResultValidated. Every failure after decode becomes
    /// an error reply; nothing escapes.
    pub async fn dispatch(&self, inbound: Inbound) -> Outcome {
        let Inbound { decoded, native } = inbound;

        let env = match decoded {
            Ok(env) => env,
            Err(DecodeError { error, id }) => {
                tracing::debug!(stage = ?Stage::Received, code = error.code().as_u16(), "decode failed");
                return Outcome::Reply(Envelope::failure(id, &error));
            }
        };

        // an empty head or an error head is a response frame; nothing is owed
        let call = match &env.call {
            Head::Method(m) if !m.is_empty() => m.clone(),
            Head::Method(_) => {
                tracing::debug!(stage = ?Stage::Dropped, id = ?env.id, "unsolicited response frame");
                return Outcome::Dropped;
            }
            Head::Error(e) => {
                tracing::debug!(stage = ?Stage::Dropped, code = e.code, "unsolicited error frame");
                return Outcome::Dropped;
            }
        };
        tracing::debug!(stage = ?Stage::Decoded, method = %call, id = ?env.id);

        let id = env.id.clone();
        let result = match discovery::target(&call) {
            Some(address) => self.discover(address),
            None => self.call(&call, env, native).await,
        };

        Outcome::Reply(match result {
            Ok(body) => Envelope::success(id, Some(body)),
            Err(e) => {
                tracing::debug!(method = %call, code = e.code().as_u16(), error = %e, "call failed");
                Envelope::failure(id, &e)
            }
        })
    }

    fn discover(&self, address: &str) -> Result<Value> {
        if !self.opts.discovery {
            return Err(MmError::Forbidden("discovery is disabled".into()));
        }
        discovery::describe(&self.registry, address)
    }

    async fn call(&self, call: &str, env: Envelope, native: Option<NativeRequest>) -> Result<Value> {
        let endpoint = self
            .registry
            .resolve(call)
            .ok_or_else(|| MmError::MethodNotFound(call.to_string()))?;

        let identity = self.authenticate(&endpoint, env.meta.as_ref()).await?;
        tracing::debug!(stage = ?Stage::AuthChecked, method = %call, authed = identity.is_some());

        let raw = endpoint.raw || env.raw;
        if !raw {
            if let Some(schema) = &endpoint.request {
                let payload = env.payload.as_ref().unwrap_or(&Value::Null);
                schema.check(payload).map_err(MmError::RequestValidation)?;
            }
        }
        tracing::debug!(stage = ?Stage::Validated, method = %call, raw);

        let ctx = CallContext {
            call: call.to_string(),
            id: env.id,
            identity,
            payload: env.payload,
            native: if raw { native } else { None },
        };
        let result = invoke(&endpoint.handler, ctx).await?;
        tracing::debug!(stage = ?Stage::Invoked, method = %call);

        if self.opts.validate_responses {
            if let Some(schema) = &endpoint.response {
                schema.check(&result).map_err(MmError::ResponseValidation)?;
            }
        }
        tracing::debug!(stage = ?Stage::ResultValidated, method = %call);

        Ok(result)
    }

    /// Verify when the endpoint requires it or the caller sent meta.
    /// Failures on an optional policy are ignored unless configured otherwise.
    async fn authenticate(&self, endpoint: &Endpoint, meta: Option<&Value>) -> Result<Option<Identity>> {
        if !endpoint.auth.required && meta.is_none() {
            return Ok(None);
        }

        match self.auth.verify(&endpoint.auth, meta).await {
            Ok(identity) => Ok(Some(identity)),
            Err(e) if endpoint.auth.required => Err(auth_failure(e)),
            Err(e)
                if self.opts.reject_invalid_optional_credentials
                    && endpoint.auth.provider.is_some()
                    && credential(meta).is_some() =>
            {
                Err(auth_failure(e))
            }
            Err(e) => {
                tracing::debug!(method = %endpoint.name, error = %e, "optional auth failed; continuing anonymously");
                Ok(None)
            }
        }
    }
}

/// A missing provider keeps its code; every other credential failure,
/// expiry included, reaches the caller as `Unauthorized`.
fn auth_failure(e: MmError) -> MmError {
    match e {
        MmError::Unauthorized(_) | MmError::ProviderNotFound(_) => e,
        other => MmError::Unauthorized(other.to_string()),
    }
}

/// Call the handler; a panic, whether raised while building the future or
/// while polling it, folds into a `Call` error like any returned failure.
async fn invoke(handler: &Handler, ctx: CallContext) -> Result<Value> {
    let handler = Arc::clone(handler);
    let fut = async move { handler(ctx).await };
    match AssertUnwindSafe(fut).catch_unwind().await {
        Ok(res) => res,
        Err(panic) => Err(MmError::call(panic_message(panic.as_ref()))),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "handler panicked".to_string()
    }
}
