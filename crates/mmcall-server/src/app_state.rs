//! Shared application state.
//!
//! Built once at boot: providers, registry and dispatcher are read-only
//! afterwards, so handlers and transports share them without locking.
//! Startup errors are returned, never panicked.

use std::sync::Arc;

use mmcall_core::error::Result;
use mmcall_core::protocol::Limits;

use crate::auth::AuthGateway;
use crate::config::ServerConfig;
use crate::dispatch::{DispatchOptions, Dispatcher, Throttle};
use crate::registry::{BootContext, MethodRegistry, Resource};

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
    dispatcher: Arc<Dispatcher>,
}

struct AppStateInner {
    cfg: ServerConfig,
    limits: Limits,
    auth: Arc<AuthGateway>,
}

impl AppState {
    /// Build state with providers taken from `cfg.auth`.
    pub fn new(cfg: ServerConfig, resources: Vec<Resource>) -> Result<Self> {
        let auth = AuthGateway::from_config(&cfg.auth)?;
        Self::with_auth(cfg, auth, resources)
    }

    /// Build state around a prepared gateway (custom providers registered).
    pub fn with_auth(cfg: ServerConfig, auth: AuthGateway, resources: Vec<Resource>) -> Result<Self> {
        let auth = Arc::new(auth);
        let validate_responses = cfg.validate_responses();

        let registry = {
            let ctx = BootContext {
                config: &cfg,
                auth: Arc::clone(&auth),
            };
            let mut builder = MethodRegistry::builder(ctx, validate_responses);
            for resource in resources {
                builder.register(resource)?;
            }
            builder.build()
        };
        tracing::info!(methods = registry.len(), "registry built");

        let opts = DispatchOptions {
            discovery: cfg.server.discovery,
            validate_responses,
            reject_invalid_optional_credentials: cfg.policy.reject_invalid_optional_credentials,
        };
        let dispatcher = Dispatcher::new(Arc::new(registry), Arc::clone(&auth), opts)
            .with_throttle(Throttle::from_config(cfg.server.throttle_response.as_ref()));

        let limits = Limits::new(cfg.codec.limit_bytes);

        Ok(Self {
            inner: Arc::new(AppStateInner { cfg, limits, auth }),
            dispatcher: Arc::new(dispatcher),
        })
    }

    pub fn cfg(&self) -> &ServerConfig {
        &self.inner.cfg
    }

    pub fn limits(&self) -> Limits {
        self.inner.limits
    }

    pub fn auth(&self) -> Arc<AuthGateway> {
        Arc::clone(&self.inner.auth)
    }

    pub fn dispatcher(&self) -> Arc<Dispatcher> {
        Arc::clone(&self.dispatcher)
    }
}
