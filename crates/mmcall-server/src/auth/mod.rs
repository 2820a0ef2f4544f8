//! Auth gateway: resolves a named provider and verifies a credential against
//! the policy declared on an endpoint.

pub mod provider;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use mmcall_core::error::{MmError, Result};

use crate::config::ProviderConfig;

pub use provider::{HashError, Provider, SignOptions, SignedToken};

/// Auth requirement declared by an endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AuthPolicy {
    pub provider: Option<String>,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audience: Option<String>,
}

impl AuthPolicy {
    pub fn required(provider: impl Into<String>) -> Self {
        Self {
            provider: Some(provider.into()),
            required: true,
            ..Self::default()
        }
    }

    pub fn optional(provider: impl Into<String>) -> Self {
        Self {
            provider: Some(provider.into()),
            required: false,
            ..Self::default()
        }
    }

    /// True when the endpoint declared nothing at all.
    pub fn is_none(&self) -> bool {
        self.provider.is_none() && !self.required
    }

    fn options(&self) -> VerifyOptions {
        VerifyOptions {
            subject: self.subject.clone(),
            audience: self.audience.clone(),
        }
    }
}

/// Per-call overrides of provider verification settings.
#[derive(Debug, Clone, Default)]
pub struct VerifyOptions {
    pub subject: Option<String>,
    pub audience: Option<String>,
}

/// Verified caller.
#[derive(Debug, Clone, PartialEq)]
pub struct Identity {
    pub provider: String,
    pub claims: Value,
}

impl Identity {
    pub fn subject(&self) -> Option<&str> {
        self.claims.get("sub").and_then(Value::as_str)
    }
}

/// A named authentication backend.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    fn is_active(&self) -> bool;
    async fn verify(&self, token: &str, opts: &VerifyOptions) -> Result<Value>;
}

/// Read-only after bootstrap; shared across tasks without locking.
#[derive(Default)]
pub struct AuthGateway {
    verifiers: HashMap<String, Arc<dyn CredentialProvider>>,
    builtin: HashMap<String, Arc<Provider>>,
}

impl AuthGateway {
    pub fn from_config(providers: &std::collections::BTreeMap<String, ProviderConfig>) -> Result<Self> {
        let mut gw = Self::default();
        for (name, cfg) in providers {
            let p = Arc::new(Provider::from_config(name, cfg)?);
            gw.verifiers.insert(name.clone(), p.clone());
            gw.builtin.insert(name.clone(), p);
        }
        Ok(gw)
    }

    /// Register or replace the verifier used for `name`.
    pub fn with_provider(mut self, name: impl Into<String>, p: Arc<dyn CredentialProvider>) -> Self {
        self.verifiers.insert(name.into(), p);
        self
    }

    /// Built-in provider (token signing, hashing).
    pub fn provider(&self, name: &str) -> Option<Arc<Provider>> {
        self.builtin.get(name).cloned()
    }

    /// Verify `meta` against `policy`.
    ///
    /// An unknown or inactive provider fails with `ProviderNotFound`
    /// regardless of the credential.
    pub async fn verify(&self, policy: &AuthPolicy, meta: Option<&Value>) -> Result<Identity> {
        let name = policy.provider.as_deref().unwrap_or_default();
        let verifier = self
            .verifiers
            .get(name)
            .filter(|p| p.is_active())
            .ok_or_else(|| MmError::ProviderNotFound(name.to_string()))?;

        let token = credential(meta).ok_or_else(|| MmError::Unauthorized("no token provided".into()))?;
        let claims = verifier.verify(token, &policy.options()).await?;
        Ok(Identity {
            provider: name.to_string(),
            claims,
        })
    }
}

/// Credential carried in `meta`: the string itself, or `meta.token`.
pub fn credential(meta: Option<&Value>) -> Option<&str> {
    match meta? {
        Value::String(s) if !s.is_empty() => Some(s.as_str()),
        Value::Object(m) => m.get("token").and_then(Value::as_str).filter(|s| !s.is_empty()),
        _ => None,
    }
}
