//! Built-in auth provider: HMAC-signed JWTs plus bcrypt hashing.
//!
//! Token checks (signature, exp, nbf, sub, aud, iss) follow the provider's
//! configuration; subject and audience can be overridden per call. Hashing is
//! an unrelated capability that lives on the same provider so resources can
//! compare stored credentials.

use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde_json::{Map, Value};
use thiserror::Error;

use mmcall_core::error::{MmError, Result};

use super::{CredentialProvider, VerifyOptions};
use crate::config::ProviderConfig;

/// Per-call overrides for [`Provider::sign`].
#[derive(Debug, Clone, Default)]
pub struct SignOptions {
    pub expires_in_secs: Option<u64>,
    pub subject: Option<String>,
    pub audience: Option<String>,
}

/// Issued token and its absolute expiry (unix seconds).
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct SignedToken {
    pub token: String,
    pub expires: u64,
}

/// Hash comparison failures. A mismatch is not a malformed hash.
#[derive(Debug, Error)]
pub enum HashError {
    #[error("secret does not match hash")]
    Mismatch,
    #[error("malformed hash: {0}")]
    Malformed(String),
    #[error("hashing failed: {0}")]
    Failed(String),
}

impl From<HashError> for MmError {
    fn from(e: HashError) -> Self {
        match e {
            HashError::Mismatch => MmError::Unauthorized("credentials do not match".into()),
            other => MmError::call(other.to_string()),
        }
    }
}

pub struct Provider {
    name: String,
    active: bool,
    algorithm: Algorithm,
    encoding: EncodingKey,
    decoding: DecodingKey,
    expires_in_secs: u64,
    subject: Option<String>,
    audience: Option<String>,
    issuer: Option<String>,
    hash_cost: u32,
}

impl Provider {
    pub fn from_config(name: &str, cfg: &ProviderConfig) -> Result<Self> {
        let algorithm = Algorithm::from_str(&cfg.token.algorithm).map_err(|e| {
            MmError::Config(format!("auth.{name}.token.algorithm: {e}"))
        })?;
        let key = cfg.token.key.as_bytes();
        Ok(Self {
            name: name.to_string(),
            active: cfg.active,
            algorithm,
            encoding: EncodingKey::from_secret(key),
            decoding: DecodingKey::from_secret(key),
            expires_in_secs: cfg.token.expires_in_secs,
            subject: cfg.token.subject.clone(),
            audience: cfg.token.audience.clone(),
            issuer: cfg.token.issuer.clone(),
            hash_cost: cfg.hash,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Issue a token carrying `claims` (must be an object or null).
    pub fn sign(&self, claims: Value, opts: &SignOptions) -> Result<SignedToken> {
        let mut body = match claims {
            Value::Object(m) => m,
            Value::Null => Map::new(),
            _ => return Err(MmError::call("token claims must be an object")),
        };

        let now = unix_now();
        let expires = now
            .checked_add(opts.expires_in_secs.unwrap_or(self.expires_in_secs))
            .ok_or_else(|| MmError::call("token lifetime out of range"))?;
        body.insert("iat".into(), now.into());
        body.insert("exp".into(), expires.into());
        if let Some(sub) = opts.subject.as_ref().or(self.subject.as_ref()) {
            body.insert("sub".into(), sub.clone().into());
        }
        if let Some(aud) = opts.audience.as_ref().or(self.audience.as_ref()) {
            body.insert("aud".into(), aud.clone().into());
        }
        if let Some(iss) = &self.issuer {
            body.insert("iss".into(), iss.clone().into());
        }

        let token = jsonwebtoken::encode(&Header::new(self.algorithm), &Value::Object(body), &self.encoding)
            .map_err(|e| MmError::call(format!("token sign failed: {e}")))?;
        Ok(SignedToken { token, expires })
    }

    fn validation(&self, opts: &VerifyOptions) -> Validation {
        let mut v = Validation::new(self.algorithm);
        v.validate_nbf = true;
        v.leeway = 0;
        v.sub = opts.subject.clone().or_else(|| self.subject.clone());
        match opts.audience.as_ref().or(self.audience.as_ref()) {
            Some(aud) => v.set_audience(&[aud]),
            None => v.validate_aud = false,
        }
        if let Some(iss) = &self.issuer {
            v.set_issuer(&[iss]);
        }
        v
    }

    pub async fn create_hash(&self, secret: &str) -> Result<String> {
        let secret = secret.to_owned();
        let cost = self.hash_cost;
        tokio::task::spawn_blocking(move || bcrypt::hash(secret, cost))
            .await
            .map_err(|e| HashError::Failed(e.to_string()))?
            .map_err(|e| HashError::Failed(e.to_string()).into())
    }

    pub async fn verify_hash(&self, hash: &str, secret: &str) -> std::result::Result<(), HashError> {
        let (hash, secret) = (hash.to_owned(), secret.to_owned());
        let matched = tokio::task::spawn_blocking(move || bcrypt::verify(secret, &hash))
            .await
            .map_err(|e| HashError::Failed(e.to_string()))?
            .map_err(|e| HashError::Malformed(e.to_string()))?;
        if matched {
            Ok(())
        } else {
            Err(HashError::Mismatch)
        }
    }
}

#[async_trait]
impl CredentialProvider for Provider {
    fn is_active(&self) -> bool {
        self.active
    }

    async fn verify(&self, token: &str, opts: &VerifyOptions) -> Result<Value> {
        jsonwebtoken::decode::<Value>(token, &self.decoding, &self.validation(opts))
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => MmError::TokenExpired,
                _ => MmError::Unauthorized(e.to_string()),
            })
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
