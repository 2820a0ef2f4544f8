//! Session demo: password login issuing a token, and a protected `whoami`.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};

use mmcall_core::error::{MmError, Result};

use crate::auth::{AuthPolicy, Provider, SignOptions, SignedToken};
use crate::registry::{handler, sync_handler, BootContext, CallContext, MethodSpec, Resource};

/// User name -> bcrypt hash.
pub type Users = HashMap<String, String>;

#[derive(Debug, Deserialize)]
struct Credentials {
    name: String,
    password: String,
}

/// `provider` must name a built-in provider; boot fails otherwise.
pub fn resource(provider: impl Into<String>, users: Users) -> Resource {
    let provider = provider.into();
    let users = Arc::new(users);
    let whoami_provider = provider.clone();

    Resource::new("session")
        .method("login", move |boot| {
            let signer = builtin(boot, &provider)?;
            let users = Arc::clone(&users);
            Ok(MethodSpec::new()
                .title("Login")
                .request(json!({
                    "type": "object",
                    "properties": {
                        "name": { "type": "string", "minLength": 1 },
                        "password": { "type": "string" }
                    },
                    "required": ["name", "password"]
                }))
                .response(json!({
                    "type": "object",
                    "properties": {
                        "token": { "type": "string" },
                        "expires": { "type": "integer" }
                    },
                    "required": ["token", "expires"]
                }))
                .handler(handler(move |ctx| login(ctx, Arc::clone(&signer), Arc::clone(&users)))))
        })
        .method("whoami", move |_| {
            Ok(MethodSpec::new()
                .auth(AuthPolicy::required(whoami_provider.clone()))
                .handler(sync_handler(whoami)))
        })
}

fn builtin(boot: &BootContext<'_>, name: &str) -> Result<Arc<Provider>> {
    boot.auth
        .provider(name)
        .ok_or_else(|| MmError::ProviderNotFound(name.to_string()))
}

async fn login(ctx: CallContext, signer: Arc<Provider>, users: Arc<Users>) -> Result<SignedToken> {
    let creds: Credentials = ctx.payload_as()?;
    let hash = users
        .get(&creds.name)
        .ok_or_else(|| MmError::Unauthorized("credentials do not match".into()))?;
    signer.verify_hash(hash, &creds.password).await?;
    signer.sign(json!({ "name": creds.name }), &SignOptions::default())
}

fn whoami(ctx: CallContext) -> Result<Value> {
    let identity = ctx.identity()?;
    Ok(json!({
        "name": identity.claims.get("name").cloned().unwrap_or(Value::Null),
        "sub": identity.subject(),
    }))
}
