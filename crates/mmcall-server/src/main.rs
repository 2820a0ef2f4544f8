//! mmcall server binary.
//!
//! - Config path from the first argument (default `mmcall.yaml`)
//! - Versioned endpoint `{api_prefix}/v1` for HTTP calls and WebSocket upgrades
//! - Demo resources: `math`, plus `session` when a `user` provider is configured

use std::net::SocketAddr;

use tracing_subscriber::{fmt, EnvFilter};

use mmcall_core::error::{MmError, Result};
use mmcall_server::auth::AuthGateway;
use mmcall_server::services::{math, session};
use mmcall_server::{app_state, config, router};

const SESSION_PROVIDER: &str = "user";

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let path = std::env::args().nth(1).unwrap_or_else(|| "mmcall.yaml".into());
    let cfg = config::load_from_file(&path)?;
    let listen: SocketAddr = cfg
        .server
        .listen
        .parse()
        .map_err(|e| MmError::Config(format!("server.listen must be a valid SocketAddr: {e}")))?;

    let auth = AuthGateway::from_config(&cfg.auth)?;
    let mut resources = vec![math::resource()];
    if let Some(provider) = auth.provider(SESSION_PROVIDER) {
        let mut users = session::Users::new();
        users.insert("demo".into(), provider.create_hash("demo").await?);
        resources.push(session::resource(SESSION_PROVIDER, users));
    } else {
        tracing::info!(provider = SESSION_PROVIDER, "no provider configured; session resource disabled");
    }

    let state = app_state::AppState::with_auth(cfg, auth, resources)?;
    let prefix = state.cfg().server.api_prefix.clone();
    let app = router::build_router(state);

    tracing::info!(%listen, %prefix, "mmcall-server starting");
    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .map_err(|e| MmError::Boot(format!("bind {listen} failed: {e}")))?;

    axum::serve(listener, app)
        .await
        .map_err(|e| MmError::Boot(format!("server failed: {e}")))
}
