#![allow(dead_code)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::panic)]

use mmcall_core::protocol::Envelope;
use mmcall_server::app_state::AppState;
use mmcall_server::config;
use mmcall_server::dispatch::{Inbound, Outcome};
use mmcall_server::registry::Resource;

pub const CONFIG: &str = r#"
version: 1
server:
  debug: true
auth:
  user:
    token: { key: "test-secret", subject: "user", issuer: "mmcall" }
    hash: 4
"#;

pub fn state(yaml: &str, resources: Vec<Resource>) -> AppState {
    let cfg = config::load_from_str(yaml).unwrap();
    AppState::new(cfg, resources).unwrap()
}

/// Dispatch a decoded envelope and expect a reply.
pub async fn call(state: &AppState, env: Envelope) -> Envelope {
    match state.dispatcher().dispatch(Inbound::new(Ok(env))).await {
        Outcome::Reply(env) => env,
        Outcome::Dropped => panic!("unexpected drop"),
    }
}

pub fn code(env: &Envelope) -> Option<u16> {
    env.call.error().map(|e| e.code)
}

pub fn token(state: &AppState) -> String {
    let provider = state.auth().provider("user").unwrap();
    provider
        .sign(serde_json::json!({ "name": "ada" }), &Default::default())
        .unwrap()
        .token
}
