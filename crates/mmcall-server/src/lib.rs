//! mmcall server library entry.
//!
//! Wires config, auth, the method registry, the dispatcher and the transport
//! adapters into one stack. Consumed by the binary (`main.rs`) and by
//! integration tests.

pub mod app_state;
pub mod auth;
pub mod config;
pub mod discovery;
pub mod dispatch;
pub mod registry;
pub mod router;
pub mod services;
pub mod transport;
pub mod validate;
