//! Dispatcher module exports.
//!
//! Re-exports the dispatcher pipeline types so transports can depend on this
//! module directly.

pub mod dispatcher;
pub mod throttle;

pub use dispatcher::{DispatchOptions, Dispatcher, Inbound, Outcome, Stage};
pub use throttle::Throttle;
