//! Top-level facade crate for mmcall.
//!
//! Re-exports the protocol core and the server library so users can depend on a single crate.

pub mod core {
    pub use mmcall_core::*;
}

pub mod server {
    pub use mmcall_server::*;
}
