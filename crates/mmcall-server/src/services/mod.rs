//! Built-in demo resources shipped with the binary.
//!
//! - `math`: stateless arithmetic plus a raw echo
//! - `session`: login against stored bcrypt hashes, token-protected `whoami`

pub mod math;
pub mod session;
