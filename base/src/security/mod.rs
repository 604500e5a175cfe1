//! The Security Store and Auth Gate (spec §4.F, §4.G): a hot-reloadable
//! API-key/IP-whitelist configuration and the request-time gate that checks
//! requests against it.

pub mod auth_gate;
pub mod ip_match;
pub mod store;

pub use auth_gate::{authenticate, is_bypass_path};
pub use store::SecurityStore;
