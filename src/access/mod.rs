//! Query pipeline
//!
//! - `AccessManager` - the one entry point collaborators call
//! - `validate_params` - per-type parameter checks
//! - `redact_fields` - forbidden-key stripping

mod manager;
mod redact;
mod validate;

pub use manager::{AccessManager, AccessStats};
pub use redact::{redact_fields, redacted};
pub use validate::{validate_params, AdminCommand};
