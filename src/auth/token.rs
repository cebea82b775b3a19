//! Token secrets and OAuth credential snapshots.

pub mod credentials;
pub mod secret;
