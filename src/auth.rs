//! Credential models: redacted secrets, the stored credential pair, and refresh wire bodies.

pub mod credentials;
pub mod secret;

pub use credentials::*;
pub use secret::*;
