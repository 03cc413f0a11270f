//! Authentication and authorization engine.
//!
//! The engine is transport-agnostic: flows take explicit timestamps and
//! request metadata, and all persistence goes through the `store` traits.

pub mod authorize;
pub mod config;
pub mod engine;
pub mod error;
pub mod lockout;
pub mod password;
pub mod rate_limit;

pub use authorize::Identity;
pub use config::AuthConfig;
pub use engine::{Authenticator, ClientMeta};
pub use error::AuthError;
