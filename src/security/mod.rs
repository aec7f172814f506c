//! Security module for shell-socket.
//!
//! Guards the connect/upgrade handshake with HTTP Basic credentials for
//! a single administrative identity.
//!
//! ## Features
//!
//! - **Gatekeeper**: parses the `Authorization` header and asks a
//!   [`CredentialVerifier`] for a yes/no answer
//! - **Auth cache**: a verified credential is trusted for 10 seconds
//! - **Middleware**: rejects unauthorized requests with a `401` challenge
//!   before any session exists
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use shell_socket::security::{AuthCache, AuthConfig, Gatekeeper, StaticPasswordVerifier};
//!
//! let gate = Gatekeeper::new(
//!     AuthConfig::default(),
//!     Arc::new(StaticPasswordVerifier::new("s3cret")),
//!     Arc::new(AuthCache::default()),
//! );
//! assert_eq!(gate.config().user, "admin");
//! ```

pub mod auth;
pub mod cache;
pub mod verifier;

// Re-export commonly used types
pub use auth::{auth_middleware, AuthConfig, BasicCredentials, Gatekeeper};
pub use cache::{AuthCache, DEFAULT_CACHE_TTL};
pub use verifier::{CredentialVerifier, StaticPasswordVerifier};
