//! Credential verification seam.

use async_trait::async_trait;
use subtle::ConstantTimeEq;

/// Checks a user/password pair against an identity provider.
///
/// Implementations may suspend (network or database lookups); the
/// gatekeeper awaits the result.
#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    async fn verify(&self, user: &str, password: &str) -> bool;
}

/// Verifies against a single configured password.
pub struct StaticPasswordVerifier {
    password: String,
}

impl StaticPasswordVerifier {
    pub fn new(password: impl Into<String>) -> Self {
        Self {
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for StaticPasswordVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticPasswordVerifier")
            .field("password", &"***")
            .finish()
    }
}

#[async_trait]
impl CredentialVerifier for StaticPasswordVerifier {
    async fn verify(&self, _user: &str, password: &str) -> bool {
        let expected = self.password.as_bytes();
        let given = password.as_bytes();
        expected.len() == given.len() && bool::from(expected.ct_eq(given))
    }
}
