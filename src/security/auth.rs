//! Basic authentication for the connect/upgrade handshake.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{
        header::{AUTHORIZATION, WWW_AUTHENTICATE},
        StatusCode,
    },
    middleware::Next,
    response::{IntoResponse, Response},
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use tracing::{debug, error};

use super::{AuthCache, CredentialVerifier};

/// Authentication configuration.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Whether authentication is enabled.
    pub enabled: bool,
    /// The single identity allowed to connect.
    pub user: String,
    /// Realm announced in the challenge header.
    pub realm: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            user: "admin".to_string(),
            realm: "shell-socket".to_string(),
        }
    }
}

impl AuthConfig {
    /// Create a disabled auth config (for development).
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }
}

/// User and password decoded from a `Basic` authorization header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicCredentials {
    pub user: String,
    pub password: String,
}

impl BasicCredentials {
    /// Decode `Basic <base64(user:password)>`.
    ///
    /// The password is everything after the first colon.
    pub fn parse(header: &str) -> Option<Self> {
        let encoded = header.strip_prefix("Basic ")?;
        let decoded = BASE64.decode(encoded.trim()).ok()?;
        let decoded = String::from_utf8(decoded).ok()?;
        let (user, password) = decoded.split_once(':')?;
        Some(Self {
            user: user.to_string(),
            password: password.to_string(),
        })
    }
}

/// Decides whether a presented credential may open a session.
pub struct Gatekeeper {
    config: AuthConfig,
    verifier: Arc<dyn CredentialVerifier>,
    cache: Arc<AuthCache>,
}

impl Gatekeeper {
    pub fn new(
        config: AuthConfig,
        verifier: Arc<dyn CredentialVerifier>,
        cache: Arc<AuthCache>,
    ) -> Self {
        Self {
            config,
            verifier,
            cache,
        }
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Check the raw `Authorization` header value.
    ///
    /// A header identical to one verified within the cache window is
    /// accepted without asking the verifier. A missing or malformed
    /// header, a foreign user or an empty password clears the cache.
    pub async fn authorize(&self, header: Option<&str>) -> bool {
        if !self.config.enabled {
            return true;
        }
        if let Some(header) = header {
            if self.cache.is_fresh(header) {
                debug!("credential accepted from cache");
                return true;
            }
        }

        let credentials = header.and_then(BasicCredentials::parse).filter(|c| {
            c.user == self.config.user && !c.password.is_empty()
        });
        let (Some(header), Some(credentials)) = (header, credentials) else {
            self.cache.clear();
            return false;
        };

        if self
            .verifier
            .verify(&credentials.user, &credentials.password)
            .await
        {
            self.cache.store(header);
            true
        } else {
            self.cache.clear();
            false
        }
    }

    /// `401` response carrying the Basic challenge.
    pub fn challenge(&self) -> Response {
        (
            StatusCode::UNAUTHORIZED,
            [(
                WWW_AUTHENTICATE,
                format!("Basic realm=\"{}\"", self.config.realm),
            )],
            "Unauthorized",
        )
            .into_response()
    }
}

/// Authentication middleware for axum.
///
/// Rejected requests, WebSocket upgrades included, never reach a
/// handler, so no session is created for them.
pub async fn auth_middleware(
    State(gate): State<Arc<Gatekeeper>>,
    request: Request,
    next: Next,
) -> Response {
    if request.uri().path() == "/health" {
        return next.run(request).await;
    }

    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    if gate.authorize(header).await {
        next.run(request).await
    } else {
        error!(path = %request.uri().path(), "rejected request without valid credentials");
        gate.challenge()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct CountingVerifier {
        password: &'static str,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl CredentialVerifier for CountingVerifier {
        async fn verify(&self, _user: &str, password: &str) -> bool {
            self.calls.fetch_add(1, Ordering::SeqCst);
            password == self.password
        }
    }

    fn basic(user: &str, password: &str) -> String {
        format!("Basic {}", BASE64.encode(format!("{}:{}", user, password)))
    }

    fn gatekeeper() -> (Gatekeeper, Arc<CountingVerifier>, Arc<AuthCache>) {
        let verifier = Arc::new(CountingVerifier {
            password: "pw",
            calls: AtomicUsize::new(0),
        });
        let cache = Arc::new(AuthCache::default());
        let gate = Gatekeeper::new(AuthConfig::default(), verifier.clone(), cache.clone());
        (gate, verifier, cache)
    }

    #[test]
    fn test_parse_basic() {
        let creds = BasicCredentials::parse(&basic("admin", "a:b")).unwrap();
        assert_eq!(creds.user, "admin");
        assert_eq!(creds.password, "a:b");

        assert!(BasicCredentials::parse("Bearer token").is_none());
        assert!(BasicCredentials::parse("Basic !!!").is_none());
        assert!(BasicCredentials::parse(&format!("Basic {}", BASE64.encode("nocolon"))).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cache_window_limits_verifier_calls() {
        let (gate, verifier, _) = gatekeeper();
        let header = basic("admin", "pw");

        assert!(gate.authorize(Some(&header)).await);
        assert!(gate.authorize(Some(&header)).await);
        assert_eq!(verifier.calls.load(Ordering::SeqCst), 1);

        tokio::time::advance(Duration::from_secs(10)).await;
        assert!(gate.authorize(Some(&header)).await);
        assert_eq!(verifier.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wrong_password_clears_cache() {
        let (gate, verifier, cache) = gatekeeper();
        let good = basic("admin", "pw");

        assert!(gate.authorize(Some(&good)).await);
        assert!(!gate.authorize(Some(&basic("admin", "nope"))).await);
        assert!(!cache.is_fresh(&good));

        assert!(gate.authorize(Some(&good)).await);
        assert_eq!(verifier.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_malformed_headers_rejected_without_verifier() {
        let (gate, verifier, cache) = gatekeeper();
        cache.store("stale");

        assert!(!gate.authorize(None).await);
        assert!(!gate.authorize(Some("Bearer x")).await);
        assert!(!gate.authorize(Some(&basic("root", "pw"))).await);
        assert!(!gate.authorize(Some(&basic("admin", ""))).await);
        assert_eq!(verifier.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_disabled_allows_everything() {
        let verifier = Arc::new(CountingVerifier {
            password: "pw",
            calls: AtomicUsize::new(0),
        });
        let gate = Gatekeeper::new(AuthConfig::disabled(), verifier.clone(), Arc::default());
        assert!(gate.authorize(None).await);
        assert_eq!(verifier.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_challenge_header() {
        let (gate, _, _) = gatekeeper();
        let response = gate.challenge();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers()[WWW_AUTHENTICATE],
            "Basic realm=\"shell-socket\""
        );
    }
}
