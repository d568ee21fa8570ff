//! The authenticator capability.
//!
//! Every authentication strategy (basic credentials, bearer tokens) answers
//! one question about an inbound request: is it authenticated? Strategies are
//! immutable after construction and shared across request tasks.

use axum::http::{header, HeaderMap};

/// Borrowed view of the parts of a request an authenticator may inspect.
#[derive(Debug, Clone, Copy)]
pub struct AuthRequest<'a> {
    pub path: &'a str,
    pub headers: &'a HeaderMap,
}

impl<'a> AuthRequest<'a> {
    pub fn new(path: &'a str, headers: &'a HeaderMap) -> Self {
        Self { path, headers }
    }

    /// Value of the `Authorization` header, if present and valid ASCII.
    pub fn authorization(&self) -> Option<&'a str> {
        self.headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
    }
}

/// A request authentication strategy.
///
/// Implementations absorb every per-request failure into `false` and log the
/// cause at debug level.
#[async_trait::async_trait]
pub trait Authenticator: Send + Sync {
    /// Short label used in logs and metrics (`"basic"`, `"bearer"`).
    fn name(&self) -> &'static str;

    /// Decide whether `request` is authenticated.
    async fn authorize(&self, request: &AuthRequest<'_>) -> bool;
}

/// Mock authenticator for testing gate composition.
pub mod mock {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Authenticator returning a fixed verdict and counting invocations.
    pub struct MockAuthenticator {
        verdict: bool,
        call_count: AtomicUsize,
    }

    impl MockAuthenticator {
        /// Create a mock that always authorizes.
        pub fn allowing() -> Self {
            Self {
                verdict: true,
                call_count: AtomicUsize::new(0),
            }
        }

        /// Create a mock that always rejects.
        pub fn denying() -> Self {
            Self {
                verdict: false,
                call_count: AtomicUsize::new(0),
            }
        }

        /// Get the number of calls made.
        pub fn call_count(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl Authenticator for MockAuthenticator {
        fn name(&self) -> &'static str {
            "mock"
        }

        async fn authorize(&self, _request: &AuthRequest<'_>) -> bool {
            self.call_count.fetch_add(1, Ordering::SeqCst);
            self.verdict
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::mock::MockAuthenticator;
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_authorization_header_lookup() {
        let mut headers = HeaderMap::new();
        let request = AuthRequest::new("/api", &headers);
        assert!(request.authorization().is_none());

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        let request = AuthRequest::new("/api", &headers);
        assert_eq!(request.authorization(), Some("Bearer abc"));
    }

    #[test]
    fn test_authorization_header_non_ascii_is_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_bytes(b"Bearer \xff").unwrap(),
        );
        let request = AuthRequest::new("/api", &headers);
        assert!(request.authorization().is_none());
    }

    #[tokio::test]
    async fn test_mock_counts_calls() {
        let headers = HeaderMap::new();
        let request = AuthRequest::new("/api", &headers);
        let mock = MockAuthenticator::denying();

        assert!(!mock.authorize(&request).await);
        assert!(!mock.authorize(&request).await);
        assert_eq!(mock.call_count(), 2);
    }
}
