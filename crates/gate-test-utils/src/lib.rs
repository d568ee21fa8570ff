//! # Gate Test Utilities
//!
//! Shared test utilities for the API Gate service.
//!
//! This crate provides:
//! - Deterministic crypto fixtures (HS256 signing, fixed Ed25519 keys)
//! - Claims builders (TestClaimsBuilder)
//! - A mock OIDC provider (discovery document plus key set on wiremock)
//! - Server test harness (TestGateServer for E2E tests)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use gate_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() {
//!     let claims = TestClaimsBuilder::new()
//!         .issuer("https://issuer.example.com")
//!         .audience("gate-client")
//!         .build();
//!
//!     let token = sign_hs256(&claims, b"s3cret");
//!     let server = TestGateServer::spawn(&[("GATE_CLIENT_SECRET", "s3cret")]).await?;
//! }
//! ```

pub mod crypto_fixtures;
pub mod mock_oidc;
pub mod server_harness;
pub mod token_builders;

// Re-export commonly used items
pub use crypto_fixtures::*;
pub use mock_oidc::*;
pub use server_harness::*;
pub use token_builders::*;
