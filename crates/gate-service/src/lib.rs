//! API Gate Service Library
//!
//! An HTTP authentication gate for a management API. Every request is
//! admitted or rejected before it reaches a handler:
//!
//! - Path exceptions (e.g. `/health`) bypass authentication
//! - Authenticators (HTTP Basic, bearer tokens) run in order; the first
//!   success admits the request
//! - Bearer tokens verify either with a shared HS256 secret or against an
//!   OIDC provider's published keys
//!
//! # Architecture
//!
//! ```text
//! routes/mod.rs -> middleware/auth.rs -> auth/gate.rs -> auth/{basic,token}.rs
//! ```
//!
//! # Modules
//!
//! - `auth` - Authenticators, token verification and the gate
//! - `config` - Service configuration from environment
//! - `errors` - Error types with HTTP status code mapping
//! - `handlers` - HTTP request handlers
//! - `middleware` - Authentication and HTTP metrics middleware
//! - `observability` - Metrics definitions
//! - `routes` - Axum router setup

pub mod auth;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod observability;
pub mod routes;
