//! Middleware for the API Gate.
//!
//! # Components
//!
//! - `auth` - Runs the authentication gate in front of every route
//! - `http_metrics` - HTTP request metrics and request logging

pub mod auth;
pub mod http_metrics;

pub use auth::{require_auth, AuthState};
pub use http_metrics::http_metrics_middleware;
