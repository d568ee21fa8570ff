//! HTTP request handlers for the API Gate.

pub mod auth_check;
pub mod health;
pub mod metrics;

pub use auth_check::auth_check;
pub use health::health_check;
pub use metrics::metrics_handler;
