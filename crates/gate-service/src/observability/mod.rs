//! Observability for the API Gate.
//!
//! Provides metrics definitions and recording helpers. Request logging lives
//! in the HTTP metrics middleware.

pub mod metrics;
