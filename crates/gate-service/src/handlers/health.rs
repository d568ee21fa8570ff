//! Liveness handler.

/// Liveness probe handler.
///
/// Returns "OK" while the process serves requests. Checks no dependencies,
/// so a discovery outage never takes the gate out of rotation.
pub async fn health_check() -> &'static str {
    "OK"
}
