//! Test server harness for E2E testing
//!
//! Provides `TestGateServer` for spawning real gate instances in tests.

use gate_service::auth::build_gate;
use gate_service::config::Config;
use gate_service::routes::{self, AppState};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};
use tokio::task::JoinHandle;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// One Prometheus handle per test process.
///
/// The global recorder can only be installed once; later callers share it.
/// If another crate already installed a recorder, fall back to a standalone
/// recorder that is never installed.
fn metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| match routes::init_metrics_recorder() {
            Ok(handle) => handle,
            Err(_) => {
                use metrics_exporter_prometheus::PrometheusBuilder;
                let recorder = PrometheusBuilder::new().build_recorder();
                recorder.handle()
            }
        })
        .clone()
}

/// Test harness for spawning the API Gate in E2E tests.
///
/// # Example
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_health_is_public() -> Result<()> {
///     let server = TestGateServer::spawn(&[("GATE_CLIENT_SECRET", "s3cret")]).await?;
///
///     let response = reqwest::get(format!("{}/health", server.url())).await?;
///
///     assert_eq!(response.status(), 200);
///     Ok(())
/// }
/// ```
pub struct TestGateServer {
    addr: SocketAddr,
    config: Config,
    _handle: JoinHandle<()>,
}

impl TestGateServer {
    /// Spawn a new gate configured from `vars`.
    ///
    /// The server will:
    /// - Bind to a random available port (127.0.0.1:0)
    /// - Build the gate exactly as `main` does (including OIDC discovery)
    /// - Start the HTTP server in the background
    ///
    /// # Returns
    /// * `Ok(TestGateServer)` - Running server instance
    /// * `Err(anyhow::Error)` - If configuration, gate construction or bind fails
    pub async fn spawn(vars: &[(&str, &str)]) -> Result<Self, anyhow::Error> {
        let mut vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        vars.insert("GATE_BIND_ADDRESS".to_string(), "127.0.0.1:0".to_string());

        let config = Config::from_vars(&vars)
            .map_err(|e| anyhow::anyhow!("Failed to create config: {}", e))?;

        let gate = build_gate(&config)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to build gate: {}", e))?;

        let state = Arc::new(AppState {
            gate: Arc::new(gate),
        });

        let app = routes::build_routes(state, metrics_handle());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        let handle = tokio::spawn(async move {
            let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
            if let Err(e) = axum::serve(listener, make_service).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            config,
            _handle: handle,
        })
    }

    /// Get the base URL of the test server.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Get the socket address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Get reference to the server configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }
}

impl Drop for TestGateServer {
    fn drop(&mut self) {
        self._handle.abort();
    }
}
