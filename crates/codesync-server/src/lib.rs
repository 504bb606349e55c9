//! HTTP/WebSocket surface for the CodeSync collaborative execution engine.
//!
//! This crate wires the core execution pipeline to the network: a JSON
//! endpoint for running code and a WebSocket channel for realtime
//! collaborative editing. The server is generic over an
//! [`ExecutionHandler`] so the routing layer can be exercised in tests
//! without a sandbox behind it; the collaboration hub is owned here
//! because session fan-out is a transport concern, not an execution one.

pub mod error;
pub mod hub;
pub mod ws;

pub use error::{Result, ServerError};
pub use hub::{CollaborationHub, PeerId};

use async_trait::async_trait;
use axum::extract::{Json as AxumJson, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::{get, options, post};
use axum::{middleware, Router};
use codesync_core::{CodeRequest, CodeResponse, ExecutionService};
use serde::Serialize;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub version: String,
}

/// Configuration for the CodeSync server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server bind address
    pub bind_addr: SocketAddr,
    /// Enable CORS (fully open when enabled)
    pub enable_cors: bool,
    /// Enable request logging
    pub enable_logging: bool,
    /// Maximum peers admitted to one collaboration session
    pub max_peers_per_session: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8000".parse().unwrap(),
            enable_cors: true,
            enable_logging: true,
            max_peers_per_session: 32,
        }
    }
}

impl ServerConfig {
    /// Create a new server configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the bind address.
    pub fn with_bind_addr(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Enable or disable CORS.
    pub fn with_cors(mut self, enable: bool) -> Self {
        self.enable_cors = enable;
        self
    }

    /// Enable or disable request logging.
    pub fn with_logging(mut self, enable: bool) -> Self {
        self.enable_logging = enable;
        self
    }

    /// Set the per-session peer cap.
    pub fn with_max_peers_per_session(mut self, limit: usize) -> Self {
        self.max_peers_per_session = limit;
        self
    }
}

/// Trait for handling execution requests.
///
/// The production implementation is [`codesync_core::ExecutionService`];
/// tests substitute a mock. Implementations never fail: every sandbox and
/// analyzer failure is already folded into the response's own fields.
#[async_trait]
pub trait ExecutionHandler: Send + Sync + Clone + 'static {
    async fn execute(&self, request: CodeRequest) -> CodeResponse;
}

#[async_trait]
impl ExecutionHandler for ExecutionService {
    async fn execute(&self, request: CodeRequest) -> CodeResponse {
        self.run(request).await
    }
}

/// Shared application state: the execution handler plus the hub.
#[derive(Clone)]
pub struct AppState<T: ExecutionHandler> {
    pub handler: T,
    pub hub: Arc<CollaborationHub>,
    pub config: ServerConfig,
}

/// Handler for the `/` service banner.
async fn root_handler() -> Json<serde_json::Value> {
    Json(json!({
        "status": "online",
        "message": "CodeSync Engine API is running.",
        "endpoints": {
            "execution": "/api/v1/execute",
            "websocket": "/ws/{room_id}"
        }
    }))
}

/// Handler for the `/api/v1/execute` POST endpoint.
async fn execute_handler<T: ExecutionHandler>(
    State(state): State<AppState<T>>,
    AxumJson(request): AxumJson<CodeRequest>,
) -> Json<CodeResponse> {
    log::info!(
        "execute request: {} bytes, language '{}'",
        request.code.len(),
        request.language
    );
    Json(state.handler.execute(request).await)
}

/// The CodeSync HTTP/WebSocket server.
pub struct CodeSyncServer<T: ExecutionHandler> {
    handler: T,
    config: ServerConfig,
}

impl<T: ExecutionHandler> CodeSyncServer<T> {
    /// Create a new server with the given handler and default configuration.
    pub fn new(handler: T) -> Self {
        Self {
            handler,
            config: ServerConfig::default(),
        }
    }

    /// Create a new server with custom configuration.
    pub fn with_config(handler: T, config: ServerConfig) -> Self {
        Self { handler, config }
    }

    /// Get the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Build the Axum router with all routes and middleware.
    pub fn build_router(&self) -> Router {
        let state = AppState {
            handler: self.handler.clone(),
            hub: Arc::new(CollaborationHub::new(self.config.max_peers_per_session)),
            config: self.config.clone(),
        };

        let mut router = Router::new()
            .route("/", get(root_handler))
            .route("/health", get(|| async {
                Json(HealthResponse {
                    status: "healthy".to_string(),
                    timestamp: chrono::Utc::now(),
                    version: env!("CARGO_PKG_VERSION").to_string(),
                })
            }))
            .route("/api/v1/execute", post(execute_handler::<T>))
            .route("/ws/{room_id}", get(ws::collaboration_handler::<T>))
            // CORS preflight
            .route("/api/v1/execute", options(|| async { StatusCode::OK }))
            .with_state(state);

        if self.config.enable_logging {
            router =
                router.layer(middleware::from_fn(
                    |request: axum::http::Request<axum::body::Body>,
                     next: axum::middleware::Next| async {
                        let request_id = uuid::Uuid::new_v4().to_string();
                        let method = request.method().clone();
                        let uri = request.uri().clone();
                        log::info!("Request {} {} {}", request_id, method, uri);

                        let start = std::time::Instant::now();
                        let response = next.run(request).await;
                        log::info!(
                            "Response {} completed in {:?}",
                            request_id,
                            start.elapsed()
                        );

                        response
                    },
                ));
        }

        router = router.layer(TraceLayer::new_for_http());

        if self.config.enable_cors {
            router = router.layer(CorsLayer::permissive());
        }

        router
    }

    /// Start the server and listen for connections.
    ///
    /// This method will block until the server is shut down.
    pub async fn serve(self) -> Result<()> {
        let router = self.build_router();
        let listener = TcpListener::bind(self.config.bind_addr)
            .await
            .map_err(|e| {
                ServerError::config_error(format!(
                    "Failed to bind to {}: {}",
                    self.config.bind_addr, e
                ))
            })?;

        log::info!("CodeSync server starting on {}", self.config.bind_addr);
        log::info!("Health check: http://{}/health", self.config.bind_addr);
        log::info!(
            "Execution endpoint: http://{}/api/v1/execute",
            self.config.bind_addr
        );
        log::info!(
            "Collaboration channel: ws://{}/ws/{{room_id}}",
            self.config.bind_addr
        );

        axum::serve(listener, router)
            .await
            .map_err(|e| ServerError::internal(format!("Server error: {}", e)))?;

        Ok(())
    }

    /// Start the server with graceful shutdown support.
    ///
    /// The server will shut down when the provided shutdown signal is received.
    pub async fn serve_with_shutdown<F>(self, shutdown_signal: F) -> Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let router = self.build_router();
        let listener = TcpListener::bind(self.config.bind_addr)
            .await
            .map_err(|e| {
                ServerError::config_error(format!(
                    "Failed to bind to {}: {}",
                    self.config.bind_addr, e
                ))
            })?;

        log::info!(
            "CodeSync server starting on {} with graceful shutdown",
            self.config.bind_addr
        );

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal)
            .await
            .map_err(|e| ServerError::internal(format!("Server error: {}", e)))?;

        log::info!("CodeSync server shut down gracefully");
        Ok(())
    }
}

/// Utility function to create a shutdown signal from Ctrl+C.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            log::info!("Received Ctrl+C, shutting down...");
        },
        _ = terminate => {
            log::info!("Received SIGTERM, shutting down...");
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use codesync_core::ComplexityReport;
    use std::sync::{Arc, Mutex};
    use tower::ServiceExt; // for `oneshot`

    #[derive(Clone)]
    struct MockHandler {
        last_request: Arc<Mutex<Option<CodeRequest>>>,
        response: CodeResponse,
    }

    impl MockHandler {
        fn new(response: CodeResponse) -> Self {
            Self {
                last_request: Arc::new(Mutex::new(None)),
                response,
            }
        }
    }

    #[async_trait]
    impl ExecutionHandler for MockHandler {
        async fn execute(&self, request: CodeRequest) -> CodeResponse {
            *self.last_request.lock().unwrap() = Some(request);
            self.response.clone()
        }
    }

    fn canned_response() -> CodeResponse {
        CodeResponse {
            output: "0\n1\n2\n".to_string(),
            error: String::new(),
            complexity: Some(ComplexityReport {
                notation: "O(n)".to_string(),
                max_depth: 1,
                loop_count: 1,
                explanation: "Single loop detected. Time complexity grows linearly with input."
                    .to_string(),
            }),
        }
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let server = CodeSyncServer::new(MockHandler::new(canned_response()));
        let app = server.build_router();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn test_root_banner_lists_endpoints() {
        let server = CodeSyncServer::new(MockHandler::new(canned_response()));
        let app = server.build_router();

        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["status"], "online");
        assert_eq!(body["endpoints"]["execution"], "/api/v1/execute");
    }

    #[tokio::test]
    async fn test_execute_endpoint_round_trip() {
        let mock = MockHandler::new(canned_response());
        let last_request = mock.last_request.clone();
        let server = CodeSyncServer::new(mock);
        let app = server.build_router();

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/execute")
                    .header("content-type", "application/json")
                    .body(Body::from(
                        r#"{"code": "for i in range(3): print(i)"}"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["output"], "0\n1\n2\n");
        assert_eq!(body["error"], "");
        assert_eq!(body["complexity"]["notation"], "O(n)");
        assert_eq!(body["complexity"]["max_depth"], 1);

        let seen = last_request.lock().unwrap().clone().unwrap();
        assert_eq!(seen.code, "for i in range(3): print(i)");
        assert_eq!(seen.language, "python", "language tag should default");
    }

    #[tokio::test]
    async fn test_execute_endpoint_rejects_missing_code() {
        let server = CodeSyncServer::new(MockHandler::new(canned_response()));
        let app = server.build_router();

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/execute")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"language": "python"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_absent_complexity_is_omitted() {
        let mut response_body = canned_response();
        response_body.complexity = None;
        let server = CodeSyncServer::new(MockHandler::new(response_body));
        let app = server.build_router();

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/execute")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"code": "print(1)"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        let body = to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!(body.get("complexity").is_none());
    }
}
