use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse};
use axum::routing::{get, post};
use axum::{Json, Router};
use tokio::sync::{broadcast, mpsc};
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use worktrack_core::SubCategoryCatalog;
use worktrack_store::Database;

use crate::client::{self, ClientId, ClientRegistry};
use crate::event_bridge::{self, TrackerEvent};
use crate::handlers::{self, HandlerState};
use crate::page;
use crate::rpc::{RpcRequest, RpcResponse};
use crate::shutdown::ShutdownCoordinator;

/// Server configuration.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_send_queue: usize,
    pub heartbeat_interval: Duration,
    pub request_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8050,
            max_send_queue: 256,
            heartbeat_interval: Duration::from_secs(30),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Shared application state passed to Axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub handler_state: Arc<HandlerState>,
    pub client_registry: Arc<ClientRegistry>,
    pub message_tx: mpsc::Sender<(ClientId, String)>,
}

/// Build the Axum router with all routes.
pub fn build_router(state: AppState, request_timeout: Duration) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/rpc", post(rpc_handler))
        .route("/ws", get(ws_handler))
        .route("/health", get(health_handler))
        .with_state(state)
        .layer(TimeoutLayer::new(request_timeout))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Bind, spawn the background tasks and start serving.
pub async fn start(
    config: ServerConfig,
    db: Database,
    catalog: Arc<SubCategoryCatalog>,
    event_tx: broadcast::Sender<TrackerEvent>,
) -> Result<ServerHandle, std::io::Error> {
    let handler_state = HandlerState::new(
        db,
        catalog,
        Arc::new(ClientRegistry::new(config.max_send_queue, config.heartbeat_interval)),
        event_tx,
    );
    start_with_state(config, handler_state).await
}

/// [`start`] with a prepared handler state (custom clock, shared registry).
pub async fn start_with_state(
    config: ServerConfig,
    handler_state: HandlerState,
) -> Result<ServerHandle, std::io::Error> {
    let shutdown = ShutdownCoordinator::new();
    let handler_state = Arc::new(handler_state);
    let client_registry = Arc::clone(&handler_state.clients);

    let bridge_handle = event_bridge::create_bridge(
        Arc::clone(&client_registry),
        handler_state.events.subscribe(),
    );
    let cleanup_handle = client::start_cleanup_task(Arc::clone(&client_registry));

    let (msg_tx, msg_rx) = mpsc::channel::<(ClientId, String)>(1024);
    let rpc_handle = tokio::spawn(process_rpc_messages(
        msg_rx,
        Arc::clone(&handler_state),
        Arc::clone(&client_registry),
    ));

    let app_state = AppState {
        handler_state,
        client_registry,
        message_tx: msg_tx,
    };
    let router = build_router(app_state, config.request_timeout);

    let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port)).await?;
    let local_addr = listener.local_addr()?;
    tracing::info!(addr = %local_addr, "worktrack server started");

    let token = shutdown.token();
    let server_handle = tokio::spawn(async move {
        let result = axum::serve(listener, router)
            .with_graceful_shutdown(async move { token.cancelled().await })
            .await;
        if let Err(e) = result {
            tracing::error!(error = %e, "server stopped with error");
        }
    });

    Ok(ServerHandle {
        addr: local_addr,
        port: local_addr.port(),
        shutdown,
        server: server_handle,
        background: vec![bridge_handle, rpc_handle, cleanup_handle],
    })
}

/// Handle returned by `start()`; keeps background tasks alive.
pub struct ServerHandle {
    pub addr: SocketAddr,
    pub port: u16,
    shutdown: ShutdownCoordinator,
    server: tokio::task::JoinHandle<()>,
    background: Vec<tokio::task::JoinHandle<()>>,
}

impl ServerHandle {
    /// Stop accepting connections, let in-flight requests finish, then stop
    /// the background tasks.
    pub async fn shutdown(self, timeout: Option<Duration>) {
        for task in &self.background {
            task.abort();
        }
        self.shutdown.graceful_shutdown(vec![self.server], timeout).await;
        tracing::info!("worktrack server stopped");
    }
}

async fn index_handler() -> Html<&'static str> {
    Html(page::INDEX_HTML)
}

/// `POST /rpc`: one request in, one response out.
async fn rpc_handler(State(state): State<AppState>, body: String) -> Json<RpcResponse> {
    Json(handle_raw(&state.handler_state, &body).await)
}

/// Decode and dispatch one raw request.
async fn handle_raw(state: &Arc<HandlerState>, raw: &str) -> RpcResponse {
    match RpcRequest::decode(raw) {
        Ok(request) => {
            let params = match request.params {
                Some(serde_json::Value::Null) | None => serde_json::json!({}),
                Some(params) => params,
            };
            handlers::dispatch(state, &request.method, &params, request.id).await
        }
        Err(response) => response,
    }
}

/// WebSocket upgrade handler.
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (client_id, rx) = state.client_registry.register();
    tracing::info!(client_id = %client_id, "WebSocket client connected");

    client::handle_ws_connection(
        socket,
        client_id,
        rx,
        state.client_registry,
        state.message_tx,
    )
    .await;
}

/// Health check HTTP endpoint.
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let report = handlers::health_report(&state.handler_state);
    let http_status = if report.is_healthy() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (http_status, Json(report))
}

/// Process RPC requests arriving as WebSocket text frames.
async fn process_rpc_messages(
    mut rx: mpsc::Receiver<(ClientId, String)>,
    state: Arc<HandlerState>,
    registry: Arc<ClientRegistry>,
) {
    while let Some((client_id, raw_message)) = rx.recv().await {
        let response = handle_raw(&state, &raw_message).await;

        if let Ok(json) = serde_json::to_string(&response) {
            let _ = registry.send_to(&client_id, json);
        }
    }
}
