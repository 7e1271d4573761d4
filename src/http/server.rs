//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the relay, passthrough and health handlers
//! - Wire up middleware (request id, tracing, timeout)
//! - Swap in reloaded configuration without dropping connections
//! - Serve until the shutdown signal fires

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use axum::{
    body::{Body, Bytes},
    extract::{DefaultBodyLimit, FromRequest, State},
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, MethodRouter},
    Json, Router,
};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::ProxyConfig;
use crate::forward::{relay, target, ForwardError, Forwarder};
use crate::http::request::{propagate_request_id_layer, set_request_id_layer, RequestIdExt};
use crate::observability::metrics;

/// Largest request body the passthrough buffers before forwarding.
const MAX_PASSTHROUGH_BODY: usize = 2 * 1024 * 1024;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    forwarder: Arc<ArcSwap<Forwarder>>,
    relay_prefix: Arc<str>,
    passthrough_prefix: Arc<str>,
}

impl AppState {
    fn new(config: &ProxyConfig) -> Result<Self, ForwardError> {
        Ok(Self {
            forwarder: Arc::new(ArcSwap::from_pointee(Forwarder::from_config(config)?)),
            relay_prefix: config.relay.route_prefix.as_str().into(),
            passthrough_prefix: config.dev_proxy.route_prefix.as_str().into(),
        })
    }

    /// Replace the active forwarder. Returns whether the update was applied.
    ///
    /// Route prefixes are bound when the router is built; changes to them
    /// are reported and otherwise ignored until restart.
    pub fn apply_config(&self, config: &ProxyConfig) -> bool {
        if *self.relay_prefix != config.relay.route_prefix
            || *self.passthrough_prefix != config.dev_proxy.route_prefix
        {
            tracing::warn!("Route prefix changes take effect after restart");
        }

        match Forwarder::from_config(config) {
            Ok(forwarder) => {
                self.forwarder.store(Arc::new(forwarder));
                tracing::info!(upstream = %config.upstream.base_url, "Configuration reloaded");
                metrics::record_config_reload(true);
                true
            }
            Err(e) => {
                tracing::error!(error = %e, "Rejected reloaded configuration");
                metrics::record_config_reload(false);
                false
            }
        }
    }

    /// The forwarder currently serving requests.
    pub fn forwarder(&self) -> Arc<Forwarder> {
        self.forwarder.load_full()
    }
}

/// HTTP server for the proxy.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
    state: AppState,
}

impl HttpServer {
    /// Create a new HTTP server with the given (validated) configuration.
    pub fn new(config: ProxyConfig) -> Result<Self, ForwardError> {
        let state = AppState::new(&config)?;
        let router = Self::build_router(&config, state.clone());
        Ok(Self {
            router,
            config,
            state,
        })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ProxyConfig, state: AppState) -> Router {
        let mut router = Router::new().route("/healthz", get(health_handler));

        if config.relay.enabled {
            let prefix = &config.relay.route_prefix;
            let relay_routes: MethodRouter<AppState> = get(relay_handler)
                .options(preflight_handler)
                .fallback(method_not_allowed_handler);
            router = router
                .route(prefix, relay_routes.clone())
                .route(&format!("{prefix}/"), relay_routes.clone())
                .route(&format!("{prefix}/{{*path}}"), relay_routes);
        }

        if config.dev_proxy.enabled {
            router = router.fallback(passthrough_handler);
        }

        router
            .with_state(state)
            .layer(DefaultBodyLimit::max(MAX_PASSTHROUGH_BODY))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(
                TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                    tracing::info_span!(
                        "request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = %request.request_id(),
                    )
                }),
            )
            .layer(propagate_request_id_layer())
            .layer(set_request_id_layer())
    }

    /// The fully layered router, for serving or in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Shared state, for applying configuration updates out of band.
    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Get a reference to the startup config.
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    /// Run the server until `shutdown` fires, applying configs received on
    /// `config_updates` as they arrive.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<ProxyConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            relay = self.config.relay.enabled,
            passthrough = self.config.dev_proxy.enabled,
            upstream = %self.config.upstream.base_url,
            "HTTP server starting"
        );

        let state = self.state.clone();
        let mut reload_shutdown = shutdown.resubscribe();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    update = config_updates.recv() => match update {
                        Some(config) => {
                            state.apply_config(&config);
                        }
                        None => break,
                    },
                    _ = reload_shutdown.recv() => break,
                }
            }
        });

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received, draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

#[derive(Serialize)]
struct HealthStatus {
    status: &'static str,
    version: &'static str,
    upstream: String,
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        upstream: state.forwarder().base_url().to_string(),
    })
}

/// Serverless-style relay: GET only, response reshaped.
async fn relay_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let request_id = request.request_id().to_string();
    let api_path = target::relay_api_path(request.uri().path(), &state.relay_prefix);
    let query = request.uri().query().map(str::to_owned);
    drop(request);

    match state
        .forwarder()
        .relay(&api_path, query.as_deref(), &request_id)
        .await
    {
        Ok(response) => response,
        Err(e) => relay::proxy_error(&e.to_string()),
    }
}

async fn preflight_handler() -> Response {
    relay::preflight()
}

async fn method_not_allowed_handler() -> Response {
    relay::method_not_allowed()
}

/// Development-style passthrough for everything under its prefix.
async fn passthrough_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let path = request.uri().path();
    let rest = match path.strip_prefix(&*state.passthrough_prefix) {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => rest.to_string(),
        _ => return (StatusCode::NOT_FOUND, "Not Found").into_response(),
    };

    let request_id = request.request_id().to_string();
    let method = request.method().clone();
    let uri = request.uri().clone();
    let headers = request.headers().clone();

    // Oversized bodies are rejected with 413 by the extractor.
    let body = match Bytes::from_request(request, &state).await {
        Ok(bytes) => bytes,
        Err(rejection) => {
            tracing::warn!(request_id = %request_id, error = %rejection.body_text(), "Failed to read request body");
            return rejection.into_response();
        }
    };

    let subject = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or_else(|| uri.path());

    state
        .forwarder()
        .passthrough(
            method,
            &rest,
            uri.query(),
            subject,
            &headers,
            body,
            &request_id,
        )
        .await
        .unwrap_or_else(IntoResponse::into_response)
}
