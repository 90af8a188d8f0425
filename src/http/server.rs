//! HTTP server setup and request forwarding.
//!
//! # Responsibilities
//! - Create the axum Router with the wildcard gateway handler
//! - Wire up middleware (tracing, timeout, request ID)
//! - Compile the initial route locator; recompile and swap on reload
//! - Locate the matching route per request and forward to its target
//! - Observability (metrics, request IDs)

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::State,
    http::{uri::PathAndQuery, Request, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::any,
    Json, Router,
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower::ServiceBuilder;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::{GatewayConfig, HttpClientConfig};
use crate::http::request::MakeRequestUuid;
use crate::observability::metrics;
use crate::routing::{CompileError, RequestContext, RouteLocatorFactory, SharedRouteLocator};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub locator: Arc<SharedRouteLocator>,
    pub client: Client<HttpConnector, Body>,
}

/// HTTP server for the gateway.
pub struct GatewayServer {
    router: Router,
    locator: Arc<SharedRouteLocator>,
    factory: Arc<RouteLocatorFactory>,
}

impl GatewayServer {
    /// Create a new server, compiling the configured routes.
    ///
    /// Compilation is all-or-nothing: a configuration problem fails
    /// construction before anything is served.
    pub fn new(
        config: GatewayConfig,
        factory: RouteLocatorFactory,
    ) -> Result<Self, CompileError> {
        let locator = Arc::new(SharedRouteLocator::new(factory.build(&config.routes)?));
        let client = build_client(&config.http_client);

        let state = AppState {
            locator: locator.clone(),
            client,
        };

        let router = Self::build_router(&config, state);
        Ok(Self {
            router,
            locator,
            factory: Arc::new(factory),
        })
    }

    /// Build the axum router with all middleware layers.
    fn build_router(config: &GatewayConfig, state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(gateway_handler))
            .route("/", any(gateway_handler))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(TraceLayer::new_for_http())
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(PropagateRequestIdLayer::x_request_id())
                    .layer(TimeoutLayer::new(Duration::from_secs(
                        config.listener.request_timeout_secs,
                    ))),
            )
    }

    /// Run the server, accepting connections on the given listener.
    ///
    /// Each configuration update is recompiled into a new route locator
    /// and swapped in atomically; a failed compilation keeps the current
    /// routes.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<GatewayConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            routes = self.locator.snapshot().len(),
            "HTTP server starting"
        );

        let locator = self.locator.clone();
        let factory = self.factory.clone();
        tokio::spawn(async move {
            while let Some(new_config) = config_updates.recv().await {
                match factory.build(&new_config.routes) {
                    Ok(new_locator) => {
                        tracing::info!(
                            routes = new_locator.len(),
                            "Route table recompiled, swapping in"
                        );
                        locator.replace(new_locator);
                    }
                    Err(e) => {
                        tracing::error!(
                            "Route compilation failed: {}. Keeping current routes.",
                            e
                        );
                    }
                }
            }
        });

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(async move {
                tokio::select! {
                    _ = shutdown.recv() => {}
                    _ = tokio::signal::ctrl_c() => {}
                }
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Build the forwarding client from pass-through pool settings.
fn build_client(config: &HttpClientConfig) -> Client<HttpConnector, Body> {
    let mut connector = HttpConnector::new();
    connector.set_connect_timeout(Some(Duration::from_millis(config.connect_timeout_ms)));

    Client::builder(TokioExecutor::new())
        .pool_max_idle_per_host(config.max_connections)
        .build(connector)
}

/// Main gateway handler.
/// Locates the matching route and forwards the request to its target.
async fn gateway_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    let (parts, body) = request.into_parts();
    let ctx = RequestContext::from_parts(&parts);
    let method = ctx.method().to_string();

    // One snapshot per request: a concurrent reload cannot change the
    // route set mid-lookup.
    let snapshot = state.locator.snapshot();
    let route = match snapshot.find(&ctx) {
        Some(route) => route,
        None => {
            tracing::warn!(request_id = %request_id, path = %ctx.path(), "No route matched");
            metrics::record_request(&method, 404, "none", start);
            return (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": "no matching route" })),
            )
                .into_response();
        }
    };

    tracing::debug!(
        request_id = %request_id,
        route = %route.id(),
        target = %route.target(),
        "Route matched"
    );

    // Rewrite scheme and authority to the route target; path and query
    // pass through unchanged.
    let mut uri_parts = parts.uri.clone().into_parts();
    uri_parts.scheme = Some(route.scheme().clone());
    uri_parts.authority = Some(route.authority().clone());
    if uri_parts.path_and_query.is_none() {
        uri_parts.path_and_query = Some(PathAndQuery::from_static("/"));
    }

    let upstream = Uri::from_parts(uri_parts)
        .map_err(|e| e.to_string())
        .and_then(|uri| {
            let mut builder = Request::builder()
                .method(parts.method.clone())
                .uri(uri)
                .version(parts.version);
            if let Some(headers) = builder.headers_mut() {
                for (name, value) in parts.headers.iter() {
                    headers.insert(name.clone(), value.clone());
                }
            }
            builder.body(body).map_err(|e| e.to_string())
        });

    let upstream = match upstream {
        Ok(req) => req,
        Err(e) => {
            tracing::error!(request_id = %request_id, route = %route.id(), error = %e, "Failed to build upstream request");
            metrics::record_request(&method, 502, route.id(), start);
            return (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response();
        }
    };

    match state.client.request(upstream).await {
        Ok(response) => {
            let status = response.status();
            metrics::record_request(&method, status.as_u16(), route.id(), start);
            let (parts, body) = response.into_parts();
            Response::from_parts(parts, Body::new(body)).into_response()
        }
        Err(e) => {
            tracing::error!(request_id = %request_id, route = %route.id(), error = %e, "Upstream error");
            metrics::record_request(&method, 502, route.id(), start);
            (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response()
        }
    }
}
