//! HTTP server setup and the forwarding handler.
//!
//! # Responsibilities
//! - Create the Axum router (`/ping`, optional `{prefix}/ping`, catch-all)
//! - Wire up middleware (tracing, CORS, request ID, timeout)
//! - Run the relay pipeline for every forwarded request
//! - Serve with graceful shutdown

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::State,
    http::{Method, Request},
    response::{IntoResponse, Response},
    routing::{any, get},
    Router,
};
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::ProxyConfig;
use crate::error::ProxyResult;
use crate::http::client::UpstreamClient;
use crate::http::request::{request_id, InboundRequest, MakeRequestUuid, X_REQUEST_ID};
use crate::http::response;
use crate::http::transform::RequestTransformer;
use crate::lifecycle::Shutdown;
use crate::observability::metrics;
use crate::rewrite::{decode_body, is_javascript, BodyRewriter};
use crate::routing::OriginResolver;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub resolver: Arc<OriginResolver>,
    pub transformer: Arc<RequestTransformer>,
    pub client: UpstreamClient,
    pub route_prefix: Arc<str>,
    pub max_body_size: usize,
    pub max_decoded_size: usize,
}

impl AppState {
    /// Compile the configuration into handler state.
    ///
    /// Fails with `InvalidOrigin` when `google_origin` is unusable.
    pub fn from_config(config: &ProxyConfig) -> ProxyResult<Self> {
        Ok(Self {
            resolver: Arc::new(OriginResolver::new(&config.google_origin)?),
            transformer: Arc::new(RequestTransformer::from_config(config)),
            client: UpstreamClient::new(&config.timeouts)?,
            route_prefix: Arc::from(config.route_prefix.as_str()),
            max_body_size: config.limits.max_body_size,
            max_decoded_size: config.limits.max_decoded_size,
        })
    }
}

/// HTTP server for the analytics relay.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ProxyConfig) -> ProxyResult<Self> {
        let state = AppState::from_config(&config)?;
        Ok(Self::with_state(&config, state))
    }

    /// Create a server around prebuilt handler state.
    pub fn with_state(config: &ProxyConfig, state: AppState) -> Self {
        tracing::info!(
            google_origin = %state.resolver.default_origin(),
            route_prefix = %config.route_prefix,
            inject_rules = state.transformer.inject_rules().len(),
            skip_params = %config.skip_params_from_req_headers,
            "Relay pipeline configured"
        );

        Self {
            router: Self::build_router(config, state),
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    pub fn build_router(config: &ProxyConfig, state: AppState) -> Router {
        let mut router = Router::new()
            .route("/ping", get(ping_handler).fallback(proxy_handler))
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler));

        if !config.route_prefix.is_empty() {
            router = router.route(
                &format!("{}/ping", config.route_prefix),
                get(ping_handler).fallback(proxy_handler),
            );
        }

        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::HEAD,
                Method::PUT,
                Method::DELETE,
                Method::PATCH,
            ])
            .allow_headers(Any);

        router
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
            .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid))
            .layer(cors)
            .layer(TraceLayer::new_for_http())
    }

    /// The router without a listener, for in-process use.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server, accepting connections on the given listener until
    /// `shutdown` is triggered.
    pub async fn run(self, listener: TcpListener, shutdown: Shutdown) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown.signalled())
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Liveness probe; never touches the upstream.
async fn ping_handler() -> &'static str {
    "pong"
}

/// Forward a request through the relay pipeline.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let request_id = request_id(request.headers()).to_string();
    let method = request.method().to_string();

    match forward(&state, request, &request_id).await {
        Ok((response, upstream)) => {
            metrics::record_request(&method, response.status().as_u16(), &upstream, start);
            response
        }
        Err(e) => {
            let response = e.into_response();
            metrics::record_request(&method, response.status().as_u16(), "none", start);
            response
        }
    }
}

/// The pipeline proper. Returns the client response and the upstream host.
async fn forward(
    state: &AppState,
    request: Request<Body>,
    request_id: &str,
) -> ProxyResult<(Response, String)> {
    let inbound = InboundRequest::from_request(request, state.max_body_size).await?;
    let public_host = inbound.public_host();

    let upstream_request = state.transformer.transform(&inbound, &state.resolver);
    let upstream_host = upstream_request.url.host_str().unwrap_or_default().to_string();

    tracing::info!(
        request_id = %request_id,
        method = %inbound.method,
        path = %inbound.uri.path(),
        upstream = %upstream_request.url,
        "Forwarding request"
    );

    let upstream = state.client.send(upstream_request).await?;
    let content_type = response::content_type(&upstream.headers).to_string();
    let body = decode_body(&upstream.headers, upstream.body, state.max_decoded_size)?;

    let body = if is_javascript(&content_type) {
        metrics::record_rewrite();
        BodyRewriter::new(&public_host, &state.route_prefix).rewrite(&content_type, body)
    } else {
        body
    };

    tracing::debug!(
        request_id = %request_id,
        status = upstream.status.as_u16(),
        content_type = %content_type,
        bytes = body.len(),
        "Upstream responded"
    );

    let response = response::assemble(
        upstream.status,
        upstream.headers.get(axum::http::header::CONTENT_TYPE),
        body,
    );
    Ok((response, upstream_host))
}
