use std::{net::SocketAddr, path::Path};

use anyhow::Context;
use axum::{middleware, routing::get, Router};
use serde::Deserialize;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::CorsLayer,
    decompression::RequestDecompressionLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};

use crate::{
    error::ErrorVerbosity,
    middleware::{
        method_not_allowed::method_not_allowed, not_found::not_found, trace_headers::trace_headers,
        trace_response_body::trace_response_body,
    },
    repository::BookRepository,
    route,
    state::ApiState,
};

fn default_max_connections() -> u32 {
    5
}

#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    pub(crate) socket_address: SocketAddr,
    #[serde(default)]
    pub(crate) error_verbosity: ErrorVerbosity,
    pub(crate) database_url: String,
    #[serde(default = "default_max_connections")]
    pub(crate) max_connections: u32,
    #[serde(default)]
    pub(crate) trace_headers: bool,
    #[serde(default)]
    pub(crate) trace_response_body: bool,
}

impl ServerConfig {
    pub fn with_database_url(mut self, database_url: String) -> Self {
        self.database_url = database_url;
        self
    }

    pub fn with_socket_address(mut self, socket_address: SocketAddr) -> Self {
        self.socket_address = socket_address;
        self
    }

    pub async fn from_config_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();

        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }
}

/// Which optional tracing middlewares to attach.
#[derive(Debug, Clone, Copy, Default)]
pub struct TraceOptions {
    pub headers: bool,
    pub response_body: bool,
}

/// Builds the whole application on top of `state`.
pub fn app(state: ApiState, trace_options: TraceOptions) -> Router {
    let mut app = Router::<ApiState>::new()
        .route("/", get(|| async { "Bookstore API" }))
        .nest("/books", route::books::app::app())
        .merge(route::docs::app())
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            method_not_allowed,
        ));

    if trace_options.response_body {
        app = app.layer(middleware::from_fn_with_state(
            state.clone(),
            trace_response_body,
        ));
    }

    if trace_options.headers {
        app = app.layer(middleware::from_fn(trace_headers));
    }

    app.with_state(state).layer(
        ServiceBuilder::new()
            .layer(
                TraceLayer::new_for_http()
                    .make_span_with(DefaultMakeSpan::new().level(tracing::Level::INFO))
                    .on_request(DefaultOnRequest::new().level(tracing::Level::INFO))
                    .on_response(DefaultOnResponse::new().level(tracing::Level::INFO)),
            )
            .layer(RequestDecompressionLayer::new())
            .layer(CompressionLayer::new())
            .layer(CorsLayer::permissive()),
    )
}

pub struct Server {
    config: ServerConfig,
}

impl Server {
    pub fn new(config: ServerConfig) -> Self {
        Self { config }
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let books = BookRepository::connect(&self.config.database_url, self.config.max_connections)
            .await
            .context("Failed to connect to database")?;

        let state = ApiState::new(self.config.error_verbosity, books);

        let app = app(
            state,
            TraceOptions {
                headers: self.config.trace_headers,
                response_body: self.config.trace_response_body,
            },
        );

        tracing::info!(addr = %self.config.socket_address, "Starting server");

        let listener = TcpListener::bind(&self.config.socket_address)
            .await
            .context("Bind failed")?;

        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server failed")?;

        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(%err, "Failed to listen for CTRL+C");

            return std::future::pending::<()>().await;
        }

        tracing::info!("CTRL+C received");
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;

                tracing::info!("SIGTERM received");
            }
            Err(err) => {
                tracing::error!(%err, "Failed to install SIGTERM signal handler");

                std::future::pending::<()>().await
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutting down");
}
