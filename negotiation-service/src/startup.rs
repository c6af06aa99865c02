//! Application startup and lifecycle management.
//!
//! Wires storage, catalog, policy and signing keys into the tool gateway and
//! serves it over HTTP next to the health, metrics and key endpoints.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::middleware::from_fn;
use axum::routing::{get, post};
use axum::Router;
use mongodb::{options::ClientOptions, Client};
use secrecy::ExposeSecret;
use service_core::middleware::{metrics_middleware, request_id_middleware, REQUEST_ID_HEADER};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::config::{NegotiationConfig, StorageBackend};
use crate::handlers;
use crate::services::{
    Catalog, Clock, InMemoryMandateRepository, InMemorySessionRepository, KeyProvider,
    MandateRepository, MandateService, MandateSettings, MongoMandateRepository,
    MongoSessionRepository, NegotiationService, PolicyEngine, RandomMarkup, RsaKeyProvider,
    SessionRepository, SessionStore, SystemClock,
};
use crate::tools::ToolGateway;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub gateway: ToolGateway,
    pub keys: Arc<dyn KeyProvider>,
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
}

impl Application {
    /// Build the application with the given configuration.
    pub async fn build(config: NegotiationConfig) -> anyhow::Result<Self> {
        let state = build_state(&config).await?;
        Self::with_state(state, &config.common.host, config.common.port).await
    }

    /// Bind a listener for an already assembled state (port 0 = random port).
    pub async fn with_state(state: AppState, host: &str, port: u16) -> anyhow::Result<Self> {
        let addr: SocketAddr = format!("{}:{}", host, port)
            .parse()
            .with_context(|| format!("Invalid listen address {}:{}", host, port))?;
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind HTTP listener to {}: {}", addr, e);
            e
        })?;
        let port = listener.local_addr()?.port();
        tracing::info!(port, "Negotiation service listening");

        Ok(Self {
            port,
            listener,
            router: build_router(state),
        })
    }

    /// Get the HTTP port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Serve until the process receives SIGINT or SIGTERM.
    pub async fn run_until_stopped(self) -> anyhow::Result<()> {
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        tracing::info!("Service shutdown complete");
        Ok(())
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/mcp", post(handlers::mcp::handle))
        .route(
            "/.well-known/mandate-key",
            get(handlers::well_known::mandate_key),
        )
        .route_layer(from_fn(metrics_middleware))
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics))
        .layer(from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            }),
        )
        .with_state(state)
}

/// Assemble repositories, catalog, policy and keys from configuration.
pub async fn build_state(config: &NegotiationConfig) -> anyhow::Result<AppState> {
    let (sessions_repo, mandates_repo) = build_repositories(config).await?;

    let catalog = Arc::new(Catalog::load(
        &config.catalog_path,
        config.negotiation.default_reference_cost,
    )?);

    let keys = build_key_provider(config).await?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let store = Arc::new(SessionStore::new(sessions_repo, clock.clone()));
    let policy = PolicyEngine::simulated(
        Arc::new(RandomMarkup::new(
            config.negotiation.markup_min_percent,
            config.negotiation.markup_max_percent,
        )),
        config.negotiation.supplier_response_timeout(),
    );
    let negotiation = Arc::new(NegotiationService::new(
        store.clone(),
        catalog.clone(),
        policy,
        config.negotiation.default_max_rounds,
    ));
    let mandates = Arc::new(MandateService::new(
        mandates_repo,
        store,
        catalog,
        keys.clone(),
        clock,
        MandateSettings {
            issuer: config.mandate.issuer.clone(),
            audience: config.mandate.audience.clone(),
            ttl: chrono::Duration::hours(config.mandate.ttl_hours),
        },
    ));

    Ok(AppState {
        gateway: ToolGateway::new(negotiation, mandates),
        keys,
    })
}

async fn build_repositories(
    config: &NegotiationConfig,
) -> anyhow::Result<(Arc<dyn SessionRepository>, Arc<dyn MandateRepository>)> {
    match config.storage.backend {
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; state is lost on restart");
            Ok((
                Arc::new(InMemorySessionRepository::new()),
                Arc::new(InMemoryMandateRepository::new()),
            ))
        }
        StorageBackend::Mongo => {
            let mongo = config
                .storage
                .mongodb
                .as_ref()
                .context("MongoDB settings missing for mongo storage backend")?;

            let mut client_options = ClientOptions::parse(mongo.uri.expose_secret())
                .await
                .map_err(|e| {
                    tracing::error!("Failed to parse MongoDB connection string: {}", e);
                    e
                })?;
            client_options.app_name = Some(config.service_name.clone());
            let client = Client::with_options(client_options)?;
            let db = client.database(&mongo.database);

            let sessions = MongoSessionRepository::new(&db);
            let mandates = MongoMandateRepository::new(&db);
            sessions.init_indexes().await?;
            mandates.init_indexes().await?;
            tracing::info!(database = %mongo.database, "MongoDB storage initialized");

            Ok((Arc::new(sessions), Arc::new(mandates)))
        }
    }
}

async fn build_key_provider(config: &NegotiationConfig) -> anyhow::Result<Arc<dyn KeyProvider>> {
    let key_id = config.mandate.key_id.clone();
    let provider = match config.mandate.pem_paths() {
        Some((private_path, public_path)) => {
            RsaKeyProvider::from_pem_files(key_id, private_path, public_path)?
        }
        None => {
            let bits = config.mandate.key_bits;
            tokio::task::spawn_blocking(move || RsaKeyProvider::generate(key_id, bits))
                .await
                .context("Key generation task failed")??
        }
    };
    Ok(Arc::new(provider))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
