use std::net::SocketAddr;

use axum::{Router, routing::get};
use catalog_cache::{DistributedLock, ProductCache};
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use crate::{
    config::AppConfig, create_channel, create_storage, create_store, events::Notifier, handlers,
    manager::CatalogManager,
};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub manager: CatalogManager,
    /// Cancelled on graceful shutdown; handlers derive a child token per request.
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(manager: CatalogManager) -> Self {
        Self {
            manager,
            shutdown: CancellationToken::new(),
        }
    }

    /// Wires storage, volatile store, lock and notifier from configuration.
    pub async fn from_config(cfg: &AppConfig) -> anyhow::Result<Self> {
        let storage = create_storage(&cfg.storage).await?;
        let (store, pool) = create_store(&cfg.redis).await;
        let notifier = Notifier::new(create_channel(pool), cfg.events.channel.clone());
        tracing::info!(
            storage = storage.backend_name(),
            store = store.backend_name(),
            events_topic = notifier.topic(),
            "Catalog backends ready"
        );

        let cache = ProductCache::new(store.clone(), cfg.cache_options());
        let lock = DistributedLock::new(store, cfg.lock_options());

        Ok(Self::new(CatalogManager::new(storage, cache, lock, notifier)))
    }
}

pub fn build_app(state: AppState, cfg: &AppConfig) -> Router {
    let body_limit = cfg.server.body_limit_bytes;
    Router::new()
        .route("/healthz", get(handlers::healthz))
        .route(
            "/products",
            get(handlers::list_products).post(handlers::create_product),
        )
        .route(
            "/products/{product_id}",
            get(handlers::get_product)
                .put(handlers::update_product)
                .delete(handlers::delete_product),
        )
        .route(
            "/products/{product_id}/reviews",
            get(handlers::list_reviews).post(handlers::create_review),
        )
        .route(
            "/products/{product_id}/reviews/{review_id}",
            get(handlers::get_review)
                .put(handlers::update_review)
                .delete(handlers::delete_review),
        )
        .with_state(state)
        // Outermost first: body limit -> trace -> compression -> cors
        .layer(
            ServiceBuilder::new()
                .layer(axum::extract::DefaultBodyLimit::max(body_limit))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(|req: &axum::http::Request<_>| {
                            tracing::info_span!(
                                "http.request",
                                http.method = %req.method(),
                                http.target = %req.uri(),
                                http.status_code = tracing::field::Empty,
                            )
                        })
                        .on_response(
                            |res: &axum::http::Response<_>,
                             latency: std::time::Duration,
                             span: &tracing::Span| {
                                span.record(
                                    "http.status_code",
                                    tracing::field::display(res.status().as_u16()),
                                );
                                tracing::info!(
                                    http.status = %res.status().as_u16(),
                                    elapsed_ms = %latency.as_millis(),
                                    "request handled"
                                );
                            },
                        ),
                )
                .layer(CompressionLayer::new())
                .layer(CorsLayer::permissive()),
        )
}

pub struct ServerBuilder {
    addr: SocketAddr,
    config: AppConfig,
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerBuilder {
    pub fn new() -> Self {
        let cfg = AppConfig::default();
        Self {
            addr: cfg.addr(),
            config: cfg,
        }
    }

    pub fn with_addr(mut self, addr: SocketAddr) -> Self {
        self.addr = addr;
        self
    }

    pub fn with_config(mut self, cfg: AppConfig) -> Self {
        self.addr = cfg.addr();
        self.config = cfg;
        self
    }

    pub async fn build(self) -> anyhow::Result<CatalogServer> {
        let state = AppState::from_config(&self.config).await?;
        let shutdown = state.shutdown.clone();
        let app = build_app(state, &self.config);

        Ok(CatalogServer {
            addr: self.addr,
            app,
            shutdown,
        })
    }
}

pub struct CatalogServer {
    addr: SocketAddr,
    app: Router,
    shutdown: CancellationToken,
}

impl CatalogServer {
    pub async fn run(self) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        tracing::info!("listening on {}", self.addr);
        let shutdown = self.shutdown.clone();
        axum::serve(listener, self.app)
            .with_graceful_shutdown(async move {
                tokio::select! {
                    _ = shutdown_signal() => shutdown.cancel(),
                    _ = shutdown.cancelled() => {}
                }
            })
            .await?;
        Ok(())
    }
}

async fn shutdown_signal() {
    // Wait for Ctrl+C
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
