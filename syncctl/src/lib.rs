//! # syncctl: SQL to document sync service
//!
//! `syncctl` moves rows between two legacy SQL databases (the *offline* and *online* sources)
//! and a JSON document store, and keeps a small registry of users and customers per tenant.
//!
//! ## Overview
//!
//! Every route is a thin mapping from an HTTP request to one query or bulk operation:
//!
//! - `GET /fetch-sql/{table}/{mode}` selects every row of a source table and upserts them into
//!   the document store, keyed by `(table, key column)`. Last write wins; keys missing from a
//!   later pull are kept.
//! - `GET /data/{table}` and `DELETE /data/{table}` read and delete stored records, and
//!   `DELETE /schema/{table}` drops all of a table's records.
//! - `POST /push-sql/{table}` inserts stored records back into a source, row by row.
//! - `/api/users` and `/api/customers` register and list tenant users and customers.
//!
//! ## Architecture
//!
//! ```text
//!                 ┌──────────────┐
//!   HTTP ───────▶ │  api::handlers│
//!                 └──────┬───────┘
//!            ┌───────────┼────────────┐
//!            ▼           ▼            ▼
//!      ┌──────────┐ ┌──────────┐ ┌──────────────┐
//!      │  sync    │ │ db       │ │ sources      │
//!      │ pull/push│ │ repos    │ │ sqlx pools   │
//!      └────┬─────┘ └────┬─────┘ └──────┬───────┘
//!           └────────────┤              │
//!                        ▼              ▼
//!                  PostgreSQL      offline / online
//!             (records, registry)   SQL databases
//! ```
//!
//! The document store and the registry share one PostgreSQL pool; schema is managed by the
//! embedded migrations in `migrations/`. Each source gets its own lazily-connected pool for the
//! backend its URL names, so a source that is down at startup only fails the requests aimed at it.
//!
//! ## Configuration
//!
//! See [`config`]: a YAML file merged with `SYNCCTL_`-prefixed environment variables, plus the
//! conventional `DATABASE_URL`, `OFFLINE_DATABASE_URL`, `ONLINE_DATABASE_URL` and `PORT`.

pub mod api;
pub mod config;
pub mod db;
pub mod errors;
mod openapi;
pub mod password;
pub mod payload;
pub mod sources;
pub mod sync;
pub mod telemetry;
pub mod types;

#[cfg(test)]
pub mod test_utils;

use crate::config::{CorsOrigin, PoolSettings};
use crate::openapi::ApiDoc;
use crate::sources::{SqlSource, Sources};
use crate::types::SourceMode;
use axum::http::{self, HeaderValue, Method};
use axum::{
    Json, Router,
    routing::{delete, get, post},
};
use axum_prometheus::PrometheusMetricLayer;
use bon::Builder;
pub use config::Config;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, debug, info, instrument};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

/// Application state shared across all request handlers.
///
/// ```ignore
/// let state = AppState::builder()
///     .db(pool)
///     .config(config)
///     .sources(sources)
///     .build();
/// ```
#[derive(Clone, Builder)]
pub struct AppState {
    /// Document store and registry
    pub db: PgPool,
    pub config: Config,
    /// Offline and online source databases
    pub sources: Sources,
}

/// Get the syncctl database migrator
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}

fn pg_pool_options(settings: &PoolSettings) -> PgPoolOptions {
    let mut options = PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .min_connections(settings.min_connections)
        .acquire_timeout(Duration::from_secs(settings.acquire_timeout_secs));
    if settings.idle_timeout_secs > 0 {
        options = options.idle_timeout(Duration::from_secs(settings.idle_timeout_secs));
    }
    if settings.max_lifetime_secs > 0 {
        options = options.max_lifetime(Duration::from_secs(settings.max_lifetime_secs));
    }
    options
}

/// Connect to the document store and bring its schema up to date.
#[instrument(skip_all)]
pub async fn setup_database(config: &Config) -> anyhow::Result<PgPool> {
    let url = config
        .database
        .url
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("No database URL configured"))?;

    let pool = pg_pool_options(&config.database.pool).connect(url).await?;
    migrator().run(&pool).await?;
    info!("Database ready, migrations applied");

    Ok(pool)
}

/// Build a lazy pool for each source, then ping both once.
#[instrument(skip_all)]
pub async fn setup_sources(config: &Config) -> anyhow::Result<(Sources, Vec<SqlSource>)> {
    let mut pools = Vec::with_capacity(SourceMode::ALL.len());
    for mode in SourceMode::ALL {
        let source_config = config.sources.get(mode);
        let url = source_config
            .url
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("No URL configured for the {mode} source"))?;
        pools.push(SqlSource::connect_lazy(mode, url, &source_config.pool)?);
    }

    let sources = Sources::new(Arc::new(pools[0].clone()), Arc::new(pools[1].clone()));
    sources.check_connectivity().await;

    Ok((sources, pools))
}

/// Create CORS layer from configuration
fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    // tower-http refuses "*" inside an explicit list
    let allow_origin = if config.cors.allowed_origins.iter().any(|o| matches!(o, CorsOrigin::Wildcard)) {
        AllowOrigin::any()
    } else {
        let mut origins = Vec::new();
        for origin in &config.cors.allowed_origins {
            if let CorsOrigin::Url(url) = origin {
                origins.push(url.origin().ascii_serialization().parse::<HeaderValue>()?);
            }
        }
        AllowOrigin::list(origins)
    };

    let mut cors = CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([http::header::CONTENT_TYPE]);

    if let Some(max_age) = config.cors.max_age {
        cors = cors.max_age(Duration::from_secs(max_age));
    }

    Ok(cors)
}

/// Build the router with every route, docs, CORS, tracing and (optionally) metrics.
#[instrument(skip_all)]
pub fn build_router(state: AppState) -> anyhow::Result<Router> {
    use api::handlers::{customers, records, sync, users};

    let cors_layer = create_cors_layer(&state.config)?;
    let enable_metrics = state.config.enable_metrics;

    let router = Router::new()
        .route("/healthz", get(|| async { "OK" }))
        .route("/fetch-sql/{table}/{mode}", get(sync::fetch_sql))
        .route("/push-sql/{table}", post(sync::push_sql))
        .route("/data/{table}", get(records::list_records).delete(records::delete_records))
        .route("/schema/{table}", delete(records::drop_table))
        .route("/api/users", post(users::create_user))
        .route("/api/users/{db_id}", get(users::list_users))
        .route("/api/customers", post(customers::create_customer))
        .route("/api/customers/{db_id}", get(customers::list_customers))
        .with_state(state)
        .route("/api-docs/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
        .merge(Scalar::with_url("/docs", ApiDoc::openapi()));

    let mut router = router.layer(cors_layer);

    if enable_metrics {
        let (prometheus_layer, metric_handle) = PrometheusMetricLayer::pair();
        router = router
            .route("/internal/metrics", get(|| async move { metric_handle.render() }))
            .layer(prometheus_layer);
    }

    let router = router.layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    );

    Ok(router)
}

/// The assembled service.
///
/// 1. **Create**: [`Application::new`] connects to the document store, runs migrations, and
///    builds the source pools
/// 2. **Serve**: [`Application::serve`] binds to the configured address and handles requests
/// 3. **Shutdown**: once the shutdown future resolves, in-flight requests finish and every
///    pool is closed
pub struct Application {
    router: Router,
    config: Config,
    pool: PgPool,
    source_pools: Vec<SqlSource>,
}

impl Application {
    /// Create a new application instance with all resources initialized
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        debug!("Starting syncctl with configuration: {:#?}", config);

        let pool = setup_database(&config).await?;
        let (sources, source_pools) = setup_sources(&config).await?;

        let mut app = Self::new_with_pool(config, pool, sources)?;
        app.source_pools = source_pools;
        Ok(app)
    }

    /// Assemble around an existing pool and sources, skipping migrations and connectivity checks.
    pub fn new_with_pool(config: Config, pool: PgPool, sources: Sources) -> anyhow::Result<Self> {
        let state = AppState::builder().db(pool.clone()).config(config.clone()).sources(sources).build();
        let router = build_router(state)?;

        Ok(Self {
            router,
            config,
            pool,
            source_pools: Vec::new(),
        })
    }

    /// Convert application into a test server (for tests)
    #[cfg(test)]
    pub fn into_test_server(self) -> axum_test::TestServer {
        axum_test::TestServer::new(self.router.into_make_service()).expect("Failed to create test server")
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!("syncctl listening on http://{}", bind_addr);

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Closing database connections...");
        self.pool.close().await;
        for source in &self.source_pools {
            source.close().await;
        }

        info!("Shutting down telemetry...");
        telemetry::shutdown_telemetry();

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_utils::*;
    use axum::http::StatusCode;

    #[sqlx::test]
    #[test_log::test]
    async fn test_healthz_and_docs(pool: PgPool) {
        let app = create_test_app(pool, TestSources::new().sources());

        let response = app.get("/healthz").await;
        response.assert_status_ok();
        response.assert_text("OK");

        let response = app.get("/api-docs/openapi.json").await;
        response.assert_status_ok();
        assert!(response.text().contains("\"/fetch-sql/{table}/{mode}\""));

        app.get("/docs").await.assert_status_ok();
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_metrics_route_absent_by_default(pool: PgPool) {
        let app = create_test_app(pool, TestSources::new().sources());
        app.get("/internal/metrics").await.assert_status(StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_cors_layer_accepts_wildcard_and_urls() {
        let mut config = create_test_config();
        assert!(create_cors_layer(&config).is_ok());

        config.cors.allowed_origins = vec![
            CorsOrigin::Url("https://app.example.com".parse().unwrap()),
            CorsOrigin::Url("http://localhost:3000".parse().unwrap()),
        ];
        assert!(create_cors_layer(&config).is_ok());
    }

    #[tokio::test]
    async fn test_setup_sources_is_lazy_for_unreachable_hosts() {
        let mut config = create_test_config();
        config.sources.online.url = Some("postgres://nobody@127.0.0.1:1/nothing".to_string());
        config.sources.online.pool.acquire_timeout_secs = 1;

        // Startup continues even though the online source is down
        let (sources, pools) = setup_sources(&config).await.unwrap();
        assert_eq!(pools.len(), 2);
        assert!(sources.get(SourceMode::Offline).ping().await.is_ok());
        assert!(sources.get(SourceMode::Online).ping().await.is_err());
    }
}
