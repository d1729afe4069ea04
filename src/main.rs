//! Airbnb Insights Backend Service
//!
//! Serves the NYC listings dashboard over a WebSocket push server. Views are
//! aggregated on request from the star-schema warehouse, either Postgres or
//! the ETL's CSV export.

use airbnb_insights::config::{AppConfig, LogFormat, WarehouseBackend};
use airbnb_insights::database::{create_pool, run_migrations};
use airbnb_insights::error::{AppError, AppResult};
use airbnb_insights::services::{DashboardService, PricePredictorClient};
use airbnb_insights::warehouse::{InMemoryWarehouse, PgWarehouse, Warehouse};
use airbnb_insights::websocket::DashboardSocketServer;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

/// Build the configured warehouse backend
async fn build_warehouse(config: &AppConfig) -> AppResult<Arc<dyn Warehouse>> {
    match &config.warehouse {
        WarehouseBackend::Postgres => {
            let db_config = config
                .database
                .as_ref()
                .ok_or_else(|| AppError::Config("DATABASE_URL is not set".to_string()))?;

            info!("Connecting to warehouse database...");
            let pool = create_pool(db_config).await.map_err(|e| {
                error!("Failed to create database pool: {}", e);
                AppError::Database(e)
            })?;
            info!("Database connection pool created successfully");
            info!("Max connections: {}", db_config.max_connections);

            // the ETL owns the warehouse schema; only scratch databases are bootstrapped
            if db_config.bootstrap_schema {
                info!("Bootstrapping star schema from migrations...");
                run_migrations(&pool, None).await.map_err(|e| {
                    error!("Database migration failed: {}", e);
                    AppError::Database(e)
                })?;
                info!("Star schema bootstrap completed");
            }

            Ok(Arc::new(PgWarehouse::new(pool)))
        }
        WarehouseBackend::Csv(dir) => {
            info!("Loading warehouse from CSV export in {}...", dir.display());
            let warehouse = InMemoryWarehouse::from_csv_dir(dir).map_err(|e| {
                error!("Failed to load CSV export: {}", e);
                AppError::Warehouse(e)
            })?;
            info!("Loaded {} fact rows", warehouse.fact_count());
            Ok(Arc::new(warehouse))
        }
    }
}

#[tokio::main]
async fn main() -> AppResult<()> {
    // Load environment variables first
    dotenv::dotenv().ok();

    let config = AppConfig::from_env().map_err(|e| {
        eprintln!("Configuration error: {}", e);
        AppError::Config(e)
    })?;

    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("airbnb_insights={},sqlx=warn", config.log_level).into()
    });
    match config.log_format {
        LogFormat::Pretty => tracing_subscriber::fmt().with_env_filter(filter).init(),
        LogFormat::Json => tracing_subscriber::fmt().json().with_env_filter(filter).init(),
    }

    info!("╔══════════════════════════════════════════════════════════╗");
    info!("║         Airbnb Insights Backend Starting                  ║");
    info!("╚══════════════════════════════════════════════════════════╝");
    info!("Environment: {}", config.environment);
    info!("Log level: {}", config.log_level);
    info!("WebSocket port: {}", config.ws_port);

    // =========================================================================
    // WAREHOUSE
    // =========================================================================
    let warehouse = build_warehouse(&config).await?;
    let dashboard = Arc::new(DashboardService::new(warehouse));
    info!("✓ Dashboard service initialized");

    // =========================================================================
    // PRICE PREDICTION CLIENT
    // =========================================================================
    let predictor = match PricePredictorClient::new(&config.ml_service) {
        Ok(client) => {
            match client.health().await {
                Ok(health) if health.is_healthy() => {
                    info!("✓ Price prediction service healthy at {}", config.ml_service.url)
                }
                Ok(health) => warn!(
                    "Price prediction service at {} reports status {}",
                    config.ml_service.url, health.status
                ),
                Err(e) => warn!(
                    "Price prediction service at {} unreachable: {}",
                    config.ml_service.url, e
                ),
            }
            Some(Arc::new(client))
        }
        Err(e) => {
            warn!("Price prediction disabled: {}", e);
            None
        }
    };

    // =========================================================================
    // START SERVER
    // =========================================================================
    let ws_addr: SocketAddr = format!("0.0.0.0:{}", config.ws_port)
        .parse()
        .map_err(|e| AppError::Config(format!("Invalid WebSocket address: {}", e)))?;

    info!("Starting WebSocket server on {}...", ws_addr);
    let listener = TcpListener::bind(ws_addr).await.map_err(|e| {
        error!("Failed to bind WebSocket server: {}", e);
        AppError::Io(e)
    })?;

    let ws_server = DashboardSocketServer::new(dashboard, predictor);
    let ws_handle = tokio::spawn(ws_server.serve(listener));

    info!("╔══════════════════════════════════════════════════════════╗");
    info!("║         Airbnb Insights Backend Ready!                    ║");
    info!("╠══════════════════════════════════════════════════════════╣");
    info!("║  WebSocket:    0.0.0.0:{}                               ║", config.ws_port);
    info!("║  Environment:  {}                                    ║", config.environment);
    info!("╚══════════════════════════════════════════════════════════╝");
    info!("Press Ctrl+C to shutdown gracefully");

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received, shutting down gracefully...");
        }
        _ = ws_handle => {
            error!("WebSocket server exited unexpectedly");
        }
    }

    info!("Airbnb insights backend shutdown complete");
    Ok(())
}
