use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use dotenvy::dotenv;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use fleet_logistics::config::{DatabaseConfig, EnvironmentConfig, StoreBackend};
use fleet_logistics::database::DatabaseConnection;
use fleet_logistics::repositories::{FleetStore, MemoryFleetStore, PgFleetStore};
use fleet_logistics::{create_app, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    // Cargar variables de entorno
    dotenv().ok();

    let config = EnvironmentConfig::from_env()?;

    // Configurar logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .init();

    info!("🚚 Fleet Logistics API ({})", config.environment);
    info!("================================================");

    let store: Arc<dyn FleetStore> = match config.store_backend {
        StoreBackend::Postgres => {
            let db_config = DatabaseConfig::from_env()?;
            let db_connection = match DatabaseConnection::connect(&db_config).await {
                Ok(conn) => conn,
                Err(e) => {
                    error!("❌ Error conectando a la base de datos: {:#}", e);
                    return Err(e);
                }
            };
            db_connection.run_migrations().await?;
            Arc::new(PgFleetStore::new(db_connection.pool().clone()))
        }
        StoreBackend::Memory => {
            warn!("⚠️ STORE_BACKEND=memory: los datos se pierden al reiniciar");
            Arc::new(MemoryFleetStore::new())
        }
    };

    if config.is_production() && config.cors_origins.is_empty() {
        warn!("⚠️ CORS_ORIGINS vacío en producción: se aceptan todos los orígenes");
    }

    let addr: SocketAddr = config.server_url().parse()?;
    let app = create_app(AppState::new(store, config));

    info!("🌐 Servidor iniciando en http://{}", addr);
    info!("🔍 Endpoints disponibles:");
    info!("   GET  /health - Health check");
    info!("👤 /api/drivers - CRUD conductores, PATCH /:id/vehicle vincula vehículo");
    info!("🚗 /api/vehicles - CRUD vehículos");
    info!("🏢 /api/customers - CRUD clientes");
    info!("🛣️ /api/routes - CRUD rutas, POST /:id/deliveries asigna, GET /:id/dashboard");
    info!("📦 /api/deliveries - CRUD entregas, POST /:id/delivered");
    info!("🔎 /api/tracking/:code - Rastreo por código");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("❌ Error del servidor: {}", e);
        return Err(e.into());
    }

    info!("👋 Servidor terminado");
    Ok(())
}

/// Espera Ctrl+C o SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("🛑 Señal Ctrl+C recibida, apagando servidor...");
        },
        _ = terminate => {
            info!("🛑 Señal de terminación recibida, apagando servidor...");
        },
    }
}
