//! Routers HTTP
//!
//! Todo lo que cuelga de `/api` pasa por el middleware de autenticación;
//! `/health` queda público.

pub mod customer_routes;
pub mod delivery_routes;
pub mod driver_routes;
pub mod route_routes;
pub mod vehicle_routes;

use axum::{middleware::from_fn_with_state, routing::get, Json, Router};
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;

use crate::middleware::{auth_middleware, cors_layer};
use crate::state::AppState;

pub fn create_api_router(state: AppState) -> Router<AppState> {
    Router::new()
        .nest("/drivers", driver_routes::create_driver_router())
        .nest("/vehicles", vehicle_routes::create_vehicle_router())
        .nest("/customers", customer_routes::create_customer_router())
        .nest("/routes", route_routes::create_route_router())
        .nest("/deliveries", delivery_routes::create_delivery_router())
        .nest("/tracking", delivery_routes::create_tracking_router())
        .layer(from_fn_with_state(state, auth_middleware))
}

/// Router completo de la aplicación
pub fn create_app(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_origins);

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", create_api_router(state.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
