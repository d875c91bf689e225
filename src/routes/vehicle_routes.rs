use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use uuid::Uuid;

use crate::controllers::VehicleController;
use crate::dto::ApiResponse;
use crate::middleware::CurrentActor;
use crate::models::vehicle::{CreateVehicleRequest, UpdateVehicleRequest, VehicleResponse};
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_vehicle_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_vehicles).post(create_vehicle))
        .route("/:id", get(get_vehicle).put(update_vehicle).delete(delete_vehicle))
}

async fn create_vehicle(
    State(state): State<AppState>,
    actor: CurrentActor,
    Json(request): Json<CreateVehicleRequest>,
) -> Result<(StatusCode, Json<ApiResponse<VehicleResponse>>), AppError> {
    let controller = VehicleController::new(state.store.clone());
    let response = controller.create(actor.get(), request).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

async fn get_vehicle(
    State(state): State<AppState>,
    actor: CurrentActor,
    Path(id): Path<Uuid>,
) -> Result<Json<VehicleResponse>, AppError> {
    let controller = VehicleController::new(state.store.clone());
    Ok(Json(controller.get(actor.get(), id).await?))
}

async fn list_vehicles(
    State(state): State<AppState>,
    actor: CurrentActor,
) -> Result<Json<Vec<VehicleResponse>>, AppError> {
    let controller = VehicleController::new(state.store.clone());
    Ok(Json(controller.list(actor.get()).await?))
}

async fn update_vehicle(
    State(state): State<AppState>,
    actor: CurrentActor,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateVehicleRequest>,
) -> Result<Json<ApiResponse<VehicleResponse>>, AppError> {
    let controller = VehicleController::new(state.store.clone());
    Ok(Json(controller.update(actor.get(), id, request).await?))
}

async fn delete_vehicle(
    State(state): State<AppState>,
    actor: CurrentActor,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    let controller = VehicleController::new(state.store.clone());
    controller.delete(actor.get(), id).await?;
    Ok(Json(ApiResponse::message("Vehicle deleted successfully".to_string())))
}
