use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, patch},
    Json, Router,
};
use uuid::Uuid;

use crate::controllers::DriverController;
use crate::dto::{ApiResponse, BindVehicleRequest, BindVehicleResponse, DriverDetail};
use crate::middleware::CurrentActor;
use crate::models::driver::{CreateDriverRequest, DriverResponse, UpdateDriverRequest};
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_driver_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_drivers).post(create_driver))
        .route("/:id", get(get_driver).put(update_driver).delete(delete_driver))
        .route("/:id/vehicle", patch(bind_vehicle))
}

async fn list_drivers(
    State(state): State<AppState>,
    actor: CurrentActor,
) -> Result<Json<Vec<DriverResponse>>, AppError> {
    let controller = DriverController::new(state.store.clone());
    Ok(Json(controller.list(actor.get()).await?))
}

async fn get_driver(
    State(state): State<AppState>,
    actor: CurrentActor,
    Path(id): Path<Uuid>,
) -> Result<Json<DriverDetail>, AppError> {
    let controller = DriverController::new(state.store.clone());
    Ok(Json(controller.get(actor.get(), id).await?))
}

async fn create_driver(
    State(state): State<AppState>,
    actor: CurrentActor,
    Json(request): Json<CreateDriverRequest>,
) -> Result<(StatusCode, Json<ApiResponse<DriverResponse>>), AppError> {
    let controller = DriverController::new(state.store.clone());
    let response = controller.create(actor.get(), request).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

async fn update_driver(
    State(state): State<AppState>,
    actor: CurrentActor,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateDriverRequest>,
) -> Result<Json<ApiResponse<DriverResponse>>, AppError> {
    let controller = DriverController::new(state.store.clone());
    Ok(Json(controller.update(actor.get(), id, request).await?))
}

async fn delete_driver(
    State(state): State<AppState>,
    actor: CurrentActor,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    let controller = DriverController::new(state.store.clone());
    controller.delete(actor.get(), id).await?;
    Ok(Json(ApiResponse::message("Driver deleted successfully".to_string())))
}

async fn bind_vehicle(
    State(state): State<AppState>,
    actor: CurrentActor,
    Path(id): Path<Uuid>,
    Json(request): Json<BindVehicleRequest>,
) -> Result<Json<ApiResponse<BindVehicleResponse>>, AppError> {
    let controller = DriverController::new(state.store.clone());
    let response = controller
        .bind_vehicle(actor.get(), id, request.vehicle_id, state.config.assignment_max_retries)
        .await?;
    Ok(Json(response))
}
