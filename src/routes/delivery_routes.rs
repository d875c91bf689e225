use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;

use crate::controllers::DeliveryController;
use crate::dto::{ApiResponse, TrackingResponse};
use crate::middleware::CurrentActor;
use crate::models::delivery::{CreateDeliveryRequest, DeliveryResponse, UpdateDeliveryRequest};
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_delivery_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_deliveries).post(create_delivery))
        .route("/:id", get(get_delivery).put(update_delivery).delete(delete_delivery))
        .route("/:id/delivered", post(mark_delivered))
}

pub fn create_tracking_router() -> Router<AppState> {
    Router::new().route("/:code", get(track_delivery))
}

async fn list_deliveries(
    State(state): State<AppState>,
    actor: CurrentActor,
) -> Result<Json<Vec<DeliveryResponse>>, AppError> {
    let controller = DeliveryController::new(state.store.clone());
    Ok(Json(controller.list(actor.get()).await?))
}

async fn get_delivery(
    State(state): State<AppState>,
    actor: CurrentActor,
    Path(id): Path<Uuid>,
) -> Result<Json<DeliveryResponse>, AppError> {
    let controller = DeliveryController::new(state.store.clone());
    Ok(Json(controller.get(actor.get(), id).await?))
}

async fn create_delivery(
    State(state): State<AppState>,
    actor: CurrentActor,
    Json(request): Json<CreateDeliveryRequest>,
) -> Result<(StatusCode, Json<ApiResponse<DeliveryResponse>>), AppError> {
    let controller = DeliveryController::new(state.store.clone());
    let response = controller.create(actor.get(), request).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

async fn update_delivery(
    State(state): State<AppState>,
    actor: CurrentActor,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateDeliveryRequest>,
) -> Result<Json<ApiResponse<DeliveryResponse>>, AppError> {
    let controller = DeliveryController::new(state.store.clone());
    Ok(Json(controller.update(actor.get(), id, request).await?))
}

async fn delete_delivery(
    State(state): State<AppState>,
    actor: CurrentActor,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    let controller = DeliveryController::new(state.store.clone());
    controller.delete(actor.get(), id).await?;
    Ok(Json(ApiResponse::message("Delivery deleted successfully".to_string())))
}

async fn mark_delivered(
    State(state): State<AppState>,
    actor: CurrentActor,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<DeliveryResponse>>, AppError> {
    let controller = DeliveryController::new(state.store.clone());
    Ok(Json(controller.mark_delivered(actor.get(), id).await?))
}

async fn track_delivery(
    State(state): State<AppState>,
    actor: CurrentActor,
    Path(code): Path<String>,
) -> Result<Json<TrackingResponse>, AppError> {
    let controller = DeliveryController::new(state.store.clone());
    Ok(Json(controller.track(actor.get(), &code).await?))
}
