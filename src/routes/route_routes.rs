use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;

use crate::controllers::RouteController;
use crate::dto::{ApiResponse, AssignDeliveriesRequest, RouteDashboard};
use crate::middleware::CurrentActor;
use crate::models::route::{CreateRouteRequest, RouteFilters, RouteResponse, UpdateRouteRequest};
use crate::services::AssignmentSummary;
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_route_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_routes).post(create_route))
        .route("/:id", get(get_route).put(update_route).delete(delete_route))
        .route("/:id/deliveries", post(assign_deliveries))
        .route("/:id/dashboard", get(route_dashboard))
}

async fn list_routes(
    State(state): State<AppState>,
    actor: CurrentActor,
    Query(filters): Query<RouteFilters>,
) -> Result<Json<Vec<RouteResponse>>, AppError> {
    let controller = RouteController::new(state.store.clone());
    Ok(Json(controller.list(actor.get(), &filters).await?))
}

async fn get_route(
    State(state): State<AppState>,
    actor: CurrentActor,
    Path(id): Path<Uuid>,
) -> Result<Json<RouteResponse>, AppError> {
    let controller = RouteController::new(state.store.clone());
    Ok(Json(controller.get(actor.get(), id).await?))
}

async fn create_route(
    State(state): State<AppState>,
    actor: CurrentActor,
    Json(request): Json<CreateRouteRequest>,
) -> Result<(StatusCode, Json<ApiResponse<RouteResponse>>), AppError> {
    let controller = RouteController::new(state.store.clone());
    let response = controller.create(actor.get(), request).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

async fn update_route(
    State(state): State<AppState>,
    actor: CurrentActor,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateRouteRequest>,
) -> Result<Json<ApiResponse<RouteResponse>>, AppError> {
    let controller = RouteController::new(state.store.clone());
    Ok(Json(controller.update(actor.get(), id, request).await?))
}

async fn delete_route(
    State(state): State<AppState>,
    actor: CurrentActor,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    let controller = RouteController::new(state.store.clone());
    controller.delete(actor.get(), id).await?;
    Ok(Json(ApiResponse::message("Route deleted successfully".to_string())))
}

async fn assign_deliveries(
    State(state): State<AppState>,
    actor: CurrentActor,
    Path(id): Path<Uuid>,
    Json(request): Json<AssignDeliveriesRequest>,
) -> Result<Json<ApiResponse<AssignmentSummary>>, AppError> {
    let controller = RouteController::new(state.store.clone());
    let response = controller
        .assign_deliveries(actor.get(), id, request, state.config.assignment_max_retries)
        .await?;
    Ok(Json(response))
}

async fn route_dashboard(
    State(state): State<AppState>,
    actor: CurrentActor,
    Path(id): Path<Uuid>,
) -> Result<Json<RouteDashboard>, AppError> {
    let controller = RouteController::new(state.store.clone());
    Ok(Json(controller.dashboard(actor.get(), id).await?))
}
