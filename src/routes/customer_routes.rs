use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use uuid::Uuid;

use crate::controllers::CustomerController;
use crate::dto::ApiResponse;
use crate::middleware::CurrentActor;
use crate::models::customer::{CreateCustomerRequest, CustomerResponse, UpdateCustomerRequest};
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_customer_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_customers).post(create_customer))
        .route("/:id", get(get_customer).put(update_customer).delete(delete_customer))
}

async fn list_customers(
    State(state): State<AppState>,
    actor: CurrentActor,
) -> Result<Json<Vec<CustomerResponse>>, AppError> {
    let controller = CustomerController::new(state.store.clone());
    Ok(Json(controller.list(actor.get()).await?))
}

async fn get_customer(
    State(state): State<AppState>,
    actor: CurrentActor,
    Path(id): Path<Uuid>,
) -> Result<Json<CustomerResponse>, AppError> {
    let controller = CustomerController::new(state.store.clone());
    Ok(Json(controller.get(actor.get(), id).await?))
}

async fn create_customer(
    State(state): State<AppState>,
    actor: CurrentActor,
    Json(request): Json<CreateCustomerRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CustomerResponse>>), AppError> {
    let controller = CustomerController::new(state.store.clone());
    let response = controller.create(actor.get(), request).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

async fn update_customer(
    State(state): State<AppState>,
    actor: CurrentActor,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateCustomerRequest>,
) -> Result<Json<ApiResponse<CustomerResponse>>, AppError> {
    let controller = CustomerController::new(state.store.clone());
    Ok(Json(controller.update(actor.get(), id, request).await?))
}

async fn delete_customer(
    State(state): State<AppState>,
    actor: CurrentActor,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    let controller = CustomerController::new(state.store.clone());
    controller.delete(actor.get(), id).await?;
    Ok(Json(ApiResponse::message("Customer deleted successfully".to_string())))
}
