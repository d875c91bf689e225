use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::dto::{ApiResponse, AssignDeliveriesRequest, RouteDashboard};
use crate::models::route::{CreateRouteRequest, RouteFilters, RouteResponse, UpdateRouteRequest};
use crate::models::{Action, Actor, ResourceKind, Route, RouteStatus};
use crate::repositories::FleetStore;
use crate::services::{
    authenticated, enforce, AssignmentService, AssignmentSummary, ResourceRef, RouteLifecycle,
    Scope, Target,
};
use crate::utils::errors::{not_found_error, AppError, AppResult};

pub struct RouteController {
    store: Arc<dyn FleetStore>,
}

impl RouteController {
    pub fn new(store: Arc<dyn FleetStore>) -> Self {
        Self { store }
    }

    pub async fn list(
        &self,
        actor: Option<&Actor>,
        filters: &RouteFilters,
    ) -> AppResult<Vec<RouteResponse>> {
        let actor = authenticated(actor)?;
        enforce(Some(actor), Action::List, Target::Collection(ResourceKind::Route))?;

        let routes = self
            .store
            .list_routes(Scope::for_actor(actor, ResourceKind::Route), filters)
            .await?;
        Ok(routes.into_iter().map(RouteResponse::from).collect())
    }

    pub async fn get(&self, actor: Option<&Actor>, id: Uuid) -> AppResult<RouteResponse> {
        let actor = authenticated(actor)?;
        let route = self.load(id).await?;
        enforce(Some(actor), Action::Read, Target::Object(ResourceRef::Route(&route)))?;
        Ok(route.into())
    }

    pub async fn create(
        &self,
        actor: Option<&Actor>,
        request: CreateRouteRequest,
    ) -> AppResult<ApiResponse<RouteResponse>> {
        let actor = authenticated(actor)?;
        enforce(Some(actor), Action::Create, Target::Collection(ResourceKind::Route))?;
        request.validate()?;

        if self.store.find_driver(request.driver_id).await?.is_none() {
            return Err(not_found_error("Driver", &request.driver_id.to_string()));
        }
        if self.store.find_vehicle(request.vehicle_id).await?.is_none() {
            return Err(not_found_error("Vehicle", &request.vehicle_id.to_string()));
        }

        let now = Utc::now();
        let route = Route {
            id: Uuid::new_v4(),
            name: request.name,
            description: request.description,
            driver_id: request.driver_id,
            vehicle_id: request.vehicle_id,
            status: RouteStatus::Planned,
            scheduled_date: request.scheduled_date.unwrap_or_else(|| now.date_naive()),
            capacity_total_used: Decimal::ZERO,
            estimated_km: request.estimated_km,
            estimated_minutes: request.estimated_minutes,
            created_at: now,
        };
        let route = self.store.insert_route(&route).await?;
        info!("🛣️ Ruta {} creada para el conductor {}", route.id, route.driver_id);

        Ok(ApiResponse::success_with_message(
            route.into(),
            "Route created successfully".to_string(),
        ))
    }

    pub async fn update(
        &self,
        actor: Option<&Actor>,
        id: Uuid,
        request: UpdateRouteRequest,
    ) -> AppResult<ApiResponse<RouteResponse>> {
        let actor = authenticated(actor)?;
        let mut route = self.load(id).await?;
        enforce(
            Some(actor),
            Action::Update(request.edit_class()),
            Target::Object(ResourceRef::Route(&route)),
        )?;
        request.validate()?;

        if request.touches_assignment() {
            return Err(AppError::BadRequest(
                "Route driver and vehicle are fixed at creation".to_string(),
            ));
        }

        if let Some(next) = request.status {
            RouteLifecycle::new(self.store.clone())
                .change_status(route.id, next)
                .await?;
        }
        request.apply_details(&mut route);
        let route = self.store.update_route(&route).await?;

        Ok(ApiResponse::success_with_message(
            route.into(),
            "Route updated successfully".to_string(),
        ))
    }

    pub async fn delete(&self, actor: Option<&Actor>, id: Uuid) -> AppResult<()> {
        let actor = authenticated(actor)?;
        let route = self.load(id).await?;
        enforce(Some(actor), Action::Delete, Target::Object(ResourceRef::Route(&route)))?;

        // El estado se revalida dentro de la transacción de borrado
        self.store.delete_route(id).await?;
        info!("🗑️ Ruta {} eliminada", id);
        Ok(())
    }

    pub async fn assign_deliveries(
        &self,
        actor: Option<&Actor>,
        id: Uuid,
        request: AssignDeliveriesRequest,
        max_retries: u32,
    ) -> AppResult<ApiResponse<AssignmentSummary>> {
        let summary = AssignmentService::new(self.store.clone(), max_retries)
            .assign_deliveries(actor, id, &request.tracking_codes)
            .await?;
        let message = summary.message();
        Ok(ApiResponse::success_with_message(summary, message))
    }

    pub async fn dashboard(&self, actor: Option<&Actor>, id: Uuid) -> AppResult<RouteDashboard> {
        let actor = authenticated(actor)?;
        let route = self.load(id).await?;
        enforce(Some(actor), Action::Read, Target::Object(ResourceRef::Route(&route)))?;

        let driver = self
            .store
            .find_driver(route.driver_id)
            .await?
            .ok_or_else(|| not_found_error("Driver", &route.driver_id.to_string()))?;
        let vehicle = self
            .store
            .find_vehicle(route.vehicle_id)
            .await?
            .ok_or_else(|| not_found_error("Vehicle", &route.vehicle_id.to_string()))?;
        let deliveries = self.store.list_deliveries_for_route(route.id).await?;

        Ok(RouteDashboard::build(route, driver, vehicle, deliveries))
    }

    async fn load(&self, id: Uuid) -> AppResult<Route> {
        self.store
            .find_route(id)
            .await?
            .ok_or_else(|| not_found_error("Route", &id.to_string()))
    }
}
