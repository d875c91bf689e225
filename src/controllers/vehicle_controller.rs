use std::sync::Arc;

use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::dto::ApiResponse;
use crate::models::vehicle::{CreateVehicleRequest, UpdateVehicleRequest, VehicleResponse};
use crate::models::{
    Action, Actor, Edit, ResourceKind, RouteStatus, Vehicle, VehicleStatus, VehicleType,
};
use crate::repositories::FleetStore;
use crate::services::{authenticated, enforce, ResourceRef, Scope, Target};
use crate::utils::errors::{not_found_error, AppError, AppResult};

pub struct VehicleController {
    store: Arc<dyn FleetStore>,
}

impl VehicleController {
    pub fn new(store: Arc<dyn FleetStore>) -> Self {
        Self { store }
    }

    pub async fn list(&self, actor: Option<&Actor>) -> AppResult<Vec<VehicleResponse>> {
        let actor = authenticated(actor)?;
        enforce(Some(actor), Action::List, Target::Collection(ResourceKind::Vehicle))?;

        let vehicles = self
            .store
            .list_vehicles(Scope::for_actor(actor, ResourceKind::Vehicle))
            .await?;
        Ok(vehicles.into_iter().map(VehicleResponse::from).collect())
    }

    pub async fn get(&self, actor: Option<&Actor>, id: Uuid) -> AppResult<VehicleResponse> {
        let actor = authenticated(actor)?;
        let vehicle = self.load(id).await?;
        enforce(Some(actor), Action::Read, Target::Object(ResourceRef::Vehicle(&vehicle)))?;
        Ok(vehicle.into())
    }

    pub async fn create(
        &self,
        actor: Option<&Actor>,
        request: CreateVehicleRequest,
    ) -> AppResult<ApiResponse<VehicleResponse>> {
        let actor = authenticated(actor)?;
        enforce(Some(actor), Action::Create, Target::Collection(ResourceKind::Vehicle))?;
        request.validate()?;

        let vehicle = Vehicle {
            id: Uuid::new_v4(),
            plate: request.plate,
            model: request.model,
            vehicle_type: request.vehicle_type.unwrap_or(VehicleType::Car),
            max_capacity: request.max_capacity,
            current_odometer: request.current_odometer.unwrap_or_default(),
            status: request.status.unwrap_or(VehicleStatus::Available),
            driver_id: None,
        };
        let vehicle = self.store.insert_vehicle(&vehicle).await?;
        info!("🚚 Vehículo {} registrado", vehicle.plate);

        Ok(ApiResponse::success_with_message(
            vehicle.into(),
            "Vehicle created successfully".to_string(),
        ))
    }

    pub async fn update(
        &self,
        actor: Option<&Actor>,
        id: Uuid,
        request: UpdateVehicleRequest,
    ) -> AppResult<ApiResponse<VehicleResponse>> {
        let actor = authenticated(actor)?;
        let mut vehicle = self.load(id).await?;
        enforce(
            Some(actor),
            Action::Update(Edit::Full),
            Target::Object(ResourceRef::Vehicle(&vehicle)),
        )?;
        request.validate()?;

        // Una capacidad menor se compara con la carga de sus rutas abiertas en el store
        request.apply(&mut vehicle);
        let vehicle = self.store.update_vehicle(&vehicle).await?;

        Ok(ApiResponse::success_with_message(
            vehicle.into(),
            "Vehicle updated successfully".to_string(),
        ))
    }

    pub async fn delete(&self, actor: Option<&Actor>, id: Uuid) -> AppResult<()> {
        let actor = authenticated(actor)?;
        let vehicle = self.load(id).await?;
        enforce(Some(actor), Action::Delete, Target::Object(ResourceRef::Vehicle(&vehicle)))?;

        let routes = self.store.list_routes_for_vehicle(id).await?;
        if let Some(route) = routes.iter().find(|r| r.status == RouteStatus::InProgress) {
            return Err(AppError::Conflict(format!(
                "Vehicle {} is in use by route {}",
                vehicle.plate, route.id
            )));
        }

        self.store.delete_vehicle(id).await?;
        info!("🗑️ Vehículo {} eliminado", vehicle.plate);
        Ok(())
    }

    async fn load(&self, id: Uuid) -> AppResult<Vehicle> {
        self.store
            .find_vehicle(id)
            .await?
            .ok_or_else(|| not_found_error("Vehicle", &id.to_string()))
    }
}
