use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::dto::{ApiResponse, BindVehicleResponse, DriverDetail};
use crate::models::driver::{CreateDriverRequest, DriverResponse, UpdateDriverRequest};
use crate::models::{Action, Actor, Driver, DriverStatus, ResourceKind};
use crate::repositories::FleetStore;
use crate::services::{authenticated, enforce, AssignmentService, ResourceRef, Scope, Target};
use crate::utils::errors::{not_found_error, AppError, AppResult};

pub struct DriverController {
    store: Arc<dyn FleetStore>,
}

impl DriverController {
    pub fn new(store: Arc<dyn FleetStore>) -> Self {
        Self { store }
    }

    pub async fn list(&self, actor: Option<&Actor>) -> AppResult<Vec<DriverResponse>> {
        let actor = authenticated(actor)?;
        enforce(Some(actor), Action::List, Target::Collection(ResourceKind::Driver))?;

        let drivers = self
            .store
            .list_drivers(Scope::for_actor(actor, ResourceKind::Driver))
            .await?;
        Ok(drivers.into_iter().map(DriverResponse::from).collect())
    }

    pub async fn get(&self, actor: Option<&Actor>, id: Uuid) -> AppResult<DriverDetail> {
        let actor = authenticated(actor)?;
        let driver = self.load(id).await?;
        enforce(Some(actor), Action::Read, Target::Object(ResourceRef::Driver(&driver)))?;

        let vehicle = self.store.find_vehicle_by_driver(driver.id).await?;
        Ok(DriverDetail {
            driver: driver.into(),
            vehicle: vehicle.map(Into::into),
        })
    }

    pub async fn create(
        &self,
        actor: Option<&Actor>,
        request: CreateDriverRequest,
    ) -> AppResult<ApiResponse<DriverResponse>> {
        let actor = authenticated(actor)?;
        enforce(Some(actor), Action::Create, Target::Collection(ResourceKind::Driver))?;
        request.validate()?;

        let driver = Driver {
            id: Uuid::new_v4(),
            user_id: request.user_id,
            name: request.name,
            national_id: request.national_id,
            license_number: request.license_number,
            phone: request.phone,
            status: request.status.unwrap_or_default(),
            registered_at: Utc::now(),
        };
        let driver = self.store.insert_driver(&driver).await?;
        info!("👤 Conductor {} registrado", driver.id);

        Ok(ApiResponse::success_with_message(
            driver.into(),
            "Driver created successfully".to_string(),
        ))
    }

    pub async fn update(
        &self,
        actor: Option<&Actor>,
        id: Uuid,
        request: UpdateDriverRequest,
    ) -> AppResult<ApiResponse<DriverResponse>> {
        let actor = authenticated(actor)?;
        let mut driver = self.load(id).await?;
        enforce(
            Some(actor),
            Action::Update(request.edit_class()),
            Target::Object(ResourceRef::Driver(&driver)),
        )?;
        request.validate()?;

        request.apply(&mut driver);
        let driver = self.store.update_driver(&driver).await?;

        Ok(ApiResponse::success_with_message(
            driver.into(),
            "Driver updated successfully".to_string(),
        ))
    }

    pub async fn delete(&self, actor: Option<&Actor>, id: Uuid) -> AppResult<()> {
        let actor = authenticated(actor)?;
        let driver = self.load(id).await?;
        enforce(Some(actor), Action::Delete, Target::Object(ResourceRef::Driver(&driver)))?;

        if driver.status == DriverStatus::OnRoute {
            return Err(AppError::Conflict(format!(
                "Driver {} is on route and cannot be deleted",
                driver.name
            )));
        }

        self.store.delete_driver(id).await?;
        info!("🗑️ Conductor {} eliminado", id);
        Ok(())
    }

    pub async fn bind_vehicle(
        &self,
        actor: Option<&Actor>,
        id: Uuid,
        vehicle_id: Option<Uuid>,
        max_retries: u32,
    ) -> AppResult<ApiResponse<BindVehicleResponse>> {
        let binding = AssignmentService::new(self.store.clone(), max_retries)
            .bind_vehicle(actor, id, vehicle_id)
            .await?;

        let message = match &binding.vehicle {
            Some(_) => "Vehicle bound successfully",
            None => "Vehicle unbound successfully",
        };
        Ok(ApiResponse::success_with_message(binding.into(), message.to_string()))
    }

    async fn load(&self, id: Uuid) -> AppResult<Driver> {
        self.store
            .find_driver(id)
            .await?
            .ok_or_else(|| not_found_error("Driver", &id.to_string()))
    }
}
