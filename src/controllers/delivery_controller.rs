use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::dto::{ApiResponse, TrackingResponse};
use crate::models::delivery::{
    generate_tracking_code, CreateDeliveryRequest, DeliveryResponse, UpdateDeliveryRequest,
};
use crate::models::{Action, Actor, Delivery, DeliveryStatus, ResourceKind};
use crate::repositories::FleetStore;
use crate::services::delivery_lifecycle::{apply_driver_status, apply_manager_status};
use crate::services::{authenticated, enforce, DeliveryLifecycle, ResourceRef, Scope, Target};
use crate::utils::errors::{not_found_error, validation_error, AppError, AppResult};

pub struct DeliveryController {
    store: Arc<dyn FleetStore>,
}

impl DeliveryController {
    pub fn new(store: Arc<dyn FleetStore>) -> Self {
        Self { store }
    }

    pub async fn list(&self, actor: Option<&Actor>) -> AppResult<Vec<DeliveryResponse>> {
        let actor = authenticated(actor)?;
        enforce(Some(actor), Action::List, Target::Collection(ResourceKind::Delivery))?;

        let deliveries = self
            .store
            .list_deliveries(Scope::for_actor(actor, ResourceKind::Delivery))
            .await?;
        Ok(deliveries.into_iter().map(DeliveryResponse::from).collect())
    }

    pub async fn get(&self, actor: Option<&Actor>, id: Uuid) -> AppResult<DeliveryResponse> {
        let actor = authenticated(actor)?;
        let delivery = self.load(id).await?;
        enforce(Some(actor), Action::Read, Target::Object(ResourceRef::Delivery(&delivery)))?;
        Ok(delivery.into())
    }

    pub async fn create(
        &self,
        actor: Option<&Actor>,
        request: CreateDeliveryRequest,
    ) -> AppResult<ApiResponse<DeliveryResponse>> {
        let actor = authenticated(actor)?;
        enforce(Some(actor), Action::Create, Target::Collection(ResourceKind::Delivery))?;
        request.validate()?;

        let (
            Some(customer_id),
            Some(origin_address),
            Some(destination_address),
            Some(capacity_required),
        ) = (
            request.customer_id,
            request.origin_address,
            request.destination_address,
            request.capacity_required,
        )
        else {
            return Err(validation_error(
                "delivery",
                "customer, origin, destination and capacity are required",
            ));
        };

        if self.store.find_customer(customer_id).await?.is_none() {
            return Err(not_found_error("Customer", &customer_id.to_string()));
        }

        let delivery = Delivery {
            id: Uuid::new_v4(),
            tracking_code: request.tracking_code.unwrap_or_else(generate_tracking_code),
            customer_id,
            route_id: None,
            driver_id: None,
            origin_address,
            destination_address,
            status: DeliveryStatus::Pending,
            capacity_required,
            freight_value: request.freight_value.unwrap_or_default(),
            requested_at: Utc::now(),
            expected_delivery_at: request.expected_delivery_at,
            actual_delivery_at: None,
            notes: request.notes,
        };
        let delivery = self.store.insert_delivery(&delivery).await?;
        info!("📦 Entrega {} creada", delivery.tracking_code);

        Ok(ApiResponse::success_with_message(
            delivery.into(),
            "Delivery created successfully".to_string(),
        ))
    }

    pub async fn update(
        &self,
        actor: Option<&Actor>,
        id: Uuid,
        request: UpdateDeliveryRequest,
    ) -> AppResult<ApiResponse<DeliveryResponse>> {
        let actor = authenticated(actor)?;
        let mut delivery = self.load(id).await?;
        enforce(
            Some(actor),
            Action::Update(request.edit_class()),
            Target::Object(ResourceRef::Delivery(&delivery)),
        )?;
        request.validate()?;

        // Capacidad primero: revalida la ruta bajo su lock
        if let Some(capacity_required) = request.capacity_required {
            if capacity_required != delivery.capacity_required {
                delivery = self.store.resize_delivery(id, capacity_required).await?;
            }
        }

        request.apply_details(&mut delivery);
        if let Some(next) = request.status {
            let now = Utc::now();
            if actor.is_manager() {
                apply_manager_status(&mut delivery, next, now);
            } else {
                apply_driver_status(&mut delivery, next, now)?;
            }
        }

        let delivery = self.store.update_delivery(&delivery).await?;
        Ok(ApiResponse::success_with_message(
            delivery.into(),
            "Delivery updated successfully".to_string(),
        ))
    }

    pub async fn delete(&self, actor: Option<&Actor>, id: Uuid) -> AppResult<()> {
        let actor = authenticated(actor)?;
        let delivery = self.load(id).await?;
        enforce(Some(actor), Action::Delete, Target::Object(ResourceRef::Delivery(&delivery)))?;

        if delivery.status != DeliveryStatus::Pending {
            return Err(AppError::Conflict(format!(
                "Delivery {} is {} and is kept for history",
                delivery.tracking_code,
                delivery.status.as_str()
            )));
        }

        self.store.delete_delivery(id).await?;
        info!("🗑️ Entrega {} eliminada", delivery.tracking_code);
        Ok(())
    }

    pub async fn mark_delivered(
        &self,
        actor: Option<&Actor>,
        id: Uuid,
    ) -> AppResult<ApiResponse<DeliveryResponse>> {
        let delivery = DeliveryLifecycle::new(self.store.clone())
            .mark_delivered(actor, id)
            .await?;
        Ok(ApiResponse::success_with_message(
            delivery.into(),
            "Delivery marked as delivered".to_string(),
        ))
    }

    pub async fn track(&self, actor: Option<&Actor>, tracking_code: &str) -> AppResult<TrackingResponse> {
        let actor = authenticated(actor)?;
        let delivery = self
            .store
            .find_delivery_by_code(tracking_code)
            .await?
            .ok_or_else(|| unknown_code(tracking_code))?;
        enforce(Some(actor), Action::Read, Target::Object(ResourceRef::Delivery(&delivery))).map_err(
            |e| match e {
                AppError::NotFound(_) => unknown_code(tracking_code),
                other => other,
            },
        )?;
        Ok(delivery.into())
    }

    async fn load(&self, id: Uuid) -> AppResult<Delivery> {
        self.store
            .find_delivery(id)
            .await?
            .ok_or_else(|| not_found_error("Delivery", &id.to_string()))
    }
}

fn unknown_code(tracking_code: &str) -> AppError {
    AppError::NotFound(format!("Delivery with tracking code '{}' not found", tracking_code))
}
