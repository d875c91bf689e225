//! Ciclo de vida de entregas
//!
//! pending -> in_transit -> delivered, y cancelled desde cualquier estado no
//! terminal. `actual_delivery_at` solo se fija al pasar a delivered.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

use crate::models::{Action, Actor, Delivery, DeliveryStatus};
use crate::repositories::FleetStore;
use crate::services::authorization_service::{authenticated, enforce, Target};
use crate::services::query_scope::ResourceRef;
use crate::utils::errors::{not_found_error, AppError, AppResult};

/// Transición guardada a delivered
pub fn transition_to_delivered(delivery: &mut Delivery, now: DateTime<Utc>) -> AppResult<()> {
    if delivery.status.is_terminal() {
        return Err(AppError::InvalidState(format!(
            "Delivery {} is already {}",
            delivery.tracking_code,
            delivery.status.as_str()
        )));
    }
    delivery.status = DeliveryStatus::Delivered;
    delivery.actual_delivery_at = Some(now);
    Ok(())
}

/// Cambio de estado pedido por un conductor: sigue la máquina de estados
pub fn apply_driver_status(
    delivery: &mut Delivery,
    next: DeliveryStatus,
    now: DateTime<Utc>,
) -> AppResult<()> {
    if delivery.status == next {
        return Ok(());
    }
    if !delivery.status.can_transition_to(next) {
        return Err(AppError::InvalidState(format!(
            "Delivery {} cannot move from {} to {}",
            delivery.tracking_code,
            delivery.status.as_str(),
            next.as_str()
        )));
    }
    delivery.status = next;
    if next == DeliveryStatus::Delivered {
        delivery.actual_delivery_at = Some(now);
    }
    Ok(())
}

/// Cambio de estado de un gestor: libre, pero delivered siempre lleva fecha
pub fn apply_manager_status(delivery: &mut Delivery, next: DeliveryStatus, now: DateTime<Utc>) {
    delivery.status = next;
    if next == DeliveryStatus::Delivered && delivery.actual_delivery_at.is_none() {
        delivery.actual_delivery_at = Some(now);
    }
}

pub struct DeliveryLifecycle {
    store: Arc<dyn FleetStore>,
}

impl DeliveryLifecycle {
    pub fn new(store: Arc<dyn FleetStore>) -> Self {
        Self { store }
    }

    pub async fn mark_delivered(&self, actor: Option<&Actor>, delivery_id: Uuid) -> AppResult<Delivery> {
        let actor = authenticated(actor)?;
        let delivery = self
            .store
            .find_delivery(delivery_id)
            .await?
            .ok_or_else(|| not_found_error("Delivery", &delivery_id.to_string()))?;

        // Un conductor ajeno recibe Forbidden, no NotFound
        if let Actor::Driver { driver_id, .. } = actor {
            if delivery.driver_id != Some(*driver_id) {
                return Err(AppError::Forbidden(format!(
                    "Delivery {} is not assigned to this driver",
                    delivery.tracking_code
                )));
            }
        }
        enforce(Some(actor), Action::MarkDelivered, Target::Object(ResourceRef::Delivery(&delivery)))?;

        // Solo escribe si la entrega sigue en un estado no terminal
        let delivery = self.store.mark_delivered(delivery.id, Utc::now()).await?;

        info!("✅ Entrega {} marcada como entregada", delivery.tracking_code);
        Ok(delivery)
    }
}
