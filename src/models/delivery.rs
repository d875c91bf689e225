//! Modelo de Delivery
//!
//! Este módulo contiene el struct Delivery, su máquina de estados y las
//! variantes para CRUD operations. Externamente una entrega se identifica
//! por su código de rastreo.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use uuid::Uuid;
use validator::Validate;

use crate::models::auth::Edit;
use crate::utils::validation::{
    validate_non_negative_decimal, validate_positive_decimal, TRACKING_CODE_REGEX,
};

/// Estado de la entrega - mapea al ENUM delivery_status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "delivery_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Pending,
    InTransit,
    Delivered,
    Cancelled,
}

impl DeliveryStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, DeliveryStatus::Delivered | DeliveryStatus::Cancelled)
    }

    /// pending -> in_transit -> delivered; cancelled desde cualquier estado no terminal
    pub fn can_transition_to(self, next: DeliveryStatus) -> bool {
        match (self, next) {
            (DeliveryStatus::Pending, DeliveryStatus::InTransit) => true,
            (DeliveryStatus::InTransit, DeliveryStatus::Delivered) => true,
            (from, DeliveryStatus::Cancelled) => !from.is_terminal(),
            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Pending => "pending",
            DeliveryStatus::InTransit => "in_transit",
            DeliveryStatus::Delivered => "delivered",
            DeliveryStatus::Cancelled => "cancelled",
        }
    }
}

/// Delivery principal - mapea exactamente a la tabla deliveries
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Delivery {
    pub id: Uuid,
    pub tracking_code: String,
    pub customer_id: Uuid,
    pub route_id: Option<Uuid>,
    /// Si hay ruta, siempre es el conductor de la ruta
    pub driver_id: Option<Uuid>,
    pub origin_address: String,
    pub destination_address: String,
    pub status: DeliveryStatus,
    pub capacity_required: Decimal,
    pub freight_value: Decimal,
    pub requested_at: DateTime<Utc>,
    pub expected_delivery_at: Option<DateTime<Utc>>,
    /// Solo se fija al pasar a delivered
    pub actual_delivery_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

/// Request para crear una nueva entrega (sin ruta; se vincula después)
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct CreateDeliveryRequest {
    #[validate(regex = "TRACKING_CODE_REGEX")]
    pub tracking_code: Option<String>,

    #[validate(required)]
    pub customer_id: Option<Uuid>,

    #[validate(required, length(min = 1, max = 255))]
    pub origin_address: Option<String>,

    #[validate(required, length(min = 1, max = 255))]
    pub destination_address: Option<String>,

    #[validate(required, custom = "validate_positive_decimal")]
    pub capacity_required: Option<Decimal>,

    #[validate(custom = "validate_non_negative_decimal")]
    pub freight_value: Option<Decimal>,

    pub expected_delivery_at: Option<DateTime<Utc>>,

    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

/// Request para actualizar una entrega existente
///
/// La ruta solo cambia por `AssignDeliveriesToRoute`.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateDeliveryRequest {
    #[validate(length(min = 1, max = 255))]
    pub origin_address: Option<String>,

    #[validate(length(min = 1, max = 255))]
    pub destination_address: Option<String>,

    pub status: Option<DeliveryStatus>,

    #[validate(custom = "validate_positive_decimal")]
    pub capacity_required: Option<Decimal>,

    #[validate(custom = "validate_non_negative_decimal")]
    pub freight_value: Option<Decimal>,

    pub expected_delivery_at: Option<DateTime<Utc>>,

    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

impl UpdateDeliveryRequest {
    pub fn edit_class(&self) -> Edit {
        let details = self.origin_address.is_some()
            || self.destination_address.is_some()
            || self.capacity_required.is_some()
            || self.freight_value.is_some()
            || self.expected_delivery_at.is_some();
        if details {
            Edit::Full
        } else {
            Edit::Progress
        }
    }

    /// Aplica los campos que no afectan capacidad ni estado
    pub fn apply_details(&self, delivery: &mut Delivery) {
        if let Some(origin) = &self.origin_address {
            delivery.origin_address = origin.clone();
        }
        if let Some(destination) = &self.destination_address {
            delivery.destination_address = destination.clone();
        }
        if let Some(freight_value) = self.freight_value {
            delivery.freight_value = freight_value;
        }
        if let Some(expected) = self.expected_delivery_at {
            delivery.expected_delivery_at = Some(expected);
        }
        if let Some(notes) = &self.notes {
            delivery.notes = Some(notes.clone());
        }
    }
}

/// Response de entrega para la API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryResponse {
    pub id: Uuid,
    pub tracking_code: String,
    pub customer_id: Uuid,
    pub route_id: Option<Uuid>,
    pub driver_id: Option<Uuid>,
    pub origin_address: String,
    pub destination_address: String,
    pub status: DeliveryStatus,
    pub capacity_required: Decimal,
    pub freight_value: Decimal,
    pub requested_at: DateTime<Utc>,
    pub expected_delivery_at: Option<DateTime<Utc>>,
    pub actual_delivery_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

impl From<Delivery> for DeliveryResponse {
    fn from(delivery: Delivery) -> Self {
        Self {
            id: delivery.id,
            tracking_code: delivery.tracking_code,
            customer_id: delivery.customer_id,
            route_id: delivery.route_id,
            driver_id: delivery.driver_id,
            origin_address: delivery.origin_address,
            destination_address: delivery.destination_address,
            status: delivery.status,
            capacity_required: delivery.capacity_required,
            freight_value: delivery.freight_value,
            requested_at: delivery.requested_at,
            expected_delivery_at: delivery.expected_delivery_at,
            actual_delivery_at: delivery.actual_delivery_at,
            notes: delivery.notes,
        }
    }
}

/// Genera un código de rastreo de 8 caracteres hexadecimales en mayúsculas
pub fn generate_tracking_code() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_uppercase()
}
