//! Modelo de Vehicle
//!
//! Este módulo contiene el struct Vehicle y sus variantes para CRUD operations.
//! Mapea exactamente a la tabla vehicles del schema PostgreSQL.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use uuid::Uuid;
use validator::Validate;

use crate::utils::validation::{
    validate_non_negative_decimal, validate_positive_decimal, PLATE_REGEX,
};

/// Tipo de vehículo - mapea al ENUM vehicle_type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "vehicle_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum VehicleType {
    Car,
    Van,
    Truck,
}

/// Estado del vehículo - mapea al ENUM vehicle_status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "vehicle_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum VehicleStatus {
    Available,
    InUse,
    Maintenance,
}

/// Vehicle principal - mapea exactamente a la tabla vehicles
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Vehicle {
    pub id: Uuid,
    pub plate: String,
    pub model: String,
    pub vehicle_type: VehicleType,
    pub max_capacity: Decimal,
    pub current_odometer: Decimal,
    pub status: VehicleStatus,
    /// Conductor que opera el vehículo en este momento
    pub driver_id: Option<Uuid>,
}

/// Request para crear un nuevo vehículo
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateVehicleRequest {
    #[validate(regex = "PLATE_REGEX")]
    pub plate: String,

    #[validate(length(min = 2, max = 70))]
    pub model: String,

    pub vehicle_type: Option<VehicleType>,

    #[validate(custom = "validate_positive_decimal")]
    pub max_capacity: Decimal,

    #[validate(custom = "validate_non_negative_decimal")]
    pub current_odometer: Option<Decimal>,

    pub status: Option<VehicleStatus>,
}

/// Request para actualizar un vehículo existente
///
/// El vínculo con el conductor solo cambia por `BindVehicleToDriver`.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateVehicleRequest {
    #[validate(regex = "PLATE_REGEX")]
    pub plate: Option<String>,

    #[validate(length(min = 2, max = 70))]
    pub model: Option<String>,

    pub vehicle_type: Option<VehicleType>,

    #[validate(custom = "validate_positive_decimal")]
    pub max_capacity: Option<Decimal>,

    #[validate(custom = "validate_non_negative_decimal")]
    pub current_odometer: Option<Decimal>,

    pub status: Option<VehicleStatus>,
}

impl UpdateVehicleRequest {
    pub fn apply(self, vehicle: &mut Vehicle) {
        if let Some(plate) = self.plate {
            vehicle.plate = plate;
        }
        if let Some(model) = self.model {
            vehicle.model = model;
        }
        if let Some(vehicle_type) = self.vehicle_type {
            vehicle.vehicle_type = vehicle_type;
        }
        if let Some(max_capacity) = self.max_capacity {
            vehicle.max_capacity = max_capacity;
        }
        if let Some(current_odometer) = self.current_odometer {
            vehicle.current_odometer = current_odometer;
        }
        if let Some(status) = self.status {
            vehicle.status = status;
        }
    }
}

/// Response de vehículo para la API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VehicleResponse {
    pub id: Uuid,
    pub plate: String,
    pub model: String,
    pub vehicle_type: VehicleType,
    pub max_capacity: Decimal,
    pub current_odometer: Decimal,
    pub status: VehicleStatus,
    pub driver_id: Option<Uuid>,
}

impl From<Vehicle> for VehicleResponse {
    fn from(vehicle: Vehicle) -> Self {
        Self {
            id: vehicle.id,
            plate: vehicle.plate,
            model: vehicle.model,
            vehicle_type: vehicle.vehicle_type,
            max_capacity: vehicle.max_capacity,
            current_odometer: vehicle.current_odometer,
            status: vehicle.status,
            driver_id: vehicle.driver_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_positive_capacity() {
        let request = CreateVehicleRequest {
            plate: "ABC1234".to_string(),
            model: "Fiat Ducato".to_string(),
            vehicle_type: Some(VehicleType::Van),
            max_capacity: Decimal::ZERO,
            current_odometer: None,
            status: None,
        };
        let errors = request.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("max_capacity"));
    }

    #[test]
    fn update_keeps_untouched_fields() {
        let mut vehicle = Vehicle {
            id: Uuid::new_v4(),
            plate: "ABC1234".to_string(),
            model: "Fiat Ducato".to_string(),
            vehicle_type: VehicleType::Van,
            max_capacity: Decimal::new(50000, 2),
            current_odometer: Decimal::ZERO,
            status: VehicleStatus::Available,
            driver_id: None,
        };
        UpdateVehicleRequest {
            current_odometer: Some(Decimal::from(1200)),
            ..Default::default()
        }
        .apply(&mut vehicle);

        assert_eq!(vehicle.current_odometer, Decimal::from(1200));
        assert_eq!(vehicle.max_capacity, Decimal::new(50000, 2));
        assert_eq!(vehicle.plate, "ABC1234");
    }
}
