//! Modelo de Driver
//!
//! Este módulo contiene el struct Driver y sus variantes para CRUD operations.
//! Mapea exactamente a la tabla drivers del schema PostgreSQL.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use uuid::Uuid;
use validator::Validate;

use crate::models::auth::Edit;
use crate::utils::validation::{
    validate_phone, LICENSE_NUMBER_REGEX, NATIONAL_ID_REGEX,
};

/// Estado del conductor - mapea al ENUM driver_status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "driver_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DriverStatus {
    Available,
    OnRoute,
    Inactive,
}

impl Default for DriverStatus {
    fn default() -> Self {
        DriverStatus::Available
    }
}

/// Driver principal - vinculado 1:1 a una identidad de cuenta
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Driver {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub national_id: String,
    pub license_number: String,
    pub phone: String,
    pub status: DriverStatus,
    /// Inmutable después de la creación
    pub registered_at: DateTime<Utc>,
}

/// Request para crear un nuevo conductor
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateDriverRequest {
    pub user_id: Uuid,

    #[validate(length(min = 2, max = 100))]
    pub name: String,

    #[validate(regex = "NATIONAL_ID_REGEX")]
    pub national_id: String,

    #[validate(regex = "LICENSE_NUMBER_REGEX")]
    pub license_number: String,

    #[validate(custom = "validate_phone")]
    pub phone: String,

    pub status: Option<DriverStatus>,
}

/// Request para actualizar un conductor existente
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateDriverRequest {
    #[validate(length(min = 2, max = 100))]
    pub name: Option<String>,

    #[validate(regex = "NATIONAL_ID_REGEX")]
    pub national_id: Option<String>,

    #[validate(regex = "LICENSE_NUMBER_REGEX")]
    pub license_number: Option<String>,

    #[validate(custom = "validate_phone")]
    pub phone: Option<String>,

    pub status: Option<DriverStatus>,
}

impl UpdateDriverRequest {
    /// Clasifica la edición para la política de autorización.
    ///
    /// El estado del conductor lo mueven las rutas; editarlo a mano es
    /// siempre `Full`.
    pub fn edit_class(&self) -> Edit {
        let documents = self.name.is_some()
            || self.national_id.is_some()
            || self.license_number.is_some();
        match (self.status.is_some(), documents) {
            (true, _) => Edit::Full,
            (false, true) => Edit::Profile,
            (false, false) => Edit::Contact,
        }
    }

    pub fn apply(self, driver: &mut Driver) {
        if let Some(name) = self.name {
            driver.name = name;
        }
        if let Some(national_id) = self.national_id {
            driver.national_id = national_id;
        }
        if let Some(license_number) = self.license_number {
            driver.license_number = license_number;
        }
        if let Some(phone) = self.phone {
            driver.phone = phone;
        }
        if let Some(status) = self.status {
            driver.status = status;
        }
    }
}

/// Response de conductor para la API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverResponse {
    pub id: Uuid,
    pub name: String,
    pub national_id: String,
    pub license_number: String,
    pub phone: String,
    pub status: DriverStatus,
    pub registered_at: String,
}

impl From<Driver> for DriverResponse {
    fn from(driver: Driver) -> Self {
        Self {
            id: driver.id,
            name: driver.name,
            national_id: driver.national_id,
            license_number: driver.license_number,
            phone: driver.phone,
            status: driver.status,
            registered_at: driver.registered_at.to_rfc3339(),
        }
    }
}
