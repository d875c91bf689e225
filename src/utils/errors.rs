//! Sistema de manejo de errores
//!
//! Este módulo define todos los tipos de errores del sistema
//! y su conversión a respuestas HTTP apropiadas.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rust_decimal::Decimal;
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

/// SQLSTATE de Postgres para violación de unicidad
const UNIQUE_VIOLATION: &str = "23505";
/// SQLSTATE de Postgres para violación de clave foránea
const FOREIGN_KEY_VIOLATION: &str = "23503";

/// Errores principales de la aplicación
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Authentication required: {0}")]
    Unauthenticated(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error(
        "Vehicle capacity exceeded by delivery '{delivery_code}': max {max_capacity}, already used {capacity_used}, requested {capacity_requested}"
    )]
    CapacityExceeded {
        max_capacity: Decimal,
        capacity_used: Decimal,
        capacity_requested: Decimal,
        delivery_code: String,
    },

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &e {
            let constraint = db_err.constraint().unwrap_or("constraint").to_string();
            match db_err.code().as_deref() {
                Some(UNIQUE_VIOLATION) => {
                    return AppError::Conflict(format!("Duplicate value violates {}", constraint));
                }
                Some(FOREIGN_KEY_VIOLATION) => {
                    return AppError::Conflict(format!(
                        "Record is still referenced ({})",
                        constraint
                    ));
                }
                _ => {}
            }
        }
        AppError::Database(e)
    }
}

/// Respuesta de error para la API
#[derive(Debug, serde::Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
    code: String,
}

impl AppError {
    /// Código estable expuesto al cliente
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Database(_) => "DB_ERROR",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Unauthenticated(_) => "UNAUTHENTICATED",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Conflict(_) => "CONFLICT",
            AppError::CapacityExceeded { .. } => "CAPACITY_EXCEEDED",
            AppError::InvalidState(_) => "INVALID_STATE",
            AppError::BadRequest(_) => "BAD_REQUEST",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Validation(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) | AppError::CapacityExceeded { .. } => StatusCode::CONFLICT,
            AppError::InvalidState(_) => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code().to_string();

        let error_response = match self {
            AppError::Database(e) => {
                error!("❌ Database error: {}", e);
                ErrorResponse {
                    error: "Database Error".to_string(),
                    message: "An error occurred while accessing the database".to_string(),
                    details: None,
                    code,
                }
            }

            AppError::Validation(e) => {
                warn!("⚠️ Validation error: {}", e);
                ErrorResponse {
                    error: "Validation Error".to_string(),
                    message: "The provided data is invalid".to_string(),
                    details: Some(json!(e)),
                    code,
                }
            }

            AppError::CapacityExceeded {
                max_capacity,
                capacity_used,
                capacity_requested,
                delivery_code,
            } => {
                warn!(
                    "⚠️ Capacity exceeded: delivery {} (max {}, used {})",
                    delivery_code, max_capacity, capacity_used
                );
                ErrorResponse {
                    error: "Capacity Exceeded".to_string(),
                    message: format!(
                        "Vehicle capacity exceeded for this route. Max capacity: {}. Capacity already used: {}. Capacity of delivery {}: {}.",
                        max_capacity, capacity_used, delivery_code, capacity_requested
                    ),
                    details: Some(json!({
                        "max_capacity": max_capacity,
                        "capacity_used": capacity_used,
                        "capacity_requested": capacity_requested,
                        "delivery_code": delivery_code,
                    })),
                    code,
                }
            }

            AppError::Internal(msg) => {
                error!("❌ Internal error: {}", msg);
                ErrorResponse {
                    error: "Internal Server Error".to_string(),
                    message: "An unexpected error occurred".to_string(),
                    details: None,
                    code,
                }
            }

            other => {
                let (title, msg) = match other {
                    AppError::Unauthenticated(msg) => ("Unauthenticated", msg),
                    AppError::Forbidden(msg) => ("Forbidden", msg),
                    AppError::NotFound(msg) => ("Not Found", msg),
                    AppError::Conflict(msg) => ("Conflict", msg),
                    AppError::InvalidState(msg) => ("Invalid State", msg),
                    AppError::BadRequest(msg) => ("Bad Request", msg),
                    _ => ("Error", String::new()),
                };
                warn!("⚠️ {}: {}", title, msg);
                ErrorResponse {
                    error: title.to_string(),
                    message: msg,
                    details: None,
                    code,
                }
            }
        };

        (status, Json(error_response)).into_response()
    }
}

/// Resultado tipado para operaciones que pueden fallar
pub type AppResult<T> = Result<T, AppError>;

/// Función helper para crear errores de validación
pub fn validation_error(field: &'static str, message: &'static str) -> AppError {
    use validator::ValidationError;

    let mut error = ValidationError::new("custom");
    error.add_param("field".into(), &field);
    error.add_param("message".into(), &message);

    let mut errors = validator::ValidationErrors::new();
    errors.add(field, error);

    AppError::Validation(errors)
}

/// Función helper para crear errores de recurso no encontrado
pub fn not_found_error(resource: &str, id: &str) -> AppError {
    AppError::NotFound(format!("{} with id '{}' not found", resource, id))
}

/// Función helper para crear errores de conflicto por unicidad
pub fn conflict_error(resource: &str, field: &str, value: &str) -> AppError {
    AppError::Conflict(format!("{} with {} '{}' already exists", resource, field, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_exceeded_maps_to_conflict_status() {
        let err = AppError::CapacityExceeded {
            max_capacity: Decimal::from(500),
            capacity_used: Decimal::from(450),
            capacity_requested: Decimal::from(100),
            delivery_code: "C0FFEE01".to_string(),
        };
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert_eq!(err.code(), "CAPACITY_EXCEEDED");
        assert!(err.to_string().contains("C0FFEE01"));
    }

    #[test]
    fn validation_helper_names_the_field() {
        let err = validation_error("origin_address", "origin is required");
        match err {
            AppError::Validation(errors) => {
                assert!(errors.field_errors().contains_key("origin_address"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn invalid_state_is_unprocessable() {
        let err = AppError::InvalidState("already delivered".into());
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
