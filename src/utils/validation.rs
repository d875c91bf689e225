//! Utilidades de validación
//!
//! Este módulo contiene funciones helper para validación de datos
//! y las expresiones regulares usadas por los requests con `validator`.

use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::Decimal;
use serde::Serialize;
use validator::ValidationError;

lazy_static! {
    /// Placa sin guiones, 7 caracteres alfanuméricos (EX: ABC1D23)
    pub static ref PLATE_REGEX: Regex = Regex::new(r"^[A-Z0-9]{7}$").unwrap();
    /// Documento nacional, 11 dígitos sin puntos ni guiones
    pub static ref NATIONAL_ID_REGEX: Regex = Regex::new(r"^[0-9]{11}$").unwrap();
    /// Número de licencia de conducir, 9 a 11 dígitos
    pub static ref LICENSE_NUMBER_REGEX: Regex = Regex::new(r"^[0-9]{9,11}$").unwrap();
    /// Código de rastreo externo
    pub static ref TRACKING_CODE_REGEX: Regex = Regex::new(r"^[A-Z0-9\-]{4,50}$").unwrap();
}

/// Validar que un string no esté vacío
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("not_blank"));
    }
    Ok(())
}

/// Validar formato de teléfono (básico)
pub fn validate_phone(value: &str) -> Result<(), ValidationError> {
    let digits = value.chars().filter(|c| c.is_ascii_digit()).count();
    if !(8..=15).contains(&digits) {
        let mut error = ValidationError::new("phone");
        error.add_param("value".into(), &value.to_string());
        return Err(error);
    }
    Ok(())
}

/// Validar que un valor sea positivo
pub fn validate_positive<T: PartialOrd + std::fmt::Display + num_traits::Zero + Serialize>(
    value: T,
) -> Result<(), ValidationError> {
    if value <= T::zero() {
        let mut error = ValidationError::new("positive");
        error.add_param("value".into(), &value);
        return Err(error);
    }
    Ok(())
}

/// Validar que un valor sea no negativo
pub fn validate_non_negative<T: PartialOrd + std::fmt::Display + num_traits::Zero + Serialize>(
    value: T,
) -> Result<(), ValidationError> {
    if value < T::zero() {
        let mut error = ValidationError::new("non_negative");
        error.add_param("value".into(), &value);
        return Err(error);
    }
    Ok(())
}

/// Capacidades y valores de flete deben ser estrictamente positivos
pub fn validate_positive_decimal(value: &Decimal) -> Result<(), ValidationError> {
    validate_positive(*value)
}

/// Odómetro y estimaciones admiten cero
pub fn validate_non_negative_decimal(value: &Decimal) -> Result<(), ValidationError> {
    validate_non_negative(*value)
}
