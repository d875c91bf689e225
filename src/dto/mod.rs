//! DTOs de la API
//!
//! Envoltorio común de respuestas y vistas agregadas (dashboard de ruta,
//! rastreo, vinculaciones).

pub mod api_response;
pub mod fleet_dto;

pub use api_response::ApiResponse;
pub use fleet_dto::*;
