//! Modelo de Route
//!
//! Este módulo contiene el struct Route y sus variantes para CRUD operations.
//! Una ruta pertenece a exactamente un conductor y un vehículo, fijados en
//! la creación.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use uuid::Uuid;
use validator::Validate;

use crate::models::auth::Edit;
use crate::utils::validation::validate_non_negative_decimal;

/// Estado de la ruta - mapea al ENUM route_status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "route_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RouteStatus {
    Planned,
    InProgress,
    Completed,
}

impl RouteStatus {
    /// planned -> in_progress -> completed; completed es terminal
    pub fn can_transition_to(self, next: RouteStatus) -> bool {
        matches!(
            (self, next),
            (RouteStatus::Planned, RouteStatus::InProgress)
                | (RouteStatus::InProgress, RouteStatus::Completed)
        ) || self == next
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RouteStatus::Planned => "planned",
            RouteStatus::InProgress => "in_progress",
            RouteStatus::Completed => "completed",
        }
    }
}

/// Route principal - mapea exactamente a la tabla routes
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Route {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub driver_id: Uuid,
    pub vehicle_id: Uuid,
    pub status: RouteStatus,
    pub scheduled_date: NaiveDate,
    /// Derivado: suma de capacity_required de las entregas vinculadas
    pub capacity_total_used: Decimal,
    pub estimated_km: Option<Decimal>,
    pub estimated_minutes: Option<i32>,
    pub created_at: DateTime<Utc>,
}

/// Request para crear una nueva ruta
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateRouteRequest {
    #[validate(length(min = 2, max = 100))]
    pub name: String,

    #[validate(length(max = 500))]
    pub description: Option<String>,

    pub driver_id: Uuid,
    pub vehicle_id: Uuid,

    pub scheduled_date: Option<NaiveDate>,

    #[validate(custom = "validate_non_negative_decimal")]
    pub estimated_km: Option<Decimal>,

    #[validate(range(min = 0))]
    pub estimated_minutes: Option<i32>,
}

/// Request para actualizar una ruta existente
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateRouteRequest {
    #[validate(length(min = 2, max = 100))]
    pub name: Option<String>,

    #[validate(length(max = 500))]
    pub description: Option<String>,

    pub status: Option<RouteStatus>,

    pub scheduled_date: Option<NaiveDate>,

    #[validate(custom = "validate_non_negative_decimal")]
    pub estimated_km: Option<Decimal>,

    #[validate(range(min = 0))]
    pub estimated_minutes: Option<i32>,

    /// Rechazados: conductor y vehículo son fijos
    pub driver_id: Option<Uuid>,
    pub vehicle_id: Option<Uuid>,
}

impl UpdateRouteRequest {
    pub fn edit_class(&self) -> Edit {
        let details = self.name.is_some()
            || self.description.is_some()
            || self.scheduled_date.is_some()
            || self.estimated_km.is_some()
            || self.estimated_minutes.is_some()
            || self.driver_id.is_some()
            || self.vehicle_id.is_some();
        if details {
            Edit::Full
        } else {
            Edit::Progress
        }
    }

    pub fn touches_assignment(&self) -> bool {
        self.driver_id.is_some() || self.vehicle_id.is_some()
    }

    /// Aplica los campos descriptivos; el estado pasa por el controlador
    pub fn apply_details(&self, route: &mut Route) {
        if let Some(name) = &self.name {
            route.name = name.clone();
        }
        if let Some(description) = &self.description {
            route.description = Some(description.clone());
        }
        if let Some(scheduled_date) = self.scheduled_date {
            route.scheduled_date = scheduled_date;
        }
        if let Some(estimated_km) = self.estimated_km {
            route.estimated_km = Some(estimated_km);
        }
        if let Some(estimated_minutes) = self.estimated_minutes {
            route.estimated_minutes = Some(estimated_minutes);
        }
    }
}

/// Filtros para el listado de rutas
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RouteFilters {
    pub status: Option<RouteStatus>,
    pub driver_id: Option<Uuid>,
    pub scheduled_date: Option<NaiveDate>,
}

impl RouteFilters {
    pub fn matches(&self, route: &Route) -> bool {
        self.status.map_or(true, |s| route.status == s)
            && self.driver_id.map_or(true, |d| route.driver_id == d)
            && self.scheduled_date.map_or(true, |d| route.scheduled_date == d)
    }
}

/// Response de ruta para la API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteResponse {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub driver_id: Uuid,
    pub vehicle_id: Uuid,
    pub status: RouteStatus,
    pub scheduled_date: NaiveDate,
    pub capacity_total_used: Decimal,
    pub estimated_km: Option<Decimal>,
    pub estimated_minutes: Option<i32>,
}

impl From<Route> for RouteResponse {
    fn from(route: Route) -> Self {
        Self {
            id: route.id,
            name: route.name,
            description: route.description,
            driver_id: route.driver_id,
            vehicle_id: route.vehicle_id,
            status: route.status,
            scheduled_date: route.scheduled_date,
            capacity_total_used: route.capacity_total_used,
            estimated_km: route.estimated_km,
            estimated_minutes: route.estimated_minutes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completed_routes_are_terminal() {
        assert!(RouteStatus::Planned.can_transition_to(RouteStatus::InProgress));
        assert!(RouteStatus::InProgress.can_transition_to(RouteStatus::Completed));
        assert!(!RouteStatus::Completed.can_transition_to(RouteStatus::InProgress));
        assert!(!RouteStatus::Planned.can_transition_to(RouteStatus::Completed));
        assert!(!RouteStatus::Completed.can_transition_to(RouteStatus::Planned));
    }

    #[test]
    fn status_only_update_is_progress_edit() {
        let update = UpdateRouteRequest {
            status: Some(RouteStatus::InProgress),
            ..Default::default()
        };
        assert_eq!(update.edit_class(), Edit::Progress);
        assert!(!update.touches_assignment());

        let update = UpdateRouteRequest {
            vehicle_id: Some(Uuid::new_v4()),
            ..Default::default()
        };
        assert_eq!(update.edit_class(), Edit::Full);
        assert!(update.touches_assignment());
    }
}
