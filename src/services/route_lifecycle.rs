//! Estados de ruta
//!
//! planned -> in_progress -> completed. Iniciar una ruta pone al conductor
//! en `on_route` y al vehículo en `in_use`; completarla los libera.

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::models::{Driver, DriverStatus, Route, RouteStatus, VehicleStatus};
use crate::repositories::FleetStore;
use crate::utils::errors::{AppError, AppResult};

/// Valida la transición contra el conductor y las rutas en curso que
/// comparten conductor o vehículo con `route`
pub fn check_route_transition(
    route: &Route,
    next: RouteStatus,
    driver: &Driver,
    active_routes: &[Route],
) -> AppResult<()> {
    if route.status == next {
        return Ok(());
    }
    if !route.status.can_transition_to(next) {
        return Err(AppError::InvalidState(format!(
            "Route cannot move from {} to {}",
            route.status.as_str(),
            next.as_str()
        )));
    }

    if next == RouteStatus::InProgress {
        if driver.status != DriverStatus::Available {
            return Err(AppError::InvalidState(format!(
                "Driver {} is not available; the route cannot start",
                driver.name
            )));
        }

        let mut running = active_routes
            .iter()
            .filter(|r| r.id != route.id && r.status == RouteStatus::InProgress);
        if let Some(active) = running.clone().find(|r| r.driver_id == route.driver_id) {
            return Err(AppError::InvalidState(format!(
                "Driver {} is already running route {}",
                driver.name, active.id
            )));
        }
        if let Some(active) = running.find(|r| r.vehicle_id == route.vehicle_id) {
            return Err(AppError::Conflict(format!(
                "Vehicle is already in use by route {}",
                active.id
            )));
        }
    }

    Ok(())
}

/// Estados de conductor y vehículo que acompañan a cada estado de ruta
pub fn derived_statuses(next: RouteStatus) -> Option<(DriverStatus, VehicleStatus)> {
    match next {
        RouteStatus::InProgress => Some((DriverStatus::OnRoute, VehicleStatus::InUse)),
        RouteStatus::Completed => Some((DriverStatus::Available, VehicleStatus::Available)),
        RouteStatus::Planned => None,
    }
}

/// Solo las rutas planned se pueden borrar
pub fn check_route_deletable(status: RouteStatus) -> AppResult<()> {
    match status {
        RouteStatus::Completed => Err(AppError::Conflict(
            "Completed routes are kept for history and cannot be deleted".to_string(),
        )),
        RouteStatus::InProgress => Err(AppError::Conflict(
            "Route is in progress and cannot be deleted".to_string(),
        )),
        RouteStatus::Planned => Ok(()),
    }
}

pub struct RouteLifecycle {
    store: Arc<dyn FleetStore>,
}

impl RouteLifecycle {
    pub fn new(store: Arc<dyn FleetStore>) -> Self {
        Self { store }
    }

    /// Aplica `next` a una ruta ya autorizada; el store revalida todo bajo lock
    pub async fn change_status(&self, route_id: Uuid, next: RouteStatus) -> AppResult<Route> {
        let route = self.store.transition_route(route_id, next).await?;
        info!("🛣️ Ruta {} pasa a {}", route.id, next.as_str());
        Ok(route)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use rust_decimal::Decimal;

    fn driver(status: DriverStatus) -> Driver {
        Driver {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            name: "Ana Souza".to_string(),
            national_id: "98765432100".to_string(),
            license_number: "987654321".to_string(),
            phone: "61998765432".to_string(),
            status,
            registered_at: Utc::now(),
        }
    }

    fn route(driver_id: Uuid, vehicle_id: Uuid, status: RouteStatus) -> Route {
        Route {
            id: Uuid::new_v4(),
            name: "Zona Sul".to_string(),
            description: None,
            driver_id,
            vehicle_id,
            status,
            scheduled_date: NaiveDate::from_ymd_opt(2026, 5, 4).unwrap(),
            capacity_total_used: Decimal::ZERO,
            estimated_km: None,
            estimated_minutes: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn start_requires_available_driver() {
        let d = driver(DriverStatus::Inactive);
        let r = route(d.id, Uuid::new_v4(), RouteStatus::Planned);
        let err = check_route_transition(&r, RouteStatus::InProgress, &d, &[]).unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));
    }

    #[test]
    fn vehicle_cannot_run_two_routes() {
        let d = driver(DriverStatus::Available);
        let vehicle_id = Uuid::new_v4();
        let running = route(Uuid::new_v4(), vehicle_id, RouteStatus::InProgress);
        let r = route(d.id, vehicle_id, RouteStatus::Planned);

        let err = check_route_transition(&r, RouteStatus::InProgress, &d, &[running, r.clone()])
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[test]
    fn driver_cannot_run_two_routes_even_if_marked_available() {
        let d = driver(DriverStatus::Available);
        let running = route(d.id, Uuid::new_v4(), RouteStatus::InProgress);
        let r = route(d.id, Uuid::new_v4(), RouteStatus::Planned);

        let err = check_route_transition(&r, RouteStatus::InProgress, &d, &[running]).unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));
    }

    #[test]
    fn only_planned_routes_are_deletable() {
        assert!(check_route_deletable(RouteStatus::Planned).is_ok());
        assert!(matches!(
            check_route_deletable(RouteStatus::InProgress),
            Err(AppError::Conflict(_))
        ));
        assert!(matches!(
            check_route_deletable(RouteStatus::Completed),
            Err(AppError::Conflict(_))
        ));
    }

    #[test]
    fn derived_statuses_follow_the_route() {
        assert_eq!(
            derived_statuses(RouteStatus::InProgress),
            Some((DriverStatus::OnRoute, VehicleStatus::InUse))
        );
        assert_eq!(
            derived_statuses(RouteStatus::Completed),
            Some((DriverStatus::Available, VehicleStatus::Available))
        );
        assert_eq!(derived_statuses(RouteStatus::Planned), None);
    }

    #[test]
    fn completed_is_terminal() {
        let d = driver(DriverStatus::Available);
        let r = route(d.id, Uuid::new_v4(), RouteStatus::Completed);
        assert!(check_route_transition(&r, RouteStatus::Planned, &d, &[]).is_err());
        assert!(check_route_transition(&r, RouteStatus::Completed, &d, &[]).is_ok());
    }

    #[test]
    fn cannot_skip_in_progress() {
        let d = driver(DriverStatus::Available);
        let r = route(d.id, Uuid::new_v4(), RouteStatus::Planned);
        assert!(check_route_transition(&r, RouteStatus::Completed, &d, &[]).is_err());
    }
}
