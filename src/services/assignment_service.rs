//! Motor de asignación
//!
//! Vincula entregas a rutas respetando la capacidad del vehículo, y
//! vehículos a conductores respetando la relación 1:1.
//!
//! La asignación se planifica sobre una foto del store (`plan_assignment`,
//! puro) y se confirma con `AssignmentStore::commit_assignment`, que vuelve a
//! calcular la capacidad bajo el lock de la ruta. Si la foto quedó vieja se
//! vuelve a planificar, hasta `max_retries` veces.

use std::collections::HashSet;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::{Action, Actor, Delivery, Route, RouteStatus};
use crate::repositories::{AssignmentCommit, CommitOutcome, FleetStore, VehicleBinding};
use crate::services::authorization_service::{authenticated, enforce, Target};
use crate::services::query_scope::ResourceRef;
use crate::utils::errors::{not_found_error, validation_error, AppError, AppResult};

pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Resultado de planificar un lote sobre una foto de la ruta
#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentPlan {
    /// Capacidad ya vinculada antes del lote
    pub expected_used: Decimal,
    pub delivery_ids: Vec<Uuid>,
    pub assigned_codes: Vec<String>,
    /// Códigos que ya estaban en esta ruta o repetidos en el pedido
    pub skipped_codes: Vec<String>,
    pub projected_total: Decimal,
}

/// Resultado visible de una asignación confirmada
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssignmentSummary {
    pub route_id: Uuid,
    pub assigned: Vec<String>,
    pub already_on_route: Vec<String>,
    pub capacity_total_used: Decimal,
    pub max_capacity: Decimal,
}

impl AssignmentSummary {
    pub fn message(&self) -> String {
        format!(
            "{} deliveries assigned to route. Capacity used: {} of {}",
            self.assigned.len(),
            self.capacity_total_used,
            self.max_capacity
        )
    }
}

/// Aplica las reglas del lote en el orden pedido.
///
/// `bound` son las entregas ya vinculadas a la ruta; `requested` las del
/// pedido, ya resueltas y en el mismo orden que los códigos recibidos.
pub fn plan_assignment(
    route: &Route,
    max_capacity: Decimal,
    bound: &[Delivery],
    requested: &[Delivery],
) -> AppResult<AssignmentPlan> {
    let expected_used: Decimal = bound.iter().map(|d| d.capacity_required).sum();
    let mut running = expected_used;
    let mut seen = HashSet::new();
    let mut plan = AssignmentPlan {
        expected_used,
        delivery_ids: Vec::new(),
        assigned_codes: Vec::new(),
        skipped_codes: Vec::new(),
        projected_total: expected_used,
    };

    for delivery in requested {
        if !seen.insert(delivery.id) {
            plan.skipped_codes.push(delivery.tracking_code.clone());
            continue;
        }

        match delivery.route_id {
            Some(route_id) if route_id == route.id => {
                plan.skipped_codes.push(delivery.tracking_code.clone());
                continue;
            }
            Some(other) => {
                return Err(AppError::Conflict(format!(
                    "Delivery {} is already assigned to route {}",
                    delivery.tracking_code, other
                )));
            }
            None => {}
        }

        if delivery.status.is_terminal() {
            return Err(AppError::InvalidState(format!(
                "Delivery {} is {} and cannot be assigned",
                delivery.tracking_code,
                delivery.status.as_str()
            )));
        }

        running += delivery.capacity_required;
        if running > max_capacity {
            return Err(AppError::CapacityExceeded {
                max_capacity,
                capacity_used: expected_used,
                capacity_requested: delivery.capacity_required,
                delivery_code: delivery.tracking_code.clone(),
            });
        }

        plan.delivery_ids.push(delivery.id);
        plan.assigned_codes.push(delivery.tracking_code.clone());
    }

    plan.projected_total = running;
    Ok(plan)
}

pub struct AssignmentService {
    store: Arc<dyn FleetStore>,
    max_retries: u32,
}

impl AssignmentService {
    pub fn new(store: Arc<dyn FleetStore>, max_retries: u32) -> Self {
        Self { store, max_retries }
    }

    /// Vincula en bloque las entregas indicadas por código de rastreo
    pub async fn assign_deliveries(
        &self,
        actor: Option<&Actor>,
        route_id: Uuid,
        tracking_codes: &[String],
    ) -> AppResult<AssignmentSummary> {
        let actor = authenticated(actor)?;
        let route = self.load_route(route_id).await?;
        enforce(Some(actor), Action::AssignDeliveries, Target::Object(ResourceRef::Route(&route)))?;

        if tracking_codes.is_empty() {
            return Err(validation_error(
                "tracking_codes",
                "at least one tracking code is required",
            ));
        }

        let mut attempt: u32 = 0;
        loop {
            attempt += 1;

            let route = self.load_route(route_id).await?;
            if route.status == RouteStatus::Completed {
                return Err(AppError::InvalidState(format!(
                    "Route {} is completed and cannot receive deliveries",
                    route.id
                )));
            }

            let vehicle = self
                .store
                .find_vehicle(route.vehicle_id)
                .await?
                .ok_or_else(|| not_found_error("Vehicle", &route.vehicle_id.to_string()))?;
            let bound = self.store.list_deliveries_for_route(route.id).await?;
            let requested = self.resolve_codes(tracking_codes).await?;

            let plan = plan_assignment(&route, vehicle.max_capacity, &bound, &requested)?;
            if plan.delivery_ids.is_empty() {
                return Ok(AssignmentSummary {
                    route_id: route.id,
                    assigned: Vec::new(),
                    already_on_route: plan.skipped_codes,
                    capacity_total_used: plan.expected_used,
                    max_capacity: vehicle.max_capacity,
                });
            }

            let commit = AssignmentCommit {
                route_id: route.id,
                driver_id: route.driver_id,
                expected_used: plan.expected_used,
                delivery_ids: plan.delivery_ids.clone(),
            };

            match self.store.commit_assignment(&commit).await? {
                CommitOutcome::Committed { capacity_total_used } => {
                    info!(
                        "📦 {} entregas vinculadas a la ruta {} ({} / {})",
                        plan.assigned_codes.len(),
                        route.id,
                        capacity_total_used,
                        vehicle.max_capacity
                    );
                    return Ok(AssignmentSummary {
                        route_id: route.id,
                        assigned: plan.assigned_codes,
                        already_on_route: plan.skipped_codes,
                        capacity_total_used,
                        max_capacity: vehicle.max_capacity,
                    });
                }
                CommitOutcome::Stale if attempt <= self.max_retries => {
                    warn!(
                        "🔁 Ruta {} modificada durante la asignación, reintento {}/{}",
                        route.id, attempt, self.max_retries
                    );
                }
                CommitOutcome::Stale => {
                    return Err(AppError::Conflict(format!(
                        "Route {} changed concurrently; assignment aborted after {} attempts",
                        route.id, attempt
                    )));
                }
            }
        }
    }

    /// Vincula (o desvincula con `None`) el vehículo de un conductor
    pub async fn bind_vehicle(
        &self,
        actor: Option<&Actor>,
        driver_id: Uuid,
        vehicle_id: Option<Uuid>,
    ) -> AppResult<VehicleBinding> {
        let actor = authenticated(actor)?;
        let driver = self
            .store
            .find_driver(driver_id)
            .await?
            .ok_or_else(|| not_found_error("Driver", &driver_id.to_string()))?;
        enforce(Some(actor), Action::BindVehicle, Target::Object(ResourceRef::Driver(&driver)))?;

        // El store rechaza a un conductor on_route bajo el lock de su fila
        let binding = self.store.bind_vehicle(driver_id, vehicle_id).await?;
        match &binding.vehicle {
            Some(vehicle) => info!("🚚 Vehículo {} vinculado al conductor {}", vehicle.plate, driver_id),
            None => info!("🚚 Conductor {} sin vehículo", driver_id),
        }
        Ok(binding)
    }

    async fn load_route(&self, route_id: Uuid) -> AppResult<Route> {
        self.store
            .find_route(route_id)
            .await?
            .ok_or_else(|| not_found_error("Route", &route_id.to_string()))
    }

    async fn resolve_codes(&self, tracking_codes: &[String]) -> AppResult<Vec<Delivery>> {
        let mut deliveries = Vec::with_capacity(tracking_codes.len());
        for code in tracking_codes {
            let delivery = self.store.find_delivery_by_code(code).await?.ok_or_else(|| {
                AppError::NotFound(format!("Delivery with tracking code '{}' not found", code))
            })?;
            deliveries.push(delivery);
        }
        Ok(deliveries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DeliveryStatus;
    use chrono::{NaiveDate, Utc};

    fn route() -> Route {
        Route {
            id: Uuid::new_v4(),
            name: "Centro".to_string(),
            description: None,
            driver_id: Uuid::new_v4(),
            vehicle_id: Uuid::new_v4(),
            status: RouteStatus::Planned,
            scheduled_date: NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
            capacity_total_used: Decimal::ZERO,
            estimated_km: None,
            estimated_minutes: None,
            created_at: Utc::now(),
        }
    }

    fn delivery(code: &str, capacity: Decimal) -> Delivery {
        Delivery {
            id: Uuid::new_v4(),
            tracking_code: code.to_string(),
            customer_id: Uuid::new_v4(),
            route_id: None,
            driver_id: None,
            origin_address: "Depósito".to_string(),
            destination_address: "Rua A, 10".to_string(),
            status: DeliveryStatus::Pending,
            capacity_required: capacity,
            freight_value: Decimal::ZERO,
            requested_at: Utc::now(),
            expected_delivery_at: None,
            actual_delivery_at: None,
            notes: None,
        }
    }

    #[test]
    fn plans_batch_within_capacity() {
        let route = route();
        let plan = plan_assignment(
            &route,
            Decimal::from(500),
            &[],
            &[delivery("AAAA0001", Decimal::from(300)), delivery("BBBB0002", Decimal::from(150))],
        )
        .unwrap();
        assert_eq!(plan.projected_total, Decimal::from(450));
        assert_eq!(plan.assigned_codes, vec!["AAAA0001", "BBBB0002"]);
    }

    #[test]
    fn reports_first_delivery_that_overflows() {
        let route = route();
        let mut bound = delivery("AAAA0001", Decimal::from(300));
        bound.route_id = Some(route.id);

        let err = plan_assignment(
            &route,
            Decimal::from(500),
            &[bound],
            &[
                delivery("BBBB0002", Decimal::from(150)),
                delivery("CCCC0003", Decimal::from(100)),
                delivery("DDDD0004", Decimal::from(10)),
            ],
        )
        .unwrap_err();

        match err {
            AppError::CapacityExceeded {
                max_capacity,
                capacity_used,
                capacity_requested,
                delivery_code,
            } => {
                assert_eq!(max_capacity, Decimal::from(500));
                assert_eq!(capacity_used, Decimal::from(300));
                assert_eq!(capacity_requested, Decimal::from(100));
                assert_eq!(delivery_code, "CCCC0003");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn delivery_on_another_route_aborts_batch() {
        let route = route();
        let mut taken = delivery("BBBB0002", Decimal::from(10));
        taken.route_id = Some(Uuid::new_v4());

        let err = plan_assignment(&route, Decimal::from(500), &[], &[delivery("AAAA0001", Decimal::from(10)), taken])
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(msg) if msg.contains("BBBB0002")));
    }

    #[test]
    fn already_bound_and_repeated_codes_are_skipped() {
        let route = route();
        let mut bound = delivery("AAAA0001", Decimal::from(100));
        bound.route_id = Some(route.id);
        let fresh = delivery("BBBB0002", Decimal::from(50));

        let plan = plan_assignment(
            &route,
            Decimal::from(200),
            &[bound.clone()],
            &[bound, fresh.clone(), fresh],
        )
        .unwrap();

        assert_eq!(plan.assigned_codes, vec!["BBBB0002"]);
        assert_eq!(plan.skipped_codes, vec!["AAAA0001", "BBBB0002"]);
        assert_eq!(plan.projected_total, Decimal::from(150));
    }

    #[test]
    fn terminal_deliveries_cannot_be_assigned() {
        let route = route();
        let mut done = delivery("AAAA0001", Decimal::from(1));
        done.status = DeliveryStatus::Delivered;

        let err = plan_assignment(&route, Decimal::from(10), &[], &[done]).unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));
    }

    #[test]
    fn exact_fill_is_allowed() {
        let route = route();
        let plan = plan_assignment(
            &route,
            Decimal::new(3, 1),
            &[],
            &[delivery("AAAA0001", Decimal::new(1, 1)), delivery("BBBB0002", Decimal::new(2, 1))],
        )
        .unwrap();
        assert_eq!(plan.projected_total, Decimal::new(3, 1));
    }
}
