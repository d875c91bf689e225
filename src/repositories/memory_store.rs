//! Store en memoria
//!
//! Reproduce las restricciones del schema PostgreSQL (unicidad, claves
//! foráneas, índice parcial de rutas en curso). Un único `RwLock` serializa
//! las escrituras, así que cada operación es atómica.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::route::RouteFilters;
use crate::models::{Customer, Delivery, Driver, DriverStatus, Route, RouteStatus, Vehicle};
use crate::services::delivery_lifecycle::transition_to_delivered;
use crate::repositories::{
    capacity_below_load_error, on_route_error, AssignmentCommit, AssignmentStore, CommitOutcome,
    CustomerRepository, DeliveryRepository, DriverRepository, RouteRepository, VehicleBinding,
    VehicleRepository,
};
use crate::services::query_scope::{ResourceRef, Scope};
use crate::services::route_lifecycle::{check_route_deletable, check_route_transition, derived_statuses};
use crate::utils::errors::{conflict_error, not_found_error, AppError, AppResult};

#[derive(Debug, Default)]
struct Tables {
    drivers: HashMap<Uuid, Driver>,
    vehicles: HashMap<Uuid, Vehicle>,
    customers: HashMap<Uuid, Customer>,
    routes: HashMap<Uuid, Route>,
    deliveries: HashMap<Uuid, Delivery>,
}

impl Tables {
    fn check_driver_unique(&self, driver: &Driver) -> AppResult<()> {
        for other in self.drivers.values().filter(|d| d.id != driver.id) {
            if other.national_id == driver.national_id {
                return Err(conflict_error("Driver", "national_id", &driver.national_id));
            }
            if other.license_number == driver.license_number {
                return Err(conflict_error("Driver", "license_number", &driver.license_number));
            }
            if other.user_id == driver.user_id {
                return Err(conflict_error("Driver", "user_id", &driver.user_id.to_string()));
            }
        }
        Ok(())
    }

    fn check_vehicle_unique(&self, vehicle: &Vehicle) -> AppResult<()> {
        if self
            .vehicles
            .values()
            .any(|v| v.id != vehicle.id && v.plate == vehicle.plate)
        {
            return Err(conflict_error("Vehicle", "plate", &vehicle.plate));
        }
        Ok(())
    }

    fn check_customer_unique(&self, customer: &Customer) -> AppResult<()> {
        if self
            .customers
            .values()
            .any(|c| c.id != customer.id && c.user_id == customer.user_id)
        {
            return Err(conflict_error("Customer", "user_id", &customer.user_id.to_string()));
        }
        Ok(())
    }

    /// Equivalente al índice parcial `routes_one_in_progress_per_vehicle`
    fn check_route_in_progress_unique(&self, route: &Route) -> AppResult<()> {
        if route.status != RouteStatus::InProgress {
            return Ok(());
        }
        if self.routes.values().any(|r| {
            r.id != route.id && r.vehicle_id == route.vehicle_id && r.status == RouteStatus::InProgress
        }) {
            return Err(AppError::Conflict(format!(
                "Vehicle {} already has a route in progress",
                route.vehicle_id
            )));
        }
        Ok(())
    }

    fn bound_capacity(&self, route_id: Uuid) -> Decimal {
        self.deliveries
            .values()
            .filter(|d| d.route_id == Some(route_id))
            .map(|d| d.capacity_required)
            .sum()
    }

    fn route_max_capacity(&self, route: &Route) -> AppResult<Decimal> {
        self.vehicles
            .get(&route.vehicle_id)
            .map(|v| v.max_capacity)
            .ok_or_else(|| not_found_error("Vehicle", &route.vehicle_id.to_string()))
    }

    fn refresh_route_total(&mut self, route_id: Uuid) {
        let total = self.bound_capacity(route_id);
        if let Some(route) = self.routes.get_mut(&route_id) {
            route.capacity_total_used = total;
        }
    }
}

/// Store en memoria compartido entre requests
#[derive(Debug, Default)]
pub struct MemoryFleetStore {
    tables: RwLock<Tables>,
}

impl MemoryFleetStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DriverRepository for MemoryFleetStore {
    async fn insert_driver(&self, driver: &Driver) -> AppResult<Driver> {
        let mut tables = self.tables.write().await;
        tables.check_driver_unique(driver)?;
        tables.drivers.insert(driver.id, driver.clone());
        Ok(driver.clone())
    }

    async fn find_driver(&self, id: Uuid) -> AppResult<Option<Driver>> {
        Ok(self.tables.read().await.drivers.get(&id).cloned())
    }

    async fn list_drivers(&self, scope: Scope) -> AppResult<Vec<Driver>> {
        let tables = self.tables.read().await;
        let mut drivers: Vec<Driver> = tables
            .drivers
            .values()
            .filter(|d| scope.admits(ResourceRef::Driver(d)))
            .cloned()
            .collect();
        drivers.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(drivers)
    }

    async fn update_driver(&self, driver: &Driver) -> AppResult<Driver> {
        let mut tables = self.tables.write().await;
        if !tables.drivers.contains_key(&driver.id) {
            return Err(not_found_error("Driver", &driver.id.to_string()));
        }
        tables.check_driver_unique(driver)?;
        tables.drivers.insert(driver.id, driver.clone());
        Ok(driver.clone())
    }

    async fn delete_driver(&self, id: Uuid) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        if tables.routes.values().any(|r| r.driver_id == id) {
            return Err(AppError::Conflict(
                "Record is still referenced (routes_driver_id_fkey)".to_string(),
            ));
        }
        if tables.drivers.remove(&id).is_none() {
            return Err(not_found_error("Driver", &id.to_string()));
        }
        for vehicle in tables.vehicles.values_mut().filter(|v| v.driver_id == Some(id)) {
            vehicle.driver_id = None;
        }
        for delivery in tables.deliveries.values_mut().filter(|d| d.driver_id == Some(id)) {
            delivery.driver_id = None;
        }
        Ok(())
    }
}

#[async_trait]
impl VehicleRepository for MemoryFleetStore {
    async fn insert_vehicle(&self, vehicle: &Vehicle) -> AppResult<Vehicle> {
        let mut tables = self.tables.write().await;
        tables.check_vehicle_unique(vehicle)?;
        let mut stored = vehicle.clone();
        stored.driver_id = None;
        tables.vehicles.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn find_vehicle(&self, id: Uuid) -> AppResult<Option<Vehicle>> {
        Ok(self.tables.read().await.vehicles.get(&id).cloned())
    }

    async fn find_vehicle_by_driver(&self, driver_id: Uuid) -> AppResult<Option<Vehicle>> {
        let tables = self.tables.read().await;
        Ok(tables
            .vehicles
            .values()
            .find(|v| v.driver_id == Some(driver_id))
            .cloned())
    }

    async fn list_vehicles(&self, scope: Scope) -> AppResult<Vec<Vehicle>> {
        let tables = self.tables.read().await;
        let mut vehicles: Vec<Vehicle> = tables
            .vehicles
            .values()
            .filter(|v| scope.admits(ResourceRef::Vehicle(v)))
            .cloned()
            .collect();
        vehicles.sort_by(|a, b| a.plate.cmp(&b.plate));
        Ok(vehicles)
    }

    async fn delete_vehicle(&self, id: Uuid) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        if tables.routes.values().any(|r| r.vehicle_id == id) {
            return Err(AppError::Conflict(
                "Record is still referenced (routes_vehicle_id_fkey)".to_string(),
            ));
        }
        tables
            .vehicles
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| not_found_error("Vehicle", &id.to_string()))
    }
}

#[async_trait]
impl CustomerRepository for MemoryFleetStore {
    async fn insert_customer(&self, customer: &Customer) -> AppResult<Customer> {
        let mut tables = self.tables.write().await;
        tables.check_customer_unique(customer)?;
        tables.customers.insert(customer.id, customer.clone());
        Ok(customer.clone())
    }

    async fn find_customer(&self, id: Uuid) -> AppResult<Option<Customer>> {
        Ok(self.tables.read().await.customers.get(&id).cloned())
    }

    async fn list_customers(&self, scope: Scope) -> AppResult<Vec<Customer>> {
        let tables = self.tables.read().await;
        let mut customers: Vec<Customer> = tables
            .customers
            .values()
            .filter(|c| scope.admits(ResourceRef::Customer(c)))
            .cloned()
            .collect();
        customers.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(customers)
    }

    async fn update_customer(&self, customer: &Customer) -> AppResult<Customer> {
        let mut tables = self.tables.write().await;
        if !tables.customers.contains_key(&customer.id) {
            return Err(not_found_error("Customer", &customer.id.to_string()));
        }
        tables.check_customer_unique(customer)?;
        tables.customers.insert(customer.id, customer.clone());
        Ok(customer.clone())
    }

    async fn delete_customer(&self, id: Uuid) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        if tables.deliveries.values().any(|d| d.customer_id == id) {
            return Err(AppError::Conflict(
                "Record is still referenced (deliveries_customer_id_fkey)".to_string(),
            ));
        }
        tables
            .customers
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| not_found_error("Customer", &id.to_string()))
    }
}

#[async_trait]
impl RouteRepository for MemoryFleetStore {
    async fn insert_route(&self, route: &Route) -> AppResult<Route> {
        let mut tables = self.tables.write().await;
        if !tables.drivers.contains_key(&route.driver_id)
            || !tables.vehicles.contains_key(&route.vehicle_id)
        {
            return Err(AppError::Conflict(
                "Record is still referenced (routes_driver_id_fkey)".to_string(),
            ));
        }
        tables.check_route_in_progress_unique(route)?;
        let mut stored = route.clone();
        stored.capacity_total_used = Decimal::ZERO;
        tables.routes.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn find_route(&self, id: Uuid) -> AppResult<Option<Route>> {
        Ok(self.tables.read().await.routes.get(&id).cloned())
    }

    async fn list_routes(&self, scope: Scope, filters: &RouteFilters) -> AppResult<Vec<Route>> {
        let tables = self.tables.read().await;
        let mut routes: Vec<Route> = tables
            .routes
            .values()
            .filter(|r| scope.admits(ResourceRef::Route(r)) && filters.matches(r))
            .cloned()
            .collect();
        routes.sort_by(|a, b| {
            b.scheduled_date
                .cmp(&a.scheduled_date)
                .then(b.created_at.cmp(&a.created_at))
        });
        Ok(routes)
    }

    async fn list_routes_for_vehicle(&self, vehicle_id: Uuid) -> AppResult<Vec<Route>> {
        let tables = self.tables.read().await;
        Ok(tables
            .routes
            .values()
            .filter(|r| r.vehicle_id == vehicle_id)
            .cloned()
            .collect())
    }

    async fn update_route(&self, route: &Route) -> AppResult<Route> {
        let mut tables = self.tables.write().await;
        let current = tables
            .routes
            .get(&route.id)
            .cloned()
            .ok_or_else(|| not_found_error("Route", &route.id.to_string()))?;
        let mut stored = route.clone();
        stored.status = current.status;
        stored.capacity_total_used = current.capacity_total_used;
        tables.routes.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn delete_route(&self, id: Uuid) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        let status = tables
            .routes
            .get(&id)
            .map(|r| r.status)
            .ok_or_else(|| not_found_error("Route", &id.to_string()))?;
        check_route_deletable(status)?;
        tables.routes.remove(&id);
        for delivery in tables.deliveries.values_mut().filter(|d| d.route_id == Some(id)) {
            delivery.route_id = None;
            delivery.driver_id = None;
        }
        Ok(())
    }
}

#[async_trait]
impl DeliveryRepository for MemoryFleetStore {
    async fn insert_delivery(&self, delivery: &Delivery) -> AppResult<Delivery> {
        let mut tables = self.tables.write().await;
        if !tables.customers.contains_key(&delivery.customer_id) {
            return Err(AppError::Conflict(
                "Record is still referenced (deliveries_customer_id_fkey)".to_string(),
            ));
        }
        if tables
            .deliveries
            .values()
            .any(|d| d.tracking_code == delivery.tracking_code)
        {
            return Err(conflict_error("Delivery", "tracking_code", &delivery.tracking_code));
        }
        let mut stored = delivery.clone();
        stored.route_id = None;
        tables.deliveries.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn find_delivery(&self, id: Uuid) -> AppResult<Option<Delivery>> {
        Ok(self.tables.read().await.deliveries.get(&id).cloned())
    }

    async fn find_delivery_by_code(&self, tracking_code: &str) -> AppResult<Option<Delivery>> {
        let tables = self.tables.read().await;
        Ok(tables
            .deliveries
            .values()
            .find(|d| d.tracking_code == tracking_code)
            .cloned())
    }

    async fn list_deliveries(&self, scope: Scope) -> AppResult<Vec<Delivery>> {
        let tables = self.tables.read().await;
        let mut deliveries: Vec<Delivery> = tables
            .deliveries
            .values()
            .filter(|d| scope.admits(ResourceRef::Delivery(d)))
            .cloned()
            .collect();
        deliveries.sort_by(|a, b| {
            b.requested_at
                .cmp(&a.requested_at)
                .then(a.tracking_code.cmp(&b.tracking_code))
        });
        Ok(deliveries)
    }

    async fn list_deliveries_for_route(&self, route_id: Uuid) -> AppResult<Vec<Delivery>> {
        let tables = self.tables.read().await;
        let mut deliveries: Vec<Delivery> = tables
            .deliveries
            .values()
            .filter(|d| d.route_id == Some(route_id))
            .cloned()
            .collect();
        deliveries.sort_by(|a, b| a.tracking_code.cmp(&b.tracking_code));
        Ok(deliveries)
    }

    async fn count_deliveries_for_customer(&self, customer_id: Uuid) -> AppResult<i64> {
        let tables = self.tables.read().await;
        Ok(tables
            .deliveries
            .values()
            .filter(|d| d.customer_id == customer_id)
            .count() as i64)
    }

    async fn update_delivery(&self, delivery: &Delivery) -> AppResult<Delivery> {
        let mut tables = self.tables.write().await;
        let current = tables
            .deliveries
            .get(&delivery.id)
            .cloned()
            .ok_or_else(|| not_found_error("Delivery", &delivery.id.to_string()))?;
        let mut stored = delivery.clone();
        stored.route_id = current.route_id;
        stored.driver_id = current.driver_id;
        stored.capacity_required = current.capacity_required;
        stored.tracking_code = current.tracking_code;
        tables.deliveries.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn mark_delivered(&self, id: Uuid, at: DateTime<Utc>) -> AppResult<Delivery> {
        let mut tables = self.tables.write().await;
        let delivery = tables
            .deliveries
            .get_mut(&id)
            .ok_or_else(|| not_found_error("Delivery", &id.to_string()))?;
        transition_to_delivered(delivery, at)?;
        Ok(delivery.clone())
    }
}

#[async_trait]
impl AssignmentStore for MemoryFleetStore {
    async fn commit_assignment(&self, commit: &AssignmentCommit) -> AppResult<CommitOutcome> {
        let mut tables = self.tables.write().await;
        let route = tables
            .routes
            .get(&commit.route_id)
            .cloned()
            .ok_or_else(|| not_found_error("Route", &commit.route_id.to_string()))?;
        let max_capacity = tables.route_max_capacity(&route)?;

        if tables.bound_capacity(route.id) != commit.expected_used
            || route.driver_id != commit.driver_id
            || route.status == RouteStatus::Completed
        {
            return Ok(CommitOutcome::Stale);
        }

        let mut total = commit.expected_used;
        for id in &commit.delivery_ids {
            match tables.deliveries.get(id) {
                Some(d) if d.route_id.is_none() => total += d.capacity_required,
                _ => return Ok(CommitOutcome::Stale),
            }
        }
        if total > max_capacity {
            return Ok(CommitOutcome::Stale);
        }

        for id in &commit.delivery_ids {
            if let Some(delivery) = tables.deliveries.get_mut(id) {
                delivery.route_id = Some(route.id);
                delivery.driver_id = Some(route.driver_id);
            }
        }
        tables.refresh_route_total(route.id);

        Ok(CommitOutcome::Committed {
            capacity_total_used: tables.bound_capacity(route.id),
        })
    }

    async fn bind_vehicle(&self, driver_id: Uuid, vehicle_id: Option<Uuid>) -> AppResult<VehicleBinding> {
        let mut tables = self.tables.write().await;
        let status = tables
            .drivers
            .get(&driver_id)
            .map(|d| d.status)
            .ok_or_else(|| not_found_error("Driver", &driver_id.to_string()))?;
        if status == DriverStatus::OnRoute {
            return Err(on_route_error(driver_id));
        }

        if let Some(vehicle_id) = vehicle_id {
            let holder = tables
                .vehicles
                .get(&vehicle_id)
                .map(|v| v.driver_id)
                .ok_or_else(|| not_found_error("Vehicle", &vehicle_id.to_string()))?;
            if let Some(other) = holder.filter(|other| *other != driver_id) {
                return Err(AppError::Conflict(format!(
                    "Vehicle {} is already bound to driver {}",
                    vehicle_id, other
                )));
            }
        }

        for vehicle in tables
            .vehicles
            .values_mut()
            .filter(|v| v.driver_id == Some(driver_id) && Some(v.id) != vehicle_id)
        {
            vehicle.driver_id = None;
        }
        let vehicle = match vehicle_id {
            Some(vehicle_id) => tables.vehicles.get_mut(&vehicle_id).map(|v| {
                v.driver_id = Some(driver_id);
                v.clone()
            }),
            None => None,
        };
        let driver = match tables.drivers.get_mut(&driver_id) {
            Some(driver) => {
                driver.status = DriverStatus::Available;
                driver.clone()
            }
            None => return Err(not_found_error("Driver", &driver_id.to_string())),
        };

        Ok(VehicleBinding { driver, vehicle })
    }

    async fn transition_route(&self, route_id: Uuid, next: RouteStatus) -> AppResult<Route> {
        let mut tables = self.tables.write().await;
        let route = tables
            .routes
            .get(&route_id)
            .cloned()
            .ok_or_else(|| not_found_error("Route", &route_id.to_string()))?;
        let driver = tables
            .drivers
            .get(&route.driver_id)
            .cloned()
            .ok_or_else(|| not_found_error("Driver", &route.driver_id.to_string()))?;
        if !tables.vehicles.contains_key(&route.vehicle_id) {
            return Err(not_found_error("Vehicle", &route.vehicle_id.to_string()));
        }

        let active: Vec<Route> = tables
            .routes
            .values()
            .filter(|r| r.driver_id == route.driver_id || r.vehicle_id == route.vehicle_id)
            .cloned()
            .collect();
        check_route_transition(&route, next, &driver, &active)?;
        if route.status == next {
            return Ok(route);
        }

        let updated = match tables.routes.get_mut(&route_id) {
            Some(stored) => {
                stored.status = next;
                stored.clone()
            }
            None => return Err(not_found_error("Route", &route_id.to_string())),
        };
        if let Some((driver_status, vehicle_status)) = derived_statuses(next) {
            if let Some(driver) = tables.drivers.get_mut(&route.driver_id) {
                driver.status = driver_status;
            }
            if let Some(vehicle) = tables.vehicles.get_mut(&route.vehicle_id) {
                vehicle.status = vehicle_status;
            }
        }
        Ok(updated)
    }

    async fn update_vehicle(&self, vehicle: &Vehicle) -> AppResult<Vehicle> {
        let mut tables = self.tables.write().await;
        let current = tables
            .vehicles
            .get(&vehicle.id)
            .cloned()
            .ok_or_else(|| not_found_error("Vehicle", &vehicle.id.to_string()))?;
        tables.check_vehicle_unique(vehicle)?;

        if vehicle.max_capacity < current.max_capacity {
            if let Some((route_id, used)) = tables
                .routes
                .values()
                .filter(|r| r.vehicle_id == vehicle.id && r.status != RouteStatus::Completed)
                .map(|r| (r.id, tables.bound_capacity(r.id)))
                .find(|(_, used)| *used > vehicle.max_capacity)
            {
                return Err(capacity_below_load_error(route_id, used, vehicle.max_capacity));
            }
        }

        let mut stored = vehicle.clone();
        stored.driver_id = current.driver_id;
        tables.vehicles.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn resize_delivery(&self, delivery_id: Uuid, capacity_required: Decimal) -> AppResult<Delivery> {
        let mut tables = self.tables.write().await;
        let delivery = tables
            .deliveries
            .get(&delivery_id)
            .cloned()
            .ok_or_else(|| not_found_error("Delivery", &delivery_id.to_string()))?;

        if let Some(route_id) = delivery.route_id {
            let route = tables
                .routes
                .get(&route_id)
                .cloned()
                .ok_or_else(|| not_found_error("Route", &route_id.to_string()))?;
            let max_capacity = tables.route_max_capacity(&route)?;
            let others = tables.bound_capacity(route_id) - delivery.capacity_required;
            if others + capacity_required > max_capacity {
                return Err(AppError::CapacityExceeded {
                    max_capacity,
                    capacity_used: others,
                    capacity_requested: capacity_required,
                    delivery_code: delivery.tracking_code,
                });
            }
        }

        let updated = match tables.deliveries.get_mut(&delivery_id) {
            Some(stored) => {
                stored.capacity_required = capacity_required;
                stored.clone()
            }
            None => return Err(not_found_error("Delivery", &delivery_id.to_string())),
        };
        if let Some(route_id) = updated.route_id {
            tables.refresh_route_total(route_id);
        }
        Ok(updated)
    }

    async fn delete_delivery(&self, delivery_id: Uuid) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        let removed = tables
            .deliveries
            .remove(&delivery_id)
            .ok_or_else(|| not_found_error("Delivery", &delivery_id.to_string()))?;
        if let Some(route_id) = removed.route_id {
            tables.refresh_route_total(route_id);
        }
        Ok(())
    }
}
