//! Repositorios de persistencia
//!
//! Los controladores dependen solo de `FleetStore`. Hay dos implementaciones:
//! `PgFleetStore` (PostgreSQL vía sqlx) y `MemoryFleetStore` (tablas en
//! memoria con las mismas restricciones, usada en tests y en desarrollo).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::models::route::RouteFilters;
use crate::models::{Customer, Delivery, Driver, Route, RouteStatus, Vehicle};
use crate::services::query_scope::Scope;
use crate::utils::errors::{AppError, AppResult};

pub mod customer_repository;
pub mod delivery_repository;
pub mod driver_repository;
pub mod memory_store;
pub mod pg_store;
pub mod route_repository;
pub mod vehicle_repository;

pub use memory_store::MemoryFleetStore;
pub use pg_store::PgFleetStore;

#[async_trait]
pub trait DriverRepository: Send + Sync {
    async fn insert_driver(&self, driver: &Driver) -> AppResult<Driver>;
    async fn find_driver(&self, id: Uuid) -> AppResult<Option<Driver>>;
    async fn list_drivers(&self, scope: Scope) -> AppResult<Vec<Driver>>;
    async fn update_driver(&self, driver: &Driver) -> AppResult<Driver>;
    async fn delete_driver(&self, id: Uuid) -> AppResult<()>;
}

#[async_trait]
pub trait VehicleRepository: Send + Sync {
    async fn insert_vehicle(&self, vehicle: &Vehicle) -> AppResult<Vehicle>;
    async fn find_vehicle(&self, id: Uuid) -> AppResult<Option<Vehicle>>;
    async fn find_vehicle_by_driver(&self, driver_id: Uuid) -> AppResult<Option<Vehicle>>;
    async fn list_vehicles(&self, scope: Scope) -> AppResult<Vec<Vehicle>>;
    async fn delete_vehicle(&self, id: Uuid) -> AppResult<()>;
}

#[async_trait]
pub trait CustomerRepository: Send + Sync {
    async fn insert_customer(&self, customer: &Customer) -> AppResult<Customer>;
    async fn find_customer(&self, id: Uuid) -> AppResult<Option<Customer>>;
    async fn list_customers(&self, scope: Scope) -> AppResult<Vec<Customer>>;
    async fn update_customer(&self, customer: &Customer) -> AppResult<Customer>;
    async fn delete_customer(&self, id: Uuid) -> AppResult<()>;
}

#[async_trait]
pub trait RouteRepository: Send + Sync {
    async fn insert_route(&self, route: &Route) -> AppResult<Route>;
    async fn find_route(&self, id: Uuid) -> AppResult<Option<Route>>;
    async fn list_routes(&self, scope: Scope, filters: &RouteFilters) -> AppResult<Vec<Route>>;
    async fn list_routes_for_vehicle(&self, vehicle_id: Uuid) -> AppResult<Vec<Route>>;
    /// Actualiza campos descriptivos; nunca estado ni `capacity_total_used`
    async fn update_route(&self, route: &Route) -> AppResult<Route>;
    /// Borra una ruta planned y libera sus entregas; el estado se revalida bajo lock
    async fn delete_route(&self, id: Uuid) -> AppResult<()>;
}

#[async_trait]
pub trait DeliveryRepository: Send + Sync {
    async fn insert_delivery(&self, delivery: &Delivery) -> AppResult<Delivery>;
    async fn find_delivery(&self, id: Uuid) -> AppResult<Option<Delivery>>;
    async fn find_delivery_by_code(&self, tracking_code: &str) -> AppResult<Option<Delivery>>;
    async fn list_deliveries(&self, scope: Scope) -> AppResult<Vec<Delivery>>;
    async fn list_deliveries_for_route(&self, route_id: Uuid) -> AppResult<Vec<Delivery>>;
    async fn count_deliveries_for_customer(&self, customer_id: Uuid) -> AppResult<i64>;
    /// Actualiza todo salvo ruta, conductor y capacidad, que pasan por `AssignmentStore`
    async fn update_delivery(&self, delivery: &Delivery) -> AppResult<Delivery>;
    /// Pasa a delivered solo si la entrega sigue en un estado no terminal
    async fn mark_delivered(&self, id: Uuid, at: DateTime<Utc>) -> AppResult<Delivery>;
}

/// Datos planificados para vincular entregas a una ruta
#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentCommit {
    pub route_id: Uuid,
    pub driver_id: Uuid,
    /// Capacidad ya usada según la foto sobre la que se planificó
    pub expected_used: Decimal,
    pub delivery_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CommitOutcome {
    Committed { capacity_total_used: Decimal },
    /// La foto quedó vieja: otra escritura tocó la ruta o las entregas
    Stale,
}

/// Resultado de vincular/desvincular vehículo
#[derive(Debug, Clone, PartialEq)]
pub struct VehicleBinding {
    pub driver: Driver,
    pub vehicle: Option<Vehicle>,
}

pub(crate) fn on_route_error(driver_id: Uuid) -> AppError {
    AppError::InvalidState(format!(
        "Driver {} is on route; finish the route before changing vehicles",
        driver_id
    ))
}

pub(crate) fn capacity_below_load_error(route_id: Uuid, used: Decimal, max_capacity: Decimal) -> AppError {
    AppError::Conflict(format!(
        "Route {} already uses {}, above the new max capacity {}",
        route_id, used, max_capacity
    ))
}

/// Operaciones que necesitan más que consistencia por fila
#[async_trait]
pub trait AssignmentStore: Send + Sync {
    /// Recalcula y compara la capacidad bajo el lock de la ruta antes de vincular
    async fn commit_assignment(&self, commit: &AssignmentCommit) -> AppResult<CommitOutcome>;

    /// Verificación de unicidad y escritura en una sola transacción; un
    /// conductor on_route se rechaza bajo el mismo lock
    async fn bind_vehicle(&self, driver_id: Uuid, vehicle_id: Option<Uuid>) -> AppResult<VehicleBinding>;

    /// Cambia el estado de la ruta junto con los de su conductor y vehículo
    async fn transition_route(&self, route_id: Uuid, next: RouteStatus) -> AppResult<Route>;

    /// Actualiza todo salvo `driver_id`, que solo cambia por `bind_vehicle`.
    /// Una capacidad menor se revalida contra las rutas abiertas bajo el lock
    /// del vehículo.
    async fn update_vehicle(&self, vehicle: &Vehicle) -> AppResult<Vehicle>;

    /// Cambia `capacity_required` revalidando la capacidad de su ruta
    async fn resize_delivery(&self, delivery_id: Uuid, capacity_required: Decimal) -> AppResult<Delivery>;

    /// Borra la entrega y recalcula el total de su ruta
    async fn delete_delivery(&self, delivery_id: Uuid) -> AppResult<()>;
}

pub trait FleetStore:
    DriverRepository
    + VehicleRepository
    + CustomerRepository
    + RouteRepository
    + DeliveryRepository
    + AssignmentStore
{
}

impl<T> FleetStore for T where
    T: DriverRepository
        + VehicleRepository
        + CustomerRepository
        + RouteRepository
        + DeliveryRepository
        + AssignmentStore
{
}
