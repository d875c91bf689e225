//! Modelos del sistema
//!
//! Este módulo contiene todos los modelos de datos que mapean exactamente
//! al schema PostgreSQL, junto con sus requests y responses.

pub mod auth;
pub mod customer;
pub mod delivery;
pub mod driver;
pub mod route;
pub mod vehicle;

pub use auth::{Action, Actor, Edit, ResourceKind, UserRole};
pub use customer::Customer;
pub use delivery::{Delivery, DeliveryStatus};
pub use driver::{Driver, DriverStatus};
pub use route::{Route, RouteStatus};
pub use vehicle::{Vehicle, VehicleStatus, VehicleType};
