//! Controladores
//!
//! Cada operación autentica al actor, evalúa la política y delega en el
//! store o en los servicios de dominio.

pub mod customer_controller;
pub mod delivery_controller;
pub mod driver_controller;
pub mod route_controller;
pub mod vehicle_controller;

pub use customer_controller::CustomerController;
pub use delivery_controller::DeliveryController;
pub use driver_controller::DriverController;
pub use route_controller::RouteController;
pub use vehicle_controller::VehicleController;
