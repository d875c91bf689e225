//! Services module
//!
//! Este módulo contiene la lógica de negocio de la aplicación: política de
//! acceso, alcance de consultas, asignación de entregas y ciclos de vida.
//! Los servicios dependen solo del trait `FleetStore`.

pub mod assignment_service;
pub mod authorization_service;
pub mod delivery_lifecycle;
pub mod query_scope;
pub mod route_lifecycle;

pub use assignment_service::{AssignmentService, AssignmentSummary};
pub use authorization_service::{authenticated, authorize, enforce, Decision, Denial, Target};
pub use delivery_lifecycle::DeliveryLifecycle;
pub use query_scope::{ResourceRef, Scope};
pub use route_lifecycle::RouteLifecycle;
