//! Alcance de consultas por rol
//!
//! `Scope` es el único predicado de visibilidad del sistema: los listados lo
//! aplican como filtro y la política de autorización lo usa para el acceso
//! a un objeto individual. Así lo que aparece en un listado siempre se puede
//! abrir en detalle, y al revés.

use uuid::Uuid;

use crate::models::{Actor, Customer, Delivery, Driver, ResourceKind, Route, Vehicle};

/// Referencia prestada a un recurso concreto
#[derive(Debug, Clone, Copy)]
pub enum ResourceRef<'a> {
    Driver(&'a Driver),
    Vehicle(&'a Vehicle),
    Customer(&'a Customer),
    Route(&'a Route),
    Delivery(&'a Delivery),
}

impl<'a> ResourceRef<'a> {
    pub fn kind(&self) -> ResourceKind {
        match self {
            ResourceRef::Driver(_) => ResourceKind::Driver,
            ResourceRef::Vehicle(_) => ResourceKind::Vehicle,
            ResourceRef::Customer(_) => ResourceKind::Customer,
            ResourceRef::Route(_) => ResourceKind::Route,
            ResourceRef::Delivery(_) => ResourceKind::Delivery,
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            ResourceRef::Driver(driver) => driver.id,
            ResourceRef::Vehicle(vehicle) => vehicle.id,
            ResourceRef::Customer(customer) => customer.id,
            ResourceRef::Route(route) => route.id,
            ResourceRef::Delivery(delivery) => delivery.id,
        }
    }
}

/// Filtro de visibilidad para un actor y un tipo de recurso
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Gestor: sin restricción
    Unrestricted,
    /// Registros del conductor (o el propio registro de Driver)
    OwnedByDriver(Uuid),
    /// Registros del cliente (o el propio registro de Customer)
    OwnedByCustomer(Uuid),
    /// El rol no ve este tipo de recurso
    Nothing,
}

impl Scope {
    pub fn for_actor(actor: &Actor, kind: ResourceKind) -> Scope {
        match (actor, kind) {
            (Actor::Manager { .. }, _) => Scope::Unrestricted,
            (
                Actor::Driver { driver_id, .. },
                ResourceKind::Driver | ResourceKind::Route | ResourceKind::Delivery,
            ) => Scope::OwnedByDriver(*driver_id),
            (Actor::Driver { .. }, ResourceKind::Vehicle | ResourceKind::Customer) => {
                Scope::Nothing
            }
            (
                Actor::Customer { customer_id, .. },
                ResourceKind::Customer | ResourceKind::Delivery,
            ) => Scope::OwnedByCustomer(*customer_id),
            (Actor::Customer { .. }, _) => Scope::Nothing,
        }
    }

    pub fn is_nothing(&self) -> bool {
        matches!(self, Scope::Nothing)
    }

    /// ¿El recurso entra en este alcance?
    ///
    /// Para entregas basta `driver_id`: una entrega con ruta hereda siempre el
    /// conductor de la ruta.
    pub fn admits(&self, resource: ResourceRef<'_>) -> bool {
        match self {
            Scope::Unrestricted => true,
            Scope::Nothing => false,
            Scope::OwnedByDriver(driver_id) => match resource {
                ResourceRef::Driver(driver) => driver.id == *driver_id,
                ResourceRef::Route(route) => route.driver_id == *driver_id,
                ResourceRef::Delivery(delivery) => delivery.driver_id == Some(*driver_id),
                ResourceRef::Vehicle(_) | ResourceRef::Customer(_) => false,
            },
            Scope::OwnedByCustomer(customer_id) => match resource {
                ResourceRef::Customer(customer) => customer.id == *customer_id,
                ResourceRef::Delivery(delivery) => delivery.customer_id == *customer_id,
                _ => false,
            },
        }
    }
}
