//! Modelo de autenticación y vocabulario de permisos
//!
//! El actor autenticado es una unión etiquetada: el rol y el vínculo con su
//! propio registro (Driver o Customer) viajan juntos.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Roles del sistema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Manager,
    Driver,
    Customer,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Manager => "manager",
            UserRole::Driver => "driver",
            UserRole::Customer => "customer",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "manager" => Some(UserRole::Manager),
            "driver" => Some(UserRole::Driver),
            "customer" => Some(UserRole::Customer),
            _ => None,
        }
    }
}

/// Actor autenticado que se inyecta en las requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    Manager { user_id: Uuid },
    Driver { user_id: Uuid, driver_id: Uuid },
    Customer { user_id: Uuid, customer_id: Uuid },
}

impl Actor {
    pub fn role(&self) -> UserRole {
        match self {
            Actor::Manager { .. } => UserRole::Manager,
            Actor::Driver { .. } => UserRole::Driver,
            Actor::Customer { .. } => UserRole::Customer,
        }
    }

    pub fn user_id(&self) -> Uuid {
        match self {
            Actor::Manager { user_id }
            | Actor::Driver { user_id, .. }
            | Actor::Customer { user_id, .. } => *user_id,
        }
    }

    pub fn is_manager(&self) -> bool {
        matches!(self, Actor::Manager { .. })
    }
}

/// Tipos de recurso protegidos por la política
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Driver,
    Vehicle,
    Customer,
    Route,
    Delivery,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Driver => "Driver",
            ResourceKind::Vehicle => "Vehicle",
            ResourceKind::Customer => "Customer",
            ResourceKind::Route => "Route",
            ResourceKind::Delivery => "Delivery",
        }
    }
}

/// Clase de edición de un update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edit {
    /// Dirección y teléfono
    Contact,
    /// Nombre y documentos del propio registro
    Profile,
    /// Estado y observaciones
    Progress,
    /// Cualquier otro campo
    Full,
}

/// Acciones evaluadas por la política de autorización
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    List,
    Read,
    Create,
    Update(Edit),
    Delete,
    BindVehicle,
    AssignDeliveries,
    MarkDelivered,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::List => "list",
            Action::Read => "read",
            Action::Create => "create",
            Action::Update(_) => "update",
            Action::Delete => "delete",
            Action::BindVehicle => "bind vehicle",
            Action::AssignDeliveries => "assign deliveries",
            Action::MarkDelivered => "mark delivered",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_round_trips_through_claim_strings() {
        for role in [UserRole::Manager, UserRole::Driver, UserRole::Customer] {
            assert_eq!(UserRole::from_str(role.as_str()), Some(role));
        }
        assert_eq!(UserRole::from_str("gestor"), None);
    }

    #[test]
    fn actor_reports_its_role() {
        let actor = Actor::Driver {
            user_id: Uuid::new_v4(),
            driver_id: Uuid::new_v4(),
        };
        assert_eq!(actor.role(), UserRole::Driver);
        assert!(!actor.is_manager());
    }
}
