//! Servicio de autorización
//!
//! Un único evaluador de reglas ordenadas decide si un actor puede aplicar
//! una acción sobre una colección o sobre un objeto concreto. Es un
//! predicado puro: no lee ni escribe nada.

use tracing::debug;

use crate::models::{Action, Actor, Edit, ResourceKind};
use crate::services::query_scope::{ResourceRef, Scope};
use crate::utils::errors::{not_found_error, AppError, AppResult};

const MISSING_CREDENTIALS: &str = "Authentication credentials were not provided";

/// Sobre qué se evalúa la acción
#[derive(Debug, Clone, Copy)]
pub enum Target<'a> {
    Collection(ResourceKind),
    Object(ResourceRef<'a>),
}

impl<'a> Target<'a> {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Target::Collection(kind) => *kind,
            Target::Object(resource) => resource.kind(),
        }
    }
}

/// Motivo de una denegación
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    Unauthenticated,
    /// El objeto no es visible para el actor; se reporta como inexistente
    OutOfScope,
    NotPermitted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(Denial),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }
}

/// Evalúa las reglas en orden de precedencia
pub fn authorize(actor: Option<&Actor>, action: Action, target: Target<'_>) -> Decision {
    let Some(actor) = actor else {
        return Decision::Deny(Denial::Unauthenticated);
    };

    match actor {
        Actor::Manager { .. } => Decision::Allow,
        Actor::Driver { .. } => driver_rules(actor, action, target),
        Actor::Customer { .. } => customer_rules(actor, action, target),
    }
}

fn driver_rules(actor: &Actor, action: Action, target: Target<'_>) -> Decision {
    let scope = Scope::for_actor(actor, target.kind());

    match target {
        Target::Collection(_) => match action {
            Action::List if !scope.is_nothing() => Decision::Allow,
            _ => Decision::Deny(Denial::NotPermitted),
        },
        Target::Object(resource) => {
            if !scope.admits(resource) {
                return Decision::Deny(Denial::OutOfScope);
            }
            match (action, resource) {
                (Action::Read, _) => Decision::Allow,
                // El estado propio solo cambia con las rutas
                (
                    Action::Update(Edit::Contact | Edit::Profile),
                    ResourceRef::Driver(_),
                ) => Decision::Allow,
                (
                    Action::Update(Edit::Progress),
                    ResourceRef::Route(_) | ResourceRef::Delivery(_),
                ) => Decision::Allow,
                (Action::MarkDelivered, ResourceRef::Delivery(_)) => Decision::Allow,
                _ => Decision::Deny(Denial::NotPermitted),
            }
        }
    }
}

fn customer_rules(actor: &Actor, action: Action, target: Target<'_>) -> Decision {
    let scope = Scope::for_actor(actor, target.kind());

    match target {
        Target::Collection(_) => match action {
            Action::List if !scope.is_nothing() => Decision::Allow,
            _ => Decision::Deny(Denial::NotPermitted),
        },
        Target::Object(resource) => {
            if !scope.admits(resource) {
                return Decision::Deny(Denial::OutOfScope);
            }
            match (action, resource) {
                (Action::Read, _) => Decision::Allow,
                (Action::Update(Edit::Contact), ResourceRef::Customer(_)) => Decision::Allow,
                _ => Decision::Deny(Denial::NotPermitted),
            }
        }
    }
}

/// Rechaza peticiones sin actor antes de tocar el store
pub fn authenticated(actor: Option<&Actor>) -> AppResult<&Actor> {
    actor.ok_or_else(|| AppError::Unauthenticated(MISSING_CREDENTIALS.to_string()))
}

/// Convierte la decisión en error de la aplicación
pub fn enforce(actor: Option<&Actor>, action: Action, target: Target<'_>) -> AppResult<()> {
    let kind = target.kind();
    match authorize(actor, action, target) {
        Decision::Allow => Ok(()),
        Decision::Deny(denial) => {
            debug!(
                "🚫 {:?} denegado: {} sobre {} ({:?})",
                actor.map(|a| a.role()),
                action.as_str(),
                kind.as_str(),
                denial
            );
            Err(denial_error(denial, action, target))
        }
    }
}

/// Fuera de alcance produce el mismo error que un id inexistente
fn denial_error(denial: Denial, action: Action, target: Target<'_>) -> AppError {
    let kind = target.kind();
    match denial {
        Denial::Unauthenticated => AppError::Unauthenticated(MISSING_CREDENTIALS.to_string()),
        Denial::OutOfScope => match target {
            Target::Object(resource) => not_found_error(kind.as_str(), &resource.id().to_string()),
            Target::Collection(_) => AppError::NotFound(format!("{} not found", kind.as_str())),
        },
        Denial::NotPermitted => AppError::Forbidden(format!(
            "Cannot {} {}: not permitted for this role",
            action.as_str(),
            kind.as_str()
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::customer::Customer;
    use crate::models::driver::{Driver, DriverStatus};
    use chrono::Utc;
    use uuid::Uuid;

    fn driver_record(id: Uuid) -> Driver {
        Driver {
            id,
            user_id: Uuid::new_v4(),
            name: "João Lima".to_string(),
            national_id: "12345678901".to_string(),
            license_number: "123456789".to_string(),
            phone: "61912345678".to_string(),
            status: DriverStatus::Available,
            registered_at: Utc::now(),
        }
    }

    fn customer_record(id: Uuid) -> Customer {
        Customer {
            id,
            user_id: Uuid::new_v4(),
            name: "Loja Central".to_string(),
            address: "Rua B, 20".to_string(),
            phone: "61912345678".to_string(),
        }
    }

    #[test]
    fn unauthenticated_is_always_denied() {
        let decision = authorize(None, Action::List, Target::Collection(ResourceKind::Delivery));
        assert_eq!(decision, Decision::Deny(Denial::Unauthenticated));
    }

    #[test]
    fn missing_actor_is_unauthenticated() {
        let err = authenticated(None).unwrap_err();
        assert!(matches!(err, AppError::Unauthenticated(_)));
    }

    #[test]
    fn manager_is_allowed_everything() {
        let manager = Actor::Manager { user_id: Uuid::new_v4() };
        let other = driver_record(Uuid::new_v4());
        assert!(authorize(Some(&manager), Action::Delete, Target::Object(ResourceRef::Driver(&other))).is_allowed());
        assert!(authorize(Some(&manager), Action::Create, Target::Collection(ResourceKind::Vehicle)).is_allowed());
    }

    #[test]
    fn drivers_never_manage_fleet_metadata() {
        let driver_id = Uuid::new_v4();
        let actor = Actor::Driver { user_id: Uuid::new_v4(), driver_id };
        for kind in [
            ResourceKind::Driver,
            ResourceKind::Vehicle,
            ResourceKind::Route,
            ResourceKind::Customer,
        ] {
            assert_eq!(
                authorize(Some(&actor), Action::Create, Target::Collection(kind)),
                Decision::Deny(Denial::NotPermitted)
            );
        }
        let own = driver_record(driver_id);
        assert_eq!(
            authorize(Some(&actor), Action::Delete, Target::Object(ResourceRef::Driver(&own))),
            Decision::Deny(Denial::NotPermitted)
        );
    }

    #[test]
    fn driver_reads_and_updates_own_record_only() {
        let driver_id = Uuid::new_v4();
        let actor = Actor::Driver { user_id: Uuid::new_v4(), driver_id };
        let own = driver_record(driver_id);
        let other = driver_record(Uuid::new_v4());

        assert!(authorize(Some(&actor), Action::Read, Target::Object(ResourceRef::Driver(&own))).is_allowed());
        assert!(authorize(Some(&actor), Action::Update(Edit::Profile), Target::Object(ResourceRef::Driver(&own))).is_allowed());
        assert_eq!(
            authorize(Some(&actor), Action::Update(Edit::Full), Target::Object(ResourceRef::Driver(&own))),
            Decision::Deny(Denial::NotPermitted)
        );
        assert_eq!(
            authorize(Some(&actor), Action::Read, Target::Object(ResourceRef::Driver(&other))),
            Decision::Deny(Denial::OutOfScope)
        );
    }

    #[test]
    fn customer_may_only_edit_own_contact_fields() {
        let customer_id = Uuid::new_v4();
        let actor = Actor::Customer { user_id: Uuid::new_v4(), customer_id };
        let own = customer_record(customer_id);

        assert!(authorize(Some(&actor), Action::Update(Edit::Contact), Target::Object(ResourceRef::Customer(&own))).is_allowed());
        assert_eq!(
            authorize(Some(&actor), Action::Update(Edit::Full), Target::Object(ResourceRef::Customer(&own))),
            Decision::Deny(Denial::NotPermitted)
        );
        assert_eq!(
            authorize(Some(&actor), Action::Create, Target::Collection(ResourceKind::Delivery)),
            Decision::Deny(Denial::NotPermitted)
        );
    }

    #[test]
    fn out_of_scope_objects_surface_as_not_found() {
        let actor = Actor::Customer { user_id: Uuid::new_v4(), customer_id: Uuid::new_v4() };
        let stranger = customer_record(Uuid::new_v4());
        let err = enforce(Some(&actor), Action::Read, Target::Object(ResourceRef::Customer(&stranger)))
            .unwrap_err();
        let missing = not_found_error("Customer", &stranger.id.to_string());
        assert_eq!(err.to_string(), missing.to_string());
    }
}
