//! Modelo de Customer
//!
//! Clientes originan entregas; nunca se borran físicamente porque las
//! entregas los referencian.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::models::auth::Edit;
use crate::utils::validation::{validate_not_blank, validate_phone};

/// Customer principal - vinculado 1:1 a una identidad de cuenta
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Customer {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub address: String,
    pub phone: String,
}

/// Request para crear un nuevo cliente
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateCustomerRequest {
    pub user_id: Uuid,

    #[validate(length(min = 2, max = 100))]
    pub name: String,

    #[validate(custom = "validate_not_blank", length(max = 255))]
    pub address: String,

    #[validate(custom = "validate_phone")]
    pub phone: String,
}

/// Request para actualizar un cliente existente
///
/// El vínculo con la cuenta (`user_id`) nunca cambia.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateCustomerRequest {
    #[validate(length(min = 2, max = 100))]
    pub name: Option<String>,

    #[validate(custom = "validate_not_blank", length(max = 255))]
    pub address: Option<String>,

    #[validate(custom = "validate_phone")]
    pub phone: Option<String>,
}

impl UpdateCustomerRequest {
    pub fn edit_class(&self) -> Edit {
        if self.name.is_some() {
            Edit::Full
        } else {
            Edit::Contact
        }
    }

    pub fn apply(self, customer: &mut Customer) {
        if let Some(name) = self.name {
            customer.name = name;
        }
        if let Some(address) = self.address {
            customer.address = address;
        }
        if let Some(phone) = self.phone {
            customer.phone = phone;
        }
    }
}

/// Response de cliente para la API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerResponse {
    pub id: Uuid,
    pub name: String,
    pub address: String,
    pub phone: String,
}

impl From<Customer> for CustomerResponse {
    fn from(customer: Customer) -> Self {
        Self {
            id: customer.id,
            name: customer.name,
            address: customer.address,
            phone: customer.phone,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renaming_is_not_a_contact_edit() {
        let update = UpdateCustomerRequest {
            address: Some("Rua das Flores, 10".to_string()),
            phone: Some("61912345678".to_string()),
            ..Default::default()
        };
        assert_eq!(update.edit_class(), Edit::Contact);

        let update = UpdateCustomerRequest {
            name: Some("Outra Empresa".to_string()),
            ..Default::default()
        };
        assert_eq!(update.edit_class(), Edit::Full);
    }

    #[test]
    fn blank_address_is_rejected() {
        let request = UpdateCustomerRequest {
            address: Some("   ".to_string()),
            ..Default::default()
        };
        assert!(request.validate().is_err());
    }
}
