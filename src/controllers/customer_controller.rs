use std::sync::Arc;

use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::dto::ApiResponse;
use crate::models::customer::{CreateCustomerRequest, CustomerResponse, UpdateCustomerRequest};
use crate::models::{Action, Actor, Customer, ResourceKind};
use crate::repositories::FleetStore;
use crate::services::{authenticated, enforce, ResourceRef, Scope, Target};
use crate::utils::errors::{not_found_error, AppError, AppResult};

pub struct CustomerController {
    store: Arc<dyn FleetStore>,
}

impl CustomerController {
    pub fn new(store: Arc<dyn FleetStore>) -> Self {
        Self { store }
    }

    pub async fn list(&self, actor: Option<&Actor>) -> AppResult<Vec<CustomerResponse>> {
        let actor = authenticated(actor)?;
        enforce(Some(actor), Action::List, Target::Collection(ResourceKind::Customer))?;

        let customers = self
            .store
            .list_customers(Scope::for_actor(actor, ResourceKind::Customer))
            .await?;
        Ok(customers.into_iter().map(CustomerResponse::from).collect())
    }

    pub async fn get(&self, actor: Option<&Actor>, id: Uuid) -> AppResult<CustomerResponse> {
        let actor = authenticated(actor)?;
        let customer = self.load(id).await?;
        enforce(Some(actor), Action::Read, Target::Object(ResourceRef::Customer(&customer)))?;
        Ok(customer.into())
    }

    pub async fn create(
        &self,
        actor: Option<&Actor>,
        request: CreateCustomerRequest,
    ) -> AppResult<ApiResponse<CustomerResponse>> {
        let actor = authenticated(actor)?;
        enforce(Some(actor), Action::Create, Target::Collection(ResourceKind::Customer))?;
        request.validate()?;

        let customer = Customer {
            id: Uuid::new_v4(),
            user_id: request.user_id,
            name: request.name,
            address: request.address,
            phone: request.phone,
        };
        let customer = self.store.insert_customer(&customer).await?;
        info!("👤 Cliente {} registrado", customer.id);

        Ok(ApiResponse::success_with_message(
            customer.into(),
            "Customer created successfully".to_string(),
        ))
    }

    pub async fn update(
        &self,
        actor: Option<&Actor>,
        id: Uuid,
        request: UpdateCustomerRequest,
    ) -> AppResult<ApiResponse<CustomerResponse>> {
        let actor = authenticated(actor)?;
        let mut customer = self.load(id).await?;
        enforce(
            Some(actor),
            Action::Update(request.edit_class()),
            Target::Object(ResourceRef::Customer(&customer)),
        )?;
        request.validate()?;

        request.apply(&mut customer);
        let customer = self.store.update_customer(&customer).await?;

        Ok(ApiResponse::success_with_message(
            customer.into(),
            "Customer updated successfully".to_string(),
        ))
    }

    pub async fn delete(&self, actor: Option<&Actor>, id: Uuid) -> AppResult<()> {
        let actor = authenticated(actor)?;
        let customer = self.load(id).await?;
        enforce(Some(actor), Action::Delete, Target::Object(ResourceRef::Customer(&customer)))?;

        let deliveries = self.store.count_deliveries_for_customer(id).await?;
        if deliveries > 0 {
            return Err(AppError::Conflict(format!(
                "Customer {} has {} deliveries and cannot be deleted",
                customer.name, deliveries
            )));
        }

        self.store.delete_customer(id).await?;
        info!("🗑️ Cliente {} eliminado", id);
        Ok(())
    }

    async fn load(&self, id: Uuid) -> AppResult<Customer> {
        self.store
            .find_customer(id)
            .await?
            .ok_or_else(|| not_found_error("Customer", &id.to_string()))
    }
}
