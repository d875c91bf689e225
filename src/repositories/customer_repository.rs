use async_trait::async_trait;
use uuid::Uuid;

use crate::models::Customer;
use crate::repositories::{CustomerRepository, PgFleetStore};
use crate::services::query_scope::Scope;
use crate::utils::errors::{not_found_error, AppResult};

#[async_trait]
impl CustomerRepository for PgFleetStore {
    async fn insert_customer(&self, customer: &Customer) -> AppResult<Customer> {
        let customer = sqlx::query_as::<_, Customer>(
            r#"
            INSERT INTO customers (id, user_id, name, address, phone)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(customer.id)
        .bind(customer.user_id)
        .bind(&customer.name)
        .bind(&customer.address)
        .bind(&customer.phone)
        .fetch_one(&self.pool)
        .await?;

        Ok(customer)
    }

    async fn find_customer(&self, id: Uuid) -> AppResult<Option<Customer>> {
        let customer = sqlx::query_as::<_, Customer>("SELECT * FROM customers WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(customer)
    }

    async fn list_customers(&self, scope: Scope) -> AppResult<Vec<Customer>> {
        let customers = match scope {
            Scope::Unrestricted => {
                sqlx::query_as::<_, Customer>("SELECT * FROM customers ORDER BY name, id")
                    .fetch_all(&self.pool)
                    .await?
            }
            Scope::OwnedByCustomer(customer_id) => {
                sqlx::query_as::<_, Customer>("SELECT * FROM customers WHERE id = $1")
                    .bind(customer_id)
                    .fetch_all(&self.pool)
                    .await?
            }
            Scope::OwnedByDriver(_) | Scope::Nothing => Vec::new(),
        };

        Ok(customers)
    }

    async fn update_customer(&self, customer: &Customer) -> AppResult<Customer> {
        let updated = sqlx::query_as::<_, Customer>(
            "UPDATE customers SET name = $2, address = $3, phone = $4 WHERE id = $1 RETURNING *",
        )
        .bind(customer.id)
        .bind(&customer.name)
        .bind(&customer.address)
        .bind(&customer.phone)
        .fetch_optional(&self.pool)
        .await?;

        updated.ok_or_else(|| not_found_error("Customer", &customer.id.to_string()))
    }

    async fn delete_customer(&self, id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM customers WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(not_found_error("Customer", &id.to_string()));
        }
        Ok(())
    }
}
