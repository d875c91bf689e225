use async_trait::async_trait;
use uuid::Uuid;

use crate::models::Driver;
use crate::repositories::{DriverRepository, PgFleetStore};
use crate::services::query_scope::Scope;
use crate::utils::errors::{not_found_error, AppResult};

#[async_trait]
impl DriverRepository for PgFleetStore {
    async fn insert_driver(&self, driver: &Driver) -> AppResult<Driver> {
        let driver = sqlx::query_as::<_, Driver>(
            r#"
            INSERT INTO drivers (id, user_id, name, national_id, license_number, phone, status, registered_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(driver.id)
        .bind(driver.user_id)
        .bind(&driver.name)
        .bind(&driver.national_id)
        .bind(&driver.license_number)
        .bind(&driver.phone)
        .bind(driver.status)
        .bind(driver.registered_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(driver)
    }

    async fn find_driver(&self, id: Uuid) -> AppResult<Option<Driver>> {
        let driver = sqlx::query_as::<_, Driver>("SELECT * FROM drivers WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(driver)
    }

    async fn list_drivers(&self, scope: Scope) -> AppResult<Vec<Driver>> {
        let drivers = match scope {
            Scope::Unrestricted => {
                sqlx::query_as::<_, Driver>("SELECT * FROM drivers ORDER BY name, id")
                    .fetch_all(&self.pool)
                    .await?
            }
            Scope::OwnedByDriver(driver_id) => {
                sqlx::query_as::<_, Driver>("SELECT * FROM drivers WHERE id = $1")
                    .bind(driver_id)
                    .fetch_all(&self.pool)
                    .await?
            }
            Scope::OwnedByCustomer(_) | Scope::Nothing => Vec::new(),
        };

        Ok(drivers)
    }

    async fn update_driver(&self, driver: &Driver) -> AppResult<Driver> {
        let updated = sqlx::query_as::<_, Driver>(
            r#"
            UPDATE drivers
            SET name = $2, national_id = $3, license_number = $4, phone = $5, status = $6
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(driver.id)
        .bind(&driver.name)
        .bind(&driver.national_id)
        .bind(&driver.license_number)
        .bind(&driver.phone)
        .bind(driver.status)
        .fetch_optional(&self.pool)
        .await?;

        updated.ok_or_else(|| not_found_error("Driver", &driver.id.to_string()))
    }

    async fn delete_driver(&self, id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM drivers WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(not_found_error("Driver", &id.to_string()));
        }
        Ok(())
    }
}
