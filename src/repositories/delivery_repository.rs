use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::Delivery;
use crate::repositories::{DeliveryRepository, PgFleetStore};
use crate::services::delivery_lifecycle::transition_to_delivered;
use crate::services::query_scope::Scope;
use crate::utils::errors::{not_found_error, AppError, AppResult};

#[async_trait]
impl DeliveryRepository for PgFleetStore {
    async fn insert_delivery(&self, delivery: &Delivery) -> AppResult<Delivery> {
        let delivery = sqlx::query_as::<_, Delivery>(
            r#"
            INSERT INTO deliveries (id, tracking_code, customer_id, route_id, driver_id,
                                    origin_address, destination_address, status, capacity_required,
                                    freight_value, requested_at, expected_delivery_at,
                                    actual_delivery_at, notes)
            VALUES ($1, $2, $3, NULL, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING *
            "#,
        )
        .bind(delivery.id)
        .bind(&delivery.tracking_code)
        .bind(delivery.customer_id)
        .bind(delivery.driver_id)
        .bind(&delivery.origin_address)
        .bind(&delivery.destination_address)
        .bind(delivery.status)
        .bind(delivery.capacity_required)
        .bind(delivery.freight_value)
        .bind(delivery.requested_at)
        .bind(delivery.expected_delivery_at)
        .bind(delivery.actual_delivery_at)
        .bind(&delivery.notes)
        .fetch_one(&self.pool)
        .await?;

        Ok(delivery)
    }

    async fn find_delivery(&self, id: Uuid) -> AppResult<Option<Delivery>> {
        let delivery = sqlx::query_as::<_, Delivery>("SELECT * FROM deliveries WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(delivery)
    }

    async fn find_delivery_by_code(&self, tracking_code: &str) -> AppResult<Option<Delivery>> {
        let delivery =
            sqlx::query_as::<_, Delivery>("SELECT * FROM deliveries WHERE tracking_code = $1")
                .bind(tracking_code)
                .fetch_optional(&self.pool)
                .await?;

        Ok(delivery)
    }

    async fn list_deliveries(&self, scope: Scope) -> AppResult<Vec<Delivery>> {
        let (driver_id, customer_id) = match scope {
            Scope::Unrestricted => (None, None),
            Scope::OwnedByDriver(driver_id) => (Some(driver_id), None),
            Scope::OwnedByCustomer(customer_id) => (None, Some(customer_id)),
            Scope::Nothing => return Ok(Vec::new()),
        };

        let deliveries = sqlx::query_as::<_, Delivery>(
            r#"
            SELECT * FROM deliveries
            WHERE ($1::uuid IS NULL OR driver_id = $1)
              AND ($2::uuid IS NULL OR customer_id = $2)
            ORDER BY requested_at DESC, tracking_code
            "#,
        )
        .bind(driver_id)
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(deliveries)
    }

    async fn list_deliveries_for_route(&self, route_id: Uuid) -> AppResult<Vec<Delivery>> {
        let deliveries = sqlx::query_as::<_, Delivery>(
            "SELECT * FROM deliveries WHERE route_id = $1 ORDER BY tracking_code",
        )
        .bind(route_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(deliveries)
    }

    async fn count_deliveries_for_customer(&self, customer_id: Uuid) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM deliveries WHERE customer_id = $1")
            .bind(customer_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    async fn update_delivery(&self, delivery: &Delivery) -> AppResult<Delivery> {
        let updated = sqlx::query_as::<_, Delivery>(
            r#"
            UPDATE deliveries
            SET customer_id = $2, origin_address = $3, destination_address = $4, status = $5,
                freight_value = $6, expected_delivery_at = $7, actual_delivery_at = $8, notes = $9
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(delivery.id)
        .bind(delivery.customer_id)
        .bind(&delivery.origin_address)
        .bind(&delivery.destination_address)
        .bind(delivery.status)
        .bind(delivery.freight_value)
        .bind(delivery.expected_delivery_at)
        .bind(delivery.actual_delivery_at)
        .bind(&delivery.notes)
        .fetch_optional(&self.pool)
        .await?;

        updated.ok_or_else(|| not_found_error("Delivery", &delivery.id.to_string()))
    }

    async fn mark_delivered(&self, id: Uuid, at: DateTime<Utc>) -> AppResult<Delivery> {
        let updated = sqlx::query_as::<_, Delivery>(
            r#"
            UPDATE deliveries
            SET status = 'delivered', actual_delivery_at = $2
            WHERE id = $1 AND status IN ('pending', 'in_transit')
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(at)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(delivery) = updated {
            return Ok(delivery);
        }

        // Ninguna fila: no existe o ya está en un estado terminal
        let mut current = self
            .find_delivery(id)
            .await?
            .ok_or_else(|| not_found_error("Delivery", &id.to_string()))?;
        transition_to_delivered(&mut current, at)?;
        Err(AppError::Conflict(format!(
            "Delivery {} changed concurrently",
            current.tracking_code
        )))
    }
}
