use async_trait::async_trait;
use uuid::Uuid;

use crate::models::route::RouteFilters;
use crate::models::{Route, RouteStatus};
use crate::repositories::{PgFleetStore, RouteRepository};
use crate::services::query_scope::Scope;
use crate::services::route_lifecycle::check_route_deletable;
use crate::utils::errors::{not_found_error, AppResult};

#[async_trait]
impl RouteRepository for PgFleetStore {
    async fn insert_route(&self, route: &Route) -> AppResult<Route> {
        let route = sqlx::query_as::<_, Route>(
            r#"
            INSERT INTO routes (id, name, description, driver_id, vehicle_id, status, scheduled_date,
                                capacity_total_used, estimated_km, estimated_minutes, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, 0, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(route.id)
        .bind(&route.name)
        .bind(&route.description)
        .bind(route.driver_id)
        .bind(route.vehicle_id)
        .bind(route.status)
        .bind(route.scheduled_date)
        .bind(route.estimated_km)
        .bind(route.estimated_minutes)
        .bind(route.created_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(route)
    }

    async fn find_route(&self, id: Uuid) -> AppResult<Option<Route>> {
        let route = sqlx::query_as::<_, Route>("SELECT * FROM routes WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(route)
    }

    async fn list_routes(&self, scope: Scope, filters: &RouteFilters) -> AppResult<Vec<Route>> {
        let owner = match scope {
            Scope::Unrestricted => None,
            Scope::OwnedByDriver(driver_id) => Some(driver_id),
            Scope::OwnedByCustomer(_) | Scope::Nothing => return Ok(Vec::new()),
        };

        let routes = sqlx::query_as::<_, Route>(
            r#"
            SELECT * FROM routes
            WHERE ($1::uuid IS NULL OR driver_id = $1)
              AND ($2::route_status IS NULL OR status = $2)
              AND ($3::uuid IS NULL OR driver_id = $3)
              AND ($4::date IS NULL OR scheduled_date = $4)
            ORDER BY scheduled_date DESC, created_at DESC
            "#,
        )
        .bind(owner)
        .bind(filters.status)
        .bind(filters.driver_id)
        .bind(filters.scheduled_date)
        .fetch_all(&self.pool)
        .await?;

        Ok(routes)
    }

    async fn list_routes_for_vehicle(&self, vehicle_id: Uuid) -> AppResult<Vec<Route>> {
        let routes = sqlx::query_as::<_, Route>("SELECT * FROM routes WHERE vehicle_id = $1")
            .bind(vehicle_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(routes)
    }

    async fn update_route(&self, route: &Route) -> AppResult<Route> {
        let updated = sqlx::query_as::<_, Route>(
            r#"
            UPDATE routes
            SET name = $2, description = $3, scheduled_date = $4,
                estimated_km = $5, estimated_minutes = $6
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(route.id)
        .bind(&route.name)
        .bind(&route.description)
        .bind(route.scheduled_date)
        .bind(route.estimated_km)
        .bind(route.estimated_minutes)
        .fetch_optional(&self.pool)
        .await?;

        updated.ok_or_else(|| not_found_error("Route", &route.id.to_string()))
    }

    async fn delete_route(&self, id: Uuid) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        let status: Option<RouteStatus> =
            sqlx::query_scalar("SELECT status FROM routes WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        let status = status.ok_or_else(|| not_found_error("Route", &id.to_string()))?;
        check_route_deletable(status)?;

        // Las entregas vuelven a quedar libres
        sqlx::query("UPDATE deliveries SET route_id = NULL, driver_id = NULL WHERE route_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM routes WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}
