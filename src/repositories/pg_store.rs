//! Store PostgreSQL
//!
//! Las consultas por entidad viven en `*_repository.rs`; aquí están el pool y
//! las operaciones transaccionales (vinculación de entregas y vehículos,
//! transiciones de ruta, capacidad del vehículo).
//!
//! Orden de locks: ruta, conductor, vehículo, entrega.

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use tracing::debug;
use uuid::Uuid;

use crate::models::{Delivery, Driver, DriverStatus, Route, RouteStatus, Vehicle};
use crate::repositories::{
    capacity_below_load_error, on_route_error, AssignmentCommit, AssignmentStore, CommitOutcome,
    VehicleBinding,
};
use crate::services::route_lifecycle::{check_route_transition, derived_statuses};
use crate::utils::errors::{not_found_error, AppError, AppResult};

#[derive(Debug, Clone)]
pub struct PgFleetStore {
    pub(crate) pool: PgPool,
}

impl PgFleetStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Fila de ruta bloqueada junto con la de su vehículo
struct LockedRoute {
    driver_id: Uuid,
    status: RouteStatus,
    max_capacity: Decimal,
}

/// Bloquea la ruta y su vehículo; la capacidad no puede cambiar hasta el commit
async fn lock_route(conn: &mut PgConnection, route_id: Uuid) -> AppResult<LockedRoute> {
    let row: Option<(Uuid, RouteStatus, Decimal)> = sqlx::query_as(
        r#"
        SELECT r.driver_id, r.status, v.max_capacity
        FROM routes r
        JOIN vehicles v ON v.id = r.vehicle_id
        WHERE r.id = $1
        FOR UPDATE OF r, v
        "#,
    )
    .bind(route_id)
    .fetch_optional(&mut *conn)
    .await?;

    row.map(|(driver_id, status, max_capacity)| LockedRoute {
        driver_id,
        status,
        max_capacity,
    })
    .ok_or_else(|| not_found_error("Route", &route_id.to_string()))
}

/// Suma real de capacidades vinculadas, opcionalmente excluyendo una entrega
async fn bound_capacity(
    conn: &mut PgConnection,
    route_id: Uuid,
    excluding: Option<Uuid>,
) -> AppResult<Decimal> {
    let total: Decimal = sqlx::query_scalar(
        r#"
        SELECT COALESCE(SUM(capacity_required), 0)
        FROM deliveries
        WHERE route_id = $1 AND ($2::uuid IS NULL OR id <> $2)
        "#,
    )
    .bind(route_id)
    .bind(excluding)
    .fetch_one(&mut *conn)
    .await?;

    Ok(total)
}

async fn store_route_total(conn: &mut PgConnection, route_id: Uuid, total: Decimal) -> AppResult<()> {
    sqlx::query("UPDATE routes SET capacity_total_used = $2 WHERE id = $1")
        .bind(route_id)
        .bind(total)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

#[async_trait]
impl AssignmentStore for PgFleetStore {
    async fn commit_assignment(&self, commit: &AssignmentCommit) -> AppResult<CommitOutcome> {
        let mut tx = self.pool.begin().await?;

        let LockedRoute {
            driver_id,
            status,
            max_capacity,
        } = lock_route(&mut tx, commit.route_id).await?;
        let current = bound_capacity(&mut tx, commit.route_id, None).await?;
        if current != commit.expected_used
            || driver_id != commit.driver_id
            || status == RouteStatus::Completed
        {
            debug!("🔁 Ruta {} cambió desde la planificación ({} != {})", commit.route_id, current, commit.expected_used);
            tx.rollback().await?;
            return Ok(CommitOutcome::Stale);
        }

        let bound = sqlx::query(
            r#"
            UPDATE deliveries
            SET route_id = $1, driver_id = $2
            WHERE id = ANY($3) AND route_id IS NULL
            "#,
        )
        .bind(commit.route_id)
        .bind(driver_id)
        .bind(commit.delivery_ids.as_slice())
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if bound != commit.delivery_ids.len() as u64 {
            debug!("🔁 {} de {} entregas ya no estaban libres", commit.delivery_ids.len() as u64 - bound, commit.delivery_ids.len());
            tx.rollback().await?;
            return Ok(CommitOutcome::Stale);
        }

        let total = bound_capacity(&mut tx, commit.route_id, None).await?;
        if total > max_capacity {
            tx.rollback().await?;
            return Ok(CommitOutcome::Stale);
        }

        store_route_total(&mut tx, commit.route_id, total).await?;
        tx.commit().await?;

        Ok(CommitOutcome::Committed {
            capacity_total_used: total,
        })
    }

    async fn bind_vehicle(&self, driver_id: Uuid, vehicle_id: Option<Uuid>) -> AppResult<VehicleBinding> {
        let mut tx = self.pool.begin().await?;

        let status: Option<DriverStatus> =
            sqlx::query_scalar("SELECT status FROM drivers WHERE id = $1 FOR UPDATE")
                .bind(driver_id)
                .fetch_optional(&mut *tx)
                .await?;
        match status {
            None => return Err(not_found_error("Driver", &driver_id.to_string())),
            Some(DriverStatus::OnRoute) => return Err(on_route_error(driver_id)),
            Some(_) => {}
        }

        if let Some(vehicle_id) = vehicle_id {
            let holder: Option<(Option<Uuid>,)> =
                sqlx::query_as("SELECT driver_id FROM vehicles WHERE id = $1 FOR UPDATE")
                    .bind(vehicle_id)
                    .fetch_optional(&mut *tx)
                    .await?;
            match holder {
                None => return Err(not_found_error("Vehicle", &vehicle_id.to_string())),
                Some((Some(other),)) if other != driver_id => {
                    return Err(AppError::Conflict(format!(
                        "Vehicle {} is already bound to driver {}",
                        vehicle_id, other
                    )));
                }
                Some(_) => {}
            }
        }

        sqlx::query(
            r#"
            UPDATE vehicles SET driver_id = NULL
            WHERE driver_id = $1 AND ($2::uuid IS NULL OR id <> $2)
            "#,
        )
        .bind(driver_id)
        .bind(vehicle_id)
        .execute(&mut *tx)
        .await?;

        let vehicle = match vehicle_id {
            Some(vehicle_id) => Some(
                sqlx::query_as::<_, Vehicle>(
                    "UPDATE vehicles SET driver_id = $1 WHERE id = $2 RETURNING *",
                )
                .bind(driver_id)
                .bind(vehicle_id)
                .fetch_one(&mut *tx)
                .await?,
            ),
            None => None,
        };

        let driver = sqlx::query_as::<_, Driver>(
            "UPDATE drivers SET status = $2 WHERE id = $1 RETURNING *",
        )
        .bind(driver_id)
        .bind(DriverStatus::Available)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(VehicleBinding { driver, vehicle })
    }

    async fn transition_route(&self, route_id: Uuid, next: RouteStatus) -> AppResult<Route> {
        let mut tx = self.pool.begin().await?;

        let route = sqlx::query_as::<_, Route>("SELECT * FROM routes WHERE id = $1 FOR UPDATE")
            .bind(route_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| not_found_error("Route", &route_id.to_string()))?;
        let driver = sqlx::query_as::<_, Driver>("SELECT * FROM drivers WHERE id = $1 FOR UPDATE")
            .bind(route.driver_id)
            .fetch_one(&mut *tx)
            .await?;
        sqlx::query("SELECT id FROM vehicles WHERE id = $1 FOR UPDATE")
            .bind(route.vehicle_id)
            .execute(&mut *tx)
            .await?;

        let active = sqlx::query_as::<_, Route>(
            r#"
            SELECT * FROM routes
            WHERE status = $3 AND (driver_id = $1 OR vehicle_id = $2)
            "#,
        )
        .bind(route.driver_id)
        .bind(route.vehicle_id)
        .bind(RouteStatus::InProgress)
        .fetch_all(&mut *tx)
        .await?;

        check_route_transition(&route, next, &driver, &active)?;
        if route.status == next {
            tx.rollback().await?;
            return Ok(route);
        }

        let updated = sqlx::query_as::<_, Route>(
            "UPDATE routes SET status = $2 WHERE id = $1 RETURNING *",
        )
        .bind(route_id)
        .bind(next)
        .fetch_one(&mut *tx)
        .await?;

        if let Some((driver_status, vehicle_status)) = derived_statuses(next) {
            sqlx::query("UPDATE drivers SET status = $2 WHERE id = $1")
                .bind(route.driver_id)
                .bind(driver_status)
                .execute(&mut *tx)
                .await?;
            sqlx::query("UPDATE vehicles SET status = $2 WHERE id = $1")
                .bind(route.vehicle_id)
                .bind(vehicle_status)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(updated)
    }

    async fn update_vehicle(&self, vehicle: &Vehicle) -> AppResult<Vehicle> {
        let mut tx = self.pool.begin().await?;

        let current: Option<Decimal> =
            sqlx::query_scalar("SELECT max_capacity FROM vehicles WHERE id = $1 FOR UPDATE")
                .bind(vehicle.id)
                .fetch_optional(&mut *tx)
                .await?;
        let current = current.ok_or_else(|| not_found_error("Vehicle", &vehicle.id.to_string()))?;

        // Con el vehículo bloqueado ningún commit puede cargar sus rutas
        if vehicle.max_capacity < current {
            let overloaded: Option<(Uuid, Decimal)> = sqlx::query_as(
                r#"
                SELECT r.id, COALESCE(SUM(d.capacity_required), 0) AS used
                FROM routes r
                LEFT JOIN deliveries d ON d.route_id = r.id
                WHERE r.vehicle_id = $1 AND r.status <> $2
                GROUP BY r.id
                HAVING COALESCE(SUM(d.capacity_required), 0) > $3
                LIMIT 1
                "#,
            )
            .bind(vehicle.id)
            .bind(RouteStatus::Completed)
            .bind(vehicle.max_capacity)
            .fetch_optional(&mut *tx)
            .await?;

            if let Some((route_id, used)) = overloaded {
                return Err(capacity_below_load_error(route_id, used, vehicle.max_capacity));
            }
        }

        let updated = sqlx::query_as::<_, Vehicle>(
            r#"
            UPDATE vehicles
            SET plate = $2, model = $3, vehicle_type = $4, max_capacity = $5,
                current_odometer = $6, status = $7
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(vehicle.id)
        .bind(&vehicle.plate)
        .bind(&vehicle.model)
        .bind(vehicle.vehicle_type)
        .bind(vehicle.max_capacity)
        .bind(vehicle.current_odometer)
        .bind(vehicle.status)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(updated)
    }

    async fn resize_delivery(&self, delivery_id: Uuid, capacity_required: Decimal) -> AppResult<Delivery> {
        let mut tx = self.pool.begin().await?;

        // La ruta se bloquea antes que la entrega, igual que en commit_assignment
        let route_id: Option<Option<Uuid>> =
            sqlx::query_scalar("SELECT route_id FROM deliveries WHERE id = $1")
                .bind(delivery_id)
                .fetch_optional(&mut *tx)
                .await?;
        let route_id = route_id.ok_or_else(|| not_found_error("Delivery", &delivery_id.to_string()))?;

        let max_capacity = match route_id {
            Some(route_id) => Some(lock_route(&mut tx, route_id).await?.max_capacity),
            None => None,
        };

        let delivery = sqlx::query_as::<_, Delivery>("SELECT * FROM deliveries WHERE id = $1 FOR UPDATE")
            .bind(delivery_id)
            .fetch_one(&mut *tx)
            .await?;
        if delivery.route_id != route_id {
            return Err(AppError::Conflict(format!(
                "Delivery {} was reassigned concurrently",
                delivery.tracking_code
            )));
        }

        if let (Some(route_id), Some(max_capacity)) = (route_id, max_capacity) {
            let others = bound_capacity(&mut tx, route_id, Some(delivery_id)).await?;
            if others + capacity_required > max_capacity {
                return Err(AppError::CapacityExceeded {
                    max_capacity,
                    capacity_used: others,
                    capacity_requested: capacity_required,
                    delivery_code: delivery.tracking_code,
                });
            }
        }

        let updated = sqlx::query_as::<_, Delivery>(
            "UPDATE deliveries SET capacity_required = $2 WHERE id = $1 RETURNING *",
        )
        .bind(delivery_id)
        .bind(capacity_required)
        .fetch_one(&mut *tx)
        .await?;

        if let Some(route_id) = route_id {
            let total = bound_capacity(&mut tx, route_id, None).await?;
            store_route_total(&mut tx, route_id, total).await?;
        }

        tx.commit().await?;
        Ok(updated)
    }

    async fn delete_delivery(&self, delivery_id: Uuid) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        let route_id: Option<Option<Uuid>> =
            sqlx::query_scalar("SELECT route_id FROM deliveries WHERE id = $1")
                .bind(delivery_id)
                .fetch_optional(&mut *tx)
                .await?;
        let route_id = route_id.ok_or_else(|| not_found_error("Delivery", &delivery_id.to_string()))?;

        if let Some(route_id) = route_id {
            lock_route(&mut tx, route_id).await?;
        }

        sqlx::query("DELETE FROM deliveries WHERE id = $1")
            .bind(delivery_id)
            .execute(&mut *tx)
            .await?;

        if let Some(route_id) = route_id {
            let total = bound_capacity(&mut tx, route_id, None).await?;
            store_route_total(&mut tx, route_id, total).await?;
        }

        tx.commit().await?;
        Ok(())
    }
}
