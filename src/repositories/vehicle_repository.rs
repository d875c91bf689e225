use async_trait::async_trait;
use uuid::Uuid;

use crate::models::Vehicle;
use crate::repositories::{PgFleetStore, VehicleRepository};
use crate::services::query_scope::Scope;
use crate::utils::errors::{not_found_error, AppResult};

#[async_trait]
impl VehicleRepository for PgFleetStore {
    async fn insert_vehicle(&self, vehicle: &Vehicle) -> AppResult<Vehicle> {
        // El vínculo con conductor solo se crea con bind_vehicle
        let vehicle = sqlx::query_as::<_, Vehicle>(
            r#"
            INSERT INTO vehicles (id, plate, model, vehicle_type, max_capacity, current_odometer, status, driver_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, NULL)
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
        .fetch_one(&self.pool)
        .await?;

        Ok(vehicle)
    }

    async fn find_vehicle(&self, id: Uuid) -> AppResult<Option<Vehicle>> {
        let vehicle = sqlx::query_as::<_, Vehicle>("SELECT * FROM vehicles WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(vehicle)
    }

    async fn find_vehicle_by_driver(&self, driver_id: Uuid) -> AppResult<Option<Vehicle>> {
        let vehicle = sqlx::query_as::<_, Vehicle>("SELECT * FROM vehicles WHERE driver_id = $1")
            .bind(driver_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(vehicle)
    }

    async fn list_vehicles(&self, scope: Scope) -> AppResult<Vec<Vehicle>> {
        if !matches!(scope, Scope::Unrestricted) {
            return Ok(Vec::new());
        }

        let vehicles = sqlx::query_as::<_, Vehicle>("SELECT * FROM vehicles ORDER BY plate")
            .fetch_all(&self.pool)
            .await?;

        Ok(vehicles)
    }

    async fn delete_vehicle(&self, id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM vehicles WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(not_found_error("Vehicle", &id.to_string()));
        }
        Ok(())
    }
}
