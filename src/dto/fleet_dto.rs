use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::driver::DriverResponse;
use crate::models::vehicle::VehicleResponse;
use crate::models::{
    Delivery, DeliveryStatus, Driver, DriverStatus, Route, RouteStatus, Vehicle, VehicleStatus,
};
use crate::repositories::VehicleBinding;

// Request para vincular entregas a una ruta, en orden
#[derive(Debug, Clone, Deserialize)]
pub struct AssignDeliveriesRequest {
    pub tracking_codes: Vec<String>,
}

// Request para vincular vehículo; `null` o ausente desvincula
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BindVehicleRequest {
    pub vehicle_id: Option<Uuid>,
}

/// Conductor junto con el vehículo que opera
#[derive(Debug, Clone, Serialize)]
pub struct DriverDetail {
    #[serde(flatten)]
    pub driver: DriverResponse,
    pub vehicle: Option<VehicleResponse>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BindVehicleResponse {
    pub driver: DriverResponse,
    pub vehicle: Option<VehicleResponse>,
}

impl From<VehicleBinding> for BindVehicleResponse {
    fn from(binding: VehicleBinding) -> Self {
        Self {
            driver: binding.driver.into(),
            vehicle: binding.vehicle.map(Into::into),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardRoute {
    pub id: Uuid,
    pub name: String,
    pub status: RouteStatus,
    pub scheduled_date: NaiveDate,
    pub capacity_total_used: Decimal,
    pub estimated_km: Option<Decimal>,
    pub estimated_minutes: Option<i32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardDriver {
    pub id: Uuid,
    pub name: String,
    pub phone: String,
    pub status: DriverStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardVehicle {
    pub id: Uuid,
    pub plate: String,
    pub model: String,
    pub max_capacity: Decimal,
    pub status: VehicleStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DeliveryProgress {
    pub total: usize,
    pub completed: usize,
    /// Entregas aún no terminales (pending + in_transit)
    pub pending: usize,
    pub cancelled: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardDelivery {
    pub tracking_code: String,
    pub destination_address: String,
    pub status: DeliveryStatus,
}

/// Vista agregada de una ruta
#[derive(Debug, Clone, Serialize)]
pub struct RouteDashboard {
    pub route: DashboardRoute,
    pub driver: DashboardDriver,
    pub vehicle: DashboardVehicle,
    pub progress: DeliveryProgress,
    pub deliveries: Vec<DashboardDelivery>,
}

impl RouteDashboard {
    pub fn build(route: Route, driver: Driver, vehicle: Vehicle, deliveries: Vec<Delivery>) -> Self {
        let mut progress = DeliveryProgress {
            total: deliveries.len(),
            ..Default::default()
        };
        for delivery in &deliveries {
            match delivery.status {
                DeliveryStatus::Delivered => progress.completed += 1,
                DeliveryStatus::Cancelled => progress.cancelled += 1,
                DeliveryStatus::Pending | DeliveryStatus::InTransit => progress.pending += 1,
            }
        }

        Self {
            route: DashboardRoute {
                id: route.id,
                name: route.name,
                status: route.status,
                scheduled_date: route.scheduled_date,
                capacity_total_used: route.capacity_total_used,
                estimated_km: route.estimated_km,
                estimated_minutes: route.estimated_minutes,
            },
            driver: DashboardDriver {
                id: driver.id,
                name: driver.name,
                phone: driver.phone,
                status: driver.status,
            },
            vehicle: DashboardVehicle {
                id: vehicle.id,
                plate: vehicle.plate,
                model: vehicle.model,
                max_capacity: vehicle.max_capacity,
                status: vehicle.status,
            },
            progress,
            deliveries: deliveries
                .into_iter()
                .map(|d| DashboardDelivery {
                    tracking_code: d.tracking_code,
                    destination_address: d.destination_address,
                    status: d.status,
                })
                .collect(),
        }
    }
}

/// Vista pública de rastreo de una entrega
#[derive(Debug, Clone, Serialize)]
pub struct TrackingResponse {
    pub tracking_code: String,
    pub status: DeliveryStatus,
    pub expected_delivery_at: Option<DateTime<Utc>>,
    pub actual_delivery_at: Option<DateTime<Utc>>,
    pub origin_address: String,
    pub destination_address: String,
}

impl From<Delivery> for TrackingResponse {
    fn from(delivery: Delivery) -> Self {
        Self {
            tracking_code: delivery.tracking_code,
            status: delivery.status,
            expected_delivery_at: delivery.expected_delivery_at,
            actual_delivery_at: delivery.actual_delivery_at,
            origin_address: delivery.origin_address,
            destination_address: delivery.destination_address,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::VehicleType;

    fn delivery(code: &str, status: DeliveryStatus) -> Delivery {
        Delivery {
            id: Uuid::new_v4(),
            tracking_code: code.to_string(),
            customer_id: Uuid::new_v4(),
            route_id: None,
            driver_id: None,
            origin_address: "Depósito".to_string(),
            destination_address: format!("Destino {}", code),
            status,
            capacity_required: Decimal::from(10),
            freight_value: Decimal::ZERO,
            requested_at: Utc::now(),
            expected_delivery_at: None,
            actual_delivery_at: None,
            notes: None,
        }
    }

    #[test]
    fn dashboard_counts_progress() {
        let driver = Driver {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            name: "Carlos Lima".to_string(),
            national_id: "11122233344".to_string(),
            license_number: "1112223334".to_string(),
            phone: "61911112222".to_string(),
            status: DriverStatus::OnRoute,
            registered_at: Utc::now(),
        };
        let vehicle = Vehicle {
            id: Uuid::new_v4(),
            plate: "ABC1D23".to_string(),
            model: "Sprinter".to_string(),
            vehicle_type: VehicleType::Van,
            max_capacity: Decimal::from(500),
            current_odometer: Decimal::ZERO,
            status: VehicleStatus::InUse,
            driver_id: Some(driver.id),
        };
        let route = Route {
            id: Uuid::new_v4(),
            name: "Norte".to_string(),
            description: None,
            driver_id: driver.id,
            vehicle_id: vehicle.id,
            status: RouteStatus::InProgress,
            scheduled_date: Utc::now().date_naive(),
            capacity_total_used: Decimal::from(40),
            estimated_km: None,
            estimated_minutes: Some(90),
            created_at: Utc::now(),
        };

        let dashboard = RouteDashboard::build(
            route,
            driver,
            vehicle,
            vec![
                delivery("AAAA0001", DeliveryStatus::Delivered),
                delivery("BBBB0002", DeliveryStatus::InTransit),
                delivery("CCCC0003", DeliveryStatus::Pending),
                delivery("DDDD0004", DeliveryStatus::Cancelled),
            ],
        );

        assert_eq!(
            dashboard.progress,
            DeliveryProgress {
                total: 4,
                completed: 1,
                pending: 2,
                cancelled: 1,
            }
        );
        assert_eq!(dashboard.deliveries[1].destination_address, "Destino BBBB0002");
    }
}
