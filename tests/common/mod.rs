#![allow(dead_code)]

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use fleet_logistics::controllers::{
    CustomerController, DeliveryController, DriverController, RouteController, VehicleController,
};
use fleet_logistics::models::customer::{CreateCustomerRequest, CustomerResponse};
use fleet_logistics::models::delivery::{CreateDeliveryRequest, DeliveryResponse};
use fleet_logistics::models::driver::{CreateDriverRequest, DriverResponse};
use fleet_logistics::models::route::{CreateRouteRequest, RouteResponse};
use fleet_logistics::models::vehicle::{CreateVehicleRequest, VehicleResponse};
use fleet_logistics::models::Actor;
use fleet_logistics::repositories::{FleetStore, MemoryFleetStore};
use rust_decimal::Decimal;
use uuid::Uuid;

pub const MAX_RETRIES: u32 = 3;

static SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next() -> u64 {
    SEQUENCE.fetch_add(1, Ordering::SeqCst)
}

/// Store en memoria con un gestor y helpers para poblarlo
pub struct Fleet {
    pub store: Arc<dyn FleetStore>,
    pub manager: Actor,
}

impl Fleet {
    pub fn new() -> Self {
        Self {
            store: Arc::new(MemoryFleetStore::new()),
            manager: Actor::Manager { user_id: Uuid::new_v4() },
        }
    }

    pub fn drivers(&self) -> DriverController {
        DriverController::new(self.store.clone())
    }

    pub fn vehicles(&self) -> VehicleController {
        VehicleController::new(self.store.clone())
    }

    pub fn customers(&self) -> CustomerController {
        CustomerController::new(self.store.clone())
    }

    pub fn routes(&self) -> RouteController {
        RouteController::new(self.store.clone())
    }

    pub fn deliveries(&self) -> DeliveryController {
        DeliveryController::new(self.store.clone())
    }

    /// Conductor nuevo y su actor autenticado
    pub async fn driver(&self) -> (DriverResponse, Actor) {
        let n = next();
        let user_id = Uuid::new_v4();
        let request = CreateDriverRequest {
            user_id,
            name: format!("Conductor {}", n),
            national_id: format!("{:011}", n),
            license_number: format!("{:09}", n),
            phone: "61912345678".to_string(),
            status: None,
        };
        let driver = self
            .drivers()
            .create(Some(&self.manager), request)
            .await
            .unwrap()
            .data
            .unwrap();
        let actor = Actor::Driver { user_id, driver_id: driver.id };
        (driver, actor)
    }

    pub async fn vehicle(&self, max_capacity: i64) -> VehicleResponse {
        let request = CreateVehicleRequest {
            plate: format!("TST{:04}", next() % 10_000),
            model: "Sprinter".to_string(),
            vehicle_type: None,
            max_capacity: Decimal::from(max_capacity),
            current_odometer: None,
            status: None,
        };
        self.vehicles()
            .create(Some(&self.manager), request)
            .await
            .unwrap()
            .data
            .unwrap()
    }

    pub async fn customer(&self) -> (CustomerResponse, Actor) {
        let user_id = Uuid::new_v4();
        let request = CreateCustomerRequest {
            user_id,
            name: format!("Cliente {}", next()),
            address: "Rua das Flores, 100".to_string(),
            phone: "6133334444".to_string(),
        };
        let customer = self
            .customers()
            .create(Some(&self.manager), request)
            .await
            .unwrap()
            .data
            .unwrap();
        let actor = Actor::Customer { user_id, customer_id: customer.id };
        (customer, actor)
    }

    pub async fn route(&self, driver_id: Uuid, vehicle_id: Uuid) -> RouteResponse {
        let request = CreateRouteRequest {
            name: format!("Ruta {}", next()),
            description: None,
            driver_id,
            vehicle_id,
            scheduled_date: None,
            estimated_km: None,
            estimated_minutes: None,
        };
        self.routes()
            .create(Some(&self.manager), request)
            .await
            .unwrap()
            .data
            .unwrap()
    }

    pub async fn delivery(&self, customer_id: Uuid, code: &str, capacity: i64) -> DeliveryResponse {
        let request = CreateDeliveryRequest {
            tracking_code: Some(code.to_string()),
            customer_id: Some(customer_id),
            origin_address: Some("Depósito Central".to_string()),
            destination_address: Some(format!("Destino {}", code)),
            capacity_required: Some(Decimal::from(capacity)),
            ..Default::default()
        };
        self.deliveries()
            .create(Some(&self.manager), request)
            .await
            .unwrap()
            .data
            .unwrap()
    }

    /// Vincula los códigos a la ruta como gestor
    pub async fn assign(&self, route_id: Uuid, codes: &[&str]) -> fleet_logistics::utils::errors::AppResult<Decimal> {
        let request = fleet_logistics::dto::AssignDeliveriesRequest {
            tracking_codes: codes.iter().map(|c| c.to_string()).collect(),
        };
        self.routes()
            .assign_deliveries(Some(&self.manager), route_id, request, MAX_RETRIES)
            .await
            .map(|response| response.data.unwrap().capacity_total_used)
    }
}
