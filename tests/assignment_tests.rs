mod common;

use common::{Fleet, MAX_RETRIES};
use fleet_logistics::models::route::UpdateRouteRequest;
use fleet_logistics::models::RouteStatus;
use fleet_logistics::utils::errors::AppError;
use rust_decimal::Decimal;
use uuid::Uuid;

#[tokio::test]
async fn capacity_is_enforced_across_batches() {
    let fleet = Fleet::new();
    let (driver, _) = fleet.driver().await;
    let vehicle = fleet.vehicle(500).await;
    let route = fleet.route(driver.id, vehicle.id).await;
    let (customer, _) = fleet.customer().await;
    fleet.delivery(customer.id, "AAAA0300", 300).await;
    fleet.delivery(customer.id, "BBBB0150", 150).await;
    let c = fleet.delivery(customer.id, "CCCC0100", 100).await;

    let used = fleet.assign(route.id, &["AAAA0300", "BBBB0150"]).await.unwrap();
    assert_eq!(used, Decimal::from(450));

    let err = fleet.assign(route.id, &["CCCC0100"]).await.unwrap_err();
    match err {
        AppError::CapacityExceeded {
            max_capacity,
            capacity_used,
            capacity_requested,
            delivery_code,
        } => {
            assert_eq!(max_capacity, Decimal::from(500));
            assert_eq!(capacity_used, Decimal::from(450));
            assert_eq!(capacity_requested, Decimal::from(100));
            assert_eq!(delivery_code, "CCCC0100");
        }
        other => panic!("expected CapacityExceeded, got {:?}", other),
    }

    let route = fleet.routes().get(Some(&fleet.manager), route.id).await.unwrap();
    assert_eq!(route.capacity_total_used, Decimal::from(450));
    let c = fleet.deliveries().get(Some(&fleet.manager), c.id).await.unwrap();
    assert_eq!(c.route_id, None);
}

#[tokio::test]
async fn failed_batch_binds_nothing() {
    let fleet = Fleet::new();
    let (driver, _) = fleet.driver().await;
    let vehicle = fleet.vehicle(200).await;
    let route = fleet.route(driver.id, vehicle.id).await;
    let (customer, _) = fleet.customer().await;
    let first = fleet.delivery(customer.id, "FIRST001", 120).await;
    fleet.delivery(customer.id, "SECOND01", 120).await;

    assert!(fleet.assign(route.id, &["FIRST001", "SECOND01"]).await.is_err());

    let first = fleet.deliveries().get(Some(&fleet.manager), first.id).await.unwrap();
    assert_eq!(first.route_id, None);
    assert_eq!(first.driver_id, None);
    let route = fleet.routes().get(Some(&fleet.manager), route.id).await.unwrap();
    assert_eq!(route.capacity_total_used, Decimal::ZERO);
}

#[tokio::test]
async fn unknown_code_aborts_the_batch() {
    let fleet = Fleet::new();
    let (driver, _) = fleet.driver().await;
    let vehicle = fleet.vehicle(500).await;
    let route = fleet.route(driver.id, vehicle.id).await;
    let (customer, _) = fleet.customer().await;
    let known = fleet.delivery(customer.id, "KNOWN001", 10).await;

    let err = fleet.assign(route.id, &["KNOWN001", "MISSING1"]).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
    let known = fleet.deliveries().get(Some(&fleet.manager), known.id).await.unwrap();
    assert_eq!(known.route_id, None);
}

#[tokio::test]
async fn delivery_on_another_route_is_a_conflict() {
    let fleet = Fleet::new();
    let (driver_a, _) = fleet.driver().await;
    let (driver_b, _) = fleet.driver().await;
    let route_a = fleet.route(driver_a.id, fleet.vehicle(500).await.id).await;
    let route_b = fleet.route(driver_b.id, fleet.vehicle(500).await.id).await;
    let (customer, _) = fleet.customer().await;
    fleet.delivery(customer.id, "SHARED01", 10).await;

    fleet.assign(route_a.id, &["SHARED01"]).await.unwrap();
    let err = fleet.assign(route_b.id, &["SHARED01"]).await.unwrap_err();
    match err {
        AppError::Conflict(message) => {
            assert!(message.contains("SHARED01"));
            assert!(message.contains(&route_a.id.to_string()));
        }
        other => panic!("expected Conflict, got {:?}", other),
    }
}

#[tokio::test]
async fn assignment_copies_route_driver_and_reassigning_is_a_no_op() {
    let fleet = Fleet::new();
    let (driver, _) = fleet.driver().await;
    let route = fleet.route(driver.id, fleet.vehicle(100).await.id).await;
    let (customer, _) = fleet.customer().await;
    let delivery = fleet.delivery(customer.id, "REPEAT01", 60).await;

    fleet.assign(route.id, &["REPEAT01"]).await.unwrap();
    let used = fleet.assign(route.id, &["REPEAT01"]).await.unwrap();
    assert_eq!(used, Decimal::from(60));

    let delivery = fleet.deliveries().get(Some(&fleet.manager), delivery.id).await.unwrap();
    assert_eq!(delivery.route_id, Some(route.id));
    assert_eq!(delivery.driver_id, Some(driver.id));
}

#[tokio::test]
async fn drivers_cannot_assign_deliveries() {
    let fleet = Fleet::new();
    let (driver, driver_actor) = fleet.driver().await;
    let route = fleet.route(driver.id, fleet.vehicle(100).await.id).await;
    let (customer, _) = fleet.customer().await;
    fleet.delivery(customer.id, "DRV00001", 10).await;

    let request = fleet_logistics::dto::AssignDeliveriesRequest {
        tracking_codes: vec!["DRV00001".to_string()],
    };
    let err = fleet
        .routes()
        .assign_deliveries(Some(&driver_actor), route.id, request, MAX_RETRIES)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
}

#[tokio::test]
async fn empty_batch_is_a_validation_error() {
    let fleet = Fleet::new();
    let (driver, _) = fleet.driver().await;
    let route = fleet.route(driver.id, fleet.vehicle(100).await.id).await;
    let err = fleet.assign(route.id, &[]).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_batches_never_overshoot_capacity() {
    let fleet = Fleet::new();
    let (driver, _) = fleet.driver().await;
    let route = fleet.route(driver.id, fleet.vehicle(500).await.id).await;
    let (customer, _) = fleet.customer().await;

    let mut codes = Vec::new();
    for i in 0..10 {
        let code = format!("PAR{:05}", i);
        fleet.delivery(customer.id, &code, 100).await;
        codes.push(code);
    }

    let route_id = route.id;
    let mut handles = Vec::new();
    for code in codes {
        let store = fleet.store.clone();
        let manager = fleet.manager;
        handles.push(tokio::spawn(async move {
            let request = fleet_logistics::dto::AssignDeliveriesRequest {
                tracking_codes: vec![code],
            };
            fleet_logistics::controllers::RouteController::new(store)
                .assign_deliveries(Some(&manager), route_id, request, 10)
                .await
        }));
    }

    let mut committed = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => committed += 1,
            Err(AppError::CapacityExceeded { .. }) => {}
            Err(other) => panic!("unexpected error: {:?}", other),
        }
    }
    assert_eq!(committed, 5);

    let dashboard = fleet.routes().dashboard(Some(&fleet.manager), route.id).await.unwrap();
    assert_eq!(dashboard.route.capacity_total_used, Decimal::from(500));
    assert_eq!(dashboard.progress.total, 5);
}

#[tokio::test]
async fn completed_route_cannot_be_deleted_or_receive_deliveries() {
    let fleet = Fleet::new();
    let (driver, _) = fleet.driver().await;
    let route = fleet.route(driver.id, fleet.vehicle(100).await.id).await;
    let (customer, _) = fleet.customer().await;
    fleet.delivery(customer.id, "LATE0001", 10).await;

    for status in [RouteStatus::InProgress, RouteStatus::Completed] {
        let request = UpdateRouteRequest {
            status: Some(status),
            ..Default::default()
        };
        fleet
            .routes()
            .update(Some(&fleet.manager), route.id, request)
            .await
            .unwrap();
    }

    let err = fleet.routes().delete(Some(&fleet.manager), route.id).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
    assert!(fleet.routes().get(Some(&fleet.manager), route.id).await.is_ok());

    let err = fleet.assign(route.id, &["LATE0001"]).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)));
}

#[tokio::test]
async fn unknown_route_is_not_found() {
    let fleet = Fleet::new();
    let err = fleet.assign(Uuid::new_v4(), &["NOPE0001"]).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}
