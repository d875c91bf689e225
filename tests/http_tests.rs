mod common;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use chrono::Duration;
use common::Fleet;
use fleet_logistics::config::EnvironmentConfig;
use fleet_logistics::models::Actor;
use fleet_logistics::utils::jwt::generate_token;
use fleet_logistics::{create_app, AppState};
use serde_json::{json, Value};
use tower::ServiceExt;

const SECRET: &str = "http-test-secret";

fn app(fleet: &Fleet) -> Router {
    let config = EnvironmentConfig::from_lookup(|key| match key {
        "JWT_SECRET" => Some(SECRET.to_string()),
        "STORE_BACKEND" => Some("memory".to_string()),
        _ => None,
    })
    .unwrap();
    create_app(AppState::new(fleet.store.clone(), config))
}

fn token(actor: &Actor) -> String {
    generate_token(actor, SECRET, Duration::hours(1)).unwrap()
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    actor: Option<&Actor>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(actor) = actor {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token(actor)));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

#[tokio::test]
async fn health_is_public() {
    let fleet = Fleet::new();
    let (status, body) = send(&app(&fleet), Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn api_requires_a_bearer_token() {
    let fleet = Fleet::new();
    let app = app(&fleet);

    let (status, body) = send(&app, Method::GET, "/api/deliveries", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHENTICATED");

    let request = Request::builder()
        .uri("/api/deliveries")
        .header(header::AUTHORIZATION, "Bearer not-a-jwt")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn manager_creates_vehicle_and_driver_cannot() {
    let fleet = Fleet::new();
    let app = app(&fleet);
    let (_, driver_actor) = fleet.driver().await;
    let payload = json!({
        "plate": "QWE1R23",
        "model": "Daily 35S",
        "vehicle_type": "van",
        "max_capacity": 800
    });

    let (status, body) = send(&app, Method::POST, "/api/vehicles", Some(&fleet.manager), Some(payload.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["plate"], "QWE1R23");
    assert!(body["data"]["driver_id"].is_null());

    let (status, body) = send(&app, Method::POST, "/api/vehicles", Some(&driver_actor), Some(payload)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");
}

#[tokio::test]
async fn malformed_plate_is_a_validation_error() {
    let fleet = Fleet::new();
    let payload = json!({ "plate": "ab-12", "model": "Fiorino", "max_capacity": 300 });
    let (status, body) = send(&app(&fleet), Method::POST, "/api/vehicles", Some(&fleet.manager), Some(payload)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn over_capacity_batch_reports_limits() {
    let fleet = Fleet::new();
    let app = app(&fleet);
    let (driver, _) = fleet.driver().await;
    let route = fleet.route(driver.id, fleet.vehicle(500).await.id).await;
    let (customer, _) = fleet.customer().await;
    fleet.delivery(customer.id, "HTTP0300", 300).await;
    fleet.delivery(customer.id, "HTTP0150", 150).await;
    fleet.delivery(customer.id, "HTTP0100", 100).await;
    let uri = format!("/api/routes/{}/deliveries", route.id);

    let (status, body) = send(
        &app,
        Method::POST,
        &uri,
        Some(&fleet.manager),
        Some(json!({ "tracking_codes": ["HTTP0300", "HTTP0150"] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["assigned"], json!(["HTTP0300", "HTTP0150"]));

    let (status, body) = send(
        &app,
        Method::POST,
        &uri,
        Some(&fleet.manager),
        Some(json!({ "tracking_codes": ["HTTP0100"] })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "CAPACITY_EXCEEDED");
    assert_eq!(body["details"]["delivery_code"], "HTTP0100");
    assert_eq!(body["details"]["max_capacity"], "500");
    assert_eq!(body["details"]["capacity_used"], "450");
}

#[tokio::test]
async fn customer_tracks_own_delivery_only() {
    let fleet = Fleet::new();
    let app = app(&fleet);
    let (mine, customer_actor) = fleet.customer().await;
    let (theirs, _) = fleet.customer().await;
    fleet.delivery(mine.id, "TRACK001", 5).await;
    let other = fleet.delivery(theirs.id, "TRACK002", 5).await;

    let (status, body) = send(&app, Method::GET, "/api/tracking/TRACK001", Some(&customer_actor), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "pending");
    assert_eq!(body["destination_address"], "Destino TRACK001");

    let (status, _) = send(&app, Method::GET, "/api/tracking/TRACK002", Some(&customer_actor), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let uri = format!("/api/deliveries/{}", other.id);
    let (status, _) = send(&app, Method::GET, &uri, Some(&customer_actor), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn driver_marks_delivery_and_dashboard_reflects_it() {
    let fleet = Fleet::new();
    let app = app(&fleet);
    let (driver, driver_actor) = fleet.driver().await;
    let route = fleet.route(driver.id, fleet.vehicle(100).await.id).await;
    let (customer, _) = fleet.customer().await;
    let done = fleet.delivery(customer.id, "DASH0001", 10).await;
    fleet.delivery(customer.id, "DASH0002", 10).await;
    fleet.assign(route.id, &["DASH0001", "DASH0002"]).await.unwrap();

    let uri = format!("/api/deliveries/{}/delivered", done.id);
    let (status, body) = send(&app, Method::POST, &uri, Some(&driver_actor), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "delivered");

    let (status, _) = send(&app, Method::POST, &uri, Some(&driver_actor), None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let uri = format!("/api/routes/{}/dashboard", route.id);
    let (status, body) = send(&app, Method::GET, &uri, Some(&driver_actor), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["progress"], json!({ "total": 2, "completed": 1, "pending": 1, "cancelled": 0 }));
    assert_eq!(body["deliveries"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn route_list_applies_filters_on_top_of_scope() {
    let fleet = Fleet::new();
    let app = app(&fleet);
    let (d1, d1_actor) = fleet.driver().await;
    let (d2, _) = fleet.driver().await;
    let r1 = fleet.route(d1.id, fleet.vehicle(100).await.id).await;
    fleet.route(d2.id, fleet.vehicle(100).await.id).await;

    let (status, body) = send(&app, Method::GET, "/api/routes?status=planned", Some(&fleet.manager), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);

    let uri = format!("/api/routes?driver_id={}", d2.id);
    let (_, body) = send(&app, Method::GET, &uri, Some(&d1_actor), None).await;
    assert!(body.as_array().unwrap().is_empty());

    let (_, body) = send(&app, Method::GET, "/api/routes", Some(&d1_actor), None).await;
    assert_eq!(body[0]["id"], r1.id.to_string());

    let (status, _) = send(&app, Method::GET, "/api/routes?status=in_progress", Some(&d1_actor), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn binding_endpoint_rejects_vehicle_of_another_driver() {
    let fleet = Fleet::new();
    let app = app(&fleet);
    let (d1, _) = fleet.driver().await;
    let (d2, _) = fleet.driver().await;
    let vehicle = fleet.vehicle(500).await;

    let body = json!({ "vehicle_id": vehicle.id });
    let (status, _) = send(&app, Method::PATCH, &format!("/api/drivers/{}/vehicle", d1.id), Some(&fleet.manager), Some(body.clone())).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, Method::PATCH, &format!("/api/drivers/{}/vehicle", d2.id), Some(&fleet.manager), Some(body)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "CONFLICT");
}

#[tokio::test]
async fn delete_responses_carry_a_confirmation_message() {
    let fleet = Fleet::new();
    let app = app(&fleet);
    let vehicle = fleet.vehicle(100).await;
    let (customer, _) = fleet.customer().await;

    let uri = format!("/api/vehicles/{}", vehicle.id);
    let (status, body) = send(&app, Method::DELETE, &uri, Some(&fleet.manager), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Vehicle deleted successfully");

    let uri = format!("/api/customers/{}", customer.id);
    let (_, body) = send(&app, Method::DELETE, &uri, Some(&fleet.manager), None).await;
    assert_eq!(body["message"], "Customer deleted successfully");
}
