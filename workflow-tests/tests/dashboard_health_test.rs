//! Health aggregation and dashboard fan-out across mixed backend states.

use collab_engine::CollaborationScope;
use serde_json::{Value, json};
use workflow_tests::{
    GatewayBackends, TestGateway, data_backend, degraded_backend, spawn_backend,
};

#[tokio::test]
async fn liveness_answers_without_probing_backends() {
    let gateway = TestGateway::spawn(
        GatewayBackends::default(),
        CollaborationScope::WithinOrganization,
    )
    .await;

    let response = gateway.client.get(gateway.url("/health")).send().await.unwrap();
    assert_eq!(response.status().as_u16(), 200);
}

#[tokio::test]
async fn aggregate_health_reports_each_backend_state() {
    let projects = spawn_backend(data_backend(json!([]))).await;
    let activity = spawn_backend(degraded_backend(500)).await;
    let performance = spawn_backend(data_backend(json!([]))).await;
    // Labs stays at the default unreachable URL.

    let gateway = TestGateway::spawn(
        GatewayBackends {
            projects: projects.url(),
            activity: activity.url(),
            performance: performance.url(),
            ..GatewayBackends::default()
        },
        CollaborationScope::WithinOrganization,
    )
    .await;

    let response = gateway
        .client
        .get(gateway.url("/api/v1/health"))
        .send()
        .await
        .unwrap();
    // The endpoint itself succeeds regardless of backend trouble.
    assert_eq!(response.status().as_u16(), 200);

    let report: Value = response.json().await.unwrap();
    assert_eq!(report["gateway"].as_str().unwrap(), "healthy");
    assert_eq!(report["projects"]["state"].as_str().unwrap(), "healthy");
    assert_eq!(report["activity"]["state"].as_str().unwrap(), "degraded");
    assert_eq!(report["performance"]["state"].as_str().unwrap(), "healthy");
    assert_eq!(report["labs"]["state"].as_str().unwrap(), "unreachable");
}

#[tokio::test]
async fn one_failing_probe_degrades_exactly_that_backend() {
    let projects = spawn_backend(data_backend(json!([]))).await;
    let activity = spawn_backend(degraded_backend(500)).await;
    let performance = spawn_backend(data_backend(json!([]))).await;
    let labs = spawn_backend(data_backend(json!([]))).await;

    let gateway = TestGateway::spawn(
        GatewayBackends {
            projects: projects.url(),
            activity: activity.url(),
            performance: performance.url(),
            labs: labs.url(),
        },
        CollaborationScope::WithinOrganization,
    )
    .await;

    let report: Value = gateway
        .client
        .get(gateway.url("/api/v1/health"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(report["activity"]["state"].as_str().unwrap(), "degraded");
    for backend in ["projects", "performance", "labs"] {
        assert_eq!(report[backend]["state"].as_str().unwrap(), "healthy");
    }
}

#[tokio::test]
async fn dashboard_degrades_per_section() {
    let projects = spawn_backend(data_backend(json!([{ "id": "p1" }]))).await;

    let gateway = TestGateway::spawn(
        GatewayBackends {
            projects: projects.url(),
            ..GatewayBackends::default()
        },
        CollaborationScope::WithinOrganization,
    )
    .await;

    let registered = gateway.register("alice@example.com", "Alice").await;
    let token = registered["token"].as_str().unwrap();

    let response = gateway.get("/api/v1/dashboard", token).await;
    assert_eq!(response.status().as_u16(), 200);

    let view: Value = response.json().await.unwrap();
    assert_eq!(view["projects"]["data"], json!([{ "id": "p1" }]));
    assert!(view["projects"].get("error").is_none());

    // Failed branches keep their slot, with null data and an error marker.
    for section in ["activity", "performance", "labs"] {
        assert!(view[section]["data"].is_null(), "{} should be empty", section);
        assert!(view[section]["error"].is_string(), "{} should carry its error", section);
    }
}

#[tokio::test]
async fn dashboard_with_every_backend_down_is_unavailable() {
    let gateway = TestGateway::spawn(
        GatewayBackends::default(),
        CollaborationScope::WithinOrganization,
    )
    .await;

    let registered = gateway.register("bob@example.com", "Bob").await;
    let token = registered["token"].as_str().unwrap();

    let response = gateway.get("/api/v1/dashboard", token).await;
    assert_eq!(response.status().as_u16(), 503);
}

#[tokio::test]
async fn dashboard_shape_is_independent_of_which_backends_fail() {
    // Same failing subset, two runs: identical successful sections.
    let projects = spawn_backend(data_backend(json!({ "total": 3 }))).await;
    let labs = spawn_backend(data_backend(json!([{ "id": "lab-1" }]))).await;

    let gateway = TestGateway::spawn(
        GatewayBackends {
            projects: projects.url(),
            labs: labs.url(),
            ..GatewayBackends::default()
        },
        CollaborationScope::WithinOrganization,
    )
    .await;

    let registered = gateway.register("carol@example.com", "Carol").await;
    let token = registered["token"].as_str().unwrap();

    let first: Value = gateway.get("/api/v1/dashboard", token).await.json().await.unwrap();
    let second: Value = gateway.get("/api/v1/dashboard", token).await.json().await.unwrap();

    assert_eq!(first["projects"], second["projects"]);
    assert_eq!(first["labs"], second["labs"]);
    assert_eq!(first["projects"]["data"], json!({ "total": 3 }));
    assert_eq!(first["labs"]["data"], json!([{ "id": "lab-1" }]));
}
