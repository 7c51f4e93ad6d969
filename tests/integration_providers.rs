mod common;

use axum::http::StatusCode;
use common::{register_user, send, set_role, setup_test_app};
use serde_json::json;
use spay::spay_models::GlobalRole;
use sqlx::PgPool;

#[sqlx::test(migrations = "./migrations")]
async fn test_only_managers_register_providers(pool: PgPool) {
    let app = setup_test_app(pool.clone());
    let merchant = register_user(&app).await;
    let manager = register_user(&app).await;
    set_role(&pool, &manager, GlobalRole::Manager).await;

    let body = json!({
        "name": "Orange Money",
        "description": "Mobile money",
        "asynchrone_mode": true,
        "pay_url": "https://api.orange.test/pay",
        "support_country": ["civ", "sen"]
    });

    let (status, _) = send(&app, "POST", "/api/providers", Some(&merchant.token), Some(body.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, created) = send(&app, "POST", "/api/providers", Some(&manager.token), Some(body.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["data"]["provider"]["name_slug"], "orange-money");
    assert_eq!(created["data"]["provider"]["asynchrone_mode"], true);
    assert_eq!(created["data"]["provider"]["support_country"], json!(["civ", "sen"]));

    let (status, conflict) = send(&app, "POST", "/api/providers", Some(&manager.token), Some(body)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(conflict["message"], "provider already exists");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_provider_urls_are_validated(pool: PgPool) {
    let app = setup_test_app(pool.clone());
    let manager = register_user(&app).await;
    set_role(&pool, &manager, GlobalRole::Manager).await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/providers",
        Some(&manager.token),
        Some(json!({ "name": "Broken", "health_url": "nope" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["data"][0]["message"], "health_url");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_list_providers_searches(pool: PgPool) {
    let app = setup_test_app(pool.clone());
    let manager = register_user(&app).await;
    set_role(&pool, &manager, GlobalRole::Manager).await;

    for name in ["Wave", "MTN MoMo", "Moov Money"] {
        let (status, _) = send(
            &app,
            "POST",
            "/api/providers",
            Some(&manager.token),
            Some(json!({ "name": name })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let merchant = register_user(&app).await;
    let (status, body) = send(&app, "GET", "/api/providers", Some(&merchant.token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["pagination"]["count"], 3);
    let names: Vec<&str> = body["data"]["providers"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["name"].as_str().unwrap())
        .collect();
    assert!(names.contains(&"Wave"));

    let (_, body) = send(&app, "GET", "/api/providers?query=mo", Some(&merchant.token), None).await;
    assert_eq!(body["data"]["pagination"]["count"], 2);
    assert_eq!(body["data"]["pagination"]["query"], "mo");
}
