mod common;

use axum::http::StatusCode;
use common::{create_shop, register_user, send, set_role, setup_test_app};
use serde_json::json;
use spay::spay_models::GlobalRole;
use sqlx::PgPool;

#[sqlx::test(migrations = "./migrations")]
async fn test_create_shop_grants_admin_to_creator(pool: PgPool) {
    let app = setup_test_app(pool.clone());
    let owner = register_user(&app).await;

    let shop = create_shop(&app, &owner.token, "My Shop!!").await;
    assert_eq!(shop["name_slug"], "my-shop");
    assert!(shop.get("client_id").is_none());
    assert!(shop.get("client_key").is_none());

    let role: String = sqlx::query_scalar(
        "SELECT sp.role FROM shop_permissions sp JOIN users u ON u.id = sp.user_id WHERE u.auth_id = $1",
    )
    .bind(&owner.auth_id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(role, "SHOP_ADMIN");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_duplicate_shop_name_conflicts(pool: PgPool) {
    let app = setup_test_app(pool);
    let owner = register_user(&app).await;
    create_shop(&app, &owner.token, "Boutique Abidjan").await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/shops",
        Some(&owner.token),
        Some(json!({
            "name": "boutique abidjan",
            "description": "again",
            "site_web": "https://shop.spay.test"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "shop already exists");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_merchant_lists_only_member_shops(pool: PgPool) {
    let app = setup_test_app(pool.clone());
    let alice = register_user(&app).await;
    let bob = register_user(&app).await;
    let manager = register_user(&app).await;
    set_role(&pool, &manager, GlobalRole::Manager).await;

    create_shop(&app, &alice.token, "Alice Shop").await;
    create_shop(&app, &bob.token, "Bob Shop").await;

    let (status, body) = send(&app, "GET", "/api/shops", Some(&alice.token), None).await;
    assert_eq!(status, StatusCode::OK);
    let shops = body["data"]["shops"].as_array().unwrap();
    assert_eq!(shops.len(), 1);
    assert_eq!(shops[0]["name"], "Alice Shop");

    let (_, body) = send(&app, "GET", "/api/shops", Some(&manager.token), None).await;
    assert_eq!(body["data"]["pagination"]["count"], 2);

    let (_, body) = send(
        &app,
        "GET",
        "/api/shops?limit=1&page=2&sorts=name%20asc",
        Some(&manager.token),
        None,
    )
    .await;
    let shops = body["data"]["shops"].as_array().unwrap();
    assert_eq!(shops.len(), 1);
    assert_eq!(shops[0]["name"], "Bob Shop");
    assert_eq!(body["data"]["pagination"]["offset"], 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_dev_member_can_list_but_not_regenerate(pool: PgPool) {
    let app = setup_test_app(pool);
    let owner = register_user(&app).await;
    let dev = register_user(&app).await;

    let shop = create_shop(&app, &owner.token, "Marche Central").await;
    let shop_id = shop["id"].as_str().unwrap();

    let uri = format!("/api/shops/{}/permissions/add", shop_id);
    let (status, body) = send(
        &app,
        "POST",
        &uri,
        Some(&owner.token),
        Some(json!({ "user_id": dev.auth_id, "role": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["permission"]["role"], 0);
    assert_eq!(body["data"]["permission"]["shop_id"], shop_id);

    let uri = format!("/api/shops/{}/permissions", shop_id);
    let (status, body) = send(&app, "GET", &uri, Some(&dev.token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["pagination"]["count"], 2);

    let uri = format!("/api/shops/{}/regenerate-client", shop_id);
    let (status, _) = send(&app, "POST", &uri, Some(&dev.token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let uri = format!("/api/shops/{}/show-client", shop_id);
    let (status, _) = send(&app, "GET", &uri, Some(&dev.token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_add_permission_rules(pool: PgPool) {
    let app = setup_test_app(pool);
    let owner = register_user(&app).await;
    let dev = register_user(&app).await;
    let other = register_user(&app).await;

    let shop = create_shop(&app, &owner.token, "Kiosque").await;
    let uri = format!("/api/shops/{}/permissions/add", shop["id"].as_str().unwrap());

    let (status, _) = send(
        &app,
        "POST",
        &uri,
        Some(&owner.token),
        Some(json!({ "user_id": dev.id, "role": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    // a DEV cannot add members
    let (status, _) = send(
        &app,
        "POST",
        &uri,
        Some(&dev.token),
        Some(json!({ "user_id": other.auth_id, "role": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        &app,
        "POST",
        &uri,
        Some(&owner.token),
        Some(json!({ "user_id": dev.auth_id, "role": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "user already added to this shop");

    let (status, body) = send(
        &app,
        "POST",
        &uri,
        Some(&owner.token),
        Some(json!({ "user_id": "00000000-0000-0000-0000-000000000000", "role": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "user does not exist");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_manager_rotates_credentials(pool: PgPool) {
    let app = setup_test_app(pool);
    let owner = register_user(&app).await;
    let shop = create_shop(&app, &owner.token, "Rotation").await;
    let shop_id = shop["id"].as_str().unwrap();

    let uri = format!("/api/shops/{}/show-client", shop_id);
    let (status, before) = send(&app, "GET", &uri, Some(&owner.token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(before["data"]["client_id"].as_str().unwrap().len(), 32);
    assert_eq!(before["data"]["client_key"].as_str().unwrap().len(), 64);

    let uri = format!("/api/shops/{}/regenerate-client", shop_id);
    let (status, after) = send(&app, "POST", &uri, Some(&owner.token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_ne!(before["data"]["client_key"], after["data"]["client_key"]);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_update_recomputes_slug(pool: PgPool) {
    let app = setup_test_app(pool);
    let owner = register_user(&app).await;
    let outsider = register_user(&app).await;
    let shop = create_shop(&app, &owner.token, "Old Name").await;
    let uri = format!("/api/shops/{}", shop["id"].as_str().unwrap());

    let (status, _) = send(
        &app,
        "PUT",
        &uri,
        Some(&outsider.token),
        Some(json!({ "name": "Stolen" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        &app,
        "PUT",
        &uri,
        Some(&owner.token),
        Some(json!({ "name": "New Name" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["shop"]["name_slug"], "new-name");
    assert_eq!(body["data"]["shop"]["description"], "Test shop");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_delete_shop_removes_permissions(pool: PgPool) {
    let app = setup_test_app(pool.clone());
    let owner = register_user(&app).await;
    let dev = register_user(&app).await;
    let shop = create_shop(&app, &owner.token, "Ephemere").await;
    let shop_id = shop["id"].as_str().unwrap();

    let uri = format!("/api/shops/{}/permissions/add", shop_id);
    send(
        &app,
        "POST",
        &uri,
        Some(&owner.token),
        Some(json!({ "user_id": dev.auth_id, "role": 0 })),
    )
    .await;

    let uri = format!("/api/shops/{}", shop_id);
    let (status, _) = send(&app, "DELETE", &uri, Some(&dev.token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&app, "DELETE", &uri, Some(&owner.token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["deleted"], true);

    let orphans: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM shop_permissions WHERE shop_id::text = $1")
            .bind(shop_id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(orphans, 0);

    let (status, _) = send(&app, "GET", &uri, Some(&owner.token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_invalid_shop_id_is_not_found(pool: PgPool) {
    let app = setup_test_app(pool);
    let owner = register_user(&app).await;

    let (status, body) = send(&app, "GET", "/api/shops/not-a-uuid", Some(&owner.token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "shop not found");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_create_on_behalf_requires_manager(pool: PgPool) {
    let app = setup_test_app(pool.clone());
    let manager = register_user(&app).await;
    let merchant = register_user(&app).await;
    set_role(&pool, &manager, GlobalRole::Manager).await;

    let body = json!({
        "name": "Delegated",
        "description": "created for a merchant",
        "site_web": "https://shop.spay.test",
        "auth_id": merchant.auth_id
    });

    let (status, _) = send(&app, "POST", "/api/shops", Some(&merchant.token), Some(body.clone())).await;
    assert_eq!(status, StatusCode::CREATED);

    let other = register_user(&app).await;
    let body = json!({
        "name": "Not Mine",
        "description": "x",
        "site_web": "https://shop.spay.test",
        "auth_id": other.auth_id
    });
    let (status, _) = send(&app, "POST", "/api/shops", Some(&merchant.token), Some(body.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, "POST", "/api/shops", Some(&manager.token), Some(body)).await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, listing) = send(&app, "GET", "/api/shops", Some(&other.token), None).await;
    let shops = listing["data"]["shops"].as_array().unwrap();
    assert_eq!(shops.len(), 1);
    assert_eq!(shops[0]["name"], "Not Mine");
}
