use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use spay::router::init_router;
use spay::spay_auth::IdentityProvider;
use spay::spay_auth::local::LocalIdp;
use spay::spay_config::{AuthorizationConfig, CorsConfig, LocalIdpConfig};
use spay::spay_models::GlobalRole;
use spay::state::AppState;
use sqlx::PgPool;
use tower::ServiceExt;
use uuid::Uuid;

pub const TEST_PASSWORD: &str = "secret123";

#[allow(dead_code)]
pub struct TestUser {
    pub id: String,
    pub auth_id: String,
    pub email: String,
    pub phone_number: String,
    pub token: String,
}

pub fn test_state(pool: PgPool) -> AppState {
    let idp = IdentityProvider::Local(LocalIdp::new(
        pool.clone(),
        LocalIdpConfig {
            secret: "spay-test-secret".to_string(),
            access_token_expiry: 3600,
            refresh_token_expiry: 604800,
        },
    ));

    AppState {
        db: pool,
        idp,
        authz: AuthorizationConfig::default(),
        cors_config: CorsConfig {
            allowed_origins: vec!["http://localhost:3000".to_string()],
        },
    }
}

#[allow(dead_code)]
pub fn setup_test_app(pool: PgPool) -> axum::Router {
    init_router(test_state(pool))
}

/// Sends one request and returns the status with the parsed envelope.
pub async fn send(
    app: &axum::Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }

    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

pub fn unique_phone() -> String {
    let n = Uuid::new_v4().as_u128() % 1_000_000_000;
    format!("07{:09}", n)
}

pub fn unique_email() -> String {
    format!("test-{}@spay.test", Uuid::new_v4())
}

pub async fn register_user(app: &axum::Router) -> TestUser {
    let email = unique_email();
    let phone_number = unique_phone();

    let (status, body) = send(
        app,
        "POST",
        "/api/users",
        None,
        Some(json!({
            "first_name": "Awa",
            "last_name": "Kone",
            "phone_prefix": "225",
            "phone_number": phone_number,
            "email": email,
            "country": "CIV",
            "password": TEST_PASSWORD,
            "password_confirmation": TEST_PASSWORD
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "register failed: {body}");

    TestUser {
        id: body["data"]["user"]["id"].as_str().unwrap().to_string(),
        auth_id: body["data"]["user"]["auth_id"].as_str().unwrap().to_string(),
        email,
        phone_number,
        token: body["data"]["token"].as_str().unwrap().to_string(),
    }
}

/// Sets the global role directly, the way `spay-cli promote` does.
#[allow(dead_code)]
pub async fn set_role(pool: &PgPool, user: &TestUser, role: GlobalRole) {
    sqlx::query("UPDATE users SET role = $1 WHERE auth_id = $2")
        .bind(role)
        .bind(&user.auth_id)
        .execute(pool)
        .await
        .unwrap();
}

#[allow(dead_code)]
pub async fn create_shop(app: &axum::Router, token: &str, name: &str) -> Value {
    let (status, body) = send(
        app,
        "POST",
        "/api/shops",
        Some(token),
        Some(json!({
            "name": name,
            "description": "Test shop",
            "site_web": "https://shop.spay.test"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "create shop failed: {body}");
    body["data"]["shop"].clone()
}

#[allow(dead_code)]
pub async fn create_service(app: &axum::Router, token: &str, name: &str) -> Value {
    let (status, body) = send(
        app,
        "POST",
        "/api/services",
        Some(token),
        Some(json!({
            "name": name,
            "description": "Test service",
            "site_web": "https://service.spay.test"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "create service failed: {body}");
    body["data"]["service"].clone()
}

#[allow(dead_code)]
pub async fn create_provider(pool: &PgPool, name: &str) -> Uuid {
    sqlx::query_scalar(
        "INSERT INTO providers (name, name_slug, description) VALUES ($1, $2, '') RETURNING id",
    )
    .bind(name)
    .bind(name.to_lowercase().replace(' ', "-"))
    .fetch_one(pool)
    .await
    .unwrap()
}
