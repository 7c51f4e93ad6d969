use sqlx::PgPool;

use spay_auth::IdentityProvider;
use spay_config::{AuthorizationConfig, CorsConfig, DatabaseConfig, IdpConfig};
use spay_db::init_db_pool;

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub idp: IdentityProvider,
    pub authz: AuthorizationConfig,
    pub cors_config: CorsConfig,
}

pub async fn init_app_state() -> anyhow::Result<AppState> {
    let db = init_db_pool(&DatabaseConfig::from_env()?).await?;
    let idp = IdentityProvider::from_config(&IdpConfig::from_env()?, db.clone())?;

    tracing::info!(idp = idp.name(), "Identity provider configured");

    Ok(AppState {
        db,
        idp,
        authz: AuthorizationConfig::from_env(),
        cors_config: CorsConfig::from_env(),
    })
}
