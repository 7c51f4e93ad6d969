//! Administrative operations used by `spay-cli`.

use anyhow::{anyhow, bail};
use sqlx::PgPool;

use spay_models::{GlobalRole, User};
use spay_models::users::USER_COLUMNS;

/// Sets the global role of the user whose auth id or email is `user`.
///
/// The change-role endpoint requires an existing ADMIN, so the first one is
/// promoted from here.
pub async fn promote_user(db: &PgPool, user: &str, role: GlobalRole) -> anyhow::Result<User> {
    let user = user.trim();
    if user.is_empty() {
        bail!("user identifier must not be empty");
    }

    let query = format!(
        "UPDATE users SET role = $1, updated_at = NOW() \
         WHERE auth_id = $2 OR lower(email) = lower($2) \
         RETURNING {USER_COLUMNS}"
    );

    let promoted = sqlx::query_as::<_, User>(&query)
        .bind(role)
        .bind(user)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| anyhow!("no user matches {user}"))?;

    tracing::info!(user_id = %promoted.id, role = %role, "User promoted");
    Ok(promoted)
}
