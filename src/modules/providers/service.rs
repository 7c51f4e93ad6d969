use anyhow::anyhow;
use sqlx::PgPool;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use spay_core::{AppError, ListParams, Pagination, order_by};
use spay_models::Provider;
use spay_models::providers::{
    CreateProviderDto, PROVIDER_COLUMNS, PROVIDER_SEARCH_COLUMNS, PROVIDER_SORT_COLUMNS,
};
use spay_models::slug::slugify;

use crate::utils::query::ListFilter;

pub struct ProviderService;

impl ProviderService {
    #[instrument(skip(db), fields(db.table = "providers", db.operation = "SELECT"))]
    pub async fn find_by_id(db: &PgPool, id: Uuid) -> Result<Option<Provider>, AppError> {
        let sql = format!("SELECT {PROVIDER_COLUMNS} FROM providers WHERE id = $1");
        let provider = sqlx::query_as::<_, Provider>(&sql)
            .bind(id)
            .fetch_optional(db)
            .await?;
        Ok(provider)
    }

    #[instrument(skip(db, params), fields(db.table = "providers", db.operation = "SELECT"))]
    pub async fn list(
        db: &PgPool,
        params: &ListParams,
    ) -> Result<(Vec<Provider>, Pagination), AppError> {
        let mut filter = ListFilter::new();
        filter.search(PROVIDER_SEARCH_COLUMNS, params.search());

        let where_clause = filter.where_clause();
        let count_sql = format!("SELECT COUNT(*) FROM providers{where_clause}");
        let count = filter
            .bind_scalar(sqlx::query_scalar::<_, i64>(&count_sql))
            .fetch_one(db)
            .await?;

        let sorts = params.sorts_within(PROVIDER_SORT_COLUMNS);
        let data_sql = format!(
            "SELECT {PROVIDER_COLUMNS} FROM providers{where_clause} ORDER BY {} LIMIT {} OFFSET {}",
            order_by(&sorts, "name ASC"),
            params.limit(),
            params.offset()
        );
        let providers = filter
            .bind_as(sqlx::query_as::<_, Provider>(&data_sql))
            .fetch_all(db)
            .await?;

        debug!(count, returned = providers.len(), "Providers fetched");
        Ok((providers, Pagination::new(count, params, sorts)))
    }

    #[instrument(skip(db, dto), fields(provider.name = %dto.name, db.table = "providers", db.operation = "INSERT"))]
    pub async fn create(db: &PgPool, dto: CreateProviderDto) -> Result<Provider, AppError> {
        let name = dto.name.trim().to_string();
        let slug = slugify(&name);

        let sql = format!(
            "INSERT INTO providers
                (name, name_slug, description, asynchrone_mode, pay_url, pay_check_url, health_url, support_country)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {PROVIDER_COLUMNS}"
        );
        let provider = sqlx::query_as::<_, Provider>(&sql)
            .bind(&name)
            .bind(&slug)
            .bind(dto.description.unwrap_or_default())
            .bind(dto.asynchrone_mode.unwrap_or(false))
            .bind(dto.pay_url.unwrap_or_default())
            .bind(dto.pay_check_url.unwrap_or_default())
            .bind(dto.health_url.unwrap_or_default())
            .bind(
                dto.support_country
                    .unwrap_or_default()
                    .into_iter()
                    .map(|c| c.trim().to_lowercase())
                    .collect::<Vec<_>>(),
            )
            .fetch_one(db)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(db_err) = &e
                    && db_err.is_unique_violation()
                {
                    warn!(slug = %slug, "Provider slug already taken");
                    return AppError::conflict(anyhow!("provider already exists"));
                }
                error!(error = %e, "Database error creating provider");
                AppError::from(e)
            })?;

        info!(provider.id = %provider.id, slug = %provider.name_slug, "Provider created");
        Ok(provider)
    }
}
