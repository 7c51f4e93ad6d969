use anyhow::anyhow;
use sqlx::PgPool;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use spay_core::{AppError, ListParams, Pagination, order_by};
use spay_models::transactions::{
    CreateTransactionDto, TRANSACTION_COLUMNS, TRANSACTION_SEARCH_COLUMNS,
    TRANSACTION_SORT_COLUMNS,
};
use spay_models::{OperationState, ResourceKind, Transaction};

use crate::modules::providers::service::ProviderService;
use crate::modules::resources::service::ResourceService;
use crate::utils::query::{FilterArg, ListFilter};

pub struct TransactionService;

impl TransactionService {
    /// Attaches the provider and the service of `transaction`.
    async fn attach_relations(db: &PgPool, transaction: &mut Transaction) -> Result<(), AppError> {
        transaction.provider = ProviderService::find_by_id(db, transaction.provider_id).await?;
        transaction.service =
            ResourceService::find_by_id(db, ResourceKind::Service, transaction.service_id).await?;
        Ok(())
    }

    #[instrument(skip(db), fields(db.table = "transactions", db.operation = "SELECT"))]
    pub async fn find_by_id(db: &PgPool, id: Uuid) -> Result<Option<Transaction>, AppError> {
        let sql = format!("SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE id = $1");
        let transaction = sqlx::query_as::<_, Transaction>(&sql)
            .bind(id)
            .fetch_optional(db)
            .await
            .map_err(|e| {
                error!(error = %e, "Database error fetching transaction");
                AppError::from(e)
            })?;

        match transaction {
            Some(mut transaction) => {
                Self::attach_relations(db, &mut transaction).await?;
                Ok(Some(transaction))
            }
            None => Ok(None),
        }
    }

    /// Lists transactions. `visible` restricts to transactions of the given
    /// services; `member` to services of one user.
    #[instrument(skip(db, params, visible), fields(db.table = "transactions", db.operation = "SELECT"))]
    pub async fn list(
        db: &PgPool,
        params: &ListParams,
        visible: Option<Vec<Uuid>>,
        member: Option<&str>,
    ) -> Result<(Vec<Transaction>, Pagination), AppError> {
        let mut filter = ListFilter::new();
        filter.search(TRANSACTION_SEARCH_COLUMNS, params.search());
        if let Some(services) = visible {
            filter.ids("service_id", services);
        }
        if let Some(user_ref) = member {
            filter.push(
                "service_id IN (SELECT p.service_id FROM service_permissions p
                    JOIN users u ON u.id = p.user_id
                    WHERE u.id::text = $? OR u.auth_id = $?)",
                FilterArg::Text(user_ref.to_string()),
            );
        }

        let where_clause = filter.where_clause();
        let count_sql = format!("SELECT COUNT(*) FROM transactions{where_clause}");
        let count = filter
            .bind_scalar(sqlx::query_scalar::<_, i64>(&count_sql))
            .fetch_one(db)
            .await?;

        let sorts = params.sorts_within(TRANSACTION_SORT_COLUMNS);
        let data_sql = format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions{where_clause} ORDER BY {} LIMIT {} OFFSET {}",
            order_by(&sorts, "created_at DESC"),
            params.limit(),
            params.offset()
        );
        let transactions = filter
            .bind_as(sqlx::query_as::<_, Transaction>(&data_sql))
            .fetch_all(db)
            .await?;

        debug!(count, returned = transactions.len(), "Transactions fetched");
        Ok((transactions, Pagination::new(count, params, sorts)))
    }

    #[instrument(skip(db, dto), fields(reference_id = %dto.reference_id, db.table = "transactions", db.operation = "INSERT"))]
    pub async fn create(db: &PgPool, dto: CreateTransactionDto) -> Result<Transaction, AppError> {
        let sql = format!(
            "INSERT INTO transactions
                (mode_live, amount, operation_mode, operation_state, reference_id, currency, provider_id, service_id)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {TRANSACTION_COLUMNS}"
        );
        let mut transaction = sqlx::query_as::<_, Transaction>(&sql)
            .bind(dto.mode_live)
            .bind(dto.amount)
            .bind(dto.operation_mode())
            .bind(OperationState::Pending)
            .bind(dto.reference_id.trim())
            .bind(dto.currency())
            .bind(dto.provider_id)
            .bind(dto.service_id)
            .fetch_one(db)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(db_err) = &e
                    && db_err.is_unique_violation()
                {
                    warn!(reference_id = %dto.reference_id, "Duplicate transaction reference");
                    return AppError::conflict(anyhow!("transaction already exists"));
                }
                error!(error = %e, "Database error creating transaction");
                AppError::from(e)
            })?;

        Self::attach_relations(db, &mut transaction).await?;
        info!(transaction.id = %transaction.id, "Transaction recorded");
        Ok(transaction)
    }
}
