//! Transactions recorded against a service and a provider.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use spay_core::Pagination;
use sqlx::{
    Database, Decode, Encode, FromRow, Type,
    postgres::{PgTypeInfo, Postgres},
};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::providers::Provider;
use crate::resources::Resource;

pub const TRANSACTION_COLUMNS: &str = "id, mode_live, amount, operation_mode, operation_state, \
     operation_msg, reference_id, currency, provider_id, service_id, created_at, updated_at";

pub const TRANSACTION_SEARCH_COLUMNS: &[&str] = &["reference_id"];

pub const TRANSACTION_SORT_COLUMNS: &[&str] = &[
    "amount",
    "reference_id",
    "operation_state",
    "created_at",
    "updated_at",
];

pub const DEFAULT_CURRENCY: &str = "XOF";

#[derive(Debug, thiserror::Error)]
#[error("unknown {kind} `{value}`")]
pub struct UnknownToken {
    kind: &'static str,
    value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum OperationMode {
    Credit,
    Debit,
}

impl OperationMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Credit => "CREDIT",
            Self::Debit => "DEBIT",
        }
    }
}

impl FromStr for OperationMode {
    type Err = UnknownToken;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "CREDIT" => Ok(Self::Credit),
            "DEBIT" => Ok(Self::Debit),
            _ => Err(UnknownToken {
                kind: "operation mode",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum OperationState {
    #[default]
    Pending,
    Success,
    Cancel,
    Fail,
}

impl OperationState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Success => "SUCCESS",
            Self::Cancel => "CANCEL",
            Self::Fail => "FAIL",
        }
    }
}

impl FromStr for OperationState {
    type Err = UnknownToken;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "PENDING" => Ok(Self::Pending),
            "SUCCESS" => Ok(Self::Success),
            "CANCEL" => Ok(Self::Cancel),
            "FAIL" => Ok(Self::Fail),
            _ => Err(UnknownToken {
                kind: "operation state",
                value: s.to_string(),
            }),
        }
    }
}

macro_rules! text_column {
    ($name:ident) => {
        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl Type<Postgres> for $name {
            fn type_info() -> PgTypeInfo {
                <String as Type<Postgres>>::type_info()
            }

            fn compatible(ty: &PgTypeInfo) -> bool {
                <String as Type<Postgres>>::compatible(ty)
            }
        }

        impl<'q> Encode<'q, Postgres> for $name {
            fn encode_by_ref(
                &self,
                buf: &mut <Postgres as Database>::ArgumentBuffer<'q>,
            ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
                <&str as Encode<'q, Postgres>>::encode_by_ref(&self.as_str(), buf)
            }
        }

        impl<'r> Decode<'r, Postgres> for $name {
            fn decode(
                value: <Postgres as Database>::ValueRef<'r>,
            ) -> Result<Self, sqlx::error::BoxDynError> {
                let token = <&str as Decode<'r, Postgres>>::decode(value)?;
                Ok(token.parse()?)
            }
        }
    };
}

text_column!(OperationMode);
text_column!(OperationState);

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Transaction {
    pub id: Uuid,
    pub mode_live: bool,
    pub amount: f64,
    pub operation_mode: OperationMode,
    pub operation_state: OperationState,
    pub operation_msg: String,
    pub reference_id: String,
    pub currency: String,
    pub provider_id: Uuid,
    pub service_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[sqlx(skip)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<Provider>,
    #[sqlx(skip)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<Resource>,
}

fn validate_operation_mode(value: &str) -> Result<(), ValidationError> {
    value
        .parse::<OperationMode>()
        .map(|_| ())
        .map_err(|_| ValidationError::new("oneof"))
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateTransactionDto {
    #[validate(range(exclusive_min = 0.0))]
    pub amount: f64,
    /// `CREDIT` or `DEBIT`
    #[validate(custom(function = "validate_operation_mode"))]
    pub operation_mode: String,
    pub provider_id: Uuid,
    #[validate(length(min = 1))]
    pub reference_id: String,
    pub service_id: Uuid,
    #[serde(default)]
    pub mode_live: bool,
    /// Record on behalf of this user (global MANAGER and above)
    pub auth_id: Option<String>,
    /// ISO currency code, defaults to `XOF`
    #[validate(length(min = 3, max = 3))]
    pub currency: Option<String>,
}

impl CreateTransactionDto {
    pub fn currency(&self) -> String {
        self.currency
            .as_deref()
            .map(str::to_uppercase)
            .unwrap_or_else(|| DEFAULT_CURRENCY.to_string())
    }

    /// Operation mode once validated; defaults to credit on a bad token.
    pub fn operation_mode(&self) -> OperationMode {
        self.operation_mode.parse().unwrap_or(OperationMode::Credit)
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TransactionResponse {
    pub transaction: Transaction,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TransactionListResponse {
    pub transactions: Vec<Transaction>,
    pub pagination: Pagination,
}

/// `filter-transaction`: only transactions on services the given user holds a
/// permission on.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TransactionFilter {
    #[serde(rename = "filter-transaction", default)]
    #[param(rename = "filter-transaction")]
    pub filter_transaction: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dto() -> CreateTransactionDto {
        CreateTransactionDto {
            amount: 1500.0,
            operation_mode: "credit".to_string(),
            provider_id: Uuid::new_v4(),
            reference_id: "REF-001".to_string(),
            service_id: Uuid::new_v4(),
            mode_live: false,
            auth_id: None,
            currency: None,
        }
    }

    #[test]
    fn test_operation_tokens() {
        assert_eq!("debit".parse::<OperationMode>().unwrap(), OperationMode::Debit);
        assert!("refund".parse::<OperationMode>().is_err());
        assert_eq!("FAIL".parse::<OperationState>().unwrap(), OperationState::Fail);
        assert_eq!(
            serde_json::to_value(OperationState::Pending).unwrap(),
            "PENDING"
        );
    }

    #[test]
    fn test_create_dto_defaults() {
        let dto = dto();
        assert!(dto.validate().is_ok());
        assert_eq!(dto.currency(), DEFAULT_CURRENCY);
        assert_eq!(dto.operation_mode(), OperationMode::Credit);
    }

    #[test]
    fn test_create_dto_rejects_bad_input() {
        let dto = CreateTransactionDto {
            amount: 0.0,
            operation_mode: "refund".to_string(),
            reference_id: String::new(),
            ..dto()
        };
        let errors = dto.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("amount"));
        assert!(fields.contains_key("operation_mode"));
        assert!(fields.contains_key("reference_id"));
    }
}
