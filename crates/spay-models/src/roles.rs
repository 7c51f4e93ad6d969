//! Global and resource-scoped roles.
//!
//! Roles are persisted as uppercase tokens (`USER_ADMIN`, `SHOP_DEV`,
//! `SERVICE_MANAGER`...) and exposed in JSON as their ordinal. Decoding never
//! fails: unknown or missing input yields the least privileged role.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sqlx::{
    Database, Decode, Encode, Type,
    postgres::{PgTypeInfo, Postgres},
};
use utoipa::{
    PartialSchema, ToSchema,
    openapi::{ObjectBuilder, RefOr, Schema, schema::Type as SchemaType},
};

/// Account-wide privilege level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum GlobalRole {
    #[default]
    Merchant,
    Manager,
    Admin,
}

impl GlobalRole {
    pub const ALL: [GlobalRole; 3] = [Self::Merchant, Self::Manager, Self::Admin];

    pub fn ordinal(self) -> u8 {
        match self {
            Self::Merchant => 0,
            Self::Manager => 1,
            Self::Admin => 2,
        }
    }

    pub fn from_ordinal(value: i64) -> Self {
        match value {
            1 => Self::Manager,
            2 => Self::Admin,
            _ => Self::Merchant,
        }
    }

    pub fn encode(self) -> &'static str {
        match self {
            Self::Merchant => "USER_MERCHANT",
            Self::Manager => "USER_MANAGER",
            Self::Admin => "USER_ADMIN",
        }
    }

    /// Exact match on the stored token.
    pub fn decode(token: Option<&str>) -> Self {
        match token {
            Some("USER_MANAGER") => Self::Manager,
            Some("USER_ADMIN") => Self::Admin,
            _ => Self::Merchant,
        }
    }

    /// Parses a CLI-style name (`merchant`, `manager`, `admin`).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "merchant" => Some(Self::Merchant),
            "manager" => Some(Self::Manager),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }
}

impl fmt::Display for GlobalRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(GlobalRole::encode(*self))
    }
}

/// Kind of tenant resource a permission record points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Shop,
    Service,
}

impl ResourceKind {
    pub fn token_prefix(self) -> &'static str {
        match self {
            Self::Shop => "SHOP",
            Self::Service => "SERVICE",
        }
    }

    pub fn singular(self) -> &'static str {
        match self {
            Self::Shop => "shop",
            Self::Service => "service",
        }
    }

    pub fn plural(self) -> &'static str {
        match self {
            Self::Shop => "shops",
            Self::Service => "services",
        }
    }

    pub fn table(self) -> &'static str {
        self.plural()
    }

    pub fn permission_table(self) -> &'static str {
        match self {
            Self::Shop => "shop_permissions",
            Self::Service => "service_permissions",
        }
    }

    /// Foreign key column of the permission table.
    pub fn fk_column(self) -> &'static str {
        match self {
            Self::Shop => "shop_id",
            Self::Service => "service_id",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.singular())
    }
}

/// Privilege on a single shop or service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ResourceRole {
    #[default]
    Dev,
    Manager,
    Admin,
}

impl ResourceRole {
    pub const ALL: [ResourceRole; 3] = [Self::Dev, Self::Manager, Self::Admin];

    pub fn ordinal(self) -> u8 {
        match self {
            Self::Dev => 0,
            Self::Manager => 1,
            Self::Admin => 2,
        }
    }

    pub fn from_ordinal(value: i64) -> Self {
        match value {
            1 => Self::Manager,
            2 => Self::Admin,
            _ => Self::Dev,
        }
    }

    fn suffix(self) -> &'static str {
        match self {
            Self::Dev => "DEV",
            Self::Manager => "MANAGER",
            Self::Admin => "ADMIN",
        }
    }

    pub fn encode(self, kind: ResourceKind) -> String {
        format!("{}_{}", kind.token_prefix(), self.suffix())
    }

    /// Decodes a token of `kind`; another kind's token yields [`ResourceRole::Dev`].
    pub fn decode(kind: ResourceKind, token: Option<&str>) -> Self {
        let suffix = token
            .and_then(|t| t.strip_prefix(kind.token_prefix()))
            .and_then(|t| t.strip_prefix('_'));
        match suffix {
            Some("MANAGER") => Self::Manager,
            Some("ADMIN") => Self::Admin,
            _ => Self::Dev,
        }
    }
}

macro_rules! ordinal_serde {
    ($name:ident, $doc:literal) => {
        impl PartialSchema for $name {
            fn schema() -> RefOr<Schema> {
                ObjectBuilder::new()
                    .schema_type(SchemaType::Integer)
                    .description(Some($doc))
                    .into()
            }
        }

        impl ToSchema for $name {}

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_u8(self.ordinal())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let value = i64::deserialize(deserializer)?;
                Ok(Self::from_ordinal(value))
            }
        }
    };
}

ordinal_serde!(GlobalRole, "0: MERCHANT, 1: MANAGER, 2: ADMIN");
ordinal_serde!(ResourceRole, "0: DEV, 1: MANAGER, 2: ADMIN");

// Resource role tokens depend on the resource kind, so only the global role
// maps straight onto a column.
impl Type<Postgres> for GlobalRole {
    fn type_info() -> PgTypeInfo {
        <String as Type<Postgres>>::type_info()
    }

    fn compatible(ty: &PgTypeInfo) -> bool {
        <String as Type<Postgres>>::compatible(ty)
    }
}

impl<'r> Decode<'r, Postgres> for GlobalRole {
    fn decode(
        value: <Postgres as Database>::ValueRef<'r>,
    ) -> Result<Self, sqlx::error::BoxDynError> {
        let token = <Option<&str> as Decode<'r, Postgres>>::decode(value)?;
        Ok(Self::decode(token))
    }
}

impl<'q> Encode<'q, Postgres> for GlobalRole {
    fn encode_by_ref(
        &self,
        buf: &mut <Postgres as Database>::ArgumentBuffer<'q>,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <&str as Encode<'q, Postgres>>::encode_by_ref(&GlobalRole::encode(*self), buf)
    }
}
