//! # SPAY Models
//!
//! Domain types of the SPAY API:
//!
//! - [`roles`]: global and resource-scoped roles and their storage tokens
//! - [`access`]: the permission evaluator
//! - [`users`], [`resources`], [`transactions`], [`providers`]: entities and DTOs
//! - [`slug`] and [`credentials`]: derived fields of shops and services

pub mod access;
pub mod credentials;
pub mod providers;
pub mod resources;
pub mod roles;
pub mod slug;
pub mod transactions;
pub mod users;

pub use providers::Provider;
pub use resources::{Permission, PermissionRow, Resource, ResourceRef};
pub use roles::{GlobalRole, ResourceKind, ResourceRole};
pub use transactions::{OperationMode, OperationState, Transaction};
pub use users::User;
