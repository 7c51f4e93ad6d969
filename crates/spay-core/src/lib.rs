//! # SPAY Core
//!
//! Foundational types shared by every crate of the SPAY API:
//!
//! - [`errors`]: [`AppError`] and its HTTP mapping
//! - [`response`]: the uniform response envelope
//! - [`pagination`]: list query parameters, sort parsing and the pagination block
//!
//! # Example
//!
//! ```ignore
//! use spay_core::{ApiResponse, AppError, ListParams};
//!
//! let error = AppError::not_found(anyhow::anyhow!("shop not found"));
//! let params = ListParams::default();
//! assert_eq!(params.offset(), 0);
//! ```

pub mod errors;
pub mod pagination;
pub mod response;

pub use errors::{AppError, ErrorDetail, INTERNAL_ERROR_MESSAGE};
pub use pagination::{ListParams, Pagination, order_by, parse_sorts};
pub use response::{ApiResponse, Envelope, EnvelopeParts};
