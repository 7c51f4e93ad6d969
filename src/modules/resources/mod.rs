//! Shops and services share storage layout and authorization rules; this
//! module holds what both controllers use.

pub mod controller;
pub mod handlers;
pub mod service;
