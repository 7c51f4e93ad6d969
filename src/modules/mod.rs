pub mod health;
pub mod providers;
pub mod resources;
pub mod services;
pub mod shops;
pub mod transactions;
pub mod users;
