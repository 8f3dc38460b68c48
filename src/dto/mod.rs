pub mod auth;
pub mod members;
pub mod orders;
pub mod products;
