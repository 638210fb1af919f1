pub mod addresses;
pub mod auth;
pub mod cards;
pub mod orders;
pub mod products;
