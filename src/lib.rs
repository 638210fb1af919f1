pub mod audit;
pub mod config;
pub mod dto;
pub mod email;
pub mod entity;
pub mod error;
pub mod field;
pub mod middleware;
pub mod payment;
pub mod repository;
pub mod response;
pub mod services;
pub mod state;
pub mod store;
pub mod telemetry;
