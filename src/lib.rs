pub mod api;
pub mod config;
pub mod engine;
pub mod entities;
pub mod metrics;
pub mod migrator;
pub mod repository;
pub mod seed;
pub mod telemetry;

pub use sea_orm;
