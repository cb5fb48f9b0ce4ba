//! Persistence layer for regimen: row models, the PostgreSQL pool and
//! migrations, query functions, and the store traits the engine writes
//! through.

pub mod config;
pub mod models;
pub mod pool;
pub mod queries;
pub mod store;
