//! MySQL settings and connection pooling for the account store.

mod config;
mod pool;

pub use config::DbConfig;
pub use pool::{create_pool, health_check, pool_options, DbPool};
