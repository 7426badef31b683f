mod schema;
pub mod queries;

pub use schema::init_db;

use std::sync::Arc;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::config::Config;
use crate::events::EventRouter;
use crate::payments::GatewayFactory;

pub type DbPool = Pool<SqliteConnectionManager>;

/// Application state, built once at the composition root and injected into
/// the HTTP layer. The event router and gateway factory live here rather than
/// in module-level singletons so tests can construct isolated instances.
#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub config: Arc<Config>,
    pub events: Arc<EventRouter>,
    pub gateways: Arc<dyn GatewayFactory>,
}

pub fn create_pool(database_path: &str) -> Result<DbPool, r2d2::Error> {
    let manager = SqliteConnectionManager::file(database_path);
    Pool::builder().max_size(10).build(manager)
}
