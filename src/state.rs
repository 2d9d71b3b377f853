use std::sync::Arc;

use crate::auth::repo::{PgUserRepo, UserRepo};
use crate::config::AppConfig;
use crate::db;

/// Shared, read-only after start-up. Cloned into every request.
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserRepo>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        let pool = db::connect(&config.database_url).await?;
        db::run_migrations(&pool).await?;

        let users = Arc::new(PgUserRepo::new(pool)) as Arc<dyn UserRepo>;
        Ok(Self::from_parts(users, Arc::new(config)))
    }

    pub fn from_parts(users: Arc<dyn UserRepo>, config: Arc<AppConfig>) -> Self {
        Self { users, config }
    }

    #[cfg(test)]
    pub fn fake() -> Self {
        use crate::auth::repo::memory::MemoryUserRepo;

        let users = Arc::new(MemoryUserRepo::default()) as Arc<dyn UserRepo>;
        Self::from_parts(users, Arc::new(AppConfig::for_tests()))
    }
}
