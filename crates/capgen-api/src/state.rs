//! Application state.

use std::sync::Arc;

use sqlx::PgPool;

use capgen_db::{
    create_pool, run_migrations, ClientRepository, CreditLedger, DbConfig, JobRepository,
    OtpRepository, UserRepository,
};
use capgen_queue::JobQueue;
use capgen_storage::MediaStore;

use crate::config::ApiConfig;
use crate::services::{CreditService, Mailer};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub pool: PgPool,
    pub storage: Arc<MediaStore>,
    pub queue: Arc<JobQueue>,
    pub mailer: Mailer,
}

impl AppState {
    /// Create new application state.
    pub async fn new(config: ApiConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let pool = create_pool(&DbConfig::from_env()).await?;
        run_migrations(&pool).await?;

        let storage = Arc::new(MediaStore::from_env());
        let queue = Arc::new(JobQueue::from_env()?);
        let mailer = Mailer::from_env()?;

        Ok(Self {
            config,
            pool,
            storage,
            queue,
            mailer,
        })
    }

    // Repositories are cheap handles around the pool; construct on demand.

    pub fn users(&self) -> UserRepository {
        UserRepository::new(self.pool.clone())
    }

    pub fn otps(&self) -> OtpRepository {
        OtpRepository::new(self.pool.clone())
    }

    pub fn clients(&self) -> ClientRepository {
        ClientRepository::new(self.pool.clone())
    }

    pub fn jobs(&self) -> JobRepository {
        JobRepository::new(self.pool.clone())
    }

    pub fn credit_ledger(&self) -> CreditLedger {
        CreditLedger::new(self.pool.clone())
    }

    pub fn credit_service(&self) -> CreditService {
        CreditService::new(self.users(), self.credit_ledger())
    }
}
