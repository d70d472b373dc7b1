//! PostgreSQL persistence for the Capgen backend.
//!
//! One repository per entity, all backed by a shared [`sqlx::PgPool`].
//! State-machine guards (job claiming, regeneration) and the credit
//! check-and-charge are single conditional statements or row-locked
//! transactions so that concurrent requests cannot race.

pub mod clients;
pub mod credits;
pub mod error;
pub mod jobs;
pub mod otps;
pub mod pool;
pub mod users;

pub use clients::{ClientRepository, NewClient};
pub use credits::{ChargeOutcome, CreditLedger};
pub use error::{DbError, DbResult};
pub use jobs::{JobRepository, NewJob};
pub use otps::{OtpOutcome, OtpRepository};
pub use pool::{create_pool, run_migrations, DbConfig};
pub use users::{NewUser, UserRepository};
