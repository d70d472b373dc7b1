//! Application services.

pub mod credit;
pub mod email;

pub use credit::{CreditOutcome, CreditService, CreditUsageSummary, LIMIT_REACHED_MESSAGE};
pub use email::{Mailer, MailerConfig};
