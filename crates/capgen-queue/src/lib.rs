//! Durable job queue on Redis Streams.
//!
//! At-least-once delivery through a consumer group; redelivery of stalled
//! messages via pending-claim; bounded retries with a dead-letter stream.
//! Consumers make pickup idempotent with the job repository's conditional
//! status transition, not queue-side locking.

pub mod error;
pub mod job;
pub mod queue;

pub use error::{QueueError, QueueResult};
pub use job::GenerateContentJob;
pub use queue::{JobQueue, QueueConfig};
