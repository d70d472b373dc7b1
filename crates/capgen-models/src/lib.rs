//! Shared data models for the Capgen backend.
//!
//! This crate provides Serde-serializable types for:
//! - Users, subscription tiers and plan limits
//! - OTP verification codes
//! - The credit usage ledger
//! - Clients (brands) and their social profiles
//! - Jobs, generation parameters and generated content payloads

pub mod client;
pub mod content;
pub mod credit;
pub mod job;
pub mod otp;
pub mod plan;
pub mod user;

// Re-export common types
pub use client::{Client, Industry, SocialLinks};
pub use content::{GeneratedContent, PlatformPost, YoutubePost};
pub use credit::CreditUsage;
pub use job::{
    FileType, GenerationParams, Job, JobId, JobStatus, LengthPreset, DEFAULT_HASHTAG_COUNT,
    MAX_HASHTAG_COUNT, MIN_HASHTAG_COUNT,
};
pub use otp::{OtpKind, OtpVerification, DEFAULT_OTP_EXPIRY_MINUTES};
pub use plan::{daily_credit_limit, FREE_DAILY_CREDIT_LIMIT};
pub use user::{SubscriptionTier, User};
