//! Tierlimit - Priority-Aware Admission Control
//!
//! This crate implements per-identity token-bucket rate limiting with two
//! priority tiers. Every client key owns a bucket that refills continuously;
//! high-priority requests may drain it to empty while low-priority requests
//! are refused once the bucket falls below a configured reserve floor.
//!
//! Time is always supplied by the caller, so the limiter is deterministic
//! and can be driven from any clock.

pub mod config;
pub mod error;
pub mod ratelimit;

pub use config::LimiterConfig;
pub use error::{Result, TierlimitError};
pub use ratelimit::{AdmissionControl, ClientKey, Limits, Priority, PriorityLimiter};
