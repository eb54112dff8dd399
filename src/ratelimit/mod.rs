//! Priority-aware token bucket state and admission logic.

mod backend;
mod bucket;
mod key;
mod limiter;
mod limits;
mod priority;

pub use backend::AdmissionControl;
pub use bucket::Bucket;
pub use key::ClientKey;
pub use limiter::PriorityLimiter;
pub use limits::Limits;
pub use priority::{ParsePriorityError, Priority};
