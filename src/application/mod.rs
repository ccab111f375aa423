//! Application services (use cases).
//!
//! These services orchestrate domain logic and coordinate adapters through
//! ports to implement the lifecycle engine's use cases.

pub mod lifecycle;
pub mod pipeline;
pub mod router;
pub mod scheduler;
