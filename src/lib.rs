//! Spaced repetition scheduling engine.
//!
//! Cards live in a [`store::CardStore`]; the [`scheduler::SchedulerService`]
//! reviews them with an SM-2 variant and serves per-owner due lists through a
//! TTL cache that is invalidated on every write.

pub mod cache;
pub mod clock;
pub mod config;
pub mod flashcards;
pub mod scheduler;
pub mod store;

pub use config::CadenceConfig;
pub use scheduler::{SchedulerError, SchedulerService};
