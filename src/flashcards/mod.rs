//! Flashcards and the spaced repetition algorithm
//!
//! This module provides:
//! - Card model and its scheduling state
//! - SM-2 variant scheduling algorithm
//! - Statistics and difficulty labels derived from card state

pub mod algorithm;
pub mod models;
pub mod stats;

pub use models::*;
