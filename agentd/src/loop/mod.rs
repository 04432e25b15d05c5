//! Agent loop module.
//!
//! The observe → plan → act → check cycle that drives one task from a plan
//! to completion, an iteration cap, or a consecutive-error cap.

mod engine;

pub use engine::{AgentLoop, LoopOutcome, LoopStatus};
