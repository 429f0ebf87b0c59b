//! Simulated search passes.
//!
//! - `effectiveness`: per-round effectiveness draws for each area.
//! - `engine`: coordinate-level passes with exhaustion tracking.

pub mod effectiveness;
pub mod engine;

pub use effectiveness::{EffectivenessRange, EffectivenessSampler, SamplerError};
pub use engine::{SearchEngine, SearchOutcome, SearchResult, combined_coverage};
