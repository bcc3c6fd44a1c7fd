pub mod engine;
pub mod signals;
pub mod sourced;

pub use engine::{round2, ScoringEngine};
pub use sourced::{Resolved, ReturnQuality, Source, SourcedMetric};
