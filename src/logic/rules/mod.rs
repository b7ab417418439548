pub mod engine;
pub mod organic_matter;
pub mod soil_ph;

pub use engine::AdvisoryEngine;

use crate::models::{Advisory, SoilReading};

/// Trait for soil-correction rules
pub trait SoilRule: Send + Sync {
    /// Unique identifier for this rule
    fn id(&self) -> &'static str;

    /// Human-readable name
    fn name(&self) -> &'static str;

    /// Evaluate the rule and return an advisory if it applies
    fn evaluate(&self, soil: &SoilReading) -> Option<Advisory>;
}
