pub mod deficit;
pub mod optimizer;
pub mod planner;
pub mod rules;
pub mod soil_supply;
pub mod units;

pub use planner::{AgronomySettings, Planner};
pub use rules::AdvisoryEngine;
