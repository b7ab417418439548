use super::{organic_matter::OrganicMatterRule, soil_ph::SoilPhRule, SoilRule};
use crate::models::{Advisory, SoilReading};

/// Runs every soil rule in registration order.
pub struct AdvisoryEngine {
    rules: Vec<Box<dyn SoilRule>>,
}

impl AdvisoryEngine {
    pub fn new() -> Self {
        let rules: Vec<Box<dyn SoilRule>> =
            vec![Box::new(SoilPhRule), Box::new(OrganicMatterRule::default())];

        Self { rules }
    }

    pub fn evaluate(&self, soil: &SoilReading) -> Vec<Advisory> {
        self.rules
            .iter()
            .filter_map(|rule| rule.evaluate(soil))
            .collect()
    }

    pub fn list_rules(&self) -> Vec<(&'static str, &'static str)> {
        self.rules.iter().map(|r| (r.id(), r.name())).collect()
    }
}

impl Default for AdvisoryEngine {
    fn default() -> Self {
        Self::new()
    }
}
