use super::SoilRule;
use crate::models::{Advisory, Severity, SoilReading};

/// Low organic matter rule
///
/// Organic matter below 2% weakens nutrient and water retention. This rule
/// is independent of the pH rule and is appended after it.
pub struct OrganicMatterRule {
    pub minimum_percent: f64,
}

impl Default for OrganicMatterRule {
    fn default() -> Self {
        Self {
            minimum_percent: 2.0,
        }
    }
}

impl SoilRule for OrganicMatterRule {
    fn id(&self) -> &'static str {
        "organic_matter"
    }

    fn name(&self) -> &'static str {
        "Organic Matter Level"
    }

    fn evaluate(&self, soil: &SoilReading) -> Option<Advisory> {
        if soil.organic_matter >= self.minimum_percent {
            return None;
        }

        Some(
            Advisory::new(
                "low_organic_matter",
                Severity::Warning,
                "Low Organic Matter",
                format!(
                    "Organic matter is low (< {}%). Nutrient and moisture retention will suffer.",
                    self.minimum_percent
                ),
            )
            .with_data_point("Organic matter", format!("{}%", soil.organic_matter))
            .with_action("Incorporate compost or other organic amendments."),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warns_below_two_percent() {
        let advisory = OrganicMatterRule::default()
            .evaluate(&SoilReading::new(6.5, 1.5))
            .unwrap();
        assert_eq!(advisory.severity, Severity::Warning);
        assert_eq!(advisory.data_points[0].value, "1.5%");
    }

    #[test]
    fn silent_at_or_above_two_percent() {
        let rule = OrganicMatterRule::default();
        assert!(rule.evaluate(&SoilReading::new(6.5, 2.0)).is_none());
        assert!(rule.evaluate(&SoilReading::new(6.5, 4.2)).is_none());
    }
}
