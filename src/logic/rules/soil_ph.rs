use super::SoilRule;
use crate::models::{Advisory, Severity, SoilReading};

/// Soil pH correction rule
///
/// Always produces exactly one advisory:
/// - pH < 5.5: strong acidity, liming required (warning)
/// - 5.5 ≤ pH < 6.0: moderate acidity, maintenance liming (info)
/// - pH > 7.5: alkaline, micronutrients locked up (warning)
/// - otherwise optimal (success)
pub struct SoilPhRule;

pub const STRONG_ACIDITY_BELOW: f64 = 5.5;
pub const MODERATE_ACIDITY_BELOW: f64 = 6.0;
pub const ALKALINE_ABOVE: f64 = 7.5;

impl SoilRule for SoilPhRule {
    fn id(&self) -> &'static str {
        "soil_ph"
    }

    fn name(&self) -> &'static str {
        "Soil pH Correction"
    }

    fn evaluate(&self, soil: &SoilReading) -> Option<Advisory> {
        let ph = soil.ph;

        let advisory = if ph < STRONG_ACIDITY_BELOW {
            Advisory::new(
                "ph_strong_acidity",
                Severity::Warning,
                "Acidity Correction Required",
                format!(
                    "A pH of {} is strongly acidic. This locks up applied fertilizer \
                     and limits root growth.",
                    ph
                ),
            )
            .with_action(
                "Apply agricultural lime or dolomite at least 30 days before planting.",
            )
        } else if ph < MODERATE_ACIDITY_BELOW {
            Advisory::new(
                "ph_moderate_acidity",
                Severity::Info,
                "Moderate Acidity",
                format!(
                    "A pH of {} is moderately acidic. Nutrient uptake is slightly reduced.",
                    ph
                ),
            )
            .with_action("Consider a maintenance lime application to optimize nutrient uptake.")
        } else if ph > ALKALINE_ABOVE {
            Advisory::new(
                "ph_alkaline",
                Severity::Warning,
                "Alkaline Soil",
                format!(
                    "A pH of {} is alkaline. Iron and zinc availability is likely blocked.",
                    ph
                ),
            )
            .with_action("Avoid liming. Prefer fertilizers with an acidifying reaction.")
        } else {
            Advisory::new(
                "ph_optimal",
                Severity::Success,
                "Optimal pH",
                format!(
                    "A pH of {} suits most crops. Fertilizer efficiency will be high.",
                    ph
                ),
            )
        };

        Some(advisory.with_data_point("pH", ph))
    }
}
