use crate::error::{FertiplanError, Result};
use crate::models::{NpkValues, NutrientRequirement, PrimaryNutrient, RemovalRate};
use serde::{Deserialize, Serialize};

/// Uptake efficiencies per primary nutrient plus the global N boost for
/// specialized products.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EfficiencyParameters {
    /// Fraction of soil-resident nutrient available to the crop
    pub soil: NpkValues,
    /// Fraction of applied fertilizer nutrient taken up
    pub fertilizer: NpkValues,
    pub nitrogen_efficiency_boost: f64,
}

impl Default for EfficiencyParameters {
    fn default() -> Self {
        Self {
            soil: NpkValues::new(0.5, 0.3, 0.6),
            fertilizer: NpkValues::new(0.6, 0.3, 0.7),
            nitrogen_efficiency_boost: 1.21,
        }
    }
}

impl EfficiencyParameters {
    pub fn with_boost(mut self, boost: f64) -> Self {
        self.nitrogen_efficiency_boost = boost;
        self
    }

    pub fn validate(&self) -> Result<()> {
        for nutrient in PrimaryNutrient::ALL {
            let fert = self.fertilizer.get(nutrient);
            if !fert.is_finite() || fert <= 0.0 {
                return Err(FertiplanError::Config(format!(
                    "fertilizer efficiency for {} must be positive, got {}",
                    nutrient, fert
                )));
            }
            let soil = self.soil.get(nutrient);
            if !soil.is_finite() || soil < 0.0 {
                return Err(FertiplanError::Config(format!(
                    "soil efficiency for {} must be non-negative, got {}",
                    nutrient, soil
                )));
            }
        }
        validate_boost(self.nitrogen_efficiency_boost)
    }
}

pub fn validate_boost(boost: f64) -> Result<()> {
    if !boost.is_finite() || boost < 1.0 {
        return Err(FertiplanError::Config(format!(
            "nitrogen efficiency boost must be at least 1.0, got {}",
            boost
        )));
    }
    Ok(())
}

/// Demand/supply balance for one nutrient.
///
/// A soil surplus never yields a negative requirement. Only the display
/// fields are rounded; the area total keeps full precision.
pub fn nutrient_requirement(
    nutrient: PrimaryNutrient,
    yield_per_ha_ton: f64,
    area_ha: f64,
    rate: &RemovalRate,
    soil_supply_kg_ha: f64,
    efficiency: &EfficiencyParameters,
) -> NutrientRequirement {
    let demand_per_ha = yield_per_ha_ton * rate.get(nutrient);
    let effective_supply = soil_supply_kg_ha * efficiency.soil.get(nutrient);
    let raw_deficit = (demand_per_ha - effective_supply).max(0.0);
    let to_apply_per_ha = raw_deficit / efficiency.fertilizer.get(nutrient);

    NutrientRequirement {
        nutrient,
        soil_available_kg_ha: soil_supply_kg_ha.round(),
        soil_supply_kg_ha: effective_supply.round(),
        crop_demand_kg_ha: demand_per_ha.round(),
        to_apply_kg_ha: to_apply_per_ha.round(),
        total_deficit_kg: to_apply_per_ha * area_ha,
    }
}

/// Requirements for N, P₂O₅ and K₂O, in that order.
pub fn requirements(
    yield_per_ha_ton: f64,
    area_ha: f64,
    rate: &RemovalRate,
    soil_supply: NpkValues,
    efficiency: &EfficiencyParameters,
) -> Vec<NutrientRequirement> {
    PrimaryNutrient::ALL
        .iter()
        .map(|nutrient| {
            nutrient_requirement(
                *nutrient,
                yield_per_ha_ton,
                area_ha,
                rate,
                soil_supply.get(*nutrient),
                efficiency,
            )
        })
        .collect()
}
