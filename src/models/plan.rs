use super::advisory::Advisory;
use super::fertilizer::FertilizerProduct;
use super::nutrient::{NpkValues, PrimaryNutrient};
use super::production::ProductionTarget;
use serde::{Deserialize, Serialize};

/// Per-nutrient demand/supply balance for one planning run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NutrientRequirement {
    pub nutrient: PrimaryNutrient,
    /// Soil supply before the soil-efficiency factor, kg/ha (rounded)
    pub soil_available_kg_ha: f64,
    /// Soil supply the crop can use, kg/ha (rounded)
    pub soil_supply_kg_ha: f64,
    /// Crop demand, kg/ha (rounded)
    pub crop_demand_kg_ha: f64,
    /// Fertilizer nutrient to apply per hectare, kg/ha (rounded)
    pub to_apply_kg_ha: f64,
    /// Area-scaled quantity at full precision; feeds the optimizer
    pub total_deficit_kg: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanKind {
    Traditional,
    Technological,
}

impl PlanKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanKind::Traditional => "traditional",
            PlanKind::Technological => "technological",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            PlanKind::Traditional => "Traditional proposal",
            PlanKind::Technological => "Technological proposal",
        }
    }
}

impl std::fmt::Display for PlanKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Bags of one product bought within a plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationLine {
    pub product: FertilizerProduct,
    pub bags: u64,
    /// kg of N, P₂O₅, K₂O delivered (N includes any efficiency boost)
    pub supplied: NpkValues,
    pub cost: f64,
}

impl AllocationLine {
    pub fn product_id(&self) -> &str {
        &self.product.id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FertilizationPlan {
    pub kind: PlanKind,
    pub name: String,
    /// Extra plant-available N credited to specialized products, percent
    pub nitrogen_boost_pct: f64,
    pub lines: Vec<AllocationLine>,
    pub total_bags: u64,
    pub total_cost: f64,
    pub total_supplied: NpkValues,
    /// Deficit left after the last pass; negative means over-application
    pub residual: NpkValues,
}

impl FertilizationPlan {
    pub fn new(
        kind: PlanKind,
        nitrogen_boost: f64,
        lines: Vec<AllocationLine>,
        residual: NpkValues,
    ) -> Self {
        let total_bags = lines.iter().fold(0u64, |acc, l| acc.saturating_add(l.bags));
        let total_cost = lines.iter().map(|l| l.cost).sum();
        let total_supplied = lines
            .iter()
            .fold(NpkValues::ZERO, |acc, l| acc + l.supplied);

        Self {
            kind,
            name: kind.display_name().to_string(),
            nitrogen_boost_pct: ((nitrogen_boost - 1.0) * 100.0).round(),
            lines,
            total_bags,
            total_cost,
            total_supplied,
            residual,
        }
    }

    pub fn line(&self, product_id: &str) -> Option<&AllocationLine> {
        self.lines.iter().find(|l| l.product_id() == product_id)
    }

    /// Positive remainder the plan could not cover.
    pub fn shortfall(&self, nutrient: PrimaryNutrient) -> f64 {
        self.residual.get(nutrient).max(0.0)
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanPair {
    pub traditional: FertilizationPlan,
    pub technological: FertilizationPlan,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanningResult {
    pub target: ProductionTarget,
    pub nutrients: Vec<NutrientRequirement>,
    pub plans: PlanPair,
    pub advisories: Vec<Advisory>,
}

impl PlanningResult {
    pub fn requirement(&self, nutrient: PrimaryNutrient) -> Option<&NutrientRequirement> {
        self.nutrients.iter().find(|r| r.nutrient == nutrient)
    }

    pub fn total_deficit(&self) -> NpkValues {
        self.nutrients
            .iter()
            .fold(NpkValues::ZERO, |acc, r| acc.with(r.nutrient, r.total_deficit_kg))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fertilizer::FertilizerCategory;

    fn line(id: &str, bags: u64, supplied: NpkValues, cost: f64) -> AllocationLine {
        AllocationLine {
            product: FertilizerProduct::new(id, id, FertilizerCategory::Commodity, 10.0, (1.0, 1.0, 1.0)),
            bags,
            supplied,
            cost,
        }
    }

    #[test]
    fn plan_rolls_up_lines() {
        let plan = FertilizationPlan::new(
            PlanKind::Technological,
            1.21,
            vec![
                line("a", 2, NpkValues::new(10.0, 5.0, 0.0), 90.0),
                line("b", 3, NpkValues::new(1.0, 0.0, 4.0), 120.0),
            ],
            NpkValues::new(-3.0, 2.5, 0.0),
        );

        assert_eq!(plan.total_bags, 5);
        assert_eq!(plan.total_cost, 210.0);
        assert_eq!(plan.total_supplied, NpkValues::new(11.0, 5.0, 4.0));
        assert_eq!(plan.nitrogen_boost_pct, 21.0);
        assert_eq!(plan.name, "Technological proposal");
        assert_eq!(plan.shortfall(PrimaryNutrient::N), 0.0);
        assert_eq!(plan.shortfall(PrimaryNutrient::P), 2.5);
        assert!(plan.line("b").is_some());
        assert!(plan.line("c").is_none());
    }

    #[test]
    fn total_bags_saturate() {
        let plan = FertilizationPlan::new(
            PlanKind::Traditional,
            1.0,
            vec![
                line("a", u64::MAX - 1, NpkValues::ZERO, 1.0),
                line("b", 5, NpkValues::ZERO, 1.0),
            ],
            NpkValues::ZERO,
        );
        assert_eq!(plan.total_bags, u64::MAX);
    }

    #[test]
    fn empty_plan() {
        let plan = FertilizationPlan::new(PlanKind::Traditional, 1.0, vec![], NpkValues::ZERO);
        assert!(plan.is_empty());
        assert_eq!(plan.total_bags, 0);
        assert_eq!(plan.total_cost, 0.0);
        assert_eq!(plan.nitrogen_boost_pct, 0.0);
    }
}
