use super::deficit::{requirements, EfficiencyParameters};
use super::optimizer::{build_plan, OptimizerSettings, PlanPolicy};
use super::rules::AdvisoryEngine;
use super::soil_supply::SoilFactors;
use super::units::{normalize_area, yield_per_hectare_tons};
use crate::error::{FertiplanError, Result};
use crate::models::{
    validate_catalog, Advisory, FertilizerProduct, NpkValues, PlanPair, PlanningResult,
    ProductionTarget, RemovalRateTable, SoilReading,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Every tunable the planning engine reads.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AgronomySettings {
    pub efficiency: EfficiencyParameters,
    pub soil_factors: SoilFactors,
    pub optimizer: OptimizerSettings,
}

impl AgronomySettings {
    pub fn validate(&self) -> Result<()> {
        self.efficiency.validate()?;
        self.soil_factors.validate()?;
        self.optimizer.validate()
    }
}

/// Validated snapshot of rates, catalog and settings.
///
/// All configuration checks happen in [`Planner::new`]; planning only
/// rejects an unusable target and has no side effects.
pub struct Planner {
    settings: AgronomySettings,
    rates: RemovalRateTable,
    catalog: Vec<FertilizerProduct>,
    advisories: AdvisoryEngine,
}

impl Planner {
    pub fn new(
        settings: AgronomySettings,
        rates: RemovalRateTable,
        catalog: Vec<FertilizerProduct>,
    ) -> Result<Self> {
        settings.validate()?;
        rates.validate()?;
        validate_catalog(&catalog)?;

        Ok(Self {
            settings,
            rates,
            catalog,
            advisories: AdvisoryEngine::new(),
        })
    }

    pub fn settings(&self) -> &AgronomySettings {
        &self.settings
    }

    pub fn catalog(&self) -> &[FertilizerProduct] {
        &self.catalog
    }

    pub fn rates(&self) -> &RemovalRateTable {
        &self.rates
    }

    /// Rejects targets that would produce meaningless totals.
    pub fn check_target(target: &ProductionTarget) -> Result<()> {
        if !target.area.value.is_finite() || target.area.value <= 0.0 {
            return Err(FertiplanError::InvalidData(format!(
                "area must be positive, got {}",
                target.area.value
            )));
        }
        if !target.target_yield.value.is_finite() || target.target_yield.value < 0.0 {
            return Err(FertiplanError::InvalidData(format!(
                "target yield must be non-negative, got {}",
                target.target_yield.value
            )));
        }
        Ok(())
    }

    pub fn policies(&self) -> (PlanPolicy, PlanPolicy) {
        (
            PlanPolicy::traditional(),
            PlanPolicy::technological(self.settings.efficiency.nitrogen_efficiency_boost),
        )
    }

    /// Nutrient balance, both plans and soil advice for one field. Only an
    /// unusable target fails; everything else degrades to partial plans.
    pub fn plan(&self, soil: &SoilReading, target: &ProductionTarget) -> Result<PlanningResult> {
        Self::check_target(target)?;

        let area_ha = normalize_area(target.area);
        let yield_t_ha = yield_per_hectare_tons(target);
        let rate = self.rates.lookup(&target.crop_key());
        let supply = self.settings.soil_factors.supply(soil);

        debug!(
            crop = %target.crop_key(),
            area_ha,
            yield_t_ha,
            "Computing nutrient requirements"
        );

        let nutrients = requirements(
            yield_t_ha,
            area_ha,
            rate,
            supply,
            &self.settings.efficiency,
        );
        let required = nutrients
            .iter()
            .fold(NpkValues::ZERO, |acc, r| acc.with(r.nutrient, r.total_deficit_kg));

        let (traditional, technological) = self.policies();
        let optimizer = self.settings.optimizer;
        let plans = PlanPair {
            traditional: build_plan(required, &self.catalog, traditional, optimizer),
            technological: build_plan(required, &self.catalog, technological, optimizer),
        };

        Ok(PlanningResult {
            target: target.clone(),
            nutrients,
            plans,
            advisories: self.advise(soil),
        })
    }

    pub fn advise(&self, soil: &SoilReading) -> Vec<Advisory> {
        self.advisories.evaluate(soil)
    }

    /// Registered advisory rules as (id, name).
    pub fn advisory_rules(&self) -> Vec<(&'static str, &'static str)> {
        self.advisories.list_rules()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        default_catalog, AreaUnit, FertilizerCategory, PrimaryNutrient, RemovalRate, Severity,
        YieldUnit,
    };

    fn planner() -> Planner {
        Planner::new(
            AgronomySettings::default(),
            RemovalRateTable::default(),
            default_catalog(),
        )
        .unwrap()
    }

    fn maiz_scenario() -> (SoilReading, ProductionTarget) {
        let soil = SoilReading::new(6.2, 3.0).with_npk(20.0, 15.0, 0.3);
        let target = ProductionTarget::new("maiz", 1.0, AreaUnit::Hectare)
            .with_yield(5.0, YieldUnit::MetricTon);
        (soil, target)
    }

    #[test]
    fn maiz_end_to_end() {
        let (soil, target) = maiz_scenario();
        let rates = RemovalRateTable::new(RemovalRate::new(20.0, 10.0, 20.0))
            .with_crop("maiz", RemovalRate::new(25.0, 10.0, 20.0));
        let planner = Planner::new(AgronomySettings::default(), rates, default_catalog()).unwrap();

        let result = planner.plan(&soil, &target).unwrap();

        let n = result.requirement(PrimaryNutrient::N).unwrap();
        assert_eq!(n.crop_demand_kg_ha, 125.0);
        assert_eq!(n.soil_available_kg_ha, 40.0);
        // (125 - 40 * 0.5) / 0.6
        assert!((n.total_deficit_kg - 175.0).abs() < 1e-9);

        for requirement in &result.nutrients {
            assert!(requirement.total_deficit_kg >= 0.0);
            assert!(requirement.total_deficit_kg.is_finite());
        }
        assert!(result
            .plans
            .traditional
            .lines
            .iter()
            .all(|l| l.product.category == FertilizerCategory::Commodity));
        assert!(!result.plans.traditional.is_empty());
        assert_eq!(result.advisories[0].severity, Severity::Success);
    }

    #[test]
    fn phosphorus_and_potassium_surplus_leave_only_nitrogen() {
        let (soil, target) = maiz_scenario();
        let result = planner().plan(&soil, &target).unwrap();

        // P₂O₅: 15 ppm * 2 * 2.29 * 0.3 = 20.6 effective vs 50 demand
        let p = result.requirement(PrimaryNutrient::P).unwrap();
        assert_eq!(p.crop_demand_kg_ha, 50.0);
        assert_eq!(p.soil_supply_kg_ha, 21.0);
        // K₂O: 0.3 cmol * 391 * 2 * 1.2 * 0.6 = 168.9 effective vs 100 demand
        let k = result.requirement(PrimaryNutrient::K).unwrap();
        assert_eq!(k.total_deficit_kg, 0.0);
    }

    #[test]
    fn manzana_targets_scale_per_unit_area() {
        let soil = SoilReading::new(6.5, 0.0);
        let target = ProductionTarget::new("maiz", 2.0, AreaUnit::Manzana)
            .with_yield(3.5, YieldUnit::MetricTon);
        let result = planner().plan(&soil, &target).unwrap();

        // 3.5 t per 0.7 ha = 5 t/ha; 125 kg N/ha / 0.6 over 1.4 ha
        let n = result.requirement(PrimaryNutrient::N).unwrap();
        assert_eq!(n.crop_demand_kg_ha, 125.0);
        assert!((n.total_deficit_kg - 125.0 / 0.6 * 1.4).abs() < 1e-9);
    }

    #[test]
    fn unknown_crop_uses_default_rates() {
        let soil = SoilReading::new(6.5, 0.0);
        let target = ProductionTarget::new("sorgo", 1.0, AreaUnit::Hectare)
            .with_yield(1.0, YieldUnit::MetricTon);
        let result = planner().plan(&soil, &target).unwrap();
        assert_eq!(result.requirement(PrimaryNutrient::N).unwrap().crop_demand_kg_ha, 20.0);
    }

    #[test]
    fn plans_keep_the_original_deficit_for_comparison() {
        let soil = SoilReading::new(6.5, 1.0);
        let target = ProductionTarget::new("frijol", 3.0, AreaUnit::Hectare)
            .with_yield(2.0, YieldUnit::MetricTon);
        let planner = Planner::new(AgronomySettings::default(), RemovalRateTable::default(), vec![])
            .unwrap();
        let result = planner.plan(&soil, &target).unwrap();

        assert!(result.plans.traditional.is_empty());
        assert!(result.plans.technological.is_empty());
        assert_eq!(result.plans.traditional.residual, result.total_deficit());
        assert!(result.total_deficit().n > 0.0);
    }

    #[test]
    fn technological_plan_reports_boost() {
        let (soil, target) = maiz_scenario();
        let result = planner().plan(&soil, &target).unwrap();
        assert_eq!(result.plans.technological.nitrogen_boost_pct, 21.0);
        assert_eq!(result.plans.traditional.nitrogen_boost_pct, 0.0);
    }

    #[test]
    fn acidity_and_alkalinity_scenarios() {
        let planner = planner();

        let acid = planner.advise(&SoilReading::new(5.0, 3.0));
        let warnings: Vec<_> = acid
            .iter()
            .filter(|a| a.severity == Severity::Warning)
            .collect();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].title.contains("Acidity"));

        let alkaline = planner.advise(&SoilReading::new(8.0, 3.0));
        assert!(alkaline
            .iter()
            .any(|a| a.severity == Severity::Warning && a.title.contains("Alkaline")));
        assert!(alkaline.iter().all(|a| !a.title.contains("Acidity")));
    }

    #[test]
    fn identical_inputs_give_identical_output() {
        let (soil, target) = maiz_scenario();
        let planner = planner();
        let first = serde_json::to_string(&planner.plan(&soil, &target).unwrap()).unwrap();
        let second = serde_json::to_string(&planner.plan(&soil, &target).unwrap()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn configuration_errors_are_rejected_up_front() {
        let mut settings = AgronomySettings::default();
        settings.efficiency.fertilizer = NpkValues::new(0.0, 0.3, 0.7);
        assert!(matches!(
            Planner::new(settings, RemovalRateTable::default(), default_catalog()),
            Err(FertiplanError::Config(_))
        ));

        let mut catalog = default_catalog();
        catalog[0].n = 146.0;
        assert!(matches!(
            Planner::new(AgronomySettings::default(), RemovalRateTable::default(), catalog),
            Err(FertiplanError::InvalidCatalog(_))
        ));
    }

    #[test]
    fn target_checks() {
        let ok = ProductionTarget::new("maiz", 1.0, AreaUnit::Hectare)
            .with_yield(5.0, YieldUnit::MetricTon);
        assert!(Planner::check_target(&ok).is_ok());

        let no_area = ProductionTarget::new("maiz", 0.0, AreaUnit::Hectare);
        assert!(Planner::check_target(&no_area).is_err());

        let negative_yield = ok.clone().with_yield(-1.0, YieldUnit::Kilogram);
        assert!(Planner::check_target(&negative_yield).is_err());
    }

    #[test]
    fn plan_rejects_unusable_targets() {
        let soil = SoilReading::new(6.2, 3.0).with_npk(20.0, 15.0, 0.3);
        for area in [0.0, -2.0, f64::NAN] {
            let target = ProductionTarget::new("maiz", area, AreaUnit::Hectare)
                .with_yield(5.0, YieldUnit::MetricTon);
            assert!(matches!(
                planner().plan(&soil, &target),
                Err(FertiplanError::InvalidData(_))
            ));
        }

        let target = ProductionTarget::new("maiz", 1.0, AreaUnit::Hectare)
            .with_yield(-5.0, YieldUnit::MetricTon);
        assert!(planner().plan(&soil, &target).is_err());
    }
}
