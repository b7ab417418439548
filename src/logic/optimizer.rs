use crate::error::{FertiplanError, Result};
use crate::models::{
    AllocationLine, FertilizationPlan, FertilizerCategory, FertilizerProduct, NpkValues,
    PlanKind, PrimaryNutrient,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Materiality thresholds for the greedy mix.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OptimizerSettings {
    /// Remaining P or K (kg) above which the bulk-fill pass runs
    pub bulk_threshold_kg: f64,
    /// Remaining deficit (kg) above which a single-nutrient cleanup runs
    pub cleanup_threshold_kg: f64,
}

impl Default for OptimizerSettings {
    fn default() -> Self {
        Self {
            bulk_threshold_kg: 10.0,
            cleanup_threshold_kg: 5.0,
        }
    }
}

impl OptimizerSettings {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("bulk_threshold_kg", self.bulk_threshold_kg),
            ("cleanup_threshold_kg", self.cleanup_threshold_kg),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(FertiplanError::Config(format!(
                    "optimizer {} must be non-negative, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

fn commodity_only(product: &FertilizerProduct) -> bool {
    product.category == FertilizerCategory::Commodity
}

fn whole_catalog(_product: &FertilizerProduct) -> bool {
    true
}

/// What distinguishes one plan variant from another: which products it may
/// buy and how much extra N specialized products are credited with.
#[derive(Debug, Clone, Copy)]
pub struct PlanPolicy {
    pub kind: PlanKind,
    pub admits: fn(&FertilizerProduct) -> bool,
    pub nitrogen_boost: f64,
}

impl PlanPolicy {
    /// Commodity products only, no nitrogen boost.
    pub fn traditional() -> Self {
        Self {
            kind: PlanKind::Traditional,
            admits: commodity_only,
            nitrogen_boost: 1.0,
        }
    }

    /// Full catalog; specialized products get the boosted N content.
    pub fn technological(nitrogen_boost: f64) -> Self {
        Self {
            kind: PlanKind::Technological,
            admits: whole_catalog,
            nitrogen_boost,
        }
    }

    /// Label percentages as this policy values them.
    pub fn effective_grade(&self, product: &FertilizerProduct) -> NpkValues {
        let grade = product.grade();
        if product.is_specialized() {
            grade.with(PrimaryNutrient::N, grade.n * self.nitrogen_boost)
        } else {
            grade
        }
    }
}

/// Optimizer passes, run once each in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pass {
    BulkFill,
    Cleanup(PrimaryNutrient),
}

pub const PASS_ORDER: [Pass; 4] = [
    Pass::BulkFill,
    Pass::Cleanup(PrimaryNutrient::K),
    Pass::Cleanup(PrimaryNutrient::P),
    Pass::Cleanup(PrimaryNutrient::N),
];

#[derive(Debug, Clone)]
struct Candidate<'a> {
    product: &'a FertilizerProduct,
    /// Effective percentages under the active policy
    grade: NpkValues,
}

impl Candidate<'_> {
    fn kg_per_bag(&self) -> NpkValues {
        let bag_kg = self.product.bag_weight_kg();
        self.grade.map(|_, pct| bag_kg * pct / 100.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Purchase {
    candidate: usize,
    bags: u64,
}

/// Running state threaded through the passes.
#[derive(Debug, Clone, PartialEq)]
pub struct Allocation {
    pub remaining: NpkValues,
    pub lines: Vec<AllocationLine>,
}

impl Allocation {
    fn start(required: NpkValues) -> Self {
        Self {
            remaining: required,
            lines: Vec::new(),
        }
    }

    /// Books a purchase, merging into an existing line for the same product.
    /// Deficits may go negative from bag granularity.
    fn apply(self, candidate: &Candidate<'_>, bags: u64) -> Self {
        let count = bags as f64;
        let supplied = candidate.kg_per_bag().map(|_, kg| kg * count);
        let cost = count * candidate.product.price;

        let mut lines = self.lines;
        match lines
            .iter_mut()
            .find(|line| line.product.id == candidate.product.id)
        {
            Some(line) => {
                line.bags = line.bags.saturating_add(bags);
                line.supplied = line.supplied + supplied;
                line.cost += cost;
            }
            None => lines.push(AllocationLine {
                product: candidate.product.clone(),
                bags,
                supplied,
                cost,
            }),
        }

        Self {
            remaining: self.remaining - supplied,
            lines,
        }
    }
}

/// Whole bags needed to cover `deficit`. Saturates at `u64::MAX`.
fn bags_to_cover(deficit: f64, kg_per_bag: f64) -> u64 {
    if deficit <= 0.0 || kg_per_bag <= 0.0 {
        return 0;
    }
    (deficit / kg_per_bag).ceil() as u64
}

/// Greedy whole-bag allocator for one plan policy.
///
/// Products without a positive price cannot be ranked by cost and are left
/// out of every pass.
pub struct MixOptimizer<'a> {
    candidates: Vec<Candidate<'a>>,
    policy: PlanPolicy,
    settings: OptimizerSettings,
}

impl<'a> MixOptimizer<'a> {
    pub fn new(
        catalog: &'a [FertilizerProduct],
        policy: PlanPolicy,
        settings: OptimizerSettings,
    ) -> Self {
        let candidates = catalog
            .iter()
            .filter(|product| (policy.admits)(product))
            .filter(|product| {
                let priced = product.price > 0.0;
                if !priced {
                    debug!(product = %product.id, "Skipping unpriced product");
                }
                priced
            })
            .map(|product| Candidate {
                product,
                grade: policy.effective_grade(product),
            })
            .collect();

        Self {
            candidates,
            policy,
            settings,
        }
    }

    pub fn allocate(&self, required: NpkValues) -> Allocation {
        PASS_ORDER
            .iter()
            .fold(Allocation::start(required), |allocation, pass| {
                match self.select(*pass, &allocation.remaining) {
                    Some(purchase) => {
                        let candidate = &self.candidates[purchase.candidate];
                        debug!(
                            plan = %self.policy.kind,
                            ?pass,
                            product = %candidate.product.id,
                            bags = purchase.bags,
                            "Allocating bags"
                        );
                        allocation.apply(candidate, purchase.bags)
                    }
                    None => allocation,
                }
            })
    }

    pub fn plan(&self, required: NpkValues) -> FertilizationPlan {
        let allocation = self.allocate(required);
        FertilizationPlan::new(
            self.policy.kind,
            self.policy.nitrogen_boost,
            allocation.lines,
            allocation.remaining,
        )
    }

    fn select(&self, pass: Pass, remaining: &NpkValues) -> Option<Purchase> {
        match pass {
            Pass::BulkFill => self.bulk_fill(remaining),
            Pass::Cleanup(nutrient) => self.cleanup(nutrient, remaining),
        }
    }

    /// Picks the product with the most useful nutrient points per unit of
    /// price and sizes it to the larger of the outstanding P or K deficits.
    fn bulk_fill(&self, remaining: &NpkValues) -> Option<Purchase> {
        let threshold = self.settings.bulk_threshold_kg;
        if remaining.p <= threshold && remaining.k <= threshold {
            return None;
        }

        let mut best: Option<(usize, f64)> = None;
        for (index, candidate) in self.candidates.iter().enumerate() {
            if candidate.grade.p <= 0.0 && candidate.grade.k <= 0.0 {
                continue;
            }
            let useful_points: f64 = PrimaryNutrient::ALL
                .iter()
                .filter(|nutrient| remaining.get(**nutrient) > threshold)
                .map(|nutrient| candidate.grade.get(*nutrient))
                .sum();
            if useful_points <= 0.0 {
                continue;
            }
            let score = useful_points / candidate.product.price;
            if best.map_or(true, |(_, top)| score > top) {
                best = Some((index, score));
            }
        }

        let (index, _) = best?;
        let per_bag = self.candidates[index].kg_per_bag();
        let grade = self.candidates[index].grade;
        let bags = if remaining.k > remaining.p && grade.k > 0.0 {
            bags_to_cover(remaining.k, per_bag.k)
        } else if remaining.p > 0.0 && grade.p > 0.0 {
            bags_to_cover(remaining.p, per_bag.p)
        } else {
            0
        };

        (bags > 0).then_some(Purchase {
            candidate: index,
            bags,
        })
    }

    /// Covers one nutrient with its cheapest source per unit of content.
    fn cleanup(&self, nutrient: PrimaryNutrient, remaining: &NpkValues) -> Option<Purchase> {
        let deficit = remaining.get(nutrient);
        if deficit <= self.settings.cleanup_threshold_kg {
            return None;
        }

        let (index, _) = self
            .candidates
            .iter()
            .enumerate()
            .filter(|(_, candidate)| candidate.grade.get(nutrient) > 0.0)
            .map(|(index, candidate)| (index, candidate.product.price / candidate.grade.get(nutrient)))
            .fold(None, |best: Option<(usize, f64)>, (index, cost)| match best {
                Some((_, lowest)) if cost >= lowest => best,
                _ => Some((index, cost)),
            })?;

        let bags = bags_to_cover(deficit, self.candidates[index].kg_per_bag().get(nutrient));
        (bags > 0).then_some(Purchase {
            candidate: index,
            bags,
        })
    }
}

/// Builds one costed plan for the given area-scaled requirement.
pub fn build_plan(
    required: NpkValues,
    catalog: &[FertilizerProduct],
    policy: PlanPolicy,
    settings: OptimizerSettings,
) -> FertilizationPlan {
    MixOptimizer::new(catalog, policy, settings).plan(required)
}
