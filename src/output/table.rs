use crate::models::{
    Advisory, FertilizationPlan, FertilizerProduct, PlanningResult, PrimaryNutrient,
    RemovalRateTable,
};

pub fn print(result: &PlanningResult) {
    print!("{}", render(result));
}

pub fn print_advisories(advisories: &[Advisory]) {
    let mut out = String::new();
    write_advisories(&mut out, advisories);
    print!("{out}");
}

pub fn print_catalog(catalog: &[FertilizerProduct]) {
    print!("{}", render_catalog(catalog));
}

pub fn print_rates(table: &RemovalRateTable) {
    print!("{}", render_rates(table));
}

pub fn render(result: &PlanningResult) -> String {
    let mut out = String::new();
    let target = &result.target;

    out.push_str(&format!(
        "=== {} | {} {} | {} {} per {} ===\n\n",
        target.crop,
        target.area.value,
        target.area.unit,
        target.target_yield.value,
        target.target_yield.unit,
        target.area.unit
    ));

    write_nutrients(&mut out, result);
    write_plan(&mut out, &result.plans.traditional);
    write_plan(&mut out, &result.plans.technological);
    write_advisories(&mut out, &result.advisories);

    out
}

fn write_nutrients(out: &mut String, result: &PlanningResult) {
    out.push_str("Nutrient balance (kg/ha unless noted)\n\n");
    out.push_str(&format!(
        "  {:<6}  {:>10}  {:>10}  {:>8}  {:>10}  {:>12}\n",
        "", "Soil", "Effective", "Demand", "To apply", "Total (kg)"
    ));
    for req in &result.nutrients {
        out.push_str(&format!(
            "  {:<6}  {:>10}  {:>10}  {:>8}  {:>10}  {:>12.1}\n",
            req.nutrient.symbol(),
            req.soil_available_kg_ha,
            req.soil_supply_kg_ha,
            req.crop_demand_kg_ha,
            req.to_apply_kg_ha,
            req.total_deficit_kg
        ));
    }
    out.push('\n');
}

fn write_plan(out: &mut String, plan: &FertilizationPlan) {
    if plan.nitrogen_boost_pct > 0.0 {
        out.push_str(&format!(
            "{} (+{}% N efficiency on specialized products)\n\n",
            plan.name, plan.nitrogen_boost_pct
        ));
    } else {
        out.push_str(&format!("{}\n\n", plan.name));
    }

    if plan.is_empty() {
        out.push_str("  No fertilizer needed or available.\n\n");
    } else {
        let max_name = plan
            .lines
            .iter()
            .map(|l| l.product.name.chars().count())
            .max()
            .unwrap_or(10);

        for line in &plan.lines {
            out.push_str(&format!(
                "  {:<width$}  {:>4} bags  {:>10.2}   N {:>6.1}  P₂O₅ {:>6.1}  K₂O {:>6.1}\n",
                line.product.name,
                line.bags,
                line.cost,
                line.supplied.n,
                line.supplied.p,
                line.supplied.k,
                width = max_name
            ));
        }
        out.push_str(&format!(
            "\n  Total: {} bags, cost {:.2}\n",
            plan.total_bags, plan.total_cost
        ));
    }

    let shortfalls: Vec<String> = PrimaryNutrient::ALL
        .iter()
        .filter(|n| plan.shortfall(**n) > 0.5)
        .map(|n| format!("{} {:.1} kg", n.symbol(), plan.shortfall(*n)))
        .collect();
    if !shortfalls.is_empty() {
        out.push_str(&format!("  Uncovered: {}\n", shortfalls.join(", ")));
    }
    out.push('\n');
}

fn write_advisories(out: &mut String, advisories: &[Advisory]) {
    if advisories.is_empty() {
        return;
    }

    out.push_str("Soil correction\n\n");
    for advisory in advisories {
        out.push_str(&format!(
            "  {} {}: {}\n",
            advisory.severity.symbol(),
            advisory.title,
            advisory.description
        ));
        for point in &advisory.data_points {
            out.push_str(&format!("      {}: {}\n", point.label, point.value));
        }
        if let Some(action) = &advisory.suggested_action {
            out.push_str(&format!("      -> {}\n", action));
        }
    }
    out.push('\n');
}

pub fn render_catalog(catalog: &[FertilizerProduct]) -> String {
    let mut out = String::new();
    if catalog.is_empty() {
        out.push_str("Catalog is empty.\n");
        return out;
    }

    let max_id = catalog.iter().map(|p| p.id.len()).max().unwrap_or(4);
    let max_name = catalog
        .iter()
        .map(|p| p.name.chars().count())
        .max()
        .unwrap_or(4);

    for product in catalog {
        out.push_str(&format!(
            "  {:<id_w$}  {:<name_w$}  {:<11}  {:>12}  {:>6} lb  {:>8.2}\n",
            product.id,
            product.name,
            product.category.as_str(),
            product.grade_label(),
            product.bag_weight_lb,
            product.price,
            id_w = max_id,
            name_w = max_name
        ));
    }
    out
}

pub fn render_rates(table: &RemovalRateTable) -> String {
    let mut out = String::new();
    out.push_str("kg removed per metric ton of yield\n\n");
    out.push_str(&format!("  {:<12}  {:>6}  {:>6}  {:>6}\n", "Crop", "N", "P₂O₅", "K₂O"));
    for (crop, rate) in table.entries() {
        out.push_str(&format!(
            "  {:<12}  {:>6}  {:>6}  {:>6}\n",
            crop, rate.n, rate.p, rate.k
        ));
    }
    out
}
