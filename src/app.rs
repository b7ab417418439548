use crate::cli::{
    CatalogAction, OutputFormat, ParamsAction, PlanArgs, ProductArgs, RatesAction,
};
use crate::config::Config;
use crate::datasources::GeminiClient;
use crate::db::Database;
use crate::error::{FertiplanError, Result};
use crate::logic::{AgronomySettings, Planner};
use crate::models::{
    FertilizerCategory, FertilizerProduct, Nutrient, PlanningResult, ProductionTarget,
    RemovalRate, RemovalRateTable, SoilReading,
};
use crate::output;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub struct App {
    pub config: Config,
    pub db: Database,
}

impl App {
    pub fn new(config: Config, db: Database) -> Self {
        Self { config, db }
    }

    /// Config settings with the stored nitrogen boost applied on top.
    pub fn settings(&self) -> Result<AgronomySettings> {
        let mut settings = self.config.settings();
        if let Some(boost) = self.db.nitrogen_boost()? {
            settings.efficiency = settings.efficiency.with_boost(boost);
        }
        Ok(settings)
    }

    /// Snapshot of the store as a validated planner.
    pub fn planner(&self) -> Result<Planner> {
        Planner::new(
            self.settings()?,
            self.db.load_removal_table()?,
            self.db.list_fertilizers()?,
        )
    }

    fn gemini(&self) -> Result<GeminiClient> {
        let config = self.config.document_analysis.clone().ok_or_else(|| {
            FertiplanError::Config(
                "document_analysis is not configured. Run `fertiplan init` or edit config.yaml."
                    .into(),
            )
        })?;
        GeminiClient::new(config)
    }

    pub async fn extract(&self, document: &Path, out: Option<PathBuf>) -> Result<()> {
        let soil = self.gemini()?.extract_soil(document).await?;
        let json = serde_json::to_string_pretty(&soil)?;

        match out {
            Some(path) => {
                std::fs::write(&path, &json)?;
                info!(path = %path.display(), "Wrote soil reading");
            }
            None => println!("{json}"),
        }
        Ok(())
    }

    pub async fn plan(&self, args: PlanArgs) -> Result<()> {
        let planner = self.planner()?;

        let soil = match (&args.soil, &args.document) {
            (Some(path), _) => read_soil(path)?,
            (None, Some(document)) => self.gemini()?.extract_soil(document).await?,
            (None, None) => {
                return Err(FertiplanError::InvalidData(
                    "either --soil or --document is required".into(),
                ))
            }
        };

        let result = run_plan(&planner, &soil, &args)?;

        match args.output {
            OutputFormat::Table => output::table::print(&result),
            OutputFormat::Json => output::json::print(&result)?,
        }
        Ok(())
    }

    pub fn advise(&self, soil: &Path, format: OutputFormat) -> Result<()> {
        let soil = read_soil(soil)?;
        let advisories = self.planner()?.advise(&soil);

        match format {
            OutputFormat::Table => output::table::print_advisories(&advisories),
            OutputFormat::Json => output::json::print(&advisories)?,
        }
        Ok(())
    }

    pub fn catalog(&self, action: CatalogAction) -> Result<()> {
        match action {
            CatalogAction::List { output: format } => {
                let catalog = self.db.list_fertilizers()?;
                match format {
                    OutputFormat::Table => output::table::print_catalog(&catalog),
                    OutputFormat::Json => output::json::print(&catalog)?,
                }
            }
            CatalogAction::Add(args) => {
                let product = product_from_args(args)?;
                let existed = self.db.get_fertilizer(&product.id)?.is_some();
                self.db.upsert_fertilizer(&product)?;
                let verb = if existed { "Updated" } else { "Added" };
                println!("{} {} ({})", verb, product.name, product.grade_label());
            }
            CatalogAction::Remove { id } => {
                self.db.delete_fertilizer(&id)?;
                println!("Removed {}", id);
            }
        }
        Ok(())
    }

    pub fn rates(&self, action: RatesAction) -> Result<()> {
        match action {
            RatesAction::List { output: format } => {
                let table = self.db.load_removal_table()?;
                match format {
                    OutputFormat::Table => output::table::print_rates(&table),
                    OutputFormat::Json => output::json::print(&table)?,
                }
            }
            RatesAction::Set { crop, n, p, k } => {
                self.db.upsert_removal_rate(&crop, RemovalRate::new(n, p, k))?;
                println!("Saved removal rate for {}", crop.trim().to_lowercase());
            }
            RatesAction::Remove { crop } => {
                self.db.delete_removal_rate(&crop)?;
                println!("Removed {}", crop.trim().to_lowercase());
            }
        }
        Ok(())
    }

    pub fn params(&self, action: ParamsAction) -> Result<()> {
        match action {
            ParamsAction::Show => {
                let yaml = serde_yaml::to_string(&self.settings()?)?;
                print!("{yaml}");
            }
            ParamsAction::Set { boost } => {
                self.db.set_nitrogen_boost(boost)?;
                println!("Nitrogen efficiency boost set to {}", boost);
            }
        }
        Ok(())
    }

    pub fn reset(&self) -> Result<()> {
        self.db.reset_to_defaults()?;
        println!("Catalog, removal rates and parameters restored to defaults.");
        Ok(())
    }

    /// Validates config, store contents and planner construction.
    pub fn check(&self) -> Result<()> {
        let planner = self.planner()?;
        println!("  Store: {}", self.db.path().display());
        println!("  Products: {}", planner.catalog().len());
        println!("  Crops with removal rates: {}", planner.rates().entries().count() - 1);
        println!(
            "  Nitrogen efficiency boost: {}",
            planner.settings().efficiency.nitrogen_efficiency_boost
        );
        let rules: Vec<&str> = planner.advisory_rules().iter().map(|(_, name)| *name).collect();
        println!("  Advisory rules: {}", rules.join(", "));

        match &self.config.document_analysis {
            Some(docs) => match GeminiClient::new(docs.clone()) {
                Ok(_) => println!("  Document analysis: {} (configured)", docs.model),
                Err(e) => println!("  Document analysis: {}", e),
            },
            None => println!("  Document analysis: not configured"),
        }
        Ok(())
    }
}

pub fn read_soil(path: &Path) -> Result<SoilReading> {
    let content = std::fs::read_to_string(path)?;
    let soil: SoilReading = serde_json::from_str(&content)?;
    debug!(path = %path.display(), ph = soil.ph, "Loaded soil reading");
    Ok(soil)
}

/// Crop from the command line, else the one named in the soil report.
fn resolve_crop(args: &PlanArgs, soil: &SoilReading) -> String {
    args.crop
        .clone()
        .or_else(|| soil.crop.clone())
        .unwrap_or_else(|| RemovalRateTable::DEFAULT_KEY.to_string())
}

fn run_plan(planner: &Planner, soil: &SoilReading, args: &PlanArgs) -> Result<PlanningResult> {
    let target = ProductionTarget::new(resolve_crop(args, soil), args.area, args.area_unit)
        .with_yield(args.target_yield, args.yield_unit);
    let result = planner.plan(soil, &target)?;

    if !planner.rates().contains(&target.crop) {
        info!(crop = %target.crop, "No removal rate for crop, using default");
    }
    Ok(result)
}

/// Parses an "N-P-K" label such as `15-15-15`.
fn parse_grade(grade: &str) -> Result<(f64, f64, f64)> {
    let parts: Vec<f64> = grade
        .split('-')
        .map(|p| p.trim().parse::<f64>())
        .collect::<std::result::Result<_, _>>()
        .map_err(|_| FertiplanError::InvalidCatalog(format!("invalid grade '{}'", grade)))?;

    match parts.as_slice() {
        [n, p, k] => Ok((*n, *p, *k)),
        _ => Err(FertiplanError::InvalidCatalog(format!(
            "grade '{}' must have three parts, e.g. 15-15-15",
            grade
        ))),
    }
}

fn product_from_args(args: ProductArgs) -> Result<FertilizerProduct> {
    let category = FertilizerCategory::from_str(&args.category).ok_or_else(|| {
        FertiplanError::InvalidCatalog(format!(
            "unknown category '{}' (expected commodity or specialized)",
            args.category
        ))
    })?;

    let mut product = FertilizerProduct::new(
        args.id,
        args.name,
        category,
        args.price,
        parse_grade(&args.grade)?,
    )
    .with_bag_weight(args.bag_weight_lb);

    for entry in &args.content {
        let (symbol, pct) = entry.split_once('=').ok_or_else(|| {
            FertiplanError::InvalidCatalog(format!("expected NUTRIENT=PCT, got '{}'", entry))
        })?;
        let nutrient = Nutrient::from_str(symbol)
            .ok_or_else(|| FertiplanError::InvalidCatalog(format!("unknown nutrient '{}'", symbol)))?;
        let pct: f64 = pct
            .trim()
            .parse()
            .map_err(|_| FertiplanError::InvalidCatalog(format!("invalid percentage in '{}'", entry)))?;
        product = product.with_content(nutrient, pct);
    }

    product.validate()?;
    Ok(product)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AreaUnit, YieldUnit};

    fn app() -> App {
        App::new(Config::default(), Database::open_in_memory().unwrap())
    }

    fn plan_args(crop: Option<&str>) -> PlanArgs {
        PlanArgs {
            soil: Some(PathBuf::from("soil.json")),
            document: None,
            crop: crop.map(str::to_string),
            area: 1.0,
            area_unit: AreaUnit::Hectare,
            target_yield: 5.0,
            yield_unit: YieldUnit::MetricTon,
            output: OutputFormat::Json,
        }
    }

    #[test]
    fn grades_parse() {
        assert_eq!(parse_grade("15-15-15").unwrap(), (15.0, 15.0, 15.0));
        assert_eq!(parse_grade("18-46-0").unwrap(), (18.0, 46.0, 0.0));
        assert!(parse_grade("15-15").is_err());
        assert!(parse_grade("a-b-c").is_err());
    }

    #[test]
    fn product_args_with_secondary_content() {
        let args = ProductArgs {
            id: "sulfan".into(),
            name: "Sulfan 24-0-0".into(),
            category: "specialized".into(),
            price: 41.0,
            grade: "24-0-0".into(),
            bag_weight_lb: 100.0,
            content: vec!["S=6".into()],
        };
        let product = product_from_args(args).unwrap();
        assert!(product.is_specialized());
        assert_eq!(product.content(Nutrient::S), 6.0);

        let bad = ProductArgs {
            id: "x".into(),
            name: "X".into(),
            category: "organic".into(),
            price: 1.0,
            grade: "1-1-1".into(),
            bag_weight_lb: 100.0,
            content: vec![],
        };
        assert!(product_from_args(bad).is_err());
    }

    #[test]
    fn stored_boost_overrides_config() {
        let app = app();
        assert_eq!(app.settings().unwrap().efficiency.nitrogen_efficiency_boost, 1.21);

        app.db.set_nitrogen_boost(1.4).unwrap();
        assert_eq!(app.settings().unwrap().efficiency.nitrogen_efficiency_boost, 1.4);
        assert_eq!(
            app.planner()
                .unwrap()
                .plan(
                    &SoilReading::new(6.5, 3.0),
                    &ProductionTarget::new("maiz", 1.0, AreaUnit::Hectare)
                        .with_yield(5.0, YieldUnit::MetricTon)
                )
                .unwrap()
                .plans
                .technological
                .nitrogen_boost_pct,
            40.0
        );
    }

    #[test]
    fn crop_comes_from_args_then_soil_then_default() {
        let soil = SoilReading::default();
        assert_eq!(resolve_crop(&plan_args(Some("cafe")), &soil), "cafe");
        assert_eq!(resolve_crop(&plan_args(None), &soil), "default");

        let mut hinted = SoilReading::default();
        hinted.crop = Some("frijol".into());
        assert_eq!(resolve_crop(&plan_args(None), &hinted), "frijol");
    }

    #[test]
    fn bad_targets_stop_before_planning() {
        let planner = app().planner().unwrap();
        let mut args = plan_args(Some("maiz"));
        args.area = 0.0;
        assert!(matches!(
            run_plan(&planner, &SoilReading::default(), &args),
            Err(FertiplanError::InvalidData(_))
        ));
    }

    #[test]
    fn soil_json_uses_report_field_names() {
        let dir = std::env::temp_dir().join(format!("fertiplan-soil-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("soil.json");
        std::fs::write(
            &path,
            r#"{"ph": 5.8, "organicMatter": 2.5, "phosphorus": 12, "potassium": 0.4, "otherData": ["Zinc: 1 ppm"]}"#,
        )
        .unwrap();

        let soil = read_soil(&path).unwrap();
        assert_eq!(soil.organic_matter, 2.5);
        assert_eq!(soil.nitrogen, 0.0);
        assert_eq!(soil.other_data, vec!["Zinc: 1 ppm".to_string()]);

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
