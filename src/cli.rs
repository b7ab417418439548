use crate::models::{AreaUnit, YieldUnit};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "fertiplan",
    version,
    about = "Fertilization plans from soil lab reports"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to config.yaml
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Override SQLite data directory
    #[arg(short, long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Increase log verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compute nutrient requirements and both fertilizer plans
    Plan(PlanArgs),
    /// Extract soil readings from a lab report (PDF or image)
    Extract {
        /// Soil report to analyze
        document: PathBuf,

        /// Write the extracted soil JSON to a file
        #[arg(short = 'O', long = "out", value_name = "FILE")]
        out: Option<PathBuf>,
    },
    /// Soil correction advice only
    Advise {
        /// Soil reading as JSON
        #[arg(long, value_name = "FILE")]
        soil: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },
    /// Manage the fertilizer catalog
    Catalog {
        #[command(subcommand)]
        action: CatalogAction,
    },
    /// Manage crop nutrient removal rates
    Rates {
        #[command(subcommand)]
        action: RatesAction,
    },
    /// Show or change planning parameters
    Params {
        #[command(subcommand)]
        action: ParamsAction,
    },
    /// Restore the default catalog, removal rates and parameters
    Reset,
    /// Re-run interactive setup
    Init,
    /// Validate config, store and planner
    Check,
}

#[derive(Args)]
pub struct PlanArgs {
    /// Soil reading as JSON
    #[arg(long, value_name = "FILE", conflicts_with = "document", required_unless_present = "document")]
    pub soil: Option<PathBuf>,

    /// Soil report to analyze first (PDF or image)
    #[arg(long, value_name = "FILE")]
    pub document: Option<PathBuf>,

    /// Crop id (falls back to the soil report's crop, then `default`)
    #[arg(long)]
    pub crop: Option<String>,

    /// Field area
    #[arg(long)]
    pub area: f64,

    /// Area unit: ha or mz
    #[arg(long, default_value = "ha")]
    pub area_unit: AreaUnit,

    /// Target yield per one unit of area
    #[arg(long = "yield")]
    pub target_yield: f64,

    /// Yield unit: kg, lb, qq or t
    #[arg(long, default_value = "t")]
    pub yield_unit: YieldUnit,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    pub output: OutputFormat,
}

#[derive(Subcommand)]
pub enum CatalogAction {
    /// List products in catalog order
    List {
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },
    /// Add a product or update an existing one
    Add(ProductArgs),
    /// Remove a product
    Remove {
        id: String,
    },
}

#[derive(Args)]
pub struct ProductArgs {
    /// Unique product id
    pub id: String,

    /// Display name
    #[arg(long)]
    pub name: String,

    /// commodity or specialized
    #[arg(long, default_value = "commodity")]
    pub category: String,

    /// Price per bag
    #[arg(long)]
    pub price: f64,

    /// N-P₂O₅-K₂O label, e.g. 15-15-15
    #[arg(long)]
    pub grade: String,

    /// Bag weight in pounds
    #[arg(long, default_value_t = 100.0)]
    pub bag_weight_lb: f64,

    /// Secondary or micronutrient content, e.g. S=4 (repeatable)
    #[arg(long = "content", value_name = "NUTRIENT=PCT")]
    pub content: Vec<String>,
}

#[derive(Subcommand)]
pub enum RatesAction {
    /// List removal rates
    List {
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },
    /// Set kg N, P₂O₅ and K₂O removed per ton of yield for a crop
    Set {
        crop: String,
        n: f64,
        p: f64,
        k: f64,
    },
    /// Remove a crop (the default entry cannot be removed)
    Remove {
        crop: String,
    },
}

#[derive(Subcommand)]
pub enum ParamsAction {
    /// Show efficiency parameters and factors in effect
    Show,
    /// Change stored parameters
    Set {
        /// Nitrogen efficiency boost for specialized products (1.21 = +21%)
        #[arg(long)]
        boost: f64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn plan_arguments_parse_unit_tags() {
        let cli = Cli::try_parse_from([
            "fertiplan", "plan", "--soil", "soil.json", "--crop", "cafe", "--area", "3",
            "--area-unit", "mz", "--yield", "30", "--yield-unit", "qq", "-o", "json",
        ])
        .unwrap();

        let Commands::Plan(args) = cli.command else {
            panic!("expected plan command");
        };
        assert_eq!(args.area_unit, AreaUnit::Manzana);
        assert_eq!(args.yield_unit, YieldUnit::Quintal);
        assert_eq!(args.output, OutputFormat::Json);
        assert_eq!(args.crop.as_deref(), Some("cafe"));
    }

    #[test]
    fn unknown_unit_tag_is_rejected() {
        let result = Cli::try_parse_from([
            "fertiplan", "plan", "--soil", "soil.json", "--area", "1", "--area-unit", "acre",
            "--yield", "5",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn plan_needs_a_soil_source() {
        let result = Cli::try_parse_from(["fertiplan", "plan", "--area", "1", "--yield", "5"]);
        assert!(result.is_err());
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["fertiplan", "check", "-vv", "--data-dir", "/tmp/x"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/x")));
    }
}
