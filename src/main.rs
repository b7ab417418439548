mod app;
mod cli;
mod config;
mod datasources;
mod db;
mod error;
mod logic;
mod models;
mod output;

use app::App;
use clap::Parser;
use cli::{Cli, Commands};
use config::Config;
use db::Database;
use error::Result;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Load .env file if present
    let _ = dotenvy::dotenv();

    let level = match cli.verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    if let Commands::Init = cli.command {
        Config::setup_interactive(cli.config)?;
        return Ok(());
    }

    let config_found = Config::exists(cli.config.as_ref());
    let config = Config::load(cli.config.clone())?;
    config.settings().validate()?;

    let db_path = Config::db_path(cli.data_dir.as_ref())?;
    let db = Database::open(&db_path)?;
    let app = App::new(config, db);

    match cli.command {
        Commands::Plan(args) => app.plan(args).await,
        Commands::Extract { document, out } => app.extract(&document, out).await,
        Commands::Advise { soil, output } => app.advise(&soil, output),
        Commands::Catalog { action } => app.catalog(action),
        Commands::Rates { action } => app.rates(action),
        Commands::Params { action } => app.params(action),
        Commands::Reset => app.reset(),
        Commands::Check => {
            if config_found {
                println!("Configuration OK");
            } else {
                println!("Configuration OK (no config.yaml found, using defaults)");
            }
            app.check()
        }
        Commands::Init => Ok(()),
    }
}
