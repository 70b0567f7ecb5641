use clap::{Parser, Subcommand};
use raingrid::{
    run_build_grid, run_build_table, run_ingest_geodata, run_ingest_weather, Config, PipelineError,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(version, about = "Boundary grid x hourly precipitation pipeline")]
struct Cli {
    /// Data root holding config/ and data/.
    #[arg(long, default_value = ".")]
    root: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the boundary polygon and road network into a dated snapshot.
    IngestGeodata,
    /// Fetch hourly precipitation for the configured points.
    IngestWeather,
    /// Rasterize the latest boundary snapshot into grid cells.
    BuildGrid,
    /// Join grid cells with the latest weather snapshot.
    BuildTable,
}

async fn run(cli: Cli) -> Result<(), PipelineError> {
    let config = Config::load(&cli.root)?;
    match cli.command {
        Commands::IngestGeodata => run_ingest_geodata(&cli.root, &config).await?,
        Commands::IngestWeather => run_ingest_weather(&cli.root, &config).await?,
        Commands::BuildGrid => run_build_grid(&cli.root, &config)?,
        Commands::BuildTable => run_build_table(&cli.root, &config)?,
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    let mut builder = pretty_env_logger::formatted_builder();
    builder.parse_filters(&std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()));
    builder.init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        log::error!("{e}");
        let mut source = std::error::Error::source(&e);
        while let Some(cause) = source {
            log::error!("caused by: {cause}");
            source = cause.source();
        }
        std::process::exit(1);
    }
}
