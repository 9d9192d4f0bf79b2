//! sensor-forecast CLI.
//!
//! Forecasts one gas channel of sensor telemetry, searches ARIMA orders and
//! decomposes the training period.

use anyhow::Context;
use clap::{Parser, Subcommand};
use sensor_forecast::config::ForecastConfig;
use sensor_forecast::models::arima::{ARIMASpec, GridSearchResult};
use sensor_forecast::models::ModelKind;
use sensor_forecast::pipeline::Pipeline;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "sensor-forecast")]
#[command(version, about = "ARIMA forecasting for gas sensor telemetry", long_about = None)]
struct Cli {
    /// Configuration file (.toml or .json)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Telemetry CSV file
    #[arg(long, global = true)]
    data: Option<PathBuf>,

    /// Channel to forecast (e.g. H2S, CO, LEL, O2)
    #[arg(short, long, global = true)]
    target: Option<String>,

    /// Output directory
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    /// ARIMA order as p,d,q
    #[arg(long, global = true, value_parser = parse_order)]
    order: Option<ARIMASpec>,

    /// Model family (arima, holt, ses)
    #[arg(short, long, global = true)]
    model: Option<ModelKind>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fit, forecast the validation period and write all outputs
    Run {
        /// Search ARIMA orders first and forecast with the best one
        #[arg(long)]
        grid_search: bool,
    },

    /// Backtest every ARIMA order in the grid on the training period
    GridSearch,

    /// Decompose the training period into trend, seasonal and residual
    Decompose {
        /// Cycle length in observations
        #[arg(short, long)]
        period: Option<usize>,
    },

    /// Print the effective configuration as TOML
    Config,
}

fn parse_order(raw: &str) -> Result<ARIMASpec, String> {
    let parts: Vec<usize> = raw
        .split(',')
        .map(|p| p.trim().parse::<usize>())
        .collect::<Result<_, _>>()
        .map_err(|e| format!("invalid order `{raw}`: {e}"))?;
    match parts.as_slice() {
        [p, d, q] => Ok(ARIMASpec::new(*p, *d, *q)),
        _ => Err(format!("order must have three components p,d,q, got `{raw}`")),
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<ForecastConfig> {
    let mut config = match &cli.config {
        Some(path) => ForecastConfig::from_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => ForecastConfig::default(),
    };

    if let Some(data) = &cli.data {
        config.data.path = data.clone();
    }
    if let Some(target) = &cli.target {
        config.data.target = target.clone();
    }
    if let Some(output) = &cli.output {
        config.output.directory = output.clone();
    }
    if let Some(order) = cli.order {
        config.model.order = order;
    }
    if let Some(model) = cli.model {
        config.model.kind = model;
    }
    match &cli.command {
        Commands::Run { grid_search: true } => config.grid.enabled = true,
        Commands::Decompose { period: Some(period) } => config.decomposition.period = *period,
        _ => {}
    }

    config.validate()?;
    Ok(config)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = load_config(&cli)?;

    match cli.command {
        Commands::Run { .. } => cmd_run(config)?,
        Commands::GridSearch => cmd_grid_search(config)?,
        Commands::Decompose { .. } => cmd_decompose(config)?,
        Commands::Config => print!("{}", config.to_toml()?),
    }

    Ok(())
}

fn cmd_run(config: ForecastConfig) -> anyhow::Result<()> {
    let summary = Pipeline::new(config).run()?;

    match summary.order {
        Some(order) => println!("Model:       {} {}", summary.model, order),
        None => println!("Model:       {}", summary.model),
    }
    println!("Channel:     {}", summary.channel);
    println!("Training:    {} points", summary.train_len);
    println!("Validation:  {} points", summary.validation_len);
    println!("MSE:         {:.3}", summary.metrics.mse);
    println!("RMSE:        {:.3}", summary.metrics.rmse);
    println!("MAE:         {:.3}", summary.metrics.mae);
    if let Some(coverage) = summary.metrics.coverage {
        println!("Coverage:    {:.1}%", coverage * 100.0);
    }
    for path in &summary.outputs {
        println!("Wrote        {}", path.display());
    }
    Ok(())
}

fn cmd_grid_search(config: ForecastConfig) -> anyhow::Result<()> {
    let table = config.output.path(&config.output.grid_csv);
    let result = Pipeline::new(config).grid_search()?;
    print!("{}", grid_summary(&result, &table));
    Ok(())
}

/// Per-order scores and the best order are already logged by the search.
fn grid_summary(result: &GridSearchResult, table: &Path) -> String {
    format!(
        "Scored:      {} of {} orders\nWrote        {}\n",
        result.scored().count(),
        result.evaluations.len(),
        table.display()
    )
}

fn cmd_decompose(config: ForecastConfig) -> anyhow::Result<()> {
    let chart = config.output.path(&config.output.decomposition_chart);
    let parts = Pipeline::new(config).decompose()?;

    println!("Period:             {}", parts.period);
    println!("Model:              {}", parts.model);
    println!("Seasonal strength:  {:.3}", parts.seasonal_strength());
    println!("Wrote               {}", chart.display());
    Ok(())
}
