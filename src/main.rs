mod cli;
mod config;
mod db;
mod error;
mod models;
mod references;
mod services;

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

#[derive(Parser)]
#[command(name = "fourfactors")]
#[command(about = "Predict NBA margins from the four factors and price them against the betting line")]
struct Cli {
    /// Season whose stats, schedule and model to use (overrides SEASON)
    #[arg(short, long, global = true)]
    season: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database
    InitDb,
    /// Import a season's four factors from a misc stats CSV
    ImportStats {
        #[arg(short, long)]
        file: PathBuf,
    },
    /// Import a season's schedule (and any final scores) from CSV
    ImportSchedule {
        #[arg(short, long)]
        file: PathBuf,
    },
    /// Fit the four factors regression on the season's finished games
    Fit {
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Predict a single matchup against a betting line
    Predict {
        #[arg(long)]
        home: String,
        #[arg(long)]
        away: String,
        /// Home team's line, e.g. -4.5 when the home team is favored
        #[arg(short, long, allow_hyphen_values = true, default_value = "0")]
        line: f64,
        #[arg(short, long)]
        model: Option<PathBuf>,
    },
    /// Predict every game scheduled on a date
    PredictDay {
        /// Date as YYYY-MM-DD
        #[arg(short, long)]
        date: NaiveDate,
        /// CSV of game_id,line; games without a line use 0
        #[arg(short, long)]
        lines: Option<PathBuf>,
        #[arg(short, long)]
        model: Option<PathBuf>,
        /// Store the predictions in the database
        #[arg(long)]
        save: bool,
        /// Write the predictions to a CSV file
        #[arg(long)]
        export: Option<PathBuf>,
    },
    /// Record final scores against stored predictions
    Grade,
    /// Delete the season's stats, schedule and predictions
    Clear,
    /// List canonical team names and abbreviations
    Teams,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let mut config = Config::from_env().with_season(cli.season);

    match cli.command {
        Commands::InitDb => {
            tracing::info!("Initializing database...");
            db::init_database(&config.database_url).await?;
        }
        Commands::ImportStats { file } => {
            tracing::info!("Importing team stats for {}", config.season);
            cli::import_stats(&config, &file).await?;
        }
        Commands::ImportSchedule { file } => {
            tracing::info!("Importing schedule for {}", config.season);
            cli::import_schedule(&config, &file).await?;
        }
        Commands::Fit { output } => {
            tracing::info!("Fitting model for {}", config.season);
            cli::fit_model(&config, output.as_deref()).await?;
        }
        Commands::Predict { home, away, line, model } => {
            if let Some(model) = model {
                config.model_path = model;
            }
            cli::predict_game(&config, &home, &away, line).await?;
        }
        Commands::PredictDay {
            date,
            lines,
            model,
            save,
            export,
        } => {
            if let Some(model) = model {
                config.model_path = model;
            }
            tracing::info!("Generating predictions for {}", date);
            cli::predict_day(&config, date, lines.as_deref(), save, export.as_deref()).await?;
        }
        Commands::Grade => {
            cli::grade(&config).await?;
        }
        Commands::Clear => {
            cli::clear(&config).await?;
        }
        Commands::Teams => {
            cli::list_teams();
        }
    }

    Ok(())
}
