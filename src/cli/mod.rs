use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::path::Path;

use crate::config::Config;
use crate::db::{
    clear_season, create_pool, grade_predictions, init_database_with_pool, insert_predictions, insert_scheduled_game,
    insert_team_stats, read_predictions, read_schedule, read_team_stats,
};
use crate::references::Team;
use crate::services::{
    describe, partition_day, read_lines_csv, read_schedule_csv, read_team_stats_csv, training_samples,
    write_predictions_csv, LinearModel, PredictionEngine,
};

async fn open(config: &Config) -> Result<SqlitePool> {
    let pool = create_pool(&config.database_url).await?;
    init_database_with_pool(&pool).await?;
    Ok(pool)
}

pub async fn import_stats(config: &Config, file: &Path) -> Result<()> {
    let pool = open(config).await?;
    let rows = read_team_stats_csv(file)?;

    insert_team_stats(&pool, &config.season, &rows).await?;
    println!("📥 Imported four factors for {} teams into season {}", rows.len(), config.season);
    Ok(())
}

pub async fn import_schedule(config: &Config, file: &Path) -> Result<()> {
    let pool = open(config).await?;
    let games = read_schedule_csv(file)?;

    for game in &games {
        insert_scheduled_game(&pool, &config.season, game).await?;
    }
    let finished = games.iter().filter(|g| g.home_margin().is_some()).count();
    println!(
        "📥 Imported {} games ({} with final scores) into season {}",
        games.len(),
        finished,
        config.season
    );
    Ok(())
}

async fn fit_from_database(pool: &SqlitePool, season: &str) -> Result<LinearModel> {
    let stats = read_team_stats(pool, season).await?;
    let schedule = read_schedule(pool, season).await?;
    let samples = training_samples(&schedule, &stats);
    LinearModel::fit(&samples, season).with_context(|| format!("Could not fit a model for season {}", season))
}

pub async fn fit_model(config: &Config, output: Option<&Path>) -> Result<()> {
    let pool = open(config).await?;
    let model = fit_from_database(&pool, &config.season).await?;
    let path = output.unwrap_or(config.model_path.as_path());
    model.save(path)?;

    println!(
        "📈 Fitted four factors model on {} games (residual std {:.2}) -> {}",
        model.samples,
        model.residual_std,
        path.display()
    );
    Ok(())
}

/// Load the saved model for the season, fitting one from the database when
/// none has been saved yet.
async fn load_model(pool: &SqlitePool, config: &Config) -> Result<LinearModel> {
    if config.model_path.exists() {
        let model = LinearModel::load(&config.model_path)
            .with_context(|| format!("Failed to load model from {}", config.model_path.display()))?;
        tracing::info!("Loaded model for {} from {}", model.season, config.model_path.display());
        return Ok(model);
    }

    tracing::info!("No saved model at {}, fitting one", config.model_path.display());
    let model = fit_from_database(pool, &config.season).await?;
    model.save(&config.model_path)?;
    Ok(model)
}

pub async fn predict_game(config: &Config, home: &str, away: &str, line: f64) -> Result<()> {
    let pool = open(config).await?;
    let model = load_model(&pool, config).await?;
    let stats = read_team_stats(&pool, &config.season).await?;

    let engine = PredictionEngine::new(&model);
    let result = engine.predict_game(&stats, Local::now().naive_local(), home, away, line)?;

    println!("🔮 {}", describe(&result));
    Ok(())
}

pub async fn predict_day(
    config: &Config,
    date: NaiveDate,
    lines: Option<&Path>,
    save: bool,
    export: Option<&Path>,
) -> Result<()> {
    let pool = open(config).await?;
    let model = load_model(&pool, config).await?;
    let stats = read_team_stats(&pool, &config.season).await?;
    let schedule = read_schedule(&pool, &config.season).await?;
    let lines = match lines {
        Some(path) => read_lines_csv(path)?,
        None => HashMap::new(),
    };

    let engine = PredictionEngine::new(&model);
    let predictions = engine.predict_day(date, &schedule, &stats, &lines)?;
    let (results, failed) = partition_day(predictions);

    println!("🏀 Predictions for {}:\n", date);
    for (game_id, result) in &results {
        println!("#{} {}", game_id, result.start_time.format("%H:%M"));
        for line in describe(result).lines() {
            println!("   {}", line);
        }
        println!();
    }
    for (game_id, error) in &failed {
        println!("❌ Game #{}: {}", game_id, error);
    }

    if save && !results.is_empty() {
        insert_predictions(&pool, &config.season, &results).await?;
        println!("💾 Saved {} predictions", results.len());
    }

    if let Some(path) = export {
        let rows: Vec<_> = results.iter().map(|(_, result)| result.clone()).collect();
        write_predictions_csv(path, &rows)?;
        println!("📄 Exported {} predictions to {}", rows.len(), path.display());
    }

    Ok(())
}

pub async fn grade(config: &Config) -> Result<()> {
    let pool = open(config).await?;
    let graded = grade_predictions(&pool, &config.season).await?;
    let predictions = read_predictions(&pool, &config.season).await?;

    let decided: Vec<bool> = predictions.iter().filter_map(|p| p.correct).collect();
    let correct = decided.iter().filter(|c| **c).count();

    println!("✅ Graded {} predictions for season {}", graded, config.season);
    if !decided.is_empty() {
        println!(
            "   Against the line: {}-{} ({:.1}%)",
            correct,
            decided.len() - correct,
            correct as f64 / decided.len() as f64 * 100.0
        );
    }
    Ok(())
}

pub async fn clear(config: &Config) -> Result<()> {
    let pool = open(config).await?;
    clear_season(&pool, &config.season).await?;
    println!("🧹 Cleared season {}", config.season);
    Ok(())
}

pub fn list_teams() {
    println!("🏀 Teams:\n");
    for team in Team::all() {
        let note = if team.is_historical() { " (historical)" } else { "" };
        println!("   {}  {}{}", team.abbreviation(), team.name(), note);
    }
}
