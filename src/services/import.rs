use anyhow::{anyhow, Context, Result};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::models::{PredictionResult, ScheduledGame, TeamStatsRow, TIME_FORMAT};
use crate::references::Team;

const TIME_FORMATS: [&str; 3] = [TIME_FORMAT, "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M:%S"];

#[derive(Debug, Deserialize)]
struct ScheduleRecord {
    id: i64,
    start_time: String,
    home_team: String,
    away_team: String,
    home_score: Option<i32>,
    away_score: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct LineRecord {
    game_id: i64,
    line: f64,
}

#[derive(Debug, Serialize)]
struct PredictionRecord<'a> {
    start_time: String,
    home_team: &'a str,
    away_team: &'a str,
    home_line: f64,
    projection: f64,
    line_probability: f64,
    function: &'a str,
}

pub fn parse_start_time(value: &str) -> Result<NaiveDateTime> {
    let value = value.trim();
    TIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .ok_or_else(|| anyhow!("Unrecognized start time '{}'", value))
}

/// Read a misc stats export. Columns are matched by header name; anything
/// besides the team name and the four factors is ignored. The asterisk
/// Basketball-Reference puts after playoff teams is stripped.
pub fn read_team_stats_csv(path: &Path) -> Result<Vec<TeamStatsRow>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open team stats file {}", path.display()))?;

    let mut rows = Vec::new();
    for (index, record) in reader.deserialize::<TeamStatsRow>().enumerate() {
        let mut row = record.with_context(|| format!("Bad team stats row {}", index + 1))?;
        row.team_name = row.team_name.trim().trim_end_matches('*').trim().to_string();
        rows.push(row);
    }

    tracing::info!("Read {} team stat rows from {}", rows.len(), path.display());
    Ok(rows)
}

pub fn read_schedule_csv(path: &Path) -> Result<Vec<ScheduledGame>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open schedule file {}", path.display()))?;

    let mut games = Vec::new();
    for (index, record) in reader.deserialize::<ScheduleRecord>().enumerate() {
        let record = record.with_context(|| format!("Bad schedule row {}", index + 1))?;
        games.push(ScheduledGame {
            id: record.id,
            start_time: parse_start_time(&record.start_time)?,
            home_team: expand_abbreviation(&record.home_team),
            away_team: expand_abbreviation(&record.away_team),
            home_score: record.home_score,
            away_score: record.away_score,
        });
    }

    tracing::info!("Read {} scheduled games from {}", games.len(), path.display());
    Ok(games)
}

/// Schedules sometimes list teams by abbreviation ("LAL"); store the full
/// name so the resolver sees it. Anything else is kept as written.
fn expand_abbreviation(team: &str) -> String {
    Team::from_abbreviation(team)
        .map(|t| t.name().to_string())
        .unwrap_or_else(|| team.trim().to_string())
}

/// Betting lines keyed by schedule id (`game_id,line`).
pub fn read_lines_csv(path: &Path) -> Result<HashMap<i64, f64>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open lines file {}", path.display()))?;

    let mut lines = HashMap::new();
    for record in reader.deserialize::<LineRecord>() {
        let record = record?;
        if !record.line.is_finite() {
            return Err(anyhow!("Line for game {} is not a number", record.game_id));
        }
        lines.insert(record.game_id, record.line);
    }
    Ok(lines)
}

pub fn write_predictions_csv(path: &Path, results: &[PredictionResult]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;

    for result in results {
        writer.serialize(PredictionRecord {
            start_time: result.start_time.format(TIME_FORMAT).to_string(),
            home_team: result.home_team.name(),
            away_team: result.away_team.name(),
            home_line: result.line,
            projection: result.prediction,
            line_probability: result.probability,
            function: result.function.as_str(),
        })?;
    }
    writer.flush()?;

    tracing::info!("Wrote {} predictions to {}", results.len(), path.display());
    Ok(())
}
