use anyhow::Result;
use chrono::NaiveDateTime;
use sqlx::{sqlite::SqliteConnectOptions, sqlite::SqliteRow, Row, SqlitePool};
use std::str::FromStr;
use uuid::Uuid;

use crate::models::*;

pub async fn create_pool(database_url: &str) -> Result<SqlitePool> {
    // Strip the "sqlite:" prefix to get the file path, create parent dir if needed
    let file_path = database_url
        .strip_prefix("sqlite:///")
        .or_else(|| database_url.strip_prefix("sqlite://"))
        .or_else(|| database_url.strip_prefix("sqlite:"))
        .unwrap_or(database_url);

    if !file_path.starts_with(":memory:") {
        if let Some(parent) = std::path::Path::new(file_path).parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
        }
    }

    let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

    let pool = SqlitePool::connect_with(options).await?;
    Ok(pool)
}

/// Called from the CLI where no pool exists yet.
pub async fn init_database(database_url: &str) -> Result<()> {
    let pool = create_pool(database_url).await?;
    init_database_with_pool(&pool).await
}

pub async fn init_database_with_pool(pool: &SqlitePool) -> Result<()> {
    // No uniqueness on (season, team_name): a duplicated team has to reach
    // the extractor and fail there as ambiguous.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS team_stats (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            season TEXT NOT NULL,
            team_name TEXT NOT NULL,
            efg_pct REAL NOT NULL,
            tov_pct REAL NOT NULL,
            orb_pct REAL NOT NULL,
            ft_rate REAL NOT NULL,
            opp_efg_pct REAL NOT NULL,
            opp_tov_pct REAL NOT NULL,
            drb_pct REAL NOT NULL,
            opp_ft_rate REAL NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schedule (
            id INTEGER NOT NULL,
            season TEXT NOT NULL,
            start_time TEXT NOT NULL,
            home_team TEXT NOT NULL,
            away_team TEXT NOT NULL,
            home_score INTEGER,
            away_score INTEGER,
            PRIMARY KEY (season, id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS predictions (
            id TEXT PRIMARY KEY,
            season TEXT NOT NULL,
            game_id INTEGER,
            start_time TEXT NOT NULL,
            home_team TEXT NOT NULL,
            away_team TEXT NOT NULL,
            home_line REAL NOT NULL,
            projection REAL NOT NULL,
            line_probability REAL NOT NULL,
            function TEXT NOT NULL,
            final_margin INTEGER,
            correct INTEGER,
            FOREIGN KEY (season, game_id) REFERENCES schedule (season, id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_team_stats_season ON team_stats(season)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_schedule_start ON schedule(season, start_time)")
        .execute(pool)
        .await?;

    // One stored prediction per scheduled game; ad hoc predictions have no game_id.
    sqlx::query("CREATE UNIQUE INDEX IF NOT EXISTS idx_predictions_game ON predictions(season, game_id)")
        .execute(pool)
        .await?;

    tracing::info!("Database initialized successfully");
    Ok(())
}

// Team stats operations

/// Replace the season's team stats with `rows`. Duplicates within `rows` are
/// kept as given.
pub async fn insert_team_stats(pool: &SqlitePool, season: &str, rows: &[TeamStatsRow]) -> Result<()> {
    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM team_stats WHERE season = ?")
        .bind(season)
        .execute(&mut *tx)
        .await?;

    for row in rows {
        sqlx::query(
            r#"
            INSERT INTO team_stats
            (season, team_name, efg_pct, tov_pct, orb_pct, ft_rate,
             opp_efg_pct, opp_tov_pct, drb_pct, opp_ft_rate)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(season)
        .bind(&row.team_name)
        .bind(row.efg_pct)
        .bind(row.tov_pct)
        .bind(row.orb_pct)
        .bind(row.ft_rate)
        .bind(row.opp_efg_pct)
        .bind(row.opp_tov_pct)
        .bind(row.drb_pct)
        .bind(row.opp_ft_rate)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;
    Ok(())
}

pub async fn read_team_stats(pool: &SqlitePool, season: &str) -> Result<Vec<TeamStatsRow>> {
    let rows = sqlx::query("SELECT * FROM team_stats WHERE season = ? ORDER BY id")
        .bind(season)
        .fetch_all(pool)
        .await?;

    Ok(rows
        .into_iter()
        .map(|row| TeamStatsRow {
            team_name: row.get("team_name"),
            efg_pct: row.get("efg_pct"),
            tov_pct: row.get("tov_pct"),
            orb_pct: row.get("orb_pct"),
            ft_rate: row.get("ft_rate"),
            opp_efg_pct: row.get("opp_efg_pct"),
            opp_tov_pct: row.get("opp_tov_pct"),
            drb_pct: row.get("drb_pct"),
            opp_ft_rate: row.get("opp_ft_rate"),
        })
        .collect())
}

// Schedule operations
pub async fn insert_scheduled_game(pool: &SqlitePool, season: &str, game: &ScheduledGame) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO schedule
        (id, season, start_time, home_team, away_team, home_score, away_score)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(season, id) DO UPDATE SET
            start_time = excluded.start_time,
            home_team  = excluded.home_team,
            away_team  = excluded.away_team,
            home_score = excluded.home_score,
            away_score = excluded.away_score
        "#,
    )
    .bind(game.id)
    .bind(season)
    .bind(game.start_time.format(TIME_FORMAT).to_string())
    .bind(&game.home_team)
    .bind(&game.away_team)
    .bind(game.home_score)
    .bind(game.away_score)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn read_schedule(pool: &SqlitePool, season: &str) -> Result<Vec<ScheduledGame>> {
    let rows = sqlx::query("SELECT * FROM schedule WHERE season = ? ORDER BY start_time, id")
        .bind(season)
        .fetch_all(pool)
        .await?;

    let mut games = Vec::new();
    for row in rows {
        games.push(ScheduledGame {
            id: row.get("id"),
            start_time: parse_time(&row.get::<String, _>("start_time"))?,
            home_team: row.get("home_team"),
            away_team: row.get("away_team"),
            home_score: row.get("home_score"),
            away_score: row.get("away_score"),
        });
    }

    Ok(games)
}

// Prediction operations

/// Store a prediction. A prediction for a game that already has one replaces
/// it (and clears any grade), keeping the existing id.
pub async fn insert_prediction(
    pool: &SqlitePool,
    season: &str,
    game_id: Option<i64>,
    result: &PredictionResult,
) -> Result<String> {
    let row = sqlx::query(
        r#"
        INSERT INTO predictions
        (id, season, game_id, start_time, home_team, away_team, home_line,
         projection, line_probability, function, final_margin, correct)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, NULL, NULL)
        ON CONFLICT(season, game_id) DO UPDATE SET
            start_time       = excluded.start_time,
            home_team        = excluded.home_team,
            away_team        = excluded.away_team,
            home_line        = excluded.home_line,
            projection       = excluded.projection,
            line_probability = excluded.line_probability,
            function         = excluded.function,
            final_margin     = NULL,
            correct          = NULL
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(season)
    .bind(game_id)
    .bind(result.start_time.format(TIME_FORMAT).to_string())
    .bind(result.home_team.name())
    .bind(result.away_team.name())
    .bind(result.line)
    .bind(result.prediction)
    .bind(result.probability)
    .bind(result.function.as_str())
    .fetch_one(pool)
    .await?;

    Ok(row.get("id"))
}

pub async fn insert_predictions(pool: &SqlitePool, season: &str, results: &[(i64, PredictionResult)]) -> Result<usize> {
    for (game_id, result) in results {
        insert_prediction(pool, season, Some(*game_id), result).await?;
    }
    tracing::info!("Saved {} predictions for {}", results.len(), season);
    Ok(results.len())
}

pub async fn read_predictions(pool: &SqlitePool, season: &str) -> Result<Vec<StoredPrediction>> {
    let rows = sqlx::query("SELECT * FROM predictions WHERE season = ? ORDER BY start_time, game_id")
        .bind(season)
        .fetch_all(pool)
        .await?;

    rows.iter().map(stored_prediction_from_row).collect()
}

fn stored_prediction_from_row(row: &SqliteRow) -> Result<StoredPrediction> {
    let function: String = row.get("function");
    Ok(StoredPrediction {
        id: row.get("id"),
        season: row.get("season"),
        game_id: row.get("game_id"),
        start_time: parse_time(&row.get::<String, _>("start_time"))?,
        home_team: row.get("home_team"),
        away_team: row.get("away_team"),
        home_line: row.get("home_line"),
        projection: row.get("projection"),
        line_probability: row.get("line_probability"),
        function: ProbabilityFunction::parse(&function)
            .ok_or_else(|| anyhow::anyhow!("Unknown probability function '{}'", function))?,
        final_margin: row.get("final_margin"),
        correct: row.get("correct"),
    })
}

/// Fill in the final margin and whether the projection landed on the right
/// side of the line, for every prediction whose game has finished.
///
/// A prediction is correct when the actual home margin and the projection
/// fall on the same side of `-home_line`. A push, or a projection exactly on
/// the line, leaves `correct` empty.
pub async fn grade_predictions(pool: &SqlitePool, season: &str) -> Result<usize> {
    let rows = sqlx::query(
        r#"
        SELECT p.id AS id, p.home_line AS home_line, p.projection AS projection,
               s.home_score AS home_score, s.away_score AS away_score
        FROM predictions p
        JOIN schedule s ON s.season = p.season AND s.id = p.game_id
        WHERE p.season = ? AND s.home_score IS NOT NULL AND s.away_score IS NOT NULL
        "#,
    )
    .bind(season)
    .fetch_all(pool)
    .await?;

    let mut graded = 0;
    for row in rows {
        let id: String = row.get("id");
        let home_line: f64 = row.get("home_line");
        let projection: f64 = row.get("projection");
        let margin = row.get::<i32, _>("home_score") - row.get::<i32, _>("away_score");

        sqlx::query("UPDATE predictions SET final_margin = ?, correct = ? WHERE id = ?")
            .bind(margin)
            .bind(beat_the_line(projection, margin, home_line))
            .bind(&id)
            .execute(pool)
            .await?;
        graded += 1;
    }

    tracing::info!("Graded {} predictions for {}", graded, season);
    Ok(graded)
}

fn beat_the_line(projection: f64, margin: i32, home_line: f64) -> Option<bool> {
    let line_margin = -home_line;
    let actual = margin as f64 - line_margin;
    let projected = projection - line_margin;
    if actual == 0.0 || projected == 0.0 {
        None
    } else {
        Some(actual.signum() == projected.signum())
    }
}

pub async fn clear_season(pool: &SqlitePool, season: &str) -> Result<()> {
    sqlx::query("DELETE FROM predictions WHERE season = ?").bind(season).execute(pool).await?;
    sqlx::query("DELETE FROM schedule WHERE season = ?").bind(season).execute(pool).await?;
    sqlx::query("DELETE FROM team_stats WHERE season = ?").bind(season).execute(pool).await?;
    tracing::info!("Cleared all data for {}", season);
    Ok(())
}

fn parse_time(value: &str) -> Result<NaiveDateTime> {
    Ok(NaiveDateTime::parse_from_str(value, TIME_FORMAT)?)
}
