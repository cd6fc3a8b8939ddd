use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use statrs::distribution::{ContinuousCDF, Normal};
use std::collections::HashMap;

use crate::error::{PredictionError, Result};
use crate::models::{DayPrediction, PredictionResult, ProbabilityFunction, Role, ScheduledGame, TeamStatsRow};
use crate::references::{resolve_team, Team};
use crate::services::features::build_feature_vector;
use crate::services::four_factors::extract_four_factors;
use crate::services::regression::FittedModel;

/// Line used for games with no betting line supplied.
pub const NEUTRAL_LINE: f64 = 0.0;

/// Probability of the betting line if the model were true.
///
/// "If the model were true" means the residuals are homoscedastic and
/// normal, so the actual home margin is distributed as
/// `Normal(prediction, residual_std)`. The line is signed from the home
/// team's betting perspective, so the margin it implies is `-line`.
///
/// The tail reported is always the one on the side of the line the model
/// leans away from: the CDF when the prediction is above the implied margin,
/// the survival function when it is below. A prediction exactly on the line
/// is `0.5` with [`ProbabilityFunction::Exact`].
pub fn line_probability(prediction: f64, line: f64, residual_std: f64) -> Result<(f64, ProbabilityFunction)> {
    if !line.is_finite() {
        return Err(PredictionError::InvalidLine { line });
    }
    if !prediction.is_finite() {
        return Err(PredictionError::InvalidModel {
            reason: format!("model produced a non-numeric prediction: {}", prediction),
        });
    }

    if !residual_std.is_finite() || residual_std <= 0.0 {
        return Err(PredictionError::InvalidModel {
            reason: format!("residual standard deviation must be positive, got {}", residual_std),
        });
    }
    let dist = Normal::new(prediction, residual_std).map_err(|e| PredictionError::InvalidModel {
        reason: e.to_string(),
    })?;

    let line_margin = -line;

    if prediction > line_margin {
        Ok((dist.cdf(line_margin), ProbabilityFunction::Cdf))
    } else if prediction < line_margin {
        Ok((dist.sf(line_margin), ProbabilityFunction::Sf))
    } else {
        Ok((0.5, ProbabilityFunction::Exact))
    }
}

/// Applies a fitted model to matchups. Holds no state of its own; the model
/// is borrowed and never mutated.
pub struct PredictionEngine<'a, M: FittedModel + ?Sized> {
    model: &'a M,
}

impl<'a, M: FittedModel + ?Sized> PredictionEngine<'a, M> {
    pub fn new(model: &'a M) -> Self {
        Self { model }
    }

    /// Predict the home margin for two canonical teams and score it against
    /// `line`.
    pub fn predict_matchup(
        &self,
        stats: &[TeamStatsRow],
        start_time: NaiveDateTime,
        home_team: Team,
        away_team: Team,
        line: f64,
    ) -> Result<PredictionResult> {
        if !line.is_finite() {
            return Err(PredictionError::InvalidLine { line });
        }

        let home = extract_four_factors(home_team, stats, Role::Home)?;
        let away = extract_four_factors(away_team, stats, Role::Away)?;
        let features = build_feature_vector(&home, &away)?;

        let prediction = self.model.predict(&features)?;
        let (probability, function) = line_probability(prediction, line, self.model.residual_std())?;

        tracing::debug!(
            "{} vs {}: projection {:.2}, line {}, {} {:.4}",
            home_team,
            away_team,
            prediction,
            line,
            function,
            probability
        );

        Ok(PredictionResult {
            start_time,
            home_team,
            away_team,
            line,
            prediction,
            probability,
            function,
        })
    }

    /// Same as [`predict_matchup`](Self::predict_matchup) but starting from
    /// free-text team names.
    pub fn predict_game(
        &self,
        stats: &[TeamStatsRow],
        start_time: NaiveDateTime,
        home_team: &str,
        away_team: &str,
        line: f64,
    ) -> Result<PredictionResult> {
        let home = resolve_team(home_team)?;
        let away = resolve_team(away_team)?;
        self.predict_matchup(stats, start_time, home, away, line)
    }

    /// Predict every game that starts on `date`, in schedule order.
    ///
    /// Games are matched on the half-open window `[date 00:00, date+1 00:00)`.
    /// Each game uses its entry in `lines` or the neutral line. A game that
    /// fails is reported in its own [`DayPrediction`] and the rest of the
    /// slate still runs.
    pub fn predict_day(
        &self,
        date: NaiveDate,
        schedule: &[ScheduledGame],
        stats: &[TeamStatsRow],
        lines: &HashMap<i64, f64>,
    ) -> Result<Vec<DayPrediction>> {
        let games = games_on_day(date, schedule);
        if games.is_empty() {
            return Err(PredictionError::NoGamesScheduled { date });
        }

        let predictions: Vec<DayPrediction> = games
            .into_iter()
            .map(|game| {
                let line = lines.get(&game.id).copied().unwrap_or(NEUTRAL_LINE);
                let outcome = self.predict_game(stats, game.start_time, &game.home_team, &game.away_team, line);
                if let Err(e) = &outcome {
                    tracing::warn!(
                        "Could not predict game {} ({} vs {}): {}",
                        game.id,
                        game.home_team,
                        game.away_team,
                        e
                    );
                }
                DayPrediction {
                    game_id: game.id,
                    outcome,
                }
            })
            .collect();

        let failed = predictions.iter().filter(|p| p.outcome.is_err()).count();
        tracing::info!(
            "Predicted {} of {} games on {}",
            predictions.len() - failed,
            predictions.len(),
            date
        );

        Ok(predictions)
    }
}

/// Schedule rows starting within `[date 00:00, date+1 00:00)`, order kept.
pub fn games_on_day(date: NaiveDate, schedule: &[ScheduledGame]) -> Vec<&ScheduledGame> {
    let start = date.and_time(NaiveTime::MIN);
    let end = start + Duration::days(1);
    schedule
        .iter()
        .filter(|game| game.start_time >= start && game.start_time < end)
        .collect()
}

/// Split a day batch into its successful predictions and its failures.
pub fn partition_day(predictions: Vec<DayPrediction>) -> (Vec<(i64, PredictionResult)>, Vec<(i64, PredictionError)>) {
    let mut ok = Vec::new();
    let mut failed = Vec::new();
    for prediction in predictions {
        match prediction.outcome {
            Ok(result) => ok.push((prediction.game_id, result)),
            Err(e) => failed.push((prediction.game_id, e)),
        }
    }
    (ok, failed)
}
