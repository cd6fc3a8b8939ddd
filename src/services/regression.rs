use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{PredictionError, Result};
use crate::models::{Role, ScheduledGame, TeamStatsRow};
use crate::references::resolve_team;
use crate::services::features::{build_feature_vector, feature_names, FeatureVector};
use crate::services::four_factors::extract_four_factors;

/// Residual std below this fraction of the largest margin means the fit is
/// exact and the model has no real error estimate.
const MIN_RELATIVE_STD: f64 = 1e-9;

/// Anything that turns a matchup feature vector into an expected home margin.
///
/// The prediction engine only ever needs these two operations, so it stays
/// independent of how a model was trained. Implementations are read-only
/// after construction and may be shared across threads.
pub trait FittedModel: Send + Sync {
    fn predict(&self, features: &FeatureVector) -> Result<f64>;

    /// Standard deviation of the training residuals
    fn residual_std(&self) -> f64;
}

/// Ordinary least squares over the four factors of both teams.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    pub season: String,
    pub coefficients: BTreeMap<String, f64>,
    pub residual_std: f64,
    pub samples: usize,
}

impl LinearModel {
    /// Fit coefficients for every feature name (intercept included as the
    /// `const` column) by least squares.
    ///
    /// Needs more games than coefficients, and rejects a fit whose residuals
    /// vanish: with no spread left there is no distribution to price lines on.
    pub fn fit(samples: &[(FeatureVector, f64)], season: &str) -> Result<Self> {
        let names = feature_names();
        if samples.len() <= names.len() {
            return Err(PredictionError::InvalidModel {
                reason: format!(
                    "{} training games is not enough to fit {} coefficients with any residual error",
                    samples.len(),
                    names.len()
                ),
            });
        }

        let mut design = Vec::with_capacity(samples.len() * names.len());
        for (features, _) in samples {
            check_names(&names, features)?;
            design.extend(features.iter().map(|(_, value)| value));
        }

        let x = DMatrix::from_row_slice(samples.len(), names.len(), &design);
        let y = DVector::from_iterator(samples.len(), samples.iter().map(|(_, margin)| *margin));

        let beta = x
            .clone()
            .svd(true, true)
            .solve(&y, 1e-12)
            .map_err(|e| PredictionError::InvalidModel {
                reason: format!("least squares solve failed: {}", e),
            })?;

        let residuals = &y - &x * &beta;
        let residual_std = residuals.iter().population_std_dev();
        let scale = y.amax().max(1.0);
        if !residual_std.is_finite() || residual_std <= MIN_RELATIVE_STD * scale {
            return Err(PredictionError::InvalidModel {
                reason: format!("fit is exact (residual std {:e}), no error estimate", residual_std),
            });
        }

        let coefficients = names.into_iter().zip(beta.iter().copied()).collect();

        tracing::info!(
            "Fitted four factors model for {} on {} games (residual std {:.3})",
            season,
            samples.len(),
            residual_std
        );

        Ok(Self {
            season: season.to_string(),
            coefficients,
            residual_std,
            samples: samples.len(),
        })
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }
}

impl FittedModel for LinearModel {
    fn predict(&self, features: &FeatureVector) -> Result<f64> {
        if self.coefficients.len() != features.len() {
            return Err(PredictionError::DimensionMismatch {
                expected: self.coefficients.len(),
                actual: features.len(),
                detail: "model and feature vector disagree on size".to_string(),
            });
        }

        let mut prediction = 0.0;
        for (name, value) in features.iter() {
            let coefficient = self.coefficients.get(name).ok_or_else(|| {
                PredictionError::DimensionMismatch {
                    expected: self.coefficients.len(),
                    actual: features.len(),
                    detail: format!("model has no coefficient for '{}'", name),
                }
            })?;
            prediction += coefficient * value;
        }
        Ok(prediction)
    }

    fn residual_std(&self) -> f64 {
        self.residual_std
    }
}

fn check_names(expected: &[String], features: &FeatureVector) -> Result<()> {
    if features.len() != expected.len() || !features.names().eq(expected.iter().map(String::as_str)) {
        return Err(PredictionError::DimensionMismatch {
            expected: expected.len(),
            actual: features.len(),
            detail: "training row does not have the four factors columns".to_string(),
        });
    }
    Ok(())
}

/// Turn finished games into (features, home margin) training pairs.
///
/// Games without a final score are ignored. Games whose teams cannot be
/// resolved or found in the stats table are skipped with a warning.
pub fn training_samples(schedule: &[ScheduledGame], stats: &[TeamStatsRow]) -> Vec<(FeatureVector, f64)> {
    let mut samples = Vec::new();

    for game in schedule {
        let Some(margin) = game.home_margin() else {
            continue;
        };

        let features = resolve_team(&game.home_team)
            .and_then(|home| extract_four_factors(home, stats, Role::Home))
            .and_then(|home| {
                let away = resolve_team(&game.away_team)?;
                let away = extract_four_factors(away, stats, Role::Away)?;
                build_feature_vector(&home, &away)
            });

        match features {
            Ok(features) => samples.push((features, margin as f64)),
            Err(e) => tracing::warn!("Skipping game {} for training: {}", game.id, e),
        }
    }

    samples
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::references::Team;
    use crate::services::fixtures::{constant_model, stats_row};
    use chrono::NaiveDate;

    /// Deterministic, well-spread synthetic season for fitting.
    fn synthetic_season() -> (Vec<TeamStatsRow>, Vec<ScheduledGame>) {
        let teams: Vec<Team> = Team::all().filter(|t| !t.is_historical()).collect();
        let stats: Vec<TeamStatsRow> = teams
            .iter()
            .enumerate()
            .map(|(i, team)| {
                let i = i as f64;
                TeamStatsRow {
                    team_name: team.name().to_string(),
                    efg_pct: 0.48 + (i * 0.37).sin() * 0.03,
                    tov_pct: 12.0 + (i * 1.3).cos() * 1.5,
                    orb_pct: 22.0 + (i * 0.71).sin() * 3.0,
                    ft_rate: 0.20 + (i * 2.1).cos() * 0.04,
                    opp_efg_pct: 0.50 + (i * 0.53).cos() * 0.03,
                    opp_tov_pct: 12.5 + (i * 1.7).sin() * 1.5,
                    drb_pct: 77.0 + (i * 0.91).cos() * 2.5,
                    opp_ft_rate: 0.21 + (i * 1.1).sin() * 0.04,
                }
            })
            .collect();

        let start = NaiveDate::from_ymd_opt(2018, 10, 16).unwrap().and_hms_opt(19, 30, 0).unwrap();
        let mut schedule = Vec::new();
        let mut id = 0;
        for (h, home) in teams.iter().enumerate() {
            for (a, away) in teams.iter().enumerate() {
                if h == a || (h + a) % 3 != 0 {
                    continue;
                }
                id += 1;
                let (hs, as_) = (&stats[h], &stats[a]);
                let margin = 300.0 * (hs.efg_pct - as_.efg_pct) - 1.2 * (hs.tov_pct - as_.tov_pct)
                    + 0.4 * (hs.orb_pct - as_.orb_pct)
                    + 3.0;
                schedule.push(ScheduledGame {
                    id,
                    start_time: start + chrono::Duration::hours(id),
                    home_team: home.name().to_string(),
                    away_team: away.name().to_string(),
                    home_score: Some(100 + margin.round() as i32),
                    away_score: Some(100),
                });
            }
        }
        (stats, schedule)
    }

    #[test]
    fn test_fit_recovers_a_useful_model() {
        let (stats, schedule) = synthetic_season();
        let samples = training_samples(&schedule, &stats);
        assert!(samples.len() > 100);

        let model = LinearModel::fit(&samples, "2019").unwrap();
        assert_eq!(model.coefficients.len(), 17);
        assert_eq!(model.samples, samples.len());
        // Scores are rounded to whole points, so residuals stay below a point.
        assert!(model.residual_std > 0.0 && model.residual_std < 1.0);

        let (features, margin) = &samples[0];
        let predicted = model.predict(features).unwrap();
        assert!((predicted - margin).abs() < 2.0);
    }

    #[test]
    fn test_fit_needs_enough_games() {
        let (stats, schedule) = synthetic_season();
        let samples = training_samples(&schedule[..5], &stats);
        let err = LinearModel::fit(&samples, "2019").unwrap_err();
        assert!(matches!(err, PredictionError::InvalidModel { .. }));
    }

    #[test]
    fn test_fit_rejects_as_many_games_as_coefficients() {
        let (stats, schedule) = synthetic_season();
        let samples = training_samples(&schedule, &stats);

        let err = LinearModel::fit(&samples[..17], "2019").unwrap_err();
        assert!(matches!(err, PredictionError::InvalidModel { .. }));
    }

    #[test]
    fn test_fit_rejects_noise_free_margins() {
        let (stats, schedule) = synthetic_season();
        let samples: Vec<(FeatureVector, f64)> = training_samples(&schedule, &stats)
            .into_iter()
            .map(|(features, _)| {
                let margin = 3.0 + 250.0 * (features.get("efg_pct_h").unwrap() - features.get("efg_pct_a").unwrap());
                (features, margin)
            })
            .collect();
        assert!(samples.len() > 17);

        let err = LinearModel::fit(&samples, "2019").unwrap_err();
        assert!(matches!(err, PredictionError::InvalidModel { .. }));
    }

    #[test]
    fn test_training_skips_unfinished_and_unknown_games() {
        let (stats, mut schedule) = synthetic_season();
        schedule.truncate(3);
        schedule[0].home_score = None;
        schedule[1].away_team = "Springfield Isotopes".to_string();
        let samples = training_samples(&schedule, &stats);
        assert_eq!(samples.len(), 1);
    }

    #[test]
    fn test_predict_rejects_mismatched_model() {
        let stats = vec![stats_row("Miami Heat", 0.0), stats_row("Utah Jazz", 0.0)];
        let home = extract_four_factors(Team::MiamiHeat, &stats, Role::Home).unwrap();
        let away = extract_four_factors(Team::UtahJazz, &stats, Role::Away).unwrap();
        let features = build_feature_vector(&home, &away).unwrap();

        let mut model = constant_model(2.5, 12.0);
        assert!((model.predict(&features).unwrap() - 2.5).abs() < 1e-12);

        model.coefficients.remove("drb_pct_a");
        model.coefficients.insert("pace_a".to_string(), 1.0);
        let err = model.predict(&features).unwrap_err();
        assert!(matches!(err, PredictionError::DimensionMismatch { .. }));

        model.coefficients.remove("pace_a");
        let err = model.predict(&features).unwrap_err();
        assert!(matches!(err, PredictionError::DimensionMismatch { expected: 16, actual: 17, .. }));
    }

    #[test]
    fn test_model_save_and_load() {
        let model = constant_model(1.5, 11.0);
        let path = std::env::temp_dir().join(format!("fourfactors_model_{}.json", std::process::id()));
        model.save(&path).unwrap();
        let loaded = LinearModel::load(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(loaded, model);
    }
}
