use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::PredictionError;
use crate::references::Team;

/// Text form of timestamps in storage and CSV exports.
pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One team's season four factors, as read from the misc stats table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamStatsRow {
    pub team_name: String,
    pub efg_pct: f64,
    pub tov_pct: f64,
    pub orb_pct: f64,
    pub ft_rate: f64,
    pub opp_efg_pct: f64,
    pub opp_tov_pct: f64,
    pub drb_pct: f64,
    pub opp_ft_rate: f64,
}

impl TeamStatsRow {
    /// The four factors paired with their column names, in table order.
    pub fn four_factors(&self) -> [(&'static str, f64); 8] {
        [
            ("efg_pct", self.efg_pct),
            ("tov_pct", self.tov_pct),
            ("orb_pct", self.orb_pct),
            ("ft_rate", self.ft_rate),
            ("opp_efg_pct", self.opp_efg_pct),
            ("opp_tov_pct", self.opp_tov_pct),
            ("drb_pct", self.drb_pct),
            ("opp_ft_rate", self.opp_ft_rate),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledGame {
    pub id: i64,
    pub start_time: NaiveDateTime,
    pub home_team: String,
    pub away_team: String,
    pub home_score: Option<i32>,
    pub away_score: Option<i32>,
}

impl ScheduledGame {
    /// Home margin of victory, once both scores are in.
    pub fn home_margin(&self) -> Option<i32> {
        match (self.home_score, self.away_score) {
            (Some(home), Some(away)) => Some(home - away),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Home,
    Away,
}

impl Role {
    pub fn suffix(&self) -> &'static str {
        match self {
            Role::Home => "_h",
            Role::Away => "_a",
        }
    }
}

/// Which tail of the outcome distribution a line probability was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbabilityFunction {
    Cdf,
    Sf,
    /// Prediction sits exactly on the line
    Exact,
}

impl ProbabilityFunction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProbabilityFunction::Cdf => "cdf",
            ProbabilityFunction::Sf => "sf",
            ProbabilityFunction::Exact => "exact",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "cdf" => Some(ProbabilityFunction::Cdf),
            "sf" => Some(ProbabilityFunction::Sf),
            "exact" => Some(ProbabilityFunction::Exact),
            _ => None,
        }
    }
}

impl fmt::Display for ProbabilityFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub start_time: NaiveDateTime,
    pub home_team: Team,
    pub away_team: Team,
    pub line: f64,
    /// Expected home margin of victory
    pub prediction: f64,
    pub probability: f64,
    pub function: ProbabilityFunction,
}

/// Outcome of one game in a day batch. Failures stay attached to their game
/// so one bad row does not sink the slate.
#[derive(Debug, Clone)]
pub struct DayPrediction {
    pub game_id: i64,
    pub outcome: Result<PredictionResult, PredictionError>,
}

/// A prediction as persisted in the `predictions` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredPrediction {
    pub id: String,
    pub season: String,
    pub game_id: Option<i64>,
    pub start_time: NaiveDateTime,
    pub home_team: String,
    pub away_team: String,
    pub home_line: f64,
    pub projection: f64,
    pub line_probability: f64,
    pub function: ProbabilityFunction,
    /// Final home margin (home score minus away score) once graded
    pub final_margin: Option<i32>,
    pub correct: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probability_function_round_trips_through_text() {
        for function in [ProbabilityFunction::Cdf, ProbabilityFunction::Sf, ProbabilityFunction::Exact] {
            assert_eq!(ProbabilityFunction::parse(function.as_str()), Some(function));
        }
        assert_eq!(ProbabilityFunction::parse("SF"), Some(ProbabilityFunction::Sf));
        assert_eq!(ProbabilityFunction::parse("pdf"), None);
    }

    #[test]
    fn test_home_margin_requires_both_scores() {
        let mut game = ScheduledGame {
            id: 1,
            start_time: chrono::NaiveDate::from_ymd_opt(2018, 10, 16)
                .unwrap()
                .and_hms_opt(20, 0, 0)
                .unwrap(),
            home_team: "Boston Celtics".to_string(),
            away_team: "Philadelphia 76ers".to_string(),
            home_score: Some(105),
            away_score: None,
        };
        assert_eq!(game.home_margin(), None);
        game.away_score = Some(87);
        assert_eq!(game.home_margin(), Some(18));
    }
}
