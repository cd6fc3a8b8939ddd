use std::collections::BTreeMap;

use crate::error::{PredictionError, Result};
use crate::models::{Role, TeamStatsRow};
use crate::references::Team;

/// A single team's four factors, renamed with a home or away suffix.
#[derive(Debug, Clone, PartialEq)]
pub struct TeamFactors {
    pub team: Team,
    pub role: Role,
    pub values: BTreeMap<String, f64>,
}

/// Pull the four factors for `team` out of a season's stats table.
///
/// Rows are matched on team name without regard to case. Every column other
/// than the eight factors is dropped, and each factor gets `_h` or `_a`
/// appended depending on `role`. Exactly one row must match: a duplicated
/// team is an error rather than a silent pick. Every factor must be finite.
pub fn extract_four_factors(team: Team, stats: &[TeamStatsRow], role: Role) -> Result<TeamFactors> {
    let mut matching = stats
        .iter()
        .filter(|row| row.team_name.trim().eq_ignore_ascii_case(team.name()));

    let row = matching.next().ok_or_else(|| PredictionError::TeamNotFound {
        team: team.name().to_string(),
    })?;

    let extra = matching.count();
    if extra > 0 {
        return Err(PredictionError::AmbiguousTeam {
            team: team.name().to_string(),
            rows: extra + 1,
        });
    }

    if let Some((factor, value)) = row.four_factors().into_iter().find(|(_, v)| !v.is_finite()) {
        return Err(PredictionError::InvalidStats {
            team: team.name().to_string(),
            factor: factor.to_string(),
            value,
        });
    }

    let values = row
        .four_factors()
        .into_iter()
        .map(|(name, value)| (format!("{}{}", name, role.suffix()), value))
        .collect();

    Ok(TeamFactors { team, role, values })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::fixtures::stats_row;

    #[test]
    fn test_extracts_and_suffixes_home_factors() {
        let stats = vec![
            stats_row("Boston Celtics", 0.0),
            stats_row("Los Angeles Lakers", 0.01),
        ];
        let factors = extract_four_factors(Team::LosAngelesLakers, &stats, Role::Home).unwrap();

        assert_eq!(factors.values.len(), 8);
        assert!(factors.values.keys().all(|k| k.ends_with("_h")));
        assert!((factors.values["efg_pct_h"] - 0.51).abs() < 1e-12);
        assert!((factors.values["drb_pct_h"] - 77.01).abs() < 1e-12);
    }

    #[test]
    fn test_matches_names_case_insensitively() {
        let stats = vec![stats_row("BOSTON CELTICS", 0.0)];
        let factors = extract_four_factors(Team::BostonCeltics, &stats, Role::Away).unwrap();
        assert!(factors.values.contains_key("opp_ft_rate_a"));
        assert_eq!(factors.role, Role::Away);
    }

    #[test]
    fn test_missing_team_fails() {
        let stats = vec![stats_row("Boston Celtics", 0.0)];
        let err = extract_four_factors(Team::MiamiHeat, &stats, Role::Home).unwrap_err();
        assert_eq!(
            err,
            PredictionError::TeamNotFound {
                team: "MIAMI HEAT".to_string()
            }
        );
    }

    #[test]
    fn test_non_numeric_factor_is_rejected() {
        let mut row = stats_row("Miami Heat", 0.0);
        row.orb_pct = f64::NAN;
        let err = extract_four_factors(Team::MiamiHeat, &[row], Role::Home).unwrap_err();
        match err {
            PredictionError::InvalidStats { team, factor, value } => {
                assert_eq!(team, "MIAMI HEAT");
                assert_eq!(factor, "orb_pct");
                assert!(value.is_nan());
            }
            other => panic!("expected InvalidStats, got {:?}", other),
        }
    }

    #[test]
    fn test_duplicate_rows_are_ambiguous() {
        let stats = vec![
            stats_row("Los Angeles Lakers", 0.0),
            stats_row("LOS ANGELES LAKERS", 0.02),
        ];
        let err = extract_four_factors(Team::LosAngelesLakers, &stats, Role::Home).unwrap_err();
        assert_eq!(
            err,
            PredictionError::AmbiguousTeam {
                team: "LOS ANGELES LAKERS".to_string(),
                rows: 2
            }
        );
    }
}
