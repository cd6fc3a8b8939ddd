pub mod features;
pub mod four_factors;
pub mod import;
pub mod predictor;
pub mod regression;
pub mod report;

pub use features::*;
pub use four_factors::*;
pub use import::*;
pub use predictor::*;
pub use regression::*;
pub use report::*;

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::models::TeamStatsRow;
    use crate::services::{feature_names, LinearModel, CONSTANT};

    /// Plausible four factors, offset by `base` so teams differ.
    pub(crate) fn stats_row(name: &str, base: f64) -> TeamStatsRow {
        TeamStatsRow {
            team_name: name.to_string(),
            efg_pct: base + 0.50,
            tov_pct: base + 12.0,
            orb_pct: base + 22.0,
            ft_rate: base + 0.20,
            opp_efg_pct: base + 0.51,
            opp_tov_pct: base + 11.5,
            drb_pct: base + 77.0,
            opp_ft_rate: base + 0.21,
        }
    }

    /// A model whose only non-zero coefficient is the constant, so every
    /// matchup projects `margin`.
    pub(crate) fn constant_model(margin: f64, residual_std: f64) -> LinearModel {
        let coefficients = feature_names()
            .into_iter()
            .map(|name| {
                let value = if name == CONSTANT { margin } else { 0.0 };
                (name, value)
            })
            .collect();
        LinearModel {
            season: "2019".to_string(),
            coefficients,
            residual_std,
            samples: 0,
        }
    }
}
