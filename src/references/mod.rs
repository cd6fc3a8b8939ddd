//! Canonical team names and abbreviations as they appear in
//! Basketball-Reference tables.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{PredictionError, Result};

/// The eight offensive and defensive four factors, in table column order.
pub const FOUR_FACTORS: [&str; 8] = [
    "efg_pct",
    "tov_pct",
    "orb_pct",
    "ft_rate",
    "opp_efg_pct",
    "opp_tov_pct",
    "drb_pct",
    "opp_ft_rate",
];

/// Minimum Jaro-Winkler similarity before a "did you mean" hint is offered.
const SUGGESTION_THRESHOLD: f64 = 0.85;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Team {
    AtlantaHawks,
    BostonCeltics,
    BrooklynNets,
    CharlotteHornets,
    ChicagoBulls,
    ClevelandCavaliers,
    DallasMavericks,
    DenverNuggets,
    DetroitPistons,
    GoldenStateWarriors,
    HoustonRockets,
    IndianaPacers,
    LosAngelesClippers,
    LosAngelesLakers,
    MemphisGrizzlies,
    MiamiHeat,
    MilwaukeeBucks,
    MinnesotaTimberwolves,
    NewOrleansPelicans,
    NewYorkKnicks,
    OklahomaCityThunder,
    OrlandoMagic,
    Philadelphia76ers,
    PhoenixSuns,
    PortlandTrailBlazers,
    SacramentoKings,
    SanAntonioSpurs,
    TorontoRaptors,
    UtahJazz,
    WashingtonWizards,

    // Historical franchises
    CharlotteBobcats,
    NewJerseyNets,
    NewOrleansHornets,
    NewOrleansOklahomaCityHornets,
    SeattleSupersonics,
    VancouverGrizzlies,
}

/// (team, canonical name, abbreviation)
static TEAMS: [(Team, &str, &str); 36] = [
    (Team::AtlantaHawks, "ATLANTA HAWKS", "ATL"),
    (Team::BostonCeltics, "BOSTON CELTICS", "BOS"),
    (Team::BrooklynNets, "BROOKLYN NETS", "BRK"),
    (Team::CharlotteHornets, "CHARLOTTE HORNETS", "CHO"),
    (Team::ChicagoBulls, "CHICAGO BULLS", "CHI"),
    (Team::ClevelandCavaliers, "CLEVELAND CAVALIERS", "CLE"),
    (Team::DallasMavericks, "DALLAS MAVERICKS", "DAL"),
    (Team::DenverNuggets, "DENVER NUGGETS", "DEN"),
    (Team::DetroitPistons, "DETROIT PISTONS", "DET"),
    (Team::GoldenStateWarriors, "GOLDEN STATE WARRIORS", "GSW"),
    (Team::HoustonRockets, "HOUSTON ROCKETS", "HOU"),
    (Team::IndianaPacers, "INDIANA PACERS", "IND"),
    (Team::LosAngelesClippers, "LOS ANGELES CLIPPERS", "LAC"),
    (Team::LosAngelesLakers, "LOS ANGELES LAKERS", "LAL"),
    (Team::MemphisGrizzlies, "MEMPHIS GRIZZLIES", "MEM"),
    (Team::MiamiHeat, "MIAMI HEAT", "MIA"),
    (Team::MilwaukeeBucks, "MILWAUKEE BUCKS", "MIL"),
    (Team::MinnesotaTimberwolves, "MINNESOTA TIMBERWOLVES", "MIN"),
    (Team::NewOrleansPelicans, "NEW ORLEANS PELICANS", "NOP"),
    (Team::NewYorkKnicks, "NEW YORK KNICKS", "NYK"),
    (Team::OklahomaCityThunder, "OKLAHOMA CITY THUNDER", "OKC"),
    (Team::OrlandoMagic, "ORLANDO MAGIC", "ORL"),
    (Team::Philadelphia76ers, "PHILADELPHIA 76ERS", "PHI"),
    (Team::PhoenixSuns, "PHOENIX SUNS", "PHO"),
    (Team::PortlandTrailBlazers, "PORTLAND TRAIL BLAZERS", "POR"),
    (Team::SacramentoKings, "SACRAMENTO KINGS", "SAC"),
    (Team::SanAntonioSpurs, "SAN ANTONIO SPURS", "SAS"),
    (Team::TorontoRaptors, "TORONTO RAPTORS", "TOR"),
    (Team::UtahJazz, "UTAH JAZZ", "UTA"),
    (Team::WashingtonWizards, "WASHINGTON WIZARDS", "WAS"),
    (Team::CharlotteBobcats, "CHARLOTTE BOBCATS", "CHA"),
    (Team::NewJerseyNets, "NEW JERSEY NETS", "NJN"),
    (Team::NewOrleansHornets, "NEW ORLEANS HORNETS", "NOH"),
    (Team::NewOrleansOklahomaCityHornets, "NEW ORLEANS/OKLAHOMA CITY HORNETS", "NOK"),
    (Team::SeattleSupersonics, "SEATTLE SUPERSONICS", "SEA"),
    (Team::VancouverGrizzlies, "VANCOUVER GRIZZLIES", "VAN"),
];

impl Team {
    pub fn all() -> impl Iterator<Item = Team> {
        TEAMS.iter().map(|(team, _, _)| *team)
    }

    /// Canonical upper-case name, e.g. "LOS ANGELES LAKERS"
    pub fn name(&self) -> &'static str {
        self.entry().1
    }

    pub fn abbreviation(&self) -> &'static str {
        self.entry().2
    }

    pub fn is_historical(&self) -> bool {
        matches!(
            self,
            Team::CharlotteBobcats
                | Team::NewJerseyNets
                | Team::NewOrleansHornets
                | Team::NewOrleansOklahomaCityHornets
                | Team::SeattleSupersonics
                | Team::VancouverGrizzlies
        )
    }

    /// Look up a team by its abbreviation (not case sensitive). "CHH", the
    /// original Charlotte Hornets code, maps to the current Hornets.
    pub fn from_abbreviation(code: &str) -> Option<Team> {
        let code = code.trim();
        if code.eq_ignore_ascii_case("CHH") {
            return Some(Team::CharlotteHornets);
        }
        TEAMS
            .iter()
            .find(|(_, _, abbr)| abbr.eq_ignore_ascii_case(code))
            .map(|(team, _, _)| *team)
    }

    fn entry(&self) -> &'static (Team, &'static str, &'static str) {
        // TEAMS lists every variant in declaration order
        &TEAMS[*self as usize]
    }
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Match a free-text team name (not case sensitive) to its canonical team.
///
/// Only exact matches resolve. A misspelled name is rejected; the error
/// carries the closest canonical name as a hint for the caller to show.
pub fn resolve_team(input: &str) -> Result<Team> {
    let trimmed = input.trim();
    if let Some((team, _, _)) = TEAMS
        .iter()
        .find(|(_, name, _)| name.eq_ignore_ascii_case(trimmed))
    {
        return Ok(*team);
    }

    let upper = trimmed.to_uppercase();
    let suggestion = TEAMS
        .iter()
        .map(|(_, name, _)| (*name, strsim::jaro_winkler(&upper, name)))
        .filter(|(_, score)| *score >= SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(name, _)| name.to_string());

    Err(PredictionError::NotFound {
        input: input.to_string(),
        suggestion,
    })
}
