use thiserror::Error;

/// Failures of the prediction core. Collaborators (storage, import, CLI) wrap
/// these in `anyhow` with context.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PredictionError {
    #[error("Unknown team name: '{input}'{}", suggestion_suffix(.suggestion))]
    NotFound {
        input: String,
        suggestion: Option<String>,
    },

    #[error("No four factors found for {team}")]
    TeamNotFound { team: String },

    #[error("Ambiguous four factors for {team}: {rows} matching rows")]
    AmbiguousTeam { team: String, rows: usize },

    #[error("Four factors for {team} have a non-numeric {factor}: {value}")]
    InvalidStats {
        team: String,
        factor: String,
        value: f64,
    },

    #[error("Invalid model: {reason}")]
    InvalidModel { reason: String },

    #[error("Feature mismatch: expected {expected} features, got {actual} ({detail})")]
    DimensionMismatch {
        expected: usize,
        actual: usize,
        detail: String,
    },

    #[error("No games scheduled on {date}")]
    NoGamesScheduled { date: chrono::NaiveDate },

    #[error("Invalid betting line: {line}")]
    InvalidLine { line: f64 },
}

fn suggestion_suffix(suggestion: &Option<String>) -> String {
    suggestion
        .as_ref()
        .map_or(String::new(), |s| format!(" (did you mean '{}'?)", s))
}

pub type Result<T> = std::result::Result<T, PredictionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message_includes_suggestion() {
        let err = PredictionError::NotFound {
            input: "Bostn Celtics".to_string(),
            suggestion: Some("BOSTON CELTICS".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "Unknown team name: 'Bostn Celtics' (did you mean 'BOSTON CELTICS'?)"
        );

        let err = PredictionError::NotFound {
            input: "xyz".to_string(),
            suggestion: None,
        };
        assert_eq!(err.to_string(), "Unknown team name: 'xyz'");
    }
}
