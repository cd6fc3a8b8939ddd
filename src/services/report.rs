use crate::models::{PredictionResult, ProbabilityFunction};

/// Human readable summary comparing the projection, the line, and the
/// probability of the line under the model.
pub fn describe(result: &PredictionResult) -> String {
    let margin = result.prediction.abs();
    let headline = if result.prediction > 0.0 {
        format!(
            "The {} are projected to beat the {} by {:.1} points",
            result.home_team, result.away_team, margin
        )
    } else if result.prediction < 0.0 {
        format!(
            "The {} are projected to lose to the {} by {:.1} points",
            result.home_team, result.away_team, margin
        )
    } else {
        format!("The {} and the {} are projected to tie", result.home_team, result.away_team)
    };

    let detail = match result.function {
        ProbabilityFunction::Cdf | ProbabilityFunction::Sf => format!(
            "If the model were true, the betting line's ({}) {}, in relation to the prediction, would be realized {:.1}% of the time",
            format_line(result.line),
            result.function.as_str().to_uppercase(),
            result.probability * 100.0
        ),
        ProbabilityFunction::Exact => format!(
            "The betting line ({}) matches the prediction; either side would be realized 50.0% of the time",
            format_line(result.line)
        ),
    };

    format!("{}\n{}", headline, detail)
}

/// Lines are shown with an explicit sign, e.g. "-4.5" or "+3".
fn format_line(line: f64) -> String {
    if line > 0.0 {
        format!("+{}", line)
    } else {
        format!("{}", line)
    }
}
