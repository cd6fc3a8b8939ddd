use std::collections::BTreeMap;

use crate::error::{PredictionError, Result};
use crate::models::Role;
use crate::references::FOUR_FACTORS;
use crate::services::four_factors::TeamFactors;

/// Name of the intercept column. The fitted model has no implicit intercept.
pub const CONSTANT: &str = "const";

/// 8 home factors + 8 away factors + the constant.
pub const FEATURE_COUNT: usize = FOUR_FACTORS.len() * 2 + 1;

/// Model inputs for one matchup, keyed by feature name in lexicographic order.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    values: BTreeMap<String, f64>,
}

impl FeatureVector {
    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Every feature name the model expects, sorted the same way a
/// `FeatureVector` iterates.
pub fn feature_names() -> Vec<String> {
    let mut names: Vec<String> = FOUR_FACTORS
        .iter()
        .flat_map(|factor| {
            [Role::Home, Role::Away]
                .into_iter()
                .map(move |role| format!("{}{}", factor, role.suffix()))
        })
        .collect();
    names.push(CONSTANT.to_string());
    names.sort();
    names
}

/// Join a home and an away row into one feature vector and add the constant.
pub fn build_feature_vector(home: &TeamFactors, away: &TeamFactors) -> Result<FeatureVector> {
    if home.role != Role::Home || away.role != Role::Away {
        return Err(PredictionError::DimensionMismatch {
            expected: FEATURE_COUNT,
            actual: home.values.len() + away.values.len() + 1,
            detail: format!("expected home and away rows, got {:?} and {:?}", home.role, away.role),
        });
    }

    let mut values = BTreeMap::new();
    values.extend(home.values.iter().map(|(k, v)| (k.clone(), *v)));
    values.extend(away.values.iter().map(|(k, v)| (k.clone(), *v)));
    values.insert(CONSTANT.to_string(), 1.0);

    if values.len() != FEATURE_COUNT {
        return Err(PredictionError::DimensionMismatch {
            expected: FEATURE_COUNT,
            actual: values.len(),
            detail: "home and away rows do not cover the four factors".to_string(),
        });
    }

    Ok(FeatureVector { values })
}
