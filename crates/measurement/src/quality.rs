//! Pre-flight checks on an observation table before running an analysis.

use geolift_core::config::QualityConfig;
use geolift_core::{normalize_location, Observation, Partition};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum DataQualityIssue {
    NoData,
    MissingTreatmentLocations { locations: Vec<String> },
    InsufficientRows { found: usize, required: usize },
}

impl fmt::Display for DataQualityIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataQualityIssue::NoData => f.write_str("No data provided"),
            DataQualityIssue::MissingTreatmentLocations { locations } => write!(
                f,
                "Test locations not found in data: {}",
                locations.join(", ")
            ),
            DataQualityIssue::InsufficientRows { found, required } => write!(
                f,
                "Insufficient data points for reliable analysis ({found} of {required})"
            ),
        }
    }
}

/// Validate a table against the treatment list. An empty table reports
/// only `NoData`.
pub fn validate_data_quality(
    observations: &[Observation],
    partition: &Partition,
    config: &QualityConfig,
) -> Vec<DataQualityIssue> {
    if observations.is_empty() {
        return vec![DataQualityIssue::NoData];
    }

    let mut issues = Vec::new();
    let available: HashSet<String> = observations
        .iter()
        .map(|o| normalize_location(&o.location))
        .collect();
    let missing: Vec<String> = partition
        .treatment()
        .iter()
        .filter(|l| !available.contains(*l))
        .cloned()
        .collect();
    if !missing.is_empty() {
        issues.push(DataQualityIssue::MissingTreatmentLocations { locations: missing });
    }

    if observations.len() < config.min_rows {
        issues.push(DataQualityIssue::InsufficientRows {
            found: observations.len(),
            required: config.min_rows,
        });
    }

    issues
}
