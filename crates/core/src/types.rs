use crate::error::{GeoLiftError, GeoLiftResult};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;
use std::str::FromStr;

/// Normalize a location identifier for grouping and membership tests.
pub fn normalize_location(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// One row of the input table: a location's outcome on a given day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub location: String,
    pub date: String,
    #[serde(alias = "outcome")]
    pub value: f64,
    /// Additional named metrics recorded for the same location and day.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metrics: BTreeMap<String, f64>,
}

impl Observation {
    pub fn new(location: impl Into<String>, date: impl Into<String>, value: f64) -> Self {
        Self {
            location: location.into(),
            date: date.into(),
            value,
            metrics: BTreeMap::new(),
        }
    }

    pub fn with_metric(mut self, name: impl Into<String>, value: f64) -> Self {
        self.metrics.insert(name.into(), value);
        self
    }

    /// Look up an outcome by field name. `value` and `outcome` both address
    /// the primary value; anything else is looked up in `metrics`.
    pub fn outcome(&self, field: &str) -> Option<f64> {
        match field.trim() {
            "value" | "outcome" => Some(self.value),
            other => self.metrics.get(other).copied(),
        }
    }
}

/// How a location's values are collapsed into a single statistic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregationMethod {
    #[default]
    Mean,
    Sum,
    Median,
}

impl FromStr for AggregationMethod {
    type Err = GeoLiftError;

    fn from_str(s: &str) -> GeoLiftResult<Self> {
        match s.trim() {
            "mean" => Ok(AggregationMethod::Mean),
            "sum" => Ok(AggregationMethod::Sum),
            "median" => Ok(AggregationMethod::Median),
            other => Err(GeoLiftError::InvalidMethod(other.to_string())),
        }
    }
}

impl fmt::Display for AggregationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AggregationMethod::Mean => "mean",
            AggregationMethod::Sum => "sum",
            AggregationMethod::Median => "median",
        };
        f.write_str(name)
    }
}

/// Per-location aggregate used by the sampler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationAggregate {
    pub location: String,
    pub statistic: f64,
}

/// Locations picked to represent the spread of an outcome.
/// Iteration order follows selection order and carries no meaning.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct SampleSelection {
    locations: Vec<String>,
    members: HashSet<String>,
}

impl SampleSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a location, ignoring duplicates. Returns whether it was new.
    pub fn insert(&mut self, location: &str) -> bool {
        if !self.members.insert(location.to_string()) {
            return false;
        }
        self.locations.push(location.to_string());
        true
    }

    pub fn contains(&self, location: &str) -> bool {
        self.members.contains(location)
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.locations.iter().map(String::as_str)
    }

    pub fn to_set(&self) -> BTreeSet<String> {
        self.locations.iter().cloned().collect()
    }

    pub fn into_vec(self) -> Vec<String> {
        self.locations
    }
}

impl From<Vec<String>> for SampleSelection {
    fn from(locations: Vec<String>) -> Self {
        let mut selection = Self::new();
        for location in &locations {
            selection.insert(location);
        }
        selection
    }
}

impl From<SampleSelection> for Vec<String> {
    fn from(selection: SampleSelection) -> Self {
        selection.locations
    }
}

/// Side of a treatment/control split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Group {
    Test,
    Control,
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Group::Test => f.write_str("test"),
            Group::Control => f.write_str("control"),
        }
    }
}

/// Treatment membership. Every location not listed as treatment is control;
/// identifiers compare case-insensitively.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partition {
    treatment: BTreeSet<String>,
}

impl Partition {
    pub fn new<I, S>(treatment: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let treatment = treatment
            .into_iter()
            .map(|l| normalize_location(l.as_ref()))
            .filter(|l| !l.is_empty())
            .collect();
        Self { treatment }
    }

    /// Parse a comma-separated treatment list such as `"Austin, Denver"`.
    pub fn from_list(list: &str) -> Self {
        Self::new(list.split(','))
    }

    pub fn treatment(&self) -> &BTreeSet<String> {
        &self.treatment
    }

    pub fn group_of(&self, location: &str) -> Group {
        if self.treatment.contains(&normalize_location(location)) {
            Group::Test
        } else {
            Group::Control
        }
    }
}

/// Same-day group means for charting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyPoint {
    pub date: NaiveDate,
    /// Offset in days from the window start.
    pub day: u32,
    pub test: f64,
    pub control: f64,
    pub in_treatment_window: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    pub lower: f64,
    pub upper: f64,
}

/// Result of an incrementality analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectEstimate {
    pub incremental_effect: f64,
    pub lift_percentage: f64,
    pub roi: f64,
    pub t_statistic: f64,
    pub standard_error: f64,
    pub is_significant: bool,
    /// Two-sided p-value under the normal approximation.
    pub p_value: f64,
    pub confidence_interval: ConfidenceInterval,
    /// Welch–Satterthwaite degrees of freedom, when both groups have variance.
    pub degrees_of_freedom: Option<f64>,
    pub test_mean: f64,
    pub control_mean: f64,
    pub test_total: f64,
    pub control_total: f64,
    pub test_count: usize,
    pub control_count: usize,
    pub total_incremental_value: f64,
    pub spend_withheld: f64,
    pub test_locations: Vec<String>,
    pub control_locations: Vec<String>,
    pub daily_series: Vec<DailyPoint>,
}
