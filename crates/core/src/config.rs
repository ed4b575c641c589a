use crate::error::GeoLiftResult;
use crate::types::AggregationMethod;
use serde::{Deserialize, Serialize};

/// Root application configuration. Loaded from an optional TOML file and
/// environment variables with the prefix `GEOLIFT__`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub sampler: SamplerConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub quality: QualityConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SamplerConfig {
    #[serde(default = "default_sample_count")]
    pub count: usize,
    #[serde(default)]
    pub method: AggregationMethod,
    #[serde(default = "default_target_field")]
    pub target: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisConfig {
    /// Critical |t| above which an effect is flagged significant.
    #[serde(default = "default_critical_value")]
    pub critical_value: f64,
    #[serde(default)]
    pub empty_group_policy: EmptyGroupPolicy,
}

/// What the estimator does when the test or control group has no
/// observations inside the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyGroupPolicy {
    /// Fail with `InsufficientData`.
    #[default]
    Reject,
    /// Treat the empty group's mean and variance as zero. With one empty
    /// group the effect collapses to the other group's mean (a lift of
    /// -100% when the test group is empty) with a standard error of 0, so
    /// the estimate is never significant and should not be read as a result.
    Zero,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QualityConfig {
    #[serde(default = "default_min_rows")]
    pub min_rows: usize,
    #[serde(default = "default_min_points_per_group")]
    pub min_points_per_group: usize,
    #[serde(default = "default_min_locations_per_group")]
    pub min_locations_per_group: usize,
}

// Default functions
fn default_sample_count() -> usize {
    5
}
fn default_target_field() -> String {
    "outcome".to_string()
}
fn default_critical_value() -> f64 {
    1.96
}
fn default_min_rows() -> usize {
    10
}
fn default_min_points_per_group() -> usize {
    30
}
fn default_min_locations_per_group() -> usize {
    3
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            count: default_sample_count(),
            method: AggregationMethod::default(),
            target: default_target_field(),
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            critical_value: default_critical_value(),
            empty_group_policy: EmptyGroupPolicy::default(),
        }
    }
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            min_rows: default_min_rows(),
            min_points_per_group: default_min_points_per_group(),
            min_locations_per_group: default_min_locations_per_group(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables and an optional config
    /// file. A file that is named must exist.
    pub fn load(path: Option<&str>) -> GeoLiftResult<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(true));
        }
        let builder = builder.add_source(
            config::Environment::with_prefix("GEOLIFT")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }
}
