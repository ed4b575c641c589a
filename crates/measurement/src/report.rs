//! Human-readable interpretation of an effect estimate.

use geolift_core::config::QualityConfig;
use geolift_core::EffectEstimate;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectDirection {
    Positive,
    Negative,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Magnitude {
    Small,
    Moderate,
    Large,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    High,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    ScaleUp,
    Discontinue,
    ExtendTest,
    CollectMoreData,
    AddLocations,
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Recommendation::ScaleUp => "The experiment shows a statistically significant positive effect. Consider scaling the tested approach.",
            Recommendation::Discontinue => "The experiment shows a statistically significant negative effect. Consider discontinuing the tested approach.",
            Recommendation::ExtendTest => "The results are not statistically significant. Consider running a longer experiment or increasing sample size.",
            Recommendation::CollectMoreData => "Consider collecting more data points for more reliable results.",
            Recommendation::AddLocations => "Consider including more locations in each group for better statistical power.",
        };
        f.write_str(text)
    }
}

/// Headline figures, rounded for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub incremental_effect: f64,
    pub lift_percentage: f64,
    pub roi: f64,
    pub is_significant: bool,
    pub p_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interpretation {
    pub effect: EffectDirection,
    pub magnitude: Magnitude,
    pub confidence: Confidence,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub summary: ReportSummary,
    pub interpretation: Interpretation,
    pub recommendations: Vec<Recommendation>,
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

impl AnalysisReport {
    pub fn from_estimate(estimate: &EffectEstimate, thresholds: &QualityConfig) -> Self {
        let effect = if estimate.incremental_effect > 0.0 {
            EffectDirection::Positive
        } else if estimate.incremental_effect < 0.0 {
            EffectDirection::Negative
        } else {
            EffectDirection::None
        };
        let lift = estimate.lift_percentage.abs();
        let magnitude = if lift < 5.0 {
            Magnitude::Small
        } else if lift < 15.0 {
            Magnitude::Moderate
        } else {
            Magnitude::Large
        };
        let confidence = if estimate.is_significant {
            Confidence::High
        } else {
            Confidence::Low
        };

        let mut recommendations = vec![match (estimate.is_significant, effect) {
            (true, EffectDirection::Positive) => Recommendation::ScaleUp,
            (true, EffectDirection::Negative) => Recommendation::Discontinue,
            _ => Recommendation::ExtendTest,
        }];
        if estimate.test_count < thresholds.min_points_per_group
            || estimate.control_count < thresholds.min_points_per_group
        {
            recommendations.push(Recommendation::CollectMoreData);
        }
        if estimate.test_locations.len() < thresholds.min_locations_per_group
            || estimate.control_locations.len() < thresholds.min_locations_per_group
        {
            recommendations.push(Recommendation::AddLocations);
        }

        Self {
            summary: ReportSummary {
                incremental_effect: round_to(estimate.incremental_effect, 2),
                lift_percentage: round_to(estimate.lift_percentage, 1),
                roi: round_to(estimate.roi, 2),
                is_significant: estimate.is_significant,
                p_value: estimate.p_value,
            },
            interpretation: Interpretation {
                effect,
                magnitude,
                confidence,
            },
            recommendations,
        }
    }
}
