//! Incrementality estimator. Compares treatment and control locations over
//! a date window and tests the difference in means for significance.

use crate::dates::{parse_date, AnalysisWindow};
use crate::stats;
use chrono::NaiveDate;
use geolift_core::config::AnalysisConfig;
use geolift_core::{
    normalize_location, ConfidenceInterval, DailyPoint, EffectEstimate, EmptyGroupPolicy,
    GeoLiftError, GeoLiftResult, Group, Observation, Partition,
};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

/// Running same-day totals for the daily series.
#[derive(Debug, Default, Clone, Copy)]
struct DayTotals {
    test_sum: f64,
    test_n: usize,
    control_sum: f64,
    control_n: usize,
}

impl DayTotals {
    fn add(&mut self, group: Group, value: f64) {
        match group {
            Group::Test => {
                self.test_sum += value;
                self.test_n += 1;
            }
            Group::Control => {
                self.control_sum += value;
                self.control_n += 1;
            }
        }
    }

    fn means(&self) -> (f64, f64) {
        let mean = |sum: f64, n: usize| if n > 0 { sum / n as f64 } else { 0.0 };
        (
            mean(self.test_sum, self.test_n),
            mean(self.control_sum, self.control_n),
        )
    }
}

/// Observations split by group, restricted to the window.
#[derive(Debug, Default)]
struct WindowedValues {
    test: Vec<f64>,
    control: Vec<f64>,
    test_locations: Vec<String>,
    control_locations: Vec<String>,
    by_day: HashMap<NaiveDate, DayTotals>,
}

/// Difference-in-means incrementality test between treatment and control.
#[derive(Debug, Clone)]
pub struct IncrementalityEstimator {
    critical_value: f64,
    empty_group_policy: EmptyGroupPolicy,
}

impl IncrementalityEstimator {
    pub fn new() -> Self {
        Self::from_config(&AnalysisConfig::default())
    }

    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self {
            critical_value: config.critical_value,
            empty_group_policy: config.empty_group_policy,
        }
    }

    pub fn with_critical_value(mut self, critical_value: f64) -> Self {
        self.critical_value = critical_value;
        self
    }

    pub fn with_empty_group_policy(mut self, policy: EmptyGroupPolicy) -> Self {
        self.empty_group_policy = policy;
        self
    }

    pub fn critical_value(&self) -> f64 {
        self.critical_value
    }

    /// Estimate the incremental effect of treatment inside `window`.
    ///
    /// Rows with an empty location or an unparseable date are ignored.
    /// `spend_withheld` only feeds the ROI and must be finite and non-negative.
    pub fn analyze(
        &self,
        observations: &[Observation],
        partition: &Partition,
        window: &AnalysisWindow,
        spend_withheld: f64,
    ) -> GeoLiftResult<EffectEstimate> {
        if !spend_withheld.is_finite() || spend_withheld < 0.0 {
            return Err(GeoLiftError::InvalidSpend(spend_withheld));
        }

        let windowed = self.collect(observations, partition, window);
        let test_count = windowed.test.len();
        let control_count = windowed.control.len();

        let empty_group = if test_count == 0 {
            Some(Group::Test)
        } else if control_count == 0 {
            Some(Group::Control)
        } else {
            None
        };
        if let Some(group) = empty_group {
            match self.empty_group_policy {
                EmptyGroupPolicy::Reject => {
                    return Err(GeoLiftError::InsufficientData { group });
                }
                EmptyGroupPolicy::Zero => {
                    warn!(
                        %group,
                        "Group has no in-window data; its mean is taken as zero and the estimate is not meaningful"
                    );
                }
            }
        }

        let test_mean = stats::mean(&windowed.test).unwrap_or(0.0);
        let control_mean = stats::mean(&windowed.control).unwrap_or(0.0);
        let incremental_effect = test_mean - control_mean;
        let lift_percentage = if control_mean > 0.0 {
            incremental_effect / control_mean * 100.0
        } else {
            0.0
        };
        let total_incremental_value = incremental_effect * test_count as f64;
        let roi = if spend_withheld > 0.0 {
            total_incremental_value / spend_withheld
        } else {
            0.0
        };

        let test_variance = stats::sample_variance(&windowed.test, test_mean);
        let control_variance = stats::sample_variance(&windowed.control, control_mean);
        // Undefined with an empty group; only reachable under the zero policy.
        let standard_error = if test_count > 0 && control_count > 0 {
            (test_variance / test_count as f64 + control_variance / control_count as f64).sqrt()
        } else {
            0.0
        };
        let t_statistic = if standard_error > 0.0 {
            incremental_effect / standard_error
        } else {
            0.0
        };
        let is_significant = t_statistic.abs() > self.critical_value;
        let p_value = if standard_error > 0.0 {
            stats::two_sided_p_value(t_statistic)
        } else {
            1.0
        };
        let margin = self.critical_value * standard_error;
        let degrees_of_freedom = stats::welch_degrees_of_freedom(
            test_variance,
            test_count,
            control_variance,
            control_count,
        );

        let daily_series = Self::daily_series(window, &windowed.by_day);

        info!(
            test_locations = windowed.test_locations.len(),
            control_locations = windowed.control_locations.len(),
            test_count,
            control_count,
            incremental_effect,
            lift_percentage,
            t_statistic,
            is_significant,
            "Incrementality analysis complete"
        );

        Ok(EffectEstimate {
            incremental_effect,
            lift_percentage,
            roi,
            t_statistic,
            standard_error,
            is_significant,
            p_value,
            confidence_interval: ConfidenceInterval {
                lower: incremental_effect - margin,
                upper: incremental_effect + margin,
            },
            degrees_of_freedom,
            test_mean,
            control_mean,
            test_total: windowed.test.iter().sum(),
            control_total: windowed.control.iter().sum(),
            test_count,
            control_count,
            total_incremental_value,
            spend_withheld,
            test_locations: windowed.test_locations,
            control_locations: windowed.control_locations,
            daily_series,
        })
    }

    fn collect(
        &self,
        observations: &[Observation],
        partition: &Partition,
        window: &AnalysisWindow,
    ) -> WindowedValues {
        let mut out = WindowedValues::default();
        let mut seen: HashSet<String> = HashSet::new();
        let mut unparseable = 0usize;

        for row in observations {
            let location = normalize_location(&row.location);
            if location.is_empty() {
                continue;
            }
            let Some(date) = parse_date(&row.date) else {
                unparseable += 1;
                continue;
            };
            if !window.contains(date) || !row.value.is_finite() {
                continue;
            }

            // Only locations contributing in-window data count as members.
            let group = partition.group_of(&location);
            match group {
                Group::Test => out.test.push(row.value),
                Group::Control => out.control.push(row.value),
            }
            out.by_day.entry(date).or_default().add(group, row.value);
            if seen.insert(location.clone()) {
                match group {
                    Group::Test => out.test_locations.push(location),
                    Group::Control => out.control_locations.push(location),
                }
            }
        }

        if unparseable > 0 {
            debug!(unparseable, "Observations with unparseable dates were excluded");
        }
        out
    }

    fn daily_series(
        window: &AnalysisWindow,
        by_day: &HashMap<NaiveDate, DayTotals>,
    ) -> Vec<DailyPoint> {
        window
            .days()
            .enumerate()
            .map(|(day, date)| {
                let (test, control) = by_day.get(&date).map(DayTotals::means).unwrap_or((0.0, 0.0));
                DailyPoint {
                    date,
                    day: day as u32,
                    test,
                    control,
                    in_treatment_window: window.contains(date),
                }
            })
            .collect()
    }
}

impl Default for IncrementalityEstimator {
    fn default() -> Self {
        Self::new()
    }
}

/// Run an analysis with default settings over string window bounds and a
/// comma-separated treatment list.
pub fn analyze_incrementality(
    observations: &[Observation],
    treatment: &str,
    start: &str,
    end: &str,
    spend_withheld: f64,
) -> GeoLiftResult<EffectEstimate> {
    let window = AnalysisWindow::parse(start, end)?;
    IncrementalityEstimator::new().analyze(
        observations,
        &Partition::from_list(treatment),
        &window,
        spend_withheld,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn window(start: &str, end: &str) -> AnalysisWindow {
        AnalysisWindow::parse(start, end).unwrap()
    }

    fn two_location_table() -> Vec<Observation> {
        vec![
            Observation::new("A", "2024-01-01", 10.0),
            Observation::new("A", "2024-01-02", 12.0),
            Observation::new("B", "2024-01-01", 1.0),
            Observation::new("B", "2024-01-02", 1.0),
        ]
    }

    #[test]
    fn test_two_location_scenario() {
        let estimate = IncrementalityEstimator::new()
            .analyze(
                &two_location_table(),
                &Partition::new(["A"]),
                &window("2024-01-01", "2024-01-02"),
                0.0,
            )
            .unwrap();

        assert!((estimate.test_mean - 11.0).abs() < EPS);
        assert!((estimate.control_mean - 1.0).abs() < EPS);
        assert!((estimate.incremental_effect - 10.0).abs() < EPS);
        assert!((estimate.lift_percentage - 1000.0).abs() < EPS);
        assert_eq!(estimate.test_count, 2);
        assert_eq!(estimate.control_count, 2);
        assert!((estimate.test_total - 22.0).abs() < EPS);
        assert!((estimate.control_total - 2.0).abs() < EPS);
        assert_eq!(estimate.roi, 0.0);
        // var(test) = 2, var(control) = 0 → se = sqrt(2 / 2) = 1
        assert!((estimate.standard_error - 1.0).abs() < EPS);
        assert!((estimate.t_statistic - 10.0).abs() < EPS);
        assert!(estimate.is_significant);
        assert_eq!(estimate.test_locations, vec!["a".to_string()]);
        assert_eq!(estimate.control_locations, vec!["b".to_string()]);
    }

    #[test]
    fn test_roi_uses_total_incremental_value() {
        let estimate = IncrementalityEstimator::new()
            .analyze(
                &two_location_table(),
                &Partition::new(["a"]),
                &window("2024-01-01", "2024-01-02"),
                40.0,
            )
            .unwrap();
        assert!((estimate.total_incremental_value - 20.0).abs() < EPS);
        assert!((estimate.roi - 0.5).abs() < EPS);
        assert_eq!(estimate.spend_withheld, 40.0);
    }

    #[test]
    fn test_negative_spend_rejected() {
        let err = IncrementalityEstimator::new()
            .analyze(
                &two_location_table(),
                &Partition::new(["A"]),
                &window("2024-01-01", "2024-01-02"),
                -1.0,
            )
            .unwrap_err();
        assert!(matches!(err, GeoLiftError::InvalidSpend(_)));
    }

    #[test]
    fn test_daily_series_covers_window() {
        let estimate = IncrementalityEstimator::new()
            .analyze(
                &two_location_table(),
                &Partition::new(["A"]),
                &window("2024-01-01", "2024-01-03"),
                0.0,
            )
            .unwrap();
        let series = &estimate.daily_series;
        assert_eq!(series.len(), 3);
        assert_eq!(series[0].day, 0);
        assert_eq!(series[0].test, 10.0);
        assert_eq!(series[0].control, 1.0);
        assert_eq!(series[1].test, 12.0);
        assert_eq!(series[2].test, 0.0);
        assert_eq!(series[2].control, 0.0);
        assert!(series.iter().all(|p| p.in_treatment_window));
    }

    #[test]
    fn test_empty_group_rejected_by_default() {
        let err = IncrementalityEstimator::new()
            .analyze(
                &two_location_table(),
                &Partition::new(["Z"]),
                &window("2024-01-01", "2024-01-02"),
                0.0,
            )
            .unwrap_err();
        assert!(matches!(
            err,
            GeoLiftError::InsufficientData { group: Group::Test }
        ));
    }

    #[test]
    fn test_zero_policy_with_no_data_in_window() {
        let estimate = IncrementalityEstimator::new()
            .with_empty_group_policy(EmptyGroupPolicy::Zero)
            .analyze(
                &two_location_table(),
                &Partition::new(["A"]),
                &window("2023-01-01", "2023-01-02"),
                100.0,
            )
            .unwrap();
        assert_eq!(estimate.test_count, 0);
        assert_eq!(estimate.control_count, 0);
        assert_eq!(estimate.incremental_effect, 0.0);
        assert_eq!(estimate.lift_percentage, 0.0);
        assert_eq!(estimate.roi, 0.0);
        assert_eq!(estimate.standard_error, 0.0);
        assert_eq!(estimate.t_statistic, 0.0);
        assert!(!estimate.is_significant);
        assert!(estimate.standard_error.is_finite());
    }

    #[test]
    fn test_inverted_window_has_empty_series() {
        let estimate = IncrementalityEstimator::new()
            .with_empty_group_policy(EmptyGroupPolicy::Zero)
            .analyze(
                &two_location_table(),
                &Partition::new(["A"]),
                &window("2024-01-02", "2024-01-01"),
                0.0,
            )
            .unwrap();
        assert!(estimate.daily_series.is_empty());
        assert_eq!(estimate.test_count, 0);
    }

    #[test]
    fn test_unparseable_dates_are_excluded() {
        let mut rows = two_location_table();
        rows.push(Observation::new("A", "someday", 1_000_000.0));
        let estimate = IncrementalityEstimator::new()
            .analyze(
                &rows,
                &Partition::new(["A"]),
                &window("2024-01-01", "2024-01-02"),
                0.0,
            )
            .unwrap();
        assert_eq!(estimate.test_count, 2);
        assert!((estimate.test_mean - 11.0).abs() < EPS);
    }

    #[test]
    fn test_custom_critical_value() {
        let estimate = IncrementalityEstimator::new()
            .with_critical_value(12.0)
            .analyze(
                &two_location_table(),
                &Partition::new(["A"]),
                &window("2024-01-01", "2024-01-02"),
                0.0,
            )
            .unwrap();
        assert!((estimate.t_statistic - 10.0).abs() < EPS);
        assert!(!estimate.is_significant);
        assert!((estimate.confidence_interval.lower - -2.0).abs() < EPS);
        assert!((estimate.confidence_interval.upper - 22.0).abs() < EPS);
    }

    #[test]
    fn test_string_entry_point() {
        let estimate =
            analyze_incrementality(&two_location_table(), "a, c", "2024-01-01", "2024-01-02", 0.0)
                .unwrap();
        assert!((estimate.incremental_effect - 10.0).abs() < EPS);

        let err = analyze_incrementality(&two_location_table(), "a", "bad", "2024-01-02", 0.0)
            .unwrap_err();
        assert!(matches!(err, GeoLiftError::InvalidDate(_)));
    }

    #[test]
    fn test_locations_without_window_data_are_not_members() {
        let partition = Partition::new(["A"]);
        let span = window("2024-01-01", "2024-01-02");
        let baseline = IncrementalityEstimator::new()
            .analyze(&two_location_table(), &partition, &span, 0.0)
            .unwrap();

        let mut rows = two_location_table();
        rows.push(Observation::new("D", "2019-05-05", 1.0));
        rows.push(Observation::new("E", "someday", 1.0));
        rows.push(Observation::new("F", "2024-01-01", f64::NAN));
        let estimate = IncrementalityEstimator::new()
            .analyze(&rows, &partition, &span, 0.0)
            .unwrap();

        assert_eq!(estimate.control_locations, vec!["b".to_string()]);
        assert_eq!(estimate, baseline);
    }

    #[test]
    fn test_zero_policy_with_one_empty_group() {
        let estimate = IncrementalityEstimator::new()
            .with_empty_group_policy(EmptyGroupPolicy::Zero)
            .analyze(
                &two_location_table(),
                &Partition::new(["Z"]),
                &window("2024-01-01", "2024-01-02"),
                0.0,
            )
            .unwrap();
        // The empty test group reads as mean 0, so the lift is a flat -100%
        // with no standard error behind it.
        assert_eq!(estimate.test_count, 0);
        assert!(estimate.test_locations.is_empty());
        assert!((estimate.control_mean - 6.0).abs() < EPS);
        assert!((estimate.incremental_effect - -6.0).abs() < EPS);
        assert!((estimate.lift_percentage - -100.0).abs() < EPS);
        assert_eq!(estimate.standard_error, 0.0);
        assert_eq!(estimate.t_statistic, 0.0);
        assert_eq!(estimate.p_value, 1.0);
        assert!(!estimate.is_significant);
    }
}
