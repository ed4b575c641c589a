//! Representative location sampler. Picks a handful of locations whose
//! aggregate outcome spans the quantiles of the whole population.

use crate::stats;
use geolift_core::config::SamplerConfig;
use geolift_core::{
    normalize_location, AggregationMethod, GeoLiftError, GeoLiftResult, LocationAggregate,
    Observation, SampleSelection,
};
use std::collections::HashMap;
use tracing::debug;

/// Quantile-matching selector over per-location aggregates.
#[derive(Debug, Clone)]
pub struct RepresentativeSampler {
    method: AggregationMethod,
    count: usize,
    target: String,
}

impl RepresentativeSampler {
    pub fn new(method: AggregationMethod, count: usize) -> Self {
        Self {
            method,
            count,
            target: "outcome".to_string(),
        }
    }

    pub fn from_config(config: &SamplerConfig) -> Self {
        Self::new(config.method, config.count).with_target(config.target.clone())
    }

    /// Choose which field of each observation is aggregated.
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = target.into();
        self
    }

    pub fn method(&self) -> AggregationMethod {
        self.method
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// One aggregate per location, ascending by statistic. Locations with
    /// equal statistics keep the order in which they first appear.
    pub fn aggregates(&self, rows: &[Observation]) -> Vec<LocationAggregate> {
        let mut index: HashMap<String, usize> = HashMap::new();
        let mut grouped: Vec<(String, Vec<f64>)> = Vec::new();
        let mut skipped = 0usize;

        for row in rows {
            let location = normalize_location(&row.location);
            if location.is_empty() {
                skipped += 1;
                continue;
            }
            let Some(value) = row.outcome(&self.target).filter(|v| v.is_finite()) else {
                skipped += 1;
                continue;
            };
            let slot = *index.entry(location.clone()).or_insert_with(|| {
                grouped.push((location, Vec::new()));
                grouped.len() - 1
            });
            grouped[slot].1.push(value);
        }

        if skipped > 0 {
            debug!(skipped, target = %self.target, "Rows without a usable outcome were skipped");
        }

        let mut aggregates: Vec<LocationAggregate> = grouped
            .into_iter()
            .filter_map(|(location, values)| {
                stats::aggregate(self.method, &values)
                    .map(|statistic| LocationAggregate { location, statistic })
            })
            .collect();
        aggregates.sort_by(|a, b| a.statistic.total_cmp(&b.statistic));
        aggregates
    }

    /// Select up to `count` representative locations.
    ///
    /// Each evenly spaced quantile of the aggregates maps to its nearest
    /// location. When several quantiles land on the same location, the
    /// selection is topped up with the lowest-aggregate locations not yet
    /// chosen, so the result always holds `min(count, locations)` entries.
    pub fn select(&self, rows: &[Observation]) -> GeoLiftResult<SampleSelection> {
        if self.count == 0 {
            return Err(GeoLiftError::InvalidSampleSize(self.count));
        }

        let aggregates = self.aggregates(rows);
        let n = self.count.min(aggregates.len());
        let mut selection = SampleSelection::new();
        if n == 0 {
            return Ok(selection);
        }

        let sorted: Vec<f64> = aggregates.iter().map(|a| a.statistic).collect();
        for p in stats::evenly_spaced_probabilities(n) {
            let nearest = stats::quantile_sorted(&sorted, p)
                .and_then(|q| stats::nearest_index(&sorted, q));
            if let Some(i) = nearest {
                selection.insert(&aggregates[i].location);
            }
        }

        let matched = selection.len();
        let mut cursor = 0;
        while selection.len() < n && cursor < aggregates.len() {
            selection.insert(&aggregates[cursor].location);
            cursor += 1;
        }

        debug!(
            method = %self.method,
            requested = self.count,
            locations = aggregates.len(),
            matched,
            selected = selection.len(),
            "Representative locations selected"
        );

        Ok(selection)
    }
}

/// Convenience entry point taking the method by name, as supplied by a UI
/// or config layer. Unknown methods fail with `InvalidMethod`.
pub fn select_representative_locations(
    rows: &[Observation],
    method: &str,
    count: usize,
    target: &str,
) -> GeoLiftResult<SampleSelection> {
    let method: AggregationMethod = method.parse()?;
    RepresentativeSampler::new(method, count)
        .with_target(target)
        .select(rows)
}
