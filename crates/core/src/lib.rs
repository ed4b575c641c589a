//! Shared data model, error taxonomy and configuration for the GeoLift
//! measurement core.

pub mod config;
pub mod error;
pub mod types;

pub use config::{AppConfig, EmptyGroupPolicy};
pub use error::{GeoLiftError, GeoLiftResult};
pub use types::{
    normalize_location, AggregationMethod, ConfidenceInterval, DailyPoint, EffectEstimate, Group,
    LocationAggregate, Observation, Partition, SampleSelection,
};
