//! GeoLift measurement core: representative location sampling, geo
//! incrementality estimation, data quality checks and result interpretation.

pub mod dates;
pub mod estimator;
pub mod quality;
pub mod report;
pub mod sampler;
pub mod stats;

pub use dates::AnalysisWindow;
pub use estimator::{analyze_incrementality, IncrementalityEstimator};
pub use quality::{validate_data_quality, DataQualityIssue};
pub use report::AnalysisReport;
pub use sampler::{select_representative_locations, RepresentativeSampler};
