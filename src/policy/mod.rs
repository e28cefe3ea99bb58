//! Policy weights, confidence thresholds, and their batch adaptation.

pub mod adapter;
pub mod thresholds;
pub mod weights;

pub use adapter::{AdaptationReport, AdaptationStatus, AdapterConfig, PolicyAdapter};
pub use thresholds::{ConfidenceThresholds, ThresholdChange};
pub use weights::{PolicyWeights, WeightChange};
