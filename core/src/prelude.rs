use serde::{Deserialize, Serialize};
use std::fmt;

pub use crate::math::kinematics::DerivedVectors;
pub use crate::processing::aggregate::AggregatedWindow;
pub use crate::timeline::{GpsStamp, MergedTimeline, Sample};

/// Which input a series (or a schema check) belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeriesKind {
    Base,
    Rover,
    Merged,
}

impl SeriesKind {
    pub fn label(&self) -> &'static str {
        match self {
            SeriesKind::Base => "base",
            SeriesKind::Rover => "rover",
            SeriesKind::Merged => "merged",
        }
    }
}

impl fmt::Display for SeriesKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Common error type for ingestion and merging.
#[derive(thiserror::Error, Debug)]
pub enum EngineError {
    #[error("{series} series is missing required columns: {}", .missing.join(", "))]
    Schema {
        series: SeriesKind,
        missing: Vec<String>,
    },
    #[error("malformed timestamp: {0}")]
    Timestamp(String),
    #[error("invalid window: {0}")]
    InvalidWindow(String),
    #[error("unknown metric: {0}")]
    UnknownMetric(String),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type EngineResult<T> = Result<T, EngineError>;

/// Column projection applied to every timeline row before per-second
/// aggregation. Segmentation and metric line views differ only here.
pub trait WindowView {
    /// Stable identifier, part of the memoization key.
    fn key(&self) -> String;
    fn columns(&self) -> Vec<&'static str>;
    /// One value per entry of `columns()`, in the same order.
    fn project(&self, sample: &Sample, derived: &DerivedVectors) -> Vec<f64>;
    /// Hook that runs once on the aggregated rows.
    fn finalize(&self, _window: &mut AggregatedWindow) {}
}
