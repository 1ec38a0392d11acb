//! Playback core for base/rover side-slip telemetry.
//!
//! Receiver files are read and merged into one timeline, per-row kinematics
//! are derived from it, and a single playback cursor drives the windowed
//! views and metric snapshots a front end renders.

pub mod ingest;
pub mod math;
pub mod playback;
pub mod prelude;
pub mod processing;
pub mod telemetry;
pub mod timeline;

pub use prelude::{EngineError, EngineResult, SeriesKind, WindowView};
