pub mod aggregate;
pub mod rates;
pub mod snapshot;
pub mod track;
pub mod view_cache;
pub mod views;
pub mod window;

pub use aggregate::{aggregate_by_second, AggregatedWindow, ColumnSeries, WindowColumns};
pub use snapshot::{snapshot, snapshot_with, DeltaPolicy, MetricSnapshot, TrackedField};
pub use track::{track, Track};
pub use view_cache::{ViewCache, ViewKey};
pub use views::{Metric, MetricView, SegmentationView};
pub use window::{build_window, build_window_with_table, select_range, WindowSpec};
