use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;
use std::str::FromStr;
use std::time::Duration;

use crate::math::kinematics::{derive, DerivedTable};
use crate::prelude::{EngineError, WindowView};
use crate::processing::aggregate::{aggregate_by_second, AggregatedWindow};
use crate::timeline::MergedTimeline;

/// How much trailing history a view shows relative to the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum WindowSpec {
    /// Every row up to and including the cursor.
    All,
    /// Rows whose timestamp lies in `(current - length, current]`.
    Trailing(Duration),
}

impl WindowSpec {
    pub fn seconds(seconds: u64) -> Self {
        WindowSpec::Trailing(Duration::from_secs(seconds))
    }
}

impl Default for WindowSpec {
    fn default() -> Self {
        WindowSpec::seconds(30)
    }
}

impl FromStr for WindowSpec {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("all") {
            return Ok(WindowSpec::All);
        }
        let length = humantime::parse_duration(trimmed)
            .map_err(|e| EngineError::InvalidWindow(format!("'{}': {}", trimmed, e)))?;
        if length.is_zero() {
            return Err(EngineError::InvalidWindow("window length must be positive".into()));
        }
        Ok(WindowSpec::Trailing(length))
    }
}

impl fmt::Display for WindowSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WindowSpec::All => f.write_str("all"),
            WindowSpec::Trailing(length) => write!(f, "{}", humantime::format_duration(*length)),
        }
    }
}

impl TryFrom<String> for WindowSpec {
    type Error = EngineError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<WindowSpec> for String {
    fn from(spec: WindowSpec) -> Self {
        spec.to_string()
    }
}

/// Contiguous row range selected by `spec` for the cursor at
/// `cursor_index`. Cursor indices past the end are clamped; an empty
/// timeline selects nothing.
pub fn select_range(timeline: &MergedTimeline, cursor_index: usize, spec: &WindowSpec) -> Range<usize> {
    let Some(last) = timeline.last_index() else {
        return 0..0;
    };
    let idx = cursor_index.min(last);
    let prefix = &timeline.samples()[..=idx];

    match spec {
        WindowSpec::All => 0..idx + 1,
        WindowSpec::Trailing(length) => {
            let current = prefix[idx].stamp;
            let start = current.offset_seconds(-length.as_secs_f64());
            let lower = prefix.partition_point(|s| s.stamp <= start);
            lower..idx + 1
        }
    }
}

/// Per-second aggregated view of the rows selected by `spec`.
pub fn build_window(
    timeline: &MergedTimeline,
    cursor_index: usize,
    spec: &WindowSpec,
    view: &dyn WindowView,
) -> AggregatedWindow {
    build(timeline, None, cursor_index, spec, view)
}

/// Same as [`build_window`], reading derived rows from a prebuilt table when
/// it belongs to this timeline.
pub fn build_window_with_table(
    timeline: &MergedTimeline,
    table: &DerivedTable,
    cursor_index: usize,
    spec: &WindowSpec,
    view: &dyn WindowView,
) -> AggregatedWindow {
    let table = (table.timeline() == timeline.id()).then_some(table);
    build(timeline, table, cursor_index, spec, view)
}

fn build(
    timeline: &MergedTimeline,
    table: Option<&DerivedTable>,
    cursor_index: usize,
    spec: &WindowSpec,
    view: &dyn WindowView,
) -> AggregatedWindow {
    let columns: Vec<String> = view.columns().into_iter().map(String::from).collect();
    let range = select_range(timeline, cursor_index, spec);

    let rows = range.map(|idx| {
        let sample = &timeline.samples()[idx];
        let derived = table
            .and_then(|t| t.get(idx).copied())
            .unwrap_or_else(|| derive(sample));
        (sample.stamp, view.project(sample, &derived))
    });

    let mut window = aggregate_by_second(rows, columns);
    view.finalize(&mut window);
    window
}
