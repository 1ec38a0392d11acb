use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::prelude::SeriesKind;
use crate::timeline::stamp::GpsStamp;

pub const COL_TIME: &str = "GPS time";
pub const COL_INDEX: &str = "Index";
pub const COL_LAT: &str = "Lat";
pub const COL_LON: &str = "Lon";
pub const COL_VX: &str = "VX";
pub const COL_VY: &str = "VY";
pub const COL_VZ: &str = "VZ";
pub const COL_COG: &str = "CoG";
pub const COL_REL_POS_HEADING: &str = "relPosHeading";
pub const COL_BETA: &str = "beta";

/// Per-receiver fields shared by the base and rover files.
pub const FIX_COLUMNS: [&str; 6] = [COL_LAT, COL_LON, COL_VX, COL_VY, COL_VZ, COL_COG];

impl SeriesKind {
    /// Columns a series must carry before it can take part in a merge.
    pub fn required_columns(&self) -> Vec<String> {
        let mut columns = vec![COL_TIME.to_string()];
        match self {
            SeriesKind::Base => columns.extend(FIX_COLUMNS.iter().map(|c| c.to_string())),
            SeriesKind::Rover => {
                columns.extend(FIX_COLUMNS.iter().map(|c| c.to_string()));
                columns.push(COL_REL_POS_HEADING.to_string());
            }
            SeriesKind::Merged => {
                for suffix in ["_base", "_rover"] {
                    columns.extend(FIX_COLUMNS.iter().map(|c| format!("{}{}", c, suffix)));
                }
                columns.push(COL_REL_POS_HEADING.to_string());
                columns.push(COL_BETA.to_string());
            }
        }
        columns
    }
}

/// Position, velocity and course over ground reported by one receiver.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ReceiverFix {
    pub lat: f64,
    pub lon: f64,
    pub vx: f64,
    pub vy: f64,
    pub vz: f64,
    pub cog: f64,
}

impl ReceiverFix {
    pub const ZERO: ReceiverFix = ReceiverFix {
        lat: 0.0,
        lon: 0.0,
        vx: 0.0,
        vy: 0.0,
        vz: 0.0,
        cog: 0.0,
    };

    pub fn as_array(&self) -> [f64; 6] {
        [self.lat, self.lon, self.vx, self.vy, self.vz, self.cog]
    }

    pub fn from_array(values: [f64; 6]) -> Self {
        let [lat, lon, vx, vy, vz, cog] = values;
        Self {
            lat,
            lon,
            vx,
            vy,
            vz,
            cog,
        }
    }
}

/// One row of a single receiver file.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawSample {
    pub stamp: GpsStamp,
    pub fix: ReceiverFix,
    /// Rover only; NaN on base rows.
    pub rel_pos_heading: f64,
}

/// A receiver series together with the columns its source actually carried.
#[derive(Debug, Clone)]
pub struct SourceSeries {
    pub kind: SeriesKind,
    pub columns: BTreeSet<String>,
    pub samples: Vec<RawSample>,
}

impl SourceSeries {
    /// Series built in memory, carrying every column its kind requires.
    pub fn new(kind: SeriesKind, samples: Vec<RawSample>) -> Self {
        Self {
            kind,
            columns: kind.required_columns().into_iter().collect(),
            samples,
        }
    }

    pub fn with_columns(kind: SeriesKind, columns: BTreeSet<String>, samples: Vec<RawSample>) -> Self {
        Self {
            kind,
            columns,
            samples,
        }
    }

    /// Required columns of `role` absent from this series.
    pub fn missing_columns(&self, role: SeriesKind) -> Vec<String> {
        role.required_columns()
            .into_iter()
            .filter(|column| !self.columns.contains(column))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// One merged timeline row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub stamp: GpsStamp,
    pub base: ReceiverFix,
    pub rover: ReceiverFix,
    pub rel_pos_heading: f64,
    /// Slip angle, fixed at merge time.
    pub beta: f64,
    /// False when the base fields were zero-filled.
    pub base_present: bool,
}

static NEXT_TIMELINE_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of one built timeline; memoized views are keyed on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TimelineId(u64);

impl TimelineId {
    fn next() -> Self {
        TimelineId(NEXT_TIMELINE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

/// Ordered, immutable sequence of merged samples with strictly increasing
/// timestamps.
#[derive(Debug)]
pub struct MergedTimeline {
    id: TimelineId,
    samples: Vec<Sample>,
}

impl MergedTimeline {
    /// Sorts by timestamp and keeps the first row of any repeated stamp.
    pub fn from_samples(mut samples: Vec<Sample>) -> Self {
        samples.sort_by_key(|s| s.stamp);
        samples.dedup_by_key(|s| s.stamp);
        Self {
            id: TimelineId::next(),
            samples,
        }
    }

    pub fn empty() -> Self {
        Self::from_samples(Vec::new())
    }

    pub fn id(&self) -> TimelineId {
        self.id
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn get(&self, index: usize) -> Option<&Sample> {
        self.samples.get(index)
    }

    pub fn last_index(&self) -> Option<usize> {
        self.samples.len().checked_sub(1)
    }

    /// Smallest index whose timestamp is `>= stamp`.
    pub fn index_at_or_after(&self, stamp: GpsStamp) -> Option<usize> {
        let idx = self.samples.partition_point(|s| s.stamp < stamp);
        (idx < self.samples.len()).then_some(idx)
    }

    /// Largest index whose timestamp is `<= stamp`.
    pub fn index_at_or_before(&self, stamp: GpsStamp) -> Option<usize> {
        self.samples.partition_point(|s| s.stamp <= stamp).checked_sub(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(stamp: &str) -> Sample {
        Sample {
            stamp: GpsStamp::parse(stamp).unwrap(),
            base: ReceiverFix::ZERO,
            rover: ReceiverFix::ZERO,
            rel_pos_heading: 0.0,
            beta: 0.0,
            base_present: false,
        }
    }

    #[test]
    fn timeline_sorts_and_drops_repeated_stamps() {
        let timeline = MergedTimeline::from_samples(vec![
            row("20240904101502"),
            row("20240904101500"),
            row("20240904101502"),
        ]);
        assert_eq!(timeline.len(), 2);
        assert!(timeline.samples()[0].stamp < timeline.samples()[1].stamp);
    }

    #[test]
    fn nearest_index_lookups() {
        let timeline = MergedTimeline::from_samples(vec![
            row("20240904101500"),
            row("20240904101502"),
            row("20240904101505"),
        ]);
        let at = |s: &str| GpsStamp::parse(s).unwrap();
        assert_eq!(timeline.index_at_or_after(at("20240904101501")), Some(1));
        assert_eq!(timeline.index_at_or_after(at("20240904101506")), None);
        assert_eq!(timeline.index_at_or_before(at("20240904101504")), Some(1));
        assert_eq!(timeline.index_at_or_before(at("20240904101459")), None);
    }

    #[test]
    fn timelines_get_distinct_ids() {
        assert_ne!(MergedTimeline::empty().id(), MergedTimeline::empty().id());
    }

    #[test]
    fn rover_schema_requires_rel_pos_heading() {
        let mut series = SourceSeries::new(SeriesKind::Rover, Vec::new());
        series.columns.remove(COL_REL_POS_HEADING);
        assert_eq!(
            series.missing_columns(SeriesKind::Rover),
            vec![COL_REL_POS_HEADING.to_string()]
        );
        assert!(series.missing_columns(SeriesKind::Base).is_empty());
    }
}
