use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::math::kinematics::speed;
use crate::processing::rates::wrap_degrees;
use crate::timeline::{MergedTimeline, Sample};

/// Scalar fields that carry a delta in dashboard readouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackedField {
    Speed,
    Heading,
    ChassisHeading,
    SlipAngle,
}

impl TrackedField {
    pub const ALL: [TrackedField; 4] = [
        TrackedField::Speed,
        TrackedField::Heading,
        TrackedField::ChassisHeading,
        TrackedField::SlipAngle,
    ];

    pub fn is_angle(&self) -> bool {
        !matches!(self, TrackedField::Speed)
    }

    pub fn read(&self, sample: &Sample) -> f64 {
        match self {
            TrackedField::Speed => speed(&sample.rover),
            TrackedField::Heading => sample.rover.cog,
            TrackedField::ChassisHeading => sample.rel_pos_heading,
            TrackedField::SlipAngle => sample.beta,
        }
    }
}

/// How angle deltas are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeltaPolicy {
    /// Plain `current - previous`; a crossing of north shows as a ~360° jump.
    #[default]
    Raw,
    /// Angle deltas folded into (-180, 180].
    Wrapped,
}

/// Current and previous rows with their signed deltas.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricSnapshot {
    pub index: usize,
    pub previous_index: usize,
    pub current: Sample,
    pub previous: Sample,
    pub deltas: BTreeMap<TrackedField, f64>,
}

impl MetricSnapshot {
    pub fn delta(&self, field: TrackedField) -> f64 {
        self.deltas.get(&field).copied().unwrap_or(0.0)
    }
}

/// Snapshot with raw deltas. `None` only for an empty timeline.
pub fn snapshot(timeline: &MergedTimeline, cursor_index: usize) -> Option<MetricSnapshot> {
    snapshot_with(timeline, cursor_index, DeltaPolicy::Raw)
}

pub fn snapshot_with(
    timeline: &MergedTimeline,
    cursor_index: usize,
    policy: DeltaPolicy,
) -> Option<MetricSnapshot> {
    let last = timeline.last_index()?;
    let index = cursor_index.min(last);
    let previous_index = index.saturating_sub(1);
    let current = *timeline.get(index)?;
    let previous = *timeline.get(previous_index)?;

    let deltas = TrackedField::ALL
        .iter()
        .map(|&field| {
            // previous == current at the first row; zero even when the field is NaN
            let delta = if previous_index == index {
                0.0
            } else {
                let raw = field.read(&current) - field.read(&previous);
                match policy {
                    DeltaPolicy::Wrapped if field.is_angle() => wrap_degrees(raw),
                    _ => raw,
                }
            };
            (field, delta)
        })
        .collect();

    Some(MetricSnapshot {
        index,
        previous_index,
        current,
        previous,
        deltas,
    })
}
