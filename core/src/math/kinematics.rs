use serde::{Deserialize, Serialize};

use crate::timeline::{MergedTimeline, ReceiverFix, Sample, TimelineId};

/// East/north components of a heading vector.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PlanarVector {
    pub x: f64,
    pub y: f64,
}

impl PlanarVector {
    /// Compass heading (0° = north, clockwise) scaled by `magnitude`.
    /// Any finite angle is accepted.
    pub fn from_heading(magnitude: f64, heading_deg: f64) -> Self {
        let radians = heading_deg.to_radians();
        Self {
            x: magnitude * radians.sin(),
            y: magnitude * radians.cos(),
        }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Kinematic quantities derived from one merged row.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DerivedVectors {
    pub speed_rover: f64,
    pub speed_base: f64,
    /// Rover speed along rover course over ground.
    pub velocity_heading: PlanarVector,
    /// Rover speed along the chassis (relative-position) heading.
    pub chassis_heading: PlanarVector,
    /// Base speed along base course over ground.
    pub base_heading: PlanarVector,
}

pub fn speed(fix: &ReceiverFix) -> f64 {
    (fix.vx * fix.vx + fix.vy * fix.vy + fix.vz * fix.vz).sqrt()
}

/// NaN inputs propagate into NaN outputs.
pub fn derive(sample: &Sample) -> DerivedVectors {
    let speed_rover = speed(&sample.rover);
    let speed_base = speed(&sample.base);
    DerivedVectors {
        speed_rover,
        speed_base,
        velocity_heading: PlanarVector::from_heading(speed_rover, sample.rover.cog),
        chassis_heading: PlanarVector::from_heading(speed_rover, sample.rel_pos_heading),
        base_heading: PlanarVector::from_heading(speed_base, sample.base.cog),
    }
}

/// Derived rows for a whole timeline, computed once per timeline identity.
#[derive(Debug, Clone)]
pub struct DerivedTable {
    timeline: TimelineId,
    rows: Vec<DerivedVectors>,
}

impl DerivedTable {
    pub fn build(timeline: &MergedTimeline) -> Self {
        Self {
            timeline: timeline.id(),
            rows: timeline.samples().iter().map(derive).collect(),
        }
    }

    pub fn timeline(&self) -> TimelineId {
        self.timeline
    }

    pub fn get(&self, index: usize) -> Option<&DerivedVectors> {
        self.rows.get(index)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
