use serde::Serialize;

use crate::timeline::{MergedTimeline, Sample};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrackPoint {
    pub lat: f64,
    pub lon: f64,
}

impl TrackPoint {
    fn of(sample: &Sample) -> Self {
        Self {
            lat: sample.base.lat,
            lon: sample.base.lon,
        }
    }
}

/// Traveled base path up to the cursor with its map markers.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Track {
    pub path: Vec<TrackPoint>,
    pub start: Option<TrackPoint>,
    pub current: Option<TrackPoint>,
    /// Only set once the cursor sits on the last row.
    pub end: Option<TrackPoint>,
}

/// Zero-filled base rows carry no position and are left out of the path
/// and markers.
pub fn track(timeline: &MergedTimeline, cursor_index: usize) -> Track {
    let Some(last) = timeline.last_index() else {
        return Track::default();
    };
    let idx = cursor_index.min(last);
    let located = |sample: &&Sample| sample.base_present;

    let path: Vec<TrackPoint> = timeline.samples()[..=idx]
        .iter()
        .filter(located)
        .map(TrackPoint::of)
        .collect();
    let start = timeline.samples().iter().find(located).map(TrackPoint::of);
    let current = path.last().copied();
    let end = if idx == last {
        timeline.samples().iter().rev().find(located).map(TrackPoint::of)
    } else {
        None
    };

    Track {
        path,
        start,
        current,
        end,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeline::{GpsStamp, ReceiverFix};

    fn timeline() -> MergedTimeline {
        let start = GpsStamp::parse("20240904101500").unwrap();
        MergedTimeline::from_samples(
            (0..5)
                .map(|i| Sample {
                    stamp: start.offset_seconds(i as f64),
                    base: if i == 2 {
                        ReceiverFix::ZERO
                    } else {
                        ReceiverFix {
                            lat: 29.0 + i as f64,
                            lon: -81.0,
                            ..ReceiverFix::ZERO
                        }
                    },
                    rover: ReceiverFix::ZERO,
                    rel_pos_heading: 0.0,
                    beta: 0.0,
                    base_present: i != 2,
                })
                .collect(),
        )
    }

    #[test]
    fn path_skips_zero_filled_rows() {
        let t = track(&timeline(), 3);
        assert_eq!(t.path.len(), 3);
        assert_eq!(t.current.unwrap().lat, 32.0);
        assert_eq!(t.start.unwrap().lat, 29.0);
        assert!(t.end.is_none());
    }

    #[test]
    fn end_marker_appears_on_the_last_row() {
        let t = track(&timeline(), 4);
        assert_eq!(t.end.unwrap().lat, 33.0);
    }

    #[test]
    fn empty_timeline_has_empty_track() {
        assert_eq!(track(&MergedTimeline::empty(), 0), Track::default());
    }
}
