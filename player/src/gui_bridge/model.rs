use serde::Serialize;
use slipcore::playback::{CursorState, PlaybackSession};
use slipcore::processing::{
    MetricSnapshot, MetricView, SegmentationView, Track, WindowColumns, WindowSpec,
};

/// Everything a front end needs to draw one playback position.
#[derive(Debug, Clone, Serialize)]
pub struct VisualizationModel {
    pub cursor: CursorState,
    pub stamp: Option<String>,
    pub clock: Option<String>,
    pub window: WindowSpec,
    pub snapshot: Option<MetricSnapshot>,
    pub segmentation: WindowColumns,
    pub metrics: WindowColumns,
    pub track: Track,
}

impl VisualizationModel {
    pub fn capture(session: &mut PlaybackSession, window: &WindowSpec, view: &MetricView) -> Self {
        let (stamp, clock) = match session.current() {
            Some(sample) => (Some(sample.stamp.to_string()), Some(sample.stamp.clock_label())),
            None => (None, None),
        };
        Self {
            cursor: session.cursor(),
            stamp,
            clock,
            window: *window,
            snapshot: session.snapshot(),
            segmentation: session.window(window, &SegmentationView).to_columns(),
            metrics: session.window(window, view).to_columns(),
            track: session.track(),
        }
    }
}
