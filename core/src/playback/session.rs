use log::warn;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::math::kinematics::{DerivedTable, DerivedVectors};
use crate::playback::cursor::{CursorState, PlaybackCursor};
use crate::prelude::WindowView;
use crate::processing::aggregate::AggregatedWindow;
use crate::processing::snapshot::{snapshot_with, DeltaPolicy, MetricSnapshot};
use crate::processing::track::{track, Track};
use crate::processing::view_cache::{ViewCache, ViewKey};
use crate::processing::window::{build_window_with_table, WindowSpec};
use crate::telemetry::{LogManager, MetricsRecorder};
use crate::timeline::{MergedTimeline, Sample};

/// Tunables for one playback session.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionOptions {
    /// Seconds advanced by each play tick.
    pub tick_seconds: f64,
    pub delta_policy: DeltaPolicy,
    pub cache_capacity: usize,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            tick_seconds: 1.0,
            delta_policy: DeltaPolicy::Raw,
            cache_capacity: 64,
        }
    }
}

impl SessionOptions {
    /// Replaces a tick step that could never move the cursor forward.
    pub fn sanitized(self) -> Self {
        if self.tick_seconds.is_finite() && self.tick_seconds > 0.0 {
            return self;
        }
        let fallback = Self::default().tick_seconds;
        warn!(
            "tick_seconds {} cannot advance playback, using {}",
            self.tick_seconds, fallback
        );
        Self {
            tick_seconds: fallback,
            ..self
        }
    }
}

/// One playback session: the loaded timeline, its derived rows, the cursor
/// and the memoized views. The cursor is the only state that changes between
/// reloads.
pub struct PlaybackSession {
    timeline: Arc<MergedTimeline>,
    derived: Arc<DerivedTable>,
    cursor: PlaybackCursor,
    cache: ViewCache,
    options: SessionOptions,
    logger: LogManager,
    metrics: Arc<MetricsRecorder>,
}

impl PlaybackSession {
    pub fn new(timeline: MergedTimeline, options: SessionOptions) -> Self {
        Self::with_metrics(timeline, options, Arc::new(MetricsRecorder::new()))
    }

    pub fn with_metrics(
        timeline: MergedTimeline,
        options: SessionOptions,
        metrics: Arc<MetricsRecorder>,
    ) -> Self {
        let options = options.sanitized();
        let logger = LogManager::new("session");
        logger.record(&format!("session opened with {} rows", timeline.len()));
        let derived = Arc::new(DerivedTable::build(&timeline));
        Self {
            cursor: PlaybackCursor::new(timeline.len()),
            timeline: Arc::new(timeline),
            derived,
            cache: ViewCache::with_capacity(options.cache_capacity),
            options,
            logger,
            metrics,
        }
    }

    pub fn timeline(&self) -> &Arc<MergedTimeline> {
        &self.timeline
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    pub fn metrics(&self) -> &Arc<MetricsRecorder> {
        &self.metrics
    }

    pub fn cursor(&self) -> CursorState {
        self.cursor.state()
    }

    pub fn current(&self) -> Option<&Sample> {
        self.timeline.get(self.cursor.index())
    }

    pub fn current_derived(&self) -> Option<&DerivedVectors> {
        self.derived.get(self.cursor.index())
    }

    fn mutated(&self) -> CursorState {
        self.metrics.record_cursor_mutation();
        let state = self.cursor.state();
        self.logger
            .trace(&format!("cursor {}/{} {:?}", state.index, state.len, state.state));
        state
    }

    pub fn seek(&mut self, index: usize) -> CursorState {
        self.cursor.seek(index);
        self.mutated()
    }

    pub fn step(&mut self, delta_seconds: f64) -> CursorState {
        self.cursor.step(&self.timeline, delta_seconds);
        self.mutated()
    }

    pub fn play(&mut self) -> CursorState {
        self.cursor.play();
        self.mutated()
    }

    pub fn pause(&mut self) -> CursorState {
        self.cursor.pause();
        self.mutated()
    }

    pub fn toggle(&mut self) -> CursorState {
        self.cursor.toggle();
        self.mutated()
    }

    pub fn restart(&mut self) -> CursorState {
        self.cursor.restart();
        self.mutated()
    }

    /// One play-driver tick: advances by `tick_seconds` while playing and
    /// does nothing while paused.
    pub fn tick(&mut self) -> CursorState {
        if !self.cursor.is_playing() {
            return self.cursor.state();
        }
        let tick = self.options.tick_seconds;
        self.step(tick)
    }

    /// Swaps in a freshly built timeline. Cached views are dropped and the
    /// cursor is clamped to the new range.
    pub fn replace_timeline(&mut self, timeline: MergedTimeline) -> CursorState {
        self.logger.record(&format!(
            "timeline replaced: {} -> {} rows",
            self.timeline.len(),
            timeline.len()
        ));
        self.derived = Arc::new(DerivedTable::build(&timeline));
        self.timeline = Arc::new(timeline);
        self.cache.invalidate();
        self.cursor.rebind(self.timeline.len());
        self.metrics.record_reload();
        self.mutated()
    }

    /// Aggregated window for the current cursor, memoized per
    /// (timeline, cursor, window, view).
    pub fn window(&mut self, spec: &WindowSpec, view: &dyn WindowView) -> Arc<AggregatedWindow> {
        let index = self.cursor.index();
        let key = ViewKey {
            timeline: self.timeline.id(),
            cursor_index: index,
            spec: *spec,
            view: view.key(),
        };
        let timeline = Arc::clone(&self.timeline);
        let derived = Arc::clone(&self.derived);
        let (window, hit) = self.cache.get_or_build(key, || {
            build_window_with_table(&timeline, &derived, index, spec, view)
        });
        self.metrics.record_cache(hit);
        window
    }

    pub fn snapshot(&self) -> Option<MetricSnapshot> {
        snapshot_with(&self.timeline, self.cursor.index(), self.options.delta_policy)
    }

    pub fn track(&self) -> Track {
        track(&self.timeline, self.cursor.index())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::cursor::PlayState;
    use crate::processing::views::{MetricView, SegmentationView};
    use crate::timeline::{GpsStamp, ReceiverFix};

    fn timeline(rows: usize) -> MergedTimeline {
        let start = GpsStamp::parse("20240904101500").unwrap();
        MergedTimeline::from_samples(
            (0..rows)
                .map(|i| Sample {
                    stamp: start.offset_seconds(i as f64),
                    base: ReceiverFix {
                        lat: 29.0,
                        lon: -81.0,
                        ..ReceiverFix::ZERO
                    },
                    rover: ReceiverFix {
                        vx: 1.0,
                        cog: i as f64,
                        ..ReceiverFix::ZERO
                    },
                    rel_pos_heading: 0.0,
                    beta: i as f64,
                    base_present: true,
                })
                .collect(),
        )
    }

    #[test]
    fn play_ticks_until_the_end_then_pauses() {
        let mut session = PlaybackSession::new(timeline(5), SessionOptions::default());
        session.play();
        let mut ticks = 0;
        while session.cursor().is_playing() {
            session.tick();
            ticks += 1;
            assert!(ticks <= 10, "driver never terminated");
        }
        assert_eq!(ticks, 4);
        assert_eq!(session.cursor().index, 4);
        assert_eq!(session.cursor().state, PlayState::Paused);
    }

    #[test]
    fn paused_tick_does_not_move() {
        let mut session = PlaybackSession::new(timeline(5), SessionOptions::default());
        session.tick();
        assert_eq!(session.cursor().index, 0);
    }

    #[test]
    fn windows_are_memoized_until_the_cursor_moves() {
        let mut session = PlaybackSession::new(timeline(20), SessionOptions::default());
        session.seek(10);
        let first = session.window(&WindowSpec::seconds(5), &SegmentationView);
        let again = session.window(&WindowSpec::seconds(5), &SegmentationView);
        assert!(Arc::ptr_eq(&first, &again));

        session.seek(11);
        let moved = session.window(&WindowSpec::seconds(5), &SegmentationView);
        assert!(!Arc::ptr_eq(&first, &moved));

        let metrics = session.metrics().snapshot();
        assert_eq!(metrics.cache_hits, 1);
        assert_eq!(metrics.cache_misses, 2);
    }

    #[test]
    fn different_views_do_not_share_cache_entries() {
        let mut session = PlaybackSession::new(timeline(20), SessionOptions::default());
        let seg = session.window(&WindowSpec::All, &SegmentationView);
        let metric = session.window(&WindowSpec::All, &MetricView::default());
        assert_ne!(seg.columns(), metric.columns());
    }

    #[test]
    fn reload_clamps_cursor_and_drops_cached_views() {
        let mut session = PlaybackSession::new(timeline(50), SessionOptions::default());
        session.seek(40);
        let before = session.window(&WindowSpec::All, &SegmentationView);
        assert_eq!(before.len(), 41);

        let state = session.replace_timeline(timeline(10));
        assert_eq!(state.index, 9);
        assert_eq!(state.len, 10);

        let after = session.window(&WindowSpec::All, &SegmentationView);
        assert_eq!(after.len(), 10);
        assert_eq!(session.metrics().snapshot().timeline_reloads, 1);
    }

    #[test]
    fn snapshot_follows_the_cursor() {
        let mut session = PlaybackSession::new(timeline(5), SessionOptions::default());
        session.seek(3);
        let snap = session.snapshot().unwrap();
        assert_eq!(snap.index, 3);
        assert_eq!(snap.previous_index, 2);
        assert_eq!(session.current().unwrap().beta, 3.0);
        assert_eq!(session.current_derived().unwrap().speed_rover, 1.0);
    }

    #[test]
    fn empty_session_is_usable() {
        let mut session = PlaybackSession::new(MergedTimeline::empty(), SessionOptions::default());
        session.play();
        session.tick();
        assert!(session.snapshot().is_none());
        assert!(session.window(&WindowSpec::All, &SegmentationView).is_empty());
        assert!(session.track().path.is_empty());
    }

    #[test]
    fn stalled_tick_step_falls_back_to_one_second() {
        for tick_seconds in [0.0, -2.0, f64::NAN] {
            let options = SessionOptions {
                tick_seconds,
                ..Default::default()
            };
            let mut session = PlaybackSession::new(timeline(4), options);
            assert_eq!(session.options().tick_seconds, 1.0);

            session.play();
            let mut ticks = 0;
            while session.cursor().is_playing() {
                session.tick();
                ticks += 1;
                assert!(ticks <= 10, "tick step {tick_seconds} never finished");
            }
            assert_eq!(session.cursor().index, 3);
        }
    }
}
