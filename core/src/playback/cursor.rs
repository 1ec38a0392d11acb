use serde::{Deserialize, Serialize};

use crate::timeline::MergedTimeline;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayState {
    #[default]
    Paused,
    Playing,
}

/// Read-only view of the cursor handed to consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CursorState {
    pub index: usize,
    pub len: usize,
    pub state: PlayState,
}

impl CursorState {
    pub fn is_playing(&self) -> bool {
        self.state == PlayState::Playing
    }

    pub fn at_end(&self) -> bool {
        self.len == 0 || self.index + 1 >= self.len
    }
}

/// The single authoritative playback position.
///
/// Every operation is total: out-of-range input clamps into `[0, len - 1]`
/// and nothing returns an error. On an empty timeline the index stays 0 and
/// the cursor never enters `Playing`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackCursor {
    index: usize,
    len: usize,
    state: PlayState,
}

impl PlaybackCursor {
    pub fn new(len: usize) -> Self {
        Self {
            index: 0,
            len,
            state: PlayState::Paused,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlayState::Playing
    }

    pub fn state(&self) -> CursorState {
        CursorState {
            index: self.index,
            len: self.len,
            state: self.state,
        }
    }

    fn last(&self) -> usize {
        self.len.saturating_sub(1)
    }

    /// Moves to `index`, clamped. Play state is unchanged.
    pub fn seek(&mut self, index: usize) {
        self.index = index.min(self.last());
    }

    /// Moves to the nearest available timestamp `delta_seconds` away from the
    /// current one: the first row at or after the target when moving forward,
    /// the last row at or before it when moving back, clamping to the ends
    /// when no such row exists. Landing on the last row while playing pauses.
    pub fn step(&mut self, timeline: &MergedTimeline, delta_seconds: f64) {
        self.rebind(timeline.len());
        if delta_seconds.is_nan() {
            return;
        }
        let Some(current) = timeline.get(self.index) else {
            return;
        };

        let target = current.stamp.offset_seconds(delta_seconds);
        self.index = if delta_seconds >= 0.0 {
            timeline.index_at_or_after(target).unwrap_or(self.last())
        } else {
            timeline.index_at_or_before(target).unwrap_or(0)
        };

        if self.is_playing() && self.index == self.last() {
            self.state = PlayState::Paused;
        }
    }

    pub fn play(&mut self) {
        if self.len > 0 {
            self.state = PlayState::Playing;
        }
    }

    pub fn pause(&mut self) {
        self.state = PlayState::Paused;
    }

    pub fn toggle(&mut self) {
        if self.is_playing() {
            self.pause();
        } else {
            self.play();
        }
    }

    pub fn restart(&mut self) {
        self.seek(0);
        self.pause();
    }

    /// Adopts a new timeline length, clamping the index into range.
    pub fn rebind(&mut self, len: usize) {
        self.len = len;
        self.index = self.index.min(self.last());
        if len == 0 {
            self.state = PlayState::Paused;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeline::{GpsStamp, ReceiverFix, Sample};

    /// Rows at the given offsets (seconds) from a fixed start.
    fn timeline(offsets: &[f64]) -> MergedTimeline {
        let start = GpsStamp::parse("20240904101500").unwrap();
        MergedTimeline::from_samples(
            offsets
                .iter()
                .map(|&offset| Sample {
                    stamp: start.offset_seconds(offset),
                    base: ReceiverFix::ZERO,
                    rover: ReceiverFix::ZERO,
                    rel_pos_heading: 0.0,
                    beta: 0.0,
                    base_present: false,
                })
                .collect(),
        )
    }

    #[test]
    fn starts_paused_at_zero() {
        let cursor = PlaybackCursor::new(10);
        assert_eq!(cursor.index(), 0);
        assert!(!cursor.is_playing());
    }

    #[test]
    fn seek_clamps_and_is_idempotent() {
        let mut cursor = PlaybackCursor::new(10);
        for target in [0, 3, 9, 42] {
            cursor.seek(target);
            let once = cursor.clone();
            cursor.seek(target);
            assert_eq!(cursor, once);
        }
        assert_eq!(cursor.index(), 9);
    }

    #[test]
    fn seek_keeps_play_state() {
        let mut cursor = PlaybackCursor::new(10);
        cursor.play();
        cursor.seek(4);
        assert!(cursor.is_playing());
    }

    #[test]
    fn step_uses_nearest_available_timestamp() {
        let t = timeline(&[0.0, 1.0, 4.0, 5.0, 9.0]);
        let mut cursor = PlaybackCursor::new(t.len());

        cursor.step(&t, 2.0);
        assert_eq!(cursor.index(), 2, "first row at or after +2s is +4s");

        cursor.step(&t, -2.0);
        assert_eq!(cursor.index(), 1, "last row at or before +2s is +1s");
    }

    #[test]
    fn step_forward_then_back_need_not_return() {
        let t = timeline(&[0.0, 1.0, 4.0, 5.0, 9.0]);
        let mut cursor = PlaybackCursor::new(t.len());
        cursor.seek(1);
        cursor.step(&t, 2.0);
        cursor.step(&t, -2.0);
        assert_eq!(cursor.index(), 1);

        // +4s → +9s → +5s: the round trip is lossy
        cursor.seek(2);
        cursor.step(&t, 3.0);
        assert_eq!(cursor.index(), 4);
        cursor.step(&t, -3.0);
        assert_eq!(cursor.index(), 3);
    }

    #[test]
    fn step_clamps_at_both_ends() {
        let t = timeline(&[0.0, 1.0, 2.0]);
        let mut cursor = PlaybackCursor::new(t.len());
        cursor.step(&t, 100.0);
        assert_eq!(cursor.index(), 2);
        cursor.step(&t, -100.0);
        assert_eq!(cursor.index(), 0);
    }

    #[test]
    fn reaching_the_end_while_playing_pauses() {
        let t = timeline(&[0.0, 1.0, 2.0]);
        let mut cursor = PlaybackCursor::new(t.len());
        cursor.play();
        cursor.step(&t, 1.0);
        assert!(cursor.is_playing());
        cursor.step(&t, 1.0);
        assert_eq!(cursor.index(), 2);
        assert!(!cursor.is_playing());
    }

    #[test]
    fn restart_rewinds_and_pauses() {
        let mut cursor = PlaybackCursor::new(5);
        cursor.seek(3);
        cursor.play();
        cursor.restart();
        assert_eq!(cursor.state(), CursorState { index: 0, len: 5, state: PlayState::Paused });
    }

    #[test]
    fn rebind_clamps_to_a_shorter_timeline() {
        let mut cursor = PlaybackCursor::new(100);
        cursor.seek(80);
        cursor.rebind(10);
        assert_eq!(cursor.index(), 9);
        cursor.rebind(0);
        assert_eq!(cursor.index(), 0);
        assert!(!cursor.is_playing());
    }

    #[test]
    fn empty_timeline_is_inert() {
        let t = timeline(&[]);
        let mut cursor = PlaybackCursor::new(0);
        cursor.seek(5);
        cursor.step(&t, 1.0);
        cursor.play();
        assert_eq!(cursor.index(), 0);
        assert!(!cursor.is_playing());
    }

    #[test]
    fn nan_step_is_a_no_op() {
        let t = timeline(&[0.0, 1.0]);
        let mut cursor = PlaybackCursor::new(t.len());
        cursor.step(&t, f64::NAN);
        assert_eq!(cursor.index(), 0);
    }
}
