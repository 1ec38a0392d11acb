use std::sync::Arc;
use tokio::sync::{watch, Mutex, MutexGuard};

use crate::playback::cursor::CursorState;
use crate::playback::session::PlaybackSession;

/// Shared owner of a [`PlaybackSession`].
///
/// All mutations go through [`SessionHandle::mutate`], which serializes them
/// behind one lock and publishes the resulting cursor to every subscriber.
/// Readers only ever observe the cursor before or after a mutation.
#[derive(Clone)]
pub struct SessionHandle {
    session: Arc<Mutex<PlaybackSession>>,
    cursor_tx: Arc<watch::Sender<CursorState>>,
}

impl SessionHandle {
    pub fn new(session: PlaybackSession) -> Self {
        let (cursor_tx, _) = watch::channel(session.cursor());
        Self {
            session: Arc::new(Mutex::new(session)),
            cursor_tx: Arc::new(cursor_tx),
        }
    }

    /// Latest published cursor without taking the session lock.
    pub fn cursor(&self) -> CursorState {
        *self.cursor_tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<CursorState> {
        self.cursor_tx.subscribe()
    }

    /// Exclusive access for reads that also touch the view cache.
    pub async fn lock(&self) -> MutexGuard<'_, PlaybackSession> {
        self.session.lock().await
    }

    pub async fn mutate<R>(&self, apply: impl FnOnce(&mut PlaybackSession) -> R) -> R {
        let mut session = self.session.lock().await;
        let result = apply(&mut session);
        self.cursor_tx.send_replace(session.cursor());
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::cursor::PlayState;
    use crate::playback::session::SessionOptions;
    use crate::timeline::{GpsStamp, MergedTimeline, ReceiverFix, Sample};

    fn session(rows: usize) -> PlaybackSession {
        let start = GpsStamp::parse("20240904101500").unwrap();
        let timeline = MergedTimeline::from_samples(
            (0..rows)
                .map(|i| Sample {
                    stamp: start.offset_seconds(i as f64),
                    base: ReceiverFix::ZERO,
                    rover: ReceiverFix::ZERO,
                    rel_pos_heading: 0.0,
                    beta: 0.0,
                    base_present: false,
                })
                .collect(),
        );
        PlaybackSession::new(timeline, SessionOptions::default())
    }

    #[tokio::test]
    async fn mutations_are_published() {
        let handle = SessionHandle::new(session(10));
        let mut rx = handle.subscribe();

        handle.mutate(|s| s.seek(7)).await;
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().index, 7);
        assert_eq!(handle.cursor().index, 7);
    }

    #[tokio::test]
    async fn clones_share_one_cursor() {
        let handle = SessionHandle::new(session(10));
        let other = handle.clone();
        other.mutate(|s| s.play()).await;
        assert_eq!(handle.cursor().state, PlayState::Playing);
        assert_eq!(handle.lock().await.cursor().state, PlayState::Playing);
    }

    #[tokio::test]
    async fn concurrent_steps_are_serialized() {
        let handle = SessionHandle::new(session(100));
        let mut tasks = Vec::new();
        for _ in 0..20 {
            let handle = handle.clone();
            tasks.push(tokio::spawn(async move {
                handle.mutate(|s| s.step(1.0)).await;
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }
        assert_eq!(handle.cursor().index, 20);
    }
}
