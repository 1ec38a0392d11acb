use log::debug;
use slipcore::playback::SessionHandle;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

/// Background task that ticks a session while it is playing.
///
/// At most one task runs per driver: starting again stops the previous
/// task first. The task ends by itself once the cursor is paused, which
/// includes reaching the last row.
#[derive(Default)]
pub struct PlayDriver {
    stop: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl PlayDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self, handle: SessionHandle, period: Duration) {
        self.stop();
        let (stop_tx, mut stop_rx) = oneshot::channel();
        let task = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // the first tick completes immediately
            ticker.tick().await;
            loop {
                tokio::select! {
                    biased;
                    _ = &mut stop_rx => break,
                    _ = ticker.tick() => {
                        let state = handle.mutate(|session| session.tick()).await;
                        if !state.is_playing() {
                            debug!("play driver idle at {}/{}", state.index, state.len);
                            break;
                        }
                    }
                }
            }
        });
        self.stop = Some(stop_tx);
        self.task = Some(task);
    }

    pub fn stop(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        self.task = None;
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Waits for the current task to finish on its own.
    pub async fn join(&mut self) {
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
        self.stop = None;
    }
}

impl Drop for PlayDriver {
    fn drop(&mut self) {
        self.stop();
    }
}
