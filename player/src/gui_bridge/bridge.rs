use crate::driver::PlayDriver;
use crate::gui_bridge::model::VisualizationModel;
use crate::workflow::config::WorkflowConfig;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::json;
use slipcore::playback::{CursorState, SessionHandle};
use slipcore::processing::{MetricView, WindowSpec};
use slipcore::telemetry::MetricsSnapshot;
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::sync::Mutex;
use warp::{http::StatusCode, Filter};

/// Cursor mutation posted by a front end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum CursorCommand {
    Seek { index: usize },
    Step { seconds: f64 },
    Play,
    Pause,
    Toggle,
    Restart,
}

#[derive(Debug, Deserialize)]
struct FrameQuery {
    window: Option<String>,
}

/// Bridge that serves playback frames over HTTP and applies cursor
/// commands to the shared session.
pub struct GuiBridge {
    handle: SessionHandle,
    driver: Mutex<PlayDriver>,
    window: WindowSpec,
    view: MetricView,
    tick: Duration,
}

impl GuiBridge {
    pub fn new(handle: SessionHandle, config: &WorkflowConfig) -> Self {
        Self {
            handle,
            driver: Mutex::new(PlayDriver::new()),
            window: config.window,
            view: config.metric_view(),
            tick: config.tick_interval(),
        }
    }

    pub async fn frame(&self, window: &WindowSpec) -> VisualizationModel {
        let mut session = self.handle.lock().await;
        VisualizationModel::capture(&mut session, window, &self.view)
    }

    pub async fn metrics(&self) -> MetricsSnapshot {
        self.handle.lock().await.metrics().snapshot()
    }

    /// Applies one command, then starts or stops the play driver to match
    /// the resulting play state.
    pub async fn apply(&self, command: CursorCommand) -> CursorState {
        let state = self
            .handle
            .mutate(|session| match command {
                CursorCommand::Seek { index } => session.seek(index),
                CursorCommand::Step { seconds } => session.step(seconds),
                CursorCommand::Play => session.play(),
                CursorCommand::Pause => session.pause(),
                CursorCommand::Toggle => session.toggle(),
                CursorCommand::Restart => session.restart(),
            })
            .await;

        let mut driver = self.driver.lock().await;
        if state.is_playing() {
            if !driver.is_running() {
                driver.start(self.handle.clone(), self.tick);
            }
        } else {
            driver.stop();
        }
        state
    }

    pub fn routes(
        self: &Arc<Self>,
    ) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
        let bridge = self.clone();
        let bridge_filter = warp::any().map(move || bridge.clone());

        let frame_route = warp::path("frame")
            .and(warp::path::end())
            .and(warp::get())
            .and(warp::query::<FrameQuery>())
            .and(bridge_filter.clone())
            .and_then(|query: FrameQuery, bridge: Arc<GuiBridge>| async move {
                let window = match query.window.as_deref().map(str::parse::<WindowSpec>) {
                    None => bridge.window,
                    Some(Ok(window)) => window,
                    Some(Err(err)) => {
                        warn!("frame request rejected: {}", err);
                        return Ok::<_, warp::Rejection>(warp::reply::with_status(
                            warp::reply::json(&json!({ "error": err.to_string() })),
                            StatusCode::BAD_REQUEST,
                        ));
                    }
                };
                let model = bridge.frame(&window).await;
                Ok(warp::reply::with_status(
                    warp::reply::json(&model),
                    StatusCode::OK,
                ))
            });

        let cursor_route = warp::path("cursor")
            .and(warp::path::end())
            .and(warp::post())
            .and(warp::body::json())
            .and(bridge_filter.clone())
            .and_then(|command: CursorCommand, bridge: Arc<GuiBridge>| async move {
                let state = bridge.apply(command).await;
                Ok::<_, warp::Rejection>(warp::reply::json(&state))
            });

        let metrics_route = warp::path("metrics")
            .and(warp::path::end())
            .and(warp::get())
            .and(bridge_filter)
            .and_then(|bridge: Arc<GuiBridge>| async move {
                Ok::<_, warp::Rejection>(warp::reply::json(&bridge.metrics().await))
            });

        frame_route.or(cursor_route).or(metrics_route)
    }

    pub async fn serve(self: Arc<Self>, address: SocketAddr) {
        self.publish_status(&format!("HTTP bridge listening on http://{}", address));
        warp::serve(self.routes()).run(address).await;
    }

    pub fn publish_status(&self, message: &str) {
        info!("[bridge] {}", message);
    }
}
