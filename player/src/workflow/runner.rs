use crate::workflow::config::WorkflowConfig;
use anyhow::{bail, Context};
use log::info;
use slipcore::ingest::{read_merged, read_series};
use slipcore::playback::PlaybackSession;
use slipcore::processing::{SegmentationView, TrackedField};
use slipcore::telemetry::MetricsRecorder;
use slipcore::timeline::{merge, MergedTimeline};
use slipcore::SeriesKind;
use std::sync::Arc;

/// Summary of a one-shot run over the whole timeline.
pub struct OfflineSummary {
    pub rows: usize,
    pub first_stamp: Option<String>,
    pub last_stamp: Option<String>,
    pub window_seconds: usize,
    pub segmentation_seconds: usize,
    pub final_slip_angle: Option<f64>,
    pub final_speed: Option<f64>,
}

#[derive(Clone)]
pub struct Runner {
    config: WorkflowConfig,
    metrics: Arc<MetricsRecorder>,
}

impl Runner {
    pub fn new(config: WorkflowConfig) -> Self {
        Self {
            config,
            metrics: Arc::new(MetricsRecorder::new()),
        }
    }

    /// Builds the merged timeline from the configured inputs.
    pub fn load_timeline(&self) -> anyhow::Result<MergedTimeline> {
        if let Some(path) = &self.config.merged {
            let timeline = read_merged(path)
                .with_context(|| format!("reading merged file {}", path.display()))?;
            self.metrics.record_load(timeline.len(), 0);
            info!("loaded {} merged rows from {}", timeline.len(), path.display());
            return Ok(timeline);
        }

        let (Some(base_path), Some(rover_path)) = (&self.config.base, &self.config.rover) else {
            bail!("no input: configure a merged file or both base and rover files");
        };

        let (base, base_report) = read_series(base_path, SeriesKind::Base, &self.config.time)
            .with_context(|| format!("reading base file {}", base_path.display()))?;
        let (rover, rover_report) = read_series(rover_path, SeriesKind::Rover, &self.config.time)
            .with_context(|| format!("reading rover file {}", rover_path.display()))?;
        for report in [&base_report, &rover_report] {
            self.metrics
                .record_load(report.rows_loaded, report.rows_skipped());
        }

        let timeline = merge(&base, &rover).context("merging base and rover series")?;
        info!(
            "merged {} base / {} rover rows into {} timeline rows",
            base.len(),
            rover.len(),
            timeline.len()
        );
        Ok(timeline)
    }

    pub fn open_session(&self) -> anyhow::Result<PlaybackSession> {
        let timeline = self.load_timeline()?;
        Ok(PlaybackSession::with_metrics(
            timeline,
            self.config.session_options(),
            self.metrics.clone(),
        ))
    }

    /// Seeks to the last row and builds every view once.
    pub fn execute(&self, session: &mut PlaybackSession) -> OfflineSummary {
        let last = session.timeline().last_index().unwrap_or(0);
        session.seek(last);

        let metric_window = session.window(&self.config.window, &self.config.metric_view());
        let segmentation = session.window(&self.config.window, &SegmentationView);
        let snapshot = session.snapshot();
        let timeline = session.timeline();

        OfflineSummary {
            rows: timeline.len(),
            first_stamp: timeline.samples().first().map(|s| s.stamp.to_string()),
            last_stamp: timeline.samples().last().map(|s| s.stamp.to_string()),
            window_seconds: metric_window.len(),
            segmentation_seconds: segmentation.len(),
            final_slip_angle: snapshot
                .as_ref()
                .map(|s| TrackedField::SlipAngle.read(&s.current)),
            final_speed: snapshot.as_ref().map(|s| TrackedField::Speed.read(&s.current)),
        }
    }
}
