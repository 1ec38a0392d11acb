use anyhow::{ensure, Context};
use serde::{Deserialize, Serialize};
use slipcore::ingest::TimeDecoder;
use slipcore::playback::SessionOptions;
use slipcore::processing::{DeltaPolicy, Metric, MetricView, WindowSpec};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    pub base: Option<PathBuf>,
    pub rover: Option<PathBuf>,
    /// A previously written merged file; takes precedence over base/rover.
    pub merged: Option<PathBuf>,
    pub window: WindowSpec,
    pub metrics: Vec<Metric>,
    /// Wall-clock time between play ticks.
    pub tick_interval_ms: u64,
    /// Timeline seconds advanced per play tick.
    pub tick_seconds: f64,
    pub time: TimeDecoder,
    pub wrap_angle_deltas: bool,
    pub cache_capacity: usize,
    pub bind: SocketAddr,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        let options = SessionOptions::default();
        Self {
            base: None,
            rover: None,
            merged: None,
            window: WindowSpec::default(),
            metrics: vec![Metric::Speed, Metric::SlipAngle],
            tick_interval_ms: 1000,
            tick_seconds: options.tick_seconds,
            time: TimeDecoder::default(),
            wrap_angle_deltas: false,
            cache_capacity: options.cache_capacity,
            bind: SocketAddr::from(([127, 0, 0, 1], 9000)),
        }
    }
}

impl WorkflowConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading workflow config {}", path_ref.display()))?;
        let config: WorkflowConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing workflow config {}", path_ref.display()))?;
        config
            .validate()
            .with_context(|| format!("checking workflow config {}", path_ref.display()))?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(
            self.tick_seconds.is_finite() && self.tick_seconds > 0.0,
            "tick_seconds must be a positive number of seconds, got {}",
            self.tick_seconds
        );
        self.time.validate()?;
        Ok(())
    }

    pub fn from_args(
        base: Option<PathBuf>,
        rover: Option<PathBuf>,
        merged: Option<PathBuf>,
        window: WindowSpec,
    ) -> Self {
        Self {
            base,
            rover,
            merged,
            window,
            ..Default::default()
        }
    }

    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            tick_seconds: self.tick_seconds,
            delta_policy: if self.wrap_angle_deltas {
                DeltaPolicy::Wrapped
            } else {
                DeltaPolicy::Raw
            },
            cache_capacity: self.cache_capacity,
        }
    }

    pub fn metric_view(&self) -> MetricView {
        if self.metrics.is_empty() {
            MetricView::default()
        } else {
            MetricView::new(self.metrics.clone())
        }
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn config_from_args_keeps_defaults() {
        let cfg = WorkflowConfig::from_args(None, None, Some("m.csv".into()), WindowSpec::All);
        assert_eq!(cfg.window, WindowSpec::All);
        assert_eq!(cfg.session_options().delta_policy, DeltaPolicy::Raw);
        assert_eq!(cfg.tick_interval(), Duration::from_secs(1));
    }

    #[test]
    fn config_load_reads_yaml() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(
            b"base: data/base.csv\n\
rover: data/rover.csv\n\
window: 2m\n\
metrics: [speed, yaw_rate]\n\
wrap_angle_deltas: true\n\
time:\n  time_zone: America/Chicago\n  utc_offset_hours: -5\n",
        )
        .unwrap();
        let path = temp.into_temp_path();
        let cfg = WorkflowConfig::load(&path).unwrap();
        assert_eq!(cfg.window, WindowSpec::seconds(120));
        assert_eq!(cfg.metric_view().metrics(), &[Metric::Speed, Metric::YawRate]);
        assert_eq!(cfg.session_options().delta_policy, DeltaPolicy::Wrapped);
        assert_eq!(cfg.time.time_zone, "America/Chicago");
        assert_eq!(cfg.time.utc_offset_hours, Some(-5.0));
        assert_eq!(cfg.time.leap_seconds, 18);
    }

    #[test]
    fn zero_window_is_rejected() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(b"window: 0s\n").unwrap();
        let path = temp.into_temp_path();
        assert!(WorkflowConfig::load(&path).is_err());
    }

    #[test]
    fn non_positive_tick_step_is_rejected() {
        for yaml in ["tick_seconds: 0\n", "tick_seconds: -1.5\n", "tick_seconds: .nan\n"] {
            let mut temp = NamedTempFile::new().unwrap();
            temp.write_all(yaml.as_bytes()).unwrap();
            let path = temp.into_temp_path();
            assert!(WorkflowConfig::load(&path).is_err(), "{yaml}");
        }
    }

    #[test]
    fn unknown_time_zone_is_rejected() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(b"time:\n  time_zone: Nowhere/Special\n").unwrap();
        let path = temp.into_temp_path();
        assert!(WorkflowConfig::load(&path).is_err());
    }
}
