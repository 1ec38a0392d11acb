use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::math::kinematics::DerivedVectors;
use crate::prelude::{EngineError, WindowView};
use crate::processing::aggregate::AggregatedWindow;
use crate::processing::rates::{lateral_acceleration, yaw_rates};
use crate::timeline::Sample;

/// Trajectory of the base receiver plus the three heading vectors anchored
/// at it.
#[derive(Debug, Clone, Copy, Default)]
pub struct SegmentationView;

impl SegmentationView {
    pub const COLUMNS: [&'static str; 8] = [
        "lat_base",
        "lon_base",
        "vel_cg_x",
        "vel_cg_y",
        "chassis_psi_x",
        "chassis_psi_y",
        "vel_rear_x",
        "vel_rear_y",
    ];
}

impl WindowView for SegmentationView {
    fn key(&self) -> String {
        "segmentation".to_string()
    }

    fn columns(&self) -> Vec<&'static str> {
        Self::COLUMNS.to_vec()
    }

    fn project(&self, sample: &Sample, derived: &DerivedVectors) -> Vec<f64> {
        vec![
            sample.base.lat,
            sample.base.lon,
            derived.velocity_heading.x,
            derived.velocity_heading.y,
            derived.chassis_heading.x,
            derived.chassis_heading.y,
            derived.base_heading.x,
            derived.base_heading.y,
        ]
    }
}

/// Scalar series offered by the line view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Speed,
    BaseSpeed,
    SlipAngle,
    Heading,
    ChassisHeading,
    YawRate,
    LateralAcceleration,
}

impl Metric {
    pub const ALL: [Metric; 7] = [
        Metric::Speed,
        Metric::BaseSpeed,
        Metric::SlipAngle,
        Metric::Heading,
        Metric::ChassisHeading,
        Metric::YawRate,
        Metric::LateralAcceleration,
    ];

    pub fn column(&self) -> &'static str {
        match self {
            Metric::Speed => "speed",
            Metric::BaseSpeed => "base_speed",
            Metric::SlipAngle => "slip_angle",
            Metric::Heading => "heading",
            Metric::ChassisHeading => "chassis_heading",
            Metric::YawRate => "yaw_rate",
            Metric::LateralAcceleration => "lateral_acceleration",
        }
    }

    fn needs_rates(&self) -> bool {
        matches!(self, Metric::YawRate | Metric::LateralAcceleration)
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

impl FromStr for Metric {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase().replace([' ', '-'], "_");
        Metric::ALL
            .iter()
            .copied()
            .find(|m| m.column() == wanted)
            .ok_or_else(|| EngineError::UnknownMetric(s.to_string()))
    }
}

// Chassis heading is averaged as a unit vector so that a second straddling
// north does not average 359° and 1° into 180°.
const AUX_HEADING_SIN: &str = "_chassis_heading_sin";
const AUX_HEADING_COS: &str = "_chassis_heading_cos";
const AUX_SPEED: &str = "_speed";

/// Multi-metric line view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricView {
    metrics: Vec<Metric>,
}

impl MetricView {
    pub fn new(metrics: Vec<Metric>) -> Self {
        let mut unique = Vec::with_capacity(metrics.len());
        for metric in metrics {
            if !unique.contains(&metric) {
                unique.push(metric);
            }
        }
        Self { metrics: unique }
    }

    pub fn metrics(&self) -> &[Metric] {
        &self.metrics
    }

    fn needs_rates(&self) -> bool {
        self.metrics.iter().any(Metric::needs_rates)
    }
}

impl Default for MetricView {
    fn default() -> Self {
        Self::new(vec![Metric::Speed, Metric::SlipAngle])
    }
}

impl WindowView for MetricView {
    fn key(&self) -> String {
        let names: Vec<&str> = self.metrics.iter().map(Metric::column).collect();
        format!("metrics:{}", names.join(","))
    }

    fn columns(&self) -> Vec<&'static str> {
        let mut columns: Vec<&'static str> = self.metrics.iter().map(Metric::column).collect();
        if self.needs_rates() {
            columns.extend([AUX_HEADING_SIN, AUX_HEADING_COS, AUX_SPEED]);
        }
        columns
    }

    fn project(&self, sample: &Sample, derived: &DerivedVectors) -> Vec<f64> {
        let mut row: Vec<f64> = self
            .metrics
            .iter()
            .map(|metric| match metric {
                Metric::Speed => derived.speed_rover,
                Metric::BaseSpeed => derived.speed_base,
                Metric::SlipAngle => sample.beta,
                Metric::Heading => sample.rover.cog,
                Metric::ChassisHeading => sample.rel_pos_heading,
                Metric::YawRate | Metric::LateralAcceleration => f64::NAN,
            })
            .collect();
        if self.needs_rates() {
            let radians = sample.rel_pos_heading.to_radians();
            row.extend([radians.sin(), radians.cos(), derived.speed_rover]);
        }
        row
    }

    fn finalize(&self, window: &mut AggregatedWindow) {
        if !self.needs_rates() {
            return;
        }
        let headings: Vec<f64> = match (window.column(AUX_HEADING_SIN), window.column(AUX_HEADING_COS)) {
            (Some(sin), Some(cos)) => sin
                .iter()
                .zip(cos.iter())
                .map(|(s, c)| s.atan2(*c).to_degrees())
                .collect(),
            _ => return,
        };
        let speeds: Vec<f64> = match window.column(AUX_SPEED) {
            Some(col) => col.to_vec(),
            None => return,
        };

        let yaw = yaw_rates(window.stamps(), &headings);
        let lateral = lateral_acceleration(&speeds, &yaw);
        window.replace_column(Metric::YawRate.column(), &yaw);
        window.replace_column(Metric::LateralAcceleration.column(), &lateral);

        let keep: Vec<&str> = self.metrics.iter().map(Metric::column).collect();
        window.retain_columns(&keep);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_parse_from_menu_labels() {
        assert_eq!("Speed".parse::<Metric>().unwrap(), Metric::Speed);
        assert_eq!("slip angle".parse::<Metric>().unwrap(), Metric::SlipAngle);
        assert_eq!("yaw-rate".parse::<Metric>().unwrap(), Metric::YawRate);
        assert!("torque".parse::<Metric>().is_err());
    }

    #[test]
    fn metric_view_dedups_and_keys_by_selection() {
        let view = MetricView::new(vec![Metric::Speed, Metric::Speed, Metric::SlipAngle]);
        assert_eq!(view.metrics().len(), 2);
        assert_eq!(view.key(), "metrics:speed,slip_angle");
        assert_eq!(view.columns(), vec!["speed", "slip_angle"]);
    }

    #[test]
    fn rate_metrics_carry_auxiliary_columns_until_finalized() {
        let view = MetricView::new(vec![Metric::YawRate]);
        assert_eq!(view.columns().len(), 4);
    }

    #[test]
    fn segmentation_projects_eight_columns() {
        assert_eq!(SegmentationView.columns().len(), SegmentationView::COLUMNS.len());
        assert_eq!(SegmentationView.key(), "segmentation");
    }
}
