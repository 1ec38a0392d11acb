use anyhow::Context;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use slipcore::ingest::write_series;
use slipcore::timeline::{GpsStamp, RawSample, ReceiverFix, SourceSeries};
use slipcore::SeriesKind;
use std::f64::consts::PI;
use std::path::{Path, PathBuf};

const METERS_PER_DEGREE: f64 = 111_320.0;

/// Synthetic drive: a constant-speed turn with an oscillating slip angle,
/// logged by both receivers at `rate_hz`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DriveProfile {
    pub seconds: u64,
    pub rate_hz: u32,
    pub start: String,
    pub origin_lat: f64,
    pub origin_lon: f64,
    pub speed: f64,
    /// Course change in degrees per second.
    pub turn_rate: f64,
    pub slip_amplitude: f64,
    pub slip_period: f64,
    pub noise: f64,
    /// Every n-th base row is missing; 0 keeps them all.
    pub base_dropout_every: usize,
    pub seed: u64,
}

impl Default for DriveProfile {
    fn default() -> Self {
        Self {
            seconds: 120,
            rate_hz: 10,
            start: "20240904101500".to_string(),
            origin_lat: 29.18853467,
            origin_lon: -81.04548,
            speed: 12.0,
            turn_rate: 3.0,
            slip_amplitude: 4.0,
            slip_period: 20.0,
            noise: 0.05,
            base_dropout_every: 50,
            seed: 0,
        }
    }
}

impl DriveProfile {
    pub fn rows(&self) -> usize {
        self.seconds as usize * self.rate_hz.max(1) as usize
    }

    pub fn base_rows(&self) -> usize {
        match self.base_dropout_every {
            0 => self.rows(),
            every => self.rows() - self.rows() / every,
        }
    }

    fn drops_base(&self, row: usize) -> bool {
        self.base_dropout_every > 0 && (row + 1) % self.base_dropout_every == 0
    }
}

fn wrap_360(degrees: f64) -> f64 {
    degrees.rem_euclid(360.0)
}

pub fn generate_drive(profile: &DriveProfile) -> anyhow::Result<(SourceSeries, SourceSeries)> {
    let start = GpsStamp::parse(&profile.start).context("parsing drive start stamp")?;
    let rate = f64::from(profile.rate_hz.max(1));
    let dt = 1.0 / rate;
    let mut rng = StdRng::seed_from_u64(profile.seed);

    let mut lat = profile.origin_lat;
    let mut lon = profile.origin_lon;
    let mut base = Vec::with_capacity(profile.base_rows());
    let mut rover = Vec::with_capacity(profile.rows());

    for row in 0..profile.rows() {
        let t = row as f64 / rate;
        let course = wrap_360(profile.turn_rate * t);
        let slip = profile.slip_amplitude * (2.0 * PI * t / profile.slip_period.max(dt)).sin();
        let jitter = if profile.noise > 0.0 {
            rng.gen_range(-profile.noise..profile.noise)
        } else {
            0.0
        };
        let speed = profile.speed + jitter;
        let radians = course.to_radians();
        let fix = ReceiverFix {
            lat,
            lon,
            vx: speed * radians.sin(),
            vy: speed * radians.cos(),
            vz: 0.0,
            cog: course,
        };
        let stamp = start.offset_seconds(t);

        if !profile.drops_base(row) {
            base.push(RawSample {
                stamp,
                fix,
                rel_pos_heading: f64::NAN,
            });
        }
        rover.push(RawSample {
            stamp,
            fix: ReceiverFix {
                cog: wrap_360(course + jitter),
                ..fix
            },
            rel_pos_heading: wrap_360(course + slip),
        });

        lat += fix.vy * dt / METERS_PER_DEGREE;
        lon += fix.vx * dt / (METERS_PER_DEGREE * lat.to_radians().cos());
    }

    Ok((
        SourceSeries::new(SeriesKind::Base, base),
        SourceSeries::new(SeriesKind::Rover, rover),
    ))
}

/// Writes `base.csv` and `rover.csv` into `dir` and returns their paths.
pub fn write_drive(dir: &Path, profile: &DriveProfile) -> anyhow::Result<(PathBuf, PathBuf)> {
    std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    let (base, rover) = generate_drive(profile)?;
    let base_path = dir.join("base.csv");
    let rover_path = dir.join("rover.csv");
    write_series(&base_path, &base)
        .with_context(|| format!("writing {}", base_path.display()))?;
    write_series(&rover_path, &rover)
        .with_context(|| format!("writing {}", rover_path.display()))?;
    Ok((base_path, rover_path))
}
