use log::debug;
use std::collections::HashMap;

use crate::prelude::{EngineError, EngineResult, SeriesKind};
use crate::timeline::sample::{MergedTimeline, RawSample, ReceiverFix, Sample, SourceSeries};
use crate::timeline::stamp::GpsStamp;

/// Slip angle between chassis heading and base course over ground.
pub fn slip_angle(rel_pos_heading: f64, cog_base: f64) -> f64 {
    rel_pos_heading - cog_base
}

/// Right join on timestamp with the rover as the driving side.
///
/// Every distinct rover timestamp yields exactly one row; rover stamps with
/// no base sample get zero base fields and base-only stamps are dropped.
/// Repeated stamps keep their first occurrence.
pub fn merge(base: &SourceSeries, rover: &SourceSeries) -> EngineResult<MergedTimeline> {
    require_schema(base, SeriesKind::Base)?;
    require_schema(rover, SeriesKind::Rover)?;

    let mut base_by_stamp: HashMap<GpsStamp, &RawSample> = HashMap::with_capacity(base.len());
    for sample in &base.samples {
        base_by_stamp.entry(sample.stamp).or_insert(sample);
    }

    let mut driving: Vec<&RawSample> = rover.samples.iter().collect();
    driving.sort_by_key(|s| s.stamp);
    driving.dedup_by_key(|s| s.stamp);

    let mut zero_filled = 0usize;
    let samples: Vec<Sample> = driving
        .into_iter()
        .map(|rover_sample| {
            let matched = base_by_stamp.get(&rover_sample.stamp).copied();
            if matched.is_none() {
                zero_filled += 1;
            }
            join_row(rover_sample, matched)
        })
        .collect();

    debug!(
        "merged {} rover / {} base samples into {} rows ({} zero-filled)",
        rover.len(),
        base.len(),
        samples.len(),
        zero_filled
    );

    Ok(MergedTimeline::from_samples(samples))
}

fn require_schema(series: &SourceSeries, role: SeriesKind) -> EngineResult<()> {
    let missing = series.missing_columns(role);
    if missing.is_empty() {
        Ok(())
    } else {
        Err(EngineError::Schema {
            series: role,
            missing,
        })
    }
}

fn join_row(rover: &RawSample, base: Option<&RawSample>) -> Sample {
    let (base_fix, base_present) = match base {
        Some(sample) => (sample.fix, true),
        None => (ReceiverFix::ZERO, false),
    };
    Sample {
        stamp: rover.stamp,
        base: base_fix,
        rover: rover.fix,
        rel_pos_heading: rover.rel_pos_heading,
        beta: slip_angle(rover.rel_pos_heading, base_fix.cog),
        base_present,
    }
}
