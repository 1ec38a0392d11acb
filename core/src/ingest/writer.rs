use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::prelude::{EngineResult, SeriesKind};
use crate::timeline::sample::{COL_INDEX, COL_REL_POS_HEADING, COL_TIME, FIX_COLUMNS};
use crate::timeline::{MergedTimeline, ReceiverFix, SourceSeries};

fn cells(fix: &ReceiverFix) -> impl Iterator<Item = String> {
    fix.as_array().into_iter().map(|value| value.to_string())
}

pub fn write_merged(path: &Path, timeline: &MergedTimeline) -> EngineResult<()> {
    write_merged_to(File::create(path)?, timeline)
}

/// Writes the merged columns in the order `read_merged` expects.
pub fn write_merged_to<W: Write>(sink: W, timeline: &MergedTimeline) -> EngineResult<()> {
    let mut writer = csv::Writer::from_writer(sink);
    writer.write_record(SeriesKind::Merged.required_columns())?;
    for sample in timeline.samples() {
        let mut record = vec![sample.stamp.to_string()];
        record.extend(cells(&sample.base));
        record.extend(cells(&sample.rover));
        record.push(sample.rel_pos_heading.to_string());
        record.push(sample.beta.to_string());
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_series(path: &Path, series: &SourceSeries) -> EngineResult<()> {
    write_series_to(File::create(path)?, series)
}

/// Writes a receiver file in the raw layout, including the leading
/// placeholder row with `Index` 0 that receivers emit.
pub fn write_series_to<W: Write>(sink: W, series: &SourceSeries) -> EngineResult<()> {
    let rover = series.kind == SeriesKind::Rover;
    let mut header = vec![COL_INDEX, COL_TIME];
    header.extend(FIX_COLUMNS);
    if rover {
        header.push(COL_REL_POS_HEADING);
    }

    let mut writer = csv::Writer::from_writer(sink);
    writer.write_record(&header)?;
    let mut placeholder = vec![String::new(); header.len()];
    placeholder[0] = "0".to_string();
    writer.write_record(&placeholder)?;

    for (idx, sample) in series.samples.iter().enumerate() {
        let mut record = vec![(idx + 1).to_string(), sample.stamp.to_string()];
        record.extend(cells(&sample.fix));
        if rover {
            record.push(sample.rel_pos_heading.to_string());
        }
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}
