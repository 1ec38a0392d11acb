use log::{debug, warn};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::ingest::gps_time::TimeDecoder;
use crate::prelude::{EngineError, EngineResult, SeriesKind};
use crate::timeline::sample::{
    COL_BETA, COL_INDEX, COL_REL_POS_HEADING, COL_TIME, FIX_COLUMNS,
};
use crate::timeline::{GpsStamp, MergedTimeline, RawSample, ReceiverFix, Sample, SourceSeries};

/// What happened to the rows of one input file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub rows_read: usize,
    pub rows_loaded: usize,
    /// Rows whose `Index` column was 0 (the receiver's placeholder record).
    pub placeholder_rows: usize,
    pub bad_timestamps: usize,
}

impl LoadReport {
    pub fn rows_skipped(&self) -> usize {
        self.rows_read - self.rows_loaded
    }
}

/// Header lookup for one CSV source.
struct Columns {
    positions: HashMap<String, usize>,
}

impl Columns {
    fn new(headers: &csv::StringRecord) -> Self {
        let positions = headers
            .iter()
            .enumerate()
            .map(|(idx, name)| (name.trim().to_string(), idx))
            .collect();
        Self { positions }
    }

    fn names(&self) -> BTreeSet<String> {
        self.positions.keys().cloned().collect()
    }

    fn has(&self, name: &str) -> bool {
        self.positions.contains_key(name)
    }

    fn text<'r>(&self, record: &'r csv::StringRecord, name: &str) -> Option<&'r str> {
        self.positions
            .get(name)
            .and_then(|&idx| record.get(idx))
            .map(str::trim)
    }

    /// Empty, absent and non-numeric cells read as NaN.
    fn number(&self, record: &csv::StringRecord, name: &str) -> f64 {
        self.text(record, name)
            .and_then(|cell| cell.parse::<f64>().ok())
            .unwrap_or(f64::NAN)
    }

    fn fix(&self, record: &csv::StringRecord, suffix: &str) -> ReceiverFix {
        let mut values = [f64::NAN; 6];
        for (value, column) in values.iter_mut().zip(FIX_COLUMNS) {
            *value = self.number(record, &format!("{}{}", column, suffix));
        }
        ReceiverFix::from_array(values)
    }
}

fn csv_reader<R: Read>(reader: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader)
}

pub fn read_series(
    path: &Path,
    kind: SeriesKind,
    decoder: &TimeDecoder,
) -> EngineResult<(SourceSeries, LoadReport)> {
    let file = File::open(path)?;
    let (series, report) = read_series_from_reader(file, kind, decoder)?;
    debug!(
        "read {} series from {}: {} of {} rows",
        kind,
        path.display(),
        report.rows_loaded,
        report.rows_read
    );
    Ok((series, report))
}

/// Reads one receiver file. Only a missing time column fails here; the
/// remaining schema is checked when the series is merged.
pub fn read_series_from_reader<R: Read>(
    reader: R,
    kind: SeriesKind,
    decoder: &TimeDecoder,
) -> EngineResult<(SourceSeries, LoadReport)> {
    decoder.validate()?;
    let mut csv = csv_reader(reader);
    let columns = Columns::new(csv.headers()?);
    if !columns.has(COL_TIME) {
        return Err(EngineError::Schema {
            series: kind,
            missing: vec![COL_TIME.to_string()],
        });
    }

    let mut report = LoadReport::default();
    let mut samples = Vec::new();
    for record in csv.records() {
        let record = record?;
        report.rows_read += 1;

        if columns.has(COL_INDEX) && columns.number(&record, COL_INDEX) == 0.0 {
            report.placeholder_rows += 1;
            continue;
        }

        let cell = columns.text(&record, COL_TIME).unwrap_or_default();
        let stamp = match decoder.decode(cell) {
            Ok(stamp) => stamp,
            Err(err) => {
                warn!("{} row {}: {}", kind, report.rows_read, err);
                report.bad_timestamps += 1;
                continue;
            }
        };

        let rel_pos_heading = match kind {
            SeriesKind::Base => f64::NAN,
            _ => columns.number(&record, COL_REL_POS_HEADING),
        };
        samples.push(RawSample {
            stamp,
            fix: columns.fix(&record, ""),
            rel_pos_heading,
        });
    }
    report.rows_loaded = samples.len();

    Ok((SourceSeries::with_columns(kind, columns.names(), samples), report))
}

pub fn read_merged(path: &Path) -> EngineResult<MergedTimeline> {
    read_merged_from_reader(File::open(path)?)
}

/// Reads a previously written merged file. Rows whose base fields are all
/// zero are taken as zero-filled.
pub fn read_merged_from_reader<R: Read>(reader: R) -> EngineResult<MergedTimeline> {
    let mut csv = csv_reader(reader);
    let columns = Columns::new(csv.headers()?);
    let missing: Vec<String> = SeriesKind::Merged
        .required_columns()
        .into_iter()
        .filter(|column| !columns.has(column))
        .collect();
    if !missing.is_empty() {
        return Err(EngineError::Schema {
            series: SeriesKind::Merged,
            missing,
        });
    }

    let mut samples = Vec::new();
    for (row, record) in csv.records().enumerate() {
        let record = record?;
        let cell = columns.text(&record, COL_TIME).unwrap_or_default();
        let stamp = match GpsStamp::parse(cell) {
            Ok(stamp) => stamp,
            Err(err) => {
                warn!("merged row {}: {}", row + 1, err);
                continue;
            }
        };
        let base = columns.fix(&record, "_base");
        samples.push(Sample {
            stamp,
            base_present: base != ReceiverFix::ZERO,
            base,
            rover: columns.fix(&record, "_rover"),
            rel_pos_heading: columns.number(&record, COL_REL_POS_HEADING),
            beta: columns.number(&record, COL_BETA),
        });
    }
    Ok(MergedTimeline::from_samples(samples))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROVER: &str = "\
Index,GPS time,Lat,Lon,VX,VY,VZ,CoG,relPosHeading
0,,,,,,,,
1,20240904101500,29.1,-81.0,1.0,0.0,0.0,90.0,45.0
2,20240904101501,29.2,-81.0,,0.5,0.0,91.0,46.0
3,garbage,29.3,-81.0,1.0,0.0,0.0,92.0,47.0
4,20240904101503,29.4,-81.0,abc,0.0,0.0,93.0,48.0
";

    #[test]
    fn placeholder_and_bad_time_rows_are_skipped() {
        let (series, report) =
            read_series_from_reader(ROVER.as_bytes(), SeriesKind::Rover, &TimeDecoder::default())
                .unwrap();
        assert_eq!(report.rows_read, 5);
        assert_eq!(report.rows_loaded, 3);
        assert_eq!(report.placeholder_rows, 1);
        assert_eq!(report.bad_timestamps, 1);
        assert_eq!(report.rows_skipped(), 2);
        assert_eq!(series.len(), 3);
        assert_eq!(series.samples[0].rel_pos_heading, 45.0);
        assert!(series.missing_columns(SeriesKind::Rover).is_empty());
    }

    #[test]
    fn empty_and_non_numeric_cells_become_nan() {
        let (series, _) =
            read_series_from_reader(ROVER.as_bytes(), SeriesKind::Rover, &TimeDecoder::default())
                .unwrap();
        assert!(series.samples[1].fix.vx.is_nan());
        assert!(series.samples[2].fix.vx.is_nan());
        assert_eq!(series.samples[1].fix.vy, 0.5);
    }

    #[test]
    fn base_rows_carry_no_relative_heading() {
        let (series, _) =
            read_series_from_reader(ROVER.as_bytes(), SeriesKind::Base, &TimeDecoder::default())
                .unwrap();
        assert!(series.samples.iter().all(|s| s.rel_pos_heading.is_nan()));
    }

    #[test]
    fn missing_time_column_fails_early() {
        let data = "Lat,Lon\n1,2\n";
        let err = read_series_from_reader(data.as_bytes(), SeriesKind::Base, &TimeDecoder::default())
            .unwrap_err();
        match err {
            EngineError::Schema { series, missing } => {
                assert_eq!(series, SeriesKind::Base);
                assert_eq!(missing, vec![COL_TIME.to_string()]);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn other_missing_columns_are_recorded_not_fatal() {
        let data = "GPS time,Lat\n20240904101500,29.0\n";
        let (series, _) =
            read_series_from_reader(data.as_bytes(), SeriesKind::Base, &TimeDecoder::default())
                .unwrap();
        assert_eq!(series.missing_columns(SeriesKind::Base).len(), 5);
    }

    #[test]
    fn raw_receiver_time_is_decoded() {
        let data = "GPS time,Lat,Lon,VX,VY,VZ,CoG\n2330:310518,29.0,-81.0,0,0,0,0\n";
        let (series, _) =
            read_series_from_reader(data.as_bytes(), SeriesKind::Base, &TimeDecoder::default())
                .unwrap();
        assert_eq!(series.samples[0].stamp.to_string(), "20240904101500");
    }

    #[test]
    fn merged_file_requires_full_schema() {
        let data = "GPS time,Lat_base\n20240904101500,1\n";
        assert!(matches!(
            read_merged_from_reader(data.as_bytes()),
            Err(EngineError::Schema { series: SeriesKind::Merged, .. })
        ));
    }

    #[test]
    fn out_of_range_weeks_are_skipped() {
        let data = "GPS time,Lat,Lon,VX,VY,VZ,CoG\n\
99999999:0,29.0,-81.0,0,0,0,0\n\
2330:310518,29.0,-81.0,0,0,0,0\n";
        let (series, report) =
            read_series_from_reader(data.as_bytes(), SeriesKind::Base, &TimeDecoder::default())
                .unwrap();
        assert_eq!(report.bad_timestamps, 1);
        assert_eq!(report.rows_loaded, 1);
        assert_eq!(series.len(), 1);
    }

    #[test]
    fn header_only_file_is_an_empty_series() {
        let data = "GPS time,Lat,Lon,VX,VY,VZ,CoG\n";
        let (series, report) =
            read_series_from_reader(data.as_bytes(), SeriesKind::Rover, &TimeDecoder::default())
                .unwrap();
        assert!(series.is_empty());
        assert_eq!(report.rows_read, 0);
    }

    #[test]
    fn unknown_time_zone_fails_before_reading_rows() {
        let decoder = TimeDecoder {
            time_zone: "Atlantis/Lost".into(),
            ..Default::default()
        };
        let data = "GPS time\n2330:310518\n";
        assert!(matches!(
            read_series_from_reader(data.as_bytes(), SeriesKind::Base, &decoder),
            Err(EngineError::Timestamp(_))
        ));
    }
}
