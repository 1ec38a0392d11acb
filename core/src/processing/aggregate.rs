use log::error;
use ndarray::{Array2, ArrayView1, ArrayView2, Axis};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::math::stats::{Bounds, StatsHelper};
use crate::timeline::GpsStamp;

/// Per-second rows of a window; one column per projected field.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedWindow {
    stamps: Vec<GpsStamp>,
    columns: Vec<String>,
    values: Array2<f64>,
}

/// Column-major form handed to consumers. NaN serializes as `null`.
#[derive(Debug, Clone, Serialize)]
pub struct WindowColumns {
    pub stamps: Vec<String>,
    pub series: Vec<ColumnSeries>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ColumnSeries {
    pub name: String,
    pub values: Vec<f64>,
    pub bounds: Option<Bounds>,
}

impl AggregatedWindow {
    pub fn empty(columns: Vec<String>) -> Self {
        let width = columns.len();
        Self {
            stamps: Vec::new(),
            columns,
            values: Array2::zeros((0, width)),
        }
    }

    pub fn len(&self) -> usize {
        self.stamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stamps.is_empty()
    }

    pub fn stamps(&self) -> &[GpsStamp] {
        &self.stamps
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> ArrayView2<'_, f64> {
        self.values.view()
    }

    pub fn first_stamp(&self) -> Option<GpsStamp> {
        self.stamps.first().copied()
    }

    pub fn last_stamp(&self) -> Option<GpsStamp> {
        self.stamps.last().copied()
    }

    fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn column(&self, name: &str) -> Option<ArrayView1<'_, f64>> {
        self.column_index(name).map(|idx| self.values.column(idx))
    }

    pub fn value(&self, row: usize, name: &str) -> Option<f64> {
        let col = self.column_index(name)?;
        self.values.get((row, col)).copied()
    }

    /// NaN-skipping extent of one column.
    pub fn bounds(&self, name: &str) -> Option<Bounds> {
        self.column(name)
            .and_then(|col| StatsHelper::bounds(col.iter().copied()))
    }

    pub fn padded_bounds(&self, name: &str, fraction: f64) -> Option<Bounds> {
        self.bounds(name).map(|b| b.padded(fraction))
    }

    /// Overwrites a column; ignored when the name or length does not match.
    pub fn replace_column(&mut self, name: &str, values: &[f64]) -> bool {
        match self.column_index(name) {
            Some(idx) if values.len() == self.len() => {
                for (slot, value) in self.values.column_mut(idx).iter_mut().zip(values) {
                    *slot = *value;
                }
                true
            }
            _ => false,
        }
    }

    /// Drops every column not named in `keep`, preserving order.
    pub fn retain_columns(&mut self, keep: &[&str]) {
        let indices: Vec<usize> = self
            .columns
            .iter()
            .enumerate()
            .filter(|(_, c)| keep.contains(&c.as_str()))
            .map(|(idx, _)| idx)
            .collect();
        self.values = self.values.select(Axis(1), &indices);
        self.columns = indices.iter().map(|&idx| self.columns[idx].clone()).collect();
    }

    pub fn to_columns(&self) -> WindowColumns {
        WindowColumns {
            stamps: self.stamps.iter().map(|s| s.to_string()).collect(),
            series: self
                .columns
                .iter()
                .enumerate()
                .map(|(idx, name)| {
                    let column = self.values.column(idx);
                    ColumnSeries {
                        name: name.clone(),
                        values: column.to_vec(),
                        bounds: StatsHelper::bounds(column.iter().copied()),
                    }
                })
                .collect(),
        }
    }
}

/// Groups rows by whole second and averages every column, skipping NaN.
/// Output is ascending by second with one row per second.
pub fn aggregate_by_second<I>(rows: I, columns: Vec<String>) -> AggregatedWindow
where
    I: IntoIterator<Item = (GpsStamp, Vec<f64>)>,
{
    let width = columns.len();
    let mut groups: BTreeMap<GpsStamp, Vec<Vec<f64>>> = BTreeMap::new();

    for (stamp, mut values) in rows {
        values.resize(width, f64::NAN);
        let group = groups
            .entry(stamp.truncate_to_second())
            .or_insert_with(|| vec![Vec::new(); width]);
        for (bucket, value) in group.iter_mut().zip(values) {
            bucket.push(value);
        }
    }

    let mut stamps = Vec::with_capacity(groups.len());
    let mut flat = Vec::with_capacity(groups.len() * width);
    for (second, buckets) in groups {
        stamps.push(second);
        flat.extend(buckets.into_iter().map(StatsHelper::nan_mean));
    }

    match Array2::from_shape_vec((stamps.len(), width), flat) {
        Ok(values) => AggregatedWindow {
            stamps,
            columns,
            values,
        },
        Err(err) => {
            error!("aggregated window shape mismatch: {}", err);
            AggregatedWindow::empty(columns)
        }
    }
}
