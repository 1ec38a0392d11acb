use serde::Serialize;

/// Closed value range used for axis extents.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bounds {
    pub min: f64,
    pub max: f64,
}

impl Bounds {
    pub fn span(&self) -> f64 {
        self.max - self.min
    }

    /// Widens both ends by `fraction` of the span. A single-valued range
    /// stays a single value.
    pub fn padded(&self, fraction: f64) -> Bounds {
        let pad = self.span() * fraction;
        Bounds {
            min: self.min - pad,
            max: self.max + pad,
        }
    }
}

pub struct StatsHelper;

impl StatsHelper {
    /// Mean of the non-NaN values; NaN when none remain.
    pub fn nan_mean<I>(values: I) -> f64
    where
        I: IntoIterator<Item = f64>,
    {
        let (sum, count) = values
            .into_iter()
            .filter(|v| !v.is_nan())
            .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
        if count == 0 {
            f64::NAN
        } else {
            sum / count as f64
        }
    }

    /// Min/max over the finite values; `None` for an empty or all-NaN input.
    pub fn bounds<I>(values: I) -> Option<Bounds>
    where
        I: IntoIterator<Item = f64>,
    {
        values
            .into_iter()
            .filter(|v| v.is_finite())
            .fold(None, |acc: Option<Bounds>, v| match acc {
                None => Some(Bounds { min: v, max: v }),
                Some(b) => Some(Bounds {
                    min: b.min.min(v),
                    max: b.max.max(v),
                }),
            })
    }

    pub fn padded_bounds<I>(values: I, fraction: f64) -> Option<Bounds>
    where
        I: IntoIterator<Item = f64>,
    {
        Self::bounds(values).map(|b| b.padded(fraction))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nan_mean_skips_nan() {
        assert_eq!(StatsHelper::nan_mean([1.0, f64::NAN, 3.0]), 2.0);
        assert!(StatsHelper::nan_mean([f64::NAN]).is_nan());
        assert!(StatsHelper::nan_mean(Vec::<f64>::new()).is_nan());
    }

    #[test]
    fn bounds_ignore_nan_rows() {
        let b = StatsHelper::bounds([f64::NAN, 4.0, -2.0, f64::NAN]).unwrap();
        assert_eq!(b, Bounds { min: -2.0, max: 4.0 });
    }

    #[test]
    fn bounds_of_nothing_is_none() {
        assert!(StatsHelper::bounds(Vec::<f64>::new()).is_none());
        assert!(StatsHelper::padded_bounds([f64::NAN, f64::NAN], 0.1).is_none());
    }

    #[test]
    fn single_value_pads_to_itself() {
        let b = StatsHelper::padded_bounds([5.0], 0.1).unwrap();
        assert_eq!(b, Bounds { min: 5.0, max: 5.0 });
    }

    #[test]
    fn padding_is_a_fraction_of_the_span() {
        let b = StatsHelper::padded_bounds([0.0, 10.0], 0.1).unwrap();
        assert_eq!(b, Bounds { min: -1.0, max: 11.0 });
    }
}
