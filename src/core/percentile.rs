use super::types::{Metric, PercentileSeries, Trajectory};

// Ages are matched by index over the shortest trajectory.
pub fn aggregate(trajectories: &[Trajectory], metric: Metric) -> PercentileSeries {
    let year_count = trajectories
        .iter()
        .map(|t| t.points.len())
        .min()
        .unwrap_or(0);
    let mut series = PercentileSeries::with_capacity(year_count);
    let mut column = Vec::with_capacity(trajectories.len());

    for idx in 0..year_count {
        column.clear();
        column.extend(trajectories.iter().map(|t| metric.value(&t.points[idx])));
        push_band(&mut series, &mut column);
    }
    series
}

pub(crate) fn aggregate_columns(columns: &mut [Vec<f64>]) -> PercentileSeries {
    let mut series = PercentileSeries::with_capacity(columns.len());
    for column in columns.iter_mut() {
        push_band(&mut series, column);
    }
    series
}

fn push_band(series: &mut PercentileSeries, column: &mut [f64]) {
    let band = nearest_rank_band(column);
    series.p10.push(band.p10);
    series.median.push(band.median);
    series.p90.push(band.p90);
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Band {
    pub p10: f64,
    pub median: f64,
    pub p90: f64,
}

/// Sorts `values` in place and reads p10/p90 at `floor(p * n)` (no interpolation).
pub fn nearest_rank_band(values: &mut [f64]) -> Band {
    if values.is_empty() {
        return Band {
            p10: f64::NAN,
            median: f64::NAN,
            p90: f64::NAN,
        };
    }

    values.sort_by(|a, b| a.total_cmp(b));

    let n = values.len();
    Band {
        p10: values[nearest_rank_index(n, 0.1)],
        median: median_of_sorted(values),
        p90: values[nearest_rank_index(n, 0.9)],
    }
}

fn nearest_rank_index(n: usize, p: f64) -> usize {
    ((p * n as f64).floor() as usize).min(n - 1)
}

fn median_of_sorted(sorted: &[f64]) -> f64 {
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}
