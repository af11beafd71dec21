use super::model::{Row, Status};

/// Control limits drawn on the chart.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Threshold {
    pub upper_limit: f64,
    pub lower_limit: f64,
}

/// Compute `mean ± 3σ` over the `used` rows, rounded to two decimals.
///
/// σ is the sample standard deviation (n − 1 denominator), so fewer than two
/// `used` rows yield `None` and the chart draws no limit lines. Missing (NaN)
/// metrics are skipped.
pub fn calculate_threshold<'a, I>(rows: I) -> Option<Threshold>
where
    I: IntoIterator<Item = &'a Row>,
{
    let metrics: Vec<f64> = rows
        .into_iter()
        .filter(|row| row.status == Status::Used)
        .map(|row| row.metric)
        .filter(|m| !m.is_nan())
        .collect();

    let n = metrics.len();
    if n < 2 {
        return None;
    }

    let mean = metrics.iter().sum::<f64>() / n as f64;
    let variance = metrics.iter().map(|m| (m - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
    let std_dev = variance.sqrt();

    let upper_limit = round2(mean + 3.0 * std_dev);
    let lower_limit = round2(mean - 3.0 * std_dev);
    if !upper_limit.is_finite() || !lower_limit.is_finite() {
        return None;
    }
    Some(Threshold {
        upper_limit,
        lower_limit,
    })
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
