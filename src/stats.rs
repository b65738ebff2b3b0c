use std::time::Duration;

/// Population standard deviation of a set of round-trip times.
///
/// Returns zero for an empty or single-element input.
pub fn standard_deviation<I>(samples: I) -> Duration
where
    I: IntoIterator<Item = Duration>,
{
    let nanos: Vec<f64> = samples
        .into_iter()
        .map(|d| d.as_nanos() as f64)
        .collect();

    if nanos.is_empty() {
        return Duration::ZERO;
    }

    let count = nanos.len() as f64;
    let mean = nanos.iter().sum::<f64>() / count;
    let variance = nanos.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / count;

    Duration::from_nanos(variance.sqrt().round() as u64)
}
