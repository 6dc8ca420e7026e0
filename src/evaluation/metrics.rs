use ndarray::ArrayView1;

/// Weighted fraction of positions where `truth == predicted`.
pub fn weighted_accuracy<T: PartialEq>(
    truth: &[T],
    predicted: &[T],
    weights: Option<ArrayView1<f64>>,
) -> f64 {
    let mut correct = 0.0;
    let mut total = 0.0;
    for (i, (t, p)) in truth.iter().zip(predicted.iter()).enumerate() {
        let w = weights.map_or(1.0, |w| w[i]);
        total += w;
        if t == p {
            correct += w;
        }
    }
    if total > 0.0 { correct / total } else { f64::NAN }
}

/// Coefficient of determination, `1 - SS_res / SS_tot`.
///
/// A constant target scores 1.0 when predicted exactly and 0.0 otherwise.
pub fn weighted_r2(
    truth: ArrayView1<f64>,
    predicted: ArrayView1<f64>,
    weights: Option<ArrayView1<f64>>,
) -> f64 {
    let weight_at = |i: usize| weights.map_or(1.0, |w| w[i]);
    let total: f64 = (0..truth.len()).map(weight_at).sum();
    if total <= 0.0 {
        return f64::NAN;
    }
    let mean = truth
        .iter()
        .enumerate()
        .map(|(i, y)| weight_at(i) * y)
        .sum::<f64>()
        / total;

    let mut ss_res = 0.0;
    let mut ss_tot = 0.0;
    for (i, (&y, &p)) in truth.iter().zip(predicted.iter()).enumerate() {
        let w = weight_at(i);
        ss_res += w * (y - p) * (y - p);
        ss_tot += w * (y - mean) * (y - mean);
    }

    if ss_tot == 0.0 {
        return if ss_res == 0.0 { 1.0 } else { 0.0 };
    }
    1.0 - ss_res / ss_tot
}
