use crate::evaluation::metrics::weighted_r2;
use ndarray::ArrayView1;

/// Weighted ordinary least squares on a single feature.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LinearRegression {
    pub coef: f64,
    pub intercept: f64,
}

impl LinearRegression {
    pub fn fit(x: ArrayView1<f64>, y: ArrayView1<f64>, weights: ArrayView1<f64>) -> Option<Self> {
        let total: f64 = weights.sum();
        if total <= 0.0 {
            return None;
        }
        let mean_x = x.iter().zip(weights.iter()).map(|(a, w)| a * w).sum::<f64>() / total;
        let mean_y = y.iter().zip(weights.iter()).map(|(a, w)| a * w).sum::<f64>() / total;

        let (mut cov, mut var) = (0.0, 0.0);
        for ((&xi, &yi), &wi) in x.iter().zip(y.iter()).zip(weights.iter()) {
            cov += wi * (xi - mean_x) * (yi - mean_y);
            var += wi * (xi - mean_x) * (xi - mean_x);
        }

        let coef = if var > 0.0 { cov / var } else { 0.0 };
        Some(Self {
            coef,
            intercept: mean_y - coef * mean_x,
        })
    }

    pub fn predict(&self, x: f64) -> f64 {
        self.coef * x + self.intercept
    }

    pub fn score(&self, x: ArrayView1<f64>, y: ArrayView1<f64>, weights: ArrayView1<f64>) -> f64 {
        let predictions: Vec<f64> = x.iter().map(|&xi| self.predict(xi)).collect();
        weighted_r2(y, ArrayView1::from(&predictions[..]), Some(weights))
    }

    /// Feature value where the fitted line crosses zero.
    pub fn decision_threshold(&self) -> f64 {
        -self.intercept / self.coef
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() <= 1e-9
    }

    #[test]
    fn recovers_exact_line() {
        let x = array![0.0, 1.0, 2.0, 3.0];
        let y = array![1.0, 3.0, 5.0, 7.0];
        let w = array![1.0, 1.0, 1.0, 1.0];
        let m = LinearRegression::fit(x.view(), y.view(), w.view()).unwrap();
        assert!(approx_eq(m.coef, 2.0));
        assert!(approx_eq(m.intercept, 1.0));
        assert!(approx_eq(m.score(x.view(), y.view(), w.view()), 1.0));
        assert!(approx_eq(m.decision_threshold(), -0.5));
    }

    #[test]
    fn constant_feature_has_no_threshold() {
        let x = array![1.0, 1.0];
        let y = array![0.0, 1.0];
        let w = array![1.0, 1.0];
        let m = LinearRegression::fit(x.view(), y.view(), w.view()).unwrap();
        assert_eq!(m.coef, 0.0);
        assert!(!m.decision_threshold().is_finite());
    }

    #[test]
    fn zero_weight_rows_are_ignored() {
        let x = array![0.0, 1.0, 2.0, 10.0];
        let y = array![0.0, 1.0, 2.0, -50.0];
        let w = array![1.0, 1.0, 1.0, 0.0];
        let m = LinearRegression::fit(x.view(), y.view(), w.view()).unwrap();
        assert!(approx_eq(m.coef, 1.0));
        assert!(approx_eq(m.intercept, 0.0));
    }
}
