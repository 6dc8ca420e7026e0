use crate::classifiers::cart::split_criteria::split_criterion::SplitCriterion;
use ndarray::ArrayView2;

/// Multi-output squared error: the mean over outputs of each output's weighted variance.
///
/// Statistics layout: `[sum_0 .. sum_k, sum_sq_0 .. sum_sq_k]`.
pub struct MseSplitCriterion<'a> {
    targets: ArrayView2<'a, f64>,
}

impl<'a> MseSplitCriterion<'a> {
    pub fn new(targets: ArrayView2<'a, f64>) -> Self {
        Self { targets }
    }

    fn n_outputs(&self) -> usize {
        self.targets.ncols()
    }
}

impl SplitCriterion for MseSplitCriterion<'_> {
    fn stats_len(&self) -> usize {
        2 * self.n_outputs()
    }

    fn accumulate(&self, stats: &mut [f64], row: usize, weight: f64) {
        let k = self.n_outputs();
        for (j, &y) in self.targets.row(row).iter().enumerate() {
            stats[j] += weight * y;
            stats[k + j] += weight * y * y;
        }
    }

    fn impurity(&self, stats: &[f64], weight_sum: f64) -> f64 {
        let k = self.n_outputs();
        if weight_sum <= 0.0 || k == 0 {
            return 0.0;
        }
        let mut total = 0.0;
        for j in 0..k {
            let mean = stats[j] / weight_sum;
            total += stats[k + j] / weight_sum - mean * mean;
        }
        total / k as f64
    }

    fn node_value(&self, stats: &[f64], weight_sum: f64) -> Vec<f64> {
        let k = self.n_outputs();
        if weight_sum <= 0.0 {
            return vec![0.0; k];
        }
        stats[..k].iter().map(|s| s / weight_sum).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() <= 1e-12
    }

    #[test]
    fn one_hot_pair_has_quarter_impurity() {
        let y = array![[1.0, 0.0], [1.0, 0.0], [0.0, 1.0], [0.0, 1.0]];
        let mse = MseSplitCriterion::new(y.view());
        let mut stats = vec![0.0; mse.stats_len()];
        for row in 0..4 {
            mse.accumulate(&mut stats, row, 1.0);
        }
        assert!(approx_eq(mse.impurity(&stats, 4.0), 0.25));
        assert_eq!(mse.node_value(&stats, 4.0), vec![0.5, 0.5]);
    }

    #[test]
    fn weights_behave_like_repetition() {
        let y = array![[0.0], [2.0]];
        let mse = MseSplitCriterion::new(y.view());
        let mut weighted = vec![0.0; 2];
        mse.accumulate(&mut weighted, 0, 2.0);
        mse.accumulate(&mut weighted, 1, 1.0);

        let rep = array![[0.0], [0.0], [2.0]];
        let mse_rep = MseSplitCriterion::new(rep.view());
        let mut repeated = vec![0.0; 2];
        for row in 0..3 {
            mse_rep.accumulate(&mut repeated, row, 1.0);
        }

        assert!(approx_eq(
            mse.impurity(&weighted, 3.0),
            mse_rep.impurity(&repeated, 3.0)
        ));
    }
}
