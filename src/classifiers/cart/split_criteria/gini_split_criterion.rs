use crate::classifiers::cart::split_criteria::split_criterion::SplitCriterion;
use ndarray::ArrayView1;

pub struct GiniSplitCriterion<'a> {
    classes: ArrayView1<'a, usize>,
    n_classes: usize,
}

impl<'a> GiniSplitCriterion<'a> {
    pub fn new(classes: ArrayView1<'a, usize>, n_classes: usize) -> Self {
        Self { classes, n_classes }
    }

    pub fn compute_gini(&self, distribution: &[f64], distribution_sum_of_weights: f64) -> f64 {
        let mut gini = 1.0;
        for i in distribution {
            let rel_freq = i / distribution_sum_of_weights;
            gini -= rel_freq.powf(2.0);
        }
        gini
    }
}

impl SplitCriterion for GiniSplitCriterion<'_> {
    fn stats_len(&self) -> usize {
        self.n_classes
    }

    fn accumulate(&self, stats: &mut [f64], row: usize, weight: f64) {
        stats[self.classes[row]] += weight;
    }

    fn impurity(&self, stats: &[f64], weight_sum: f64) -> f64 {
        if weight_sum <= 0.0 {
            return 0.0;
        }
        self.compute_gini(stats, weight_sum)
    }

    fn node_value(&self, stats: &[f64], weight_sum: f64) -> Vec<f64> {
        if weight_sum <= 0.0 {
            return vec![0.0; stats.len()];
        }
        stats.iter().map(|c| c / weight_sum).collect()
    }
}
