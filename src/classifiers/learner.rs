use crate::core::dataset::Dataset;
use crate::core::errors::FitResult;
use crate::core::prediction_task::PredictionTask;
use crate::evaluation::metrics::{weighted_accuracy, weighted_r2};
use ndarray::{Array2, ArrayView2};
use std::fmt::Display;

/// A model fit in batch on a [`Dataset`] and queried one matrix at a time.
pub trait Learner: Display {
    fn fit(&mut self, dataset: &Dataset) -> FitResult<()>;

    /// Predicted target columns, shaped like `Dataset::targets`.
    fn predict_targets(&self, x: ArrayView2<f64>) -> FitResult<Array2<f64>>;

    fn task(&self) -> PredictionTask;

    /// Number of splits the fitted model uses.
    fn complexity(&self) -> usize;

    fn calc_memory_size(&self) -> usize;

    /// One score per target column: accuracy for classification, R² for regression.
    fn score(&self, dataset: &Dataset) -> FitResult<Vec<f64>> {
        let predicted = self.predict_targets(dataset.features.view())?;
        let weights = dataset.sample_weight.as_ref().map(|w| w.view());
        let scores = (0..dataset.n_outputs())
            .map(|j| {
                let truth = dataset.targets.column(j);
                let pred = predicted.column(j);
                match self.task() {
                    PredictionTask::Classification => weighted_accuracy(
                        &truth.to_vec(),
                        &pred.to_vec(),
                        weights,
                    ),
                    PredictionTask::Regression => weighted_r2(truth, pred, weights),
                }
            })
            .collect();
        Ok(scores)
    }
}
