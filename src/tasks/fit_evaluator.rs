use crate::classifiers::Learner;
use crate::core::dataset::Dataset;
use crate::core::errors::{FitError, FitResult};
use crate::evaluation::FitReport;
use std::collections::BTreeMap;

use chrono::{Local, SecondsFormat};
use cpu_time::ThreadTime;
use tracing::info;

/// Fits one learner on a training set and scores it on that set and an
/// optional held-out set.
pub struct FitEvaluator {
    learner: Box<dyn Learner>,
    learner_name: String,
    train: Dataset,
    test: Option<Dataset>,
    report: Option<FitReport>,
}

impl FitEvaluator {
    pub fn new(
        learner: Box<dyn Learner>,
        learner_name: impl Into<String>,
        train: Dataset,
        test: Option<Dataset>,
    ) -> FitResult<Self> {
        if let Some(test) = &test {
            if test.n_features() != train.n_features() {
                return Err(FitError::shape(
                    format!("{} test feature columns", train.n_features()),
                    format!("{} test feature columns", test.n_features()),
                ));
            }
            if test.n_outputs() != train.n_outputs() {
                return Err(FitError::shape(
                    format!("{} test target columns", train.n_outputs()),
                    format!("{} test target columns", test.n_outputs()),
                ));
            }
        }

        Ok(Self {
            learner,
            learner_name: learner_name.into(),
            train,
            test,
            report: None,
        })
    }

    pub fn run(&mut self) -> FitResult<&FitReport> {
        let started_at = Local::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        let start_cpu = ThreadTime::now();

        self.learner.fit(&self.train)?;
        let fit_time = start_cpu.elapsed();

        let train_scores = self.learner.score(&self.train)?;
        let test_scores = match &self.test {
            Some(test) => Some(self.learner.score(test)?),
            None => None,
        };

        let model_bytes = self.learner.calc_memory_size();
        let model_gb = model_bytes as f64 / (1024.0 * 1024.0 * 1024.0);
        let mut extras = BTreeMap::new();
        extras.insert(
            "ram_hours".to_string(),
            model_gb * fit_time.as_secs_f64() / 3600.0,
        );
        extras.insert("train_rows".to_string(), self.train.n_samples() as f64);

        let report = FitReport {
            learner: self.learner_name.clone(),
            started_at,
            seconds: fit_time.as_secs_f64(),
            complexity: self.learner.complexity(),
            model_bytes,
            train_scores,
            test_scores,
            extras,
        };
        info!(learner = %report.learner, complexity = report.complexity, "fit evaluated");

        Ok(self.report.insert(report))
    }

    pub fn learner(&self) -> &dyn Learner {
        self.learner.as_ref()
    }

    pub fn report(&self) -> Option<&FitReport> {
        self.report.as_ref()
    }
}
