mod fit_evaluator;

pub use fit_evaluator::FitEvaluator;
