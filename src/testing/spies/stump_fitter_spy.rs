use crate::classifiers::cart::{CartStumpFitter, StumpFitter, TreeStructure};
use crate::core::errors::FitResult;
use ndarray::{ArrayView1, ArrayView2};
use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

pub struct FitSpyHandle(Arc<AtomicU64>);
impl FitSpyHandle {
    pub fn count(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Delegates to [`CartStumpFitter`] and counts the calls.
pub struct StumpFitterSpy {
    count: Arc<AtomicU64>,
    inner: CartStumpFitter,
}

impl StumpFitterSpy {
    pub fn new() -> (Self, FitSpyHandle) {
        let counter = Arc::new(AtomicU64::new(0));
        (
            Self {
                count: counter.clone(),
                inner: CartStumpFitter::new(),
            },
            FitSpyHandle(counter),
        )
    }
}

impl StumpFitter for StumpFitterSpy {
    fn fit_stump(
        &self,
        x: ArrayView2<f64>,
        y: ArrayView2<f64>,
        sample_weight: Option<ArrayView1<f64>>,
    ) -> FitResult<TreeStructure> {
        self.count.fetch_add(1, Ordering::Relaxed);
        self.inner.fit_stump(x, y, sample_weight)
    }
}
