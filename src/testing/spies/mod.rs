mod stump_fitter_spy;

pub use stump_fitter_spy::{FitSpyHandle, StumpFitterSpy};
