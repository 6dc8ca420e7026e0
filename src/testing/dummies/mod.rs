mod no_split_stump_fitter;

pub use no_split_stump_fitter::NoSplitStumpFitter;
