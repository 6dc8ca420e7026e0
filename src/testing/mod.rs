pub mod dummies;
pub mod fixtures;
pub mod spies;
