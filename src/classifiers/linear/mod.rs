pub mod linear_regression;
pub mod logistic_regression;

pub use linear_regression::LinearRegression;
pub use logistic_regression::LogisticRegression;
