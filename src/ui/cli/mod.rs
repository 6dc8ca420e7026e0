pub mod args;

pub use args::{Cli, Command, DescribeArgs, RunArgs};
