mod learner_choice;
pub mod schema;
mod task_choice;

pub use learner_choice::{FigsParams, LearnerChoice, LearnerKind, TaoParams};
pub use task_choice::{DumpFormat, FitEvaluateParams, TaskChoice, TaskKind};

use schemars::Schema;
use serde_json::Value;
use strum::IntoEnumIterator;

/// A tagged `{"type": .., "params": ..}` enum the CLI can build from a kind
/// name plus JSON parameter overrides.
pub trait UIChoice: Sized {
    type Kind: Copy + IntoEnumIterator + Into<&'static str>;

    fn schema() -> Schema;

    /// Parameters used when the caller overrides nothing.
    fn default_params(kind: Self::Kind) -> Value;

    fn from_parts(kind: Self::Kind, params: Value) -> anyhow::Result<Self>;

    fn kind_names() -> Vec<&'static str> {
        Self::Kind::iter().map(Into::into).collect()
    }
}
