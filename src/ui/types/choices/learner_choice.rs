use crate::classifiers::{
    AdditiveTreeGrower, AdditiveTreeGrowerConfig, Learner, PathOptimizer, PathOptimizerConfig,
};
use crate::ui::types::choices::UIChoice;
use anyhow::Context;
use schemars::{JsonSchema, Schema, schema_for};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use strum_macros::{Display, EnumDiscriminants, EnumIter, EnumMessage, EnumString, IntoStaticStr};

pub type FigsParams = AdditiveTreeGrowerConfig;
pub type TaoParams = PathOptimizerConfig;

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, EnumDiscriminants)]
#[serde(tag = "type", content = "params", rename_all = "kebab-case")]
#[strum_discriminants(name(LearnerKind))]
#[strum_discriminants(derive(EnumIter, EnumString, Display, IntoStaticStr, EnumMessage))]
#[strum_discriminants(strum(serialize_all = "kebab-case"))]
pub enum LearnerChoice {
    #[strum_discriminants(strum(
        message = "FIGS",
        detailed_message = "Greedy sum of trees over one or more class outputs."
    ))]
    Figs(FigsParams),

    #[strum_discriminants(strum(
        message = "TAO",
        detailed_message = "CART tree refined by alternating node-wise optimization."
    ))]
    Tao(TaoParams),
}

impl LearnerChoice {
    pub fn kind(&self) -> LearnerKind {
        LearnerKind::from(self)
    }

    pub fn build(self) -> Box<dyn Learner> {
        match self {
            LearnerChoice::Figs(params) => Box::new(AdditiveTreeGrower::new(params)),
            LearnerChoice::Tao(params) => Box::new(PathOptimizer::new(params)),
        }
    }
}

impl UIChoice for LearnerChoice {
    type Kind = LearnerKind;

    fn schema() -> Schema {
        schema_for!(LearnerChoice)
    }

    fn default_params(kind: Self::Kind) -> Value {
        match kind {
            LearnerKind::Figs => json!({
                "max_interaction_order": null,
                "max_rules": 12,
                "min_impurity_decrease": 0.0,
                "task": "classification",
                "clip_probabilities": false
            }),
            LearnerKind::Tao => json!({
                "model_type": "cart",
                "reg_param": 1e-3,
                "n_iters": 20,
                "initial_tree": {
                    "max_depth": null,
                    "max_leaf_nodes": 15,
                    "min_samples_split": 2,
                    "min_samples_leaf": 1
                },
                "randomize_tree": false,
                "random_seed": 42,
                "min_node_samples_tao": 3,
                "min_leaf_samples_tao": 2,
                "node_model": "stump",
                "weight_errors": true,
                "stump_threshold": "split-threshold",
                "task": "classification"
            }),
        }
    }

    fn from_parts(kind: Self::Kind, params: Value) -> anyhow::Result<Self> {
        match kind {
            LearnerKind::Figs => {
                let p: FigsParams =
                    serde_json::from_value(params).context("invalid figs parameters")?;
                p.validate()?;
                Ok(LearnerChoice::Figs(p))
            }
            LearnerKind::Tao => {
                let p: TaoParams =
                    serde_json::from_value(params).context("invalid tao parameters")?;
                p.validate()?;
                Ok(LearnerChoice::Tao(p))
            }
        }
    }
}
