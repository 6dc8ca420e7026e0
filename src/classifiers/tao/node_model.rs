use crate::classifiers::cart::{
    DecisionTree, DecisionTreeParams, TREE_UNDEFINED, TreeStructure, TreeTargets,
};
use crate::classifiers::linear::{LinearRegression, LogisticRegression};
use crate::core::errors::{FitError, FitResult};
use crate::core::prediction_task::PredictionTask;
use crate::evaluation::metrics::{weighted_accuracy, weighted_r2};
use ndarray::{Array1, ArrayView1, ArrayView2, Axis, s};
use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize, de};
use std::str::FromStr;
use strum_macros::{Display, EnumIter, EnumString, IntoStaticStr};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    JsonSchema,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum ModelType {
    #[default]
    Cart,
}

impl ModelType {
    pub fn parse(name: &str) -> FitResult<Self> {
        ModelType::from_str(name).map_err(|_| {
            FitError::config("model_type", format!("unsupported model type '{name}'"))
        })
    }
}

impl<'de> Deserialize<'de> for ModelType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        ModelType::parse(&name).map_err(de::Error::custom)
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    JsonSchema,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum NodeModel {
    #[default]
    Stump,
    Linear,
}

/// How a winning stump becomes the node's new threshold.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    JsonSchema,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum StumpThresholdRule {
    #[default]
    SplitThreshold,
    /// The winning stump's split feature read as a threshold. Each stump sees
    /// one column, so this is 0, or -2 when the stump has no split. Older runs
    /// read the stump fit on the last column rather than the winning one.
    LegacyFeatureIndex,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalSplit {
    pub feature: usize,
    pub threshold: f64,
    pub score: f64,
}

enum FittedModel {
    Stump(TreeStructure),
    Logistic(LogisticRegression),
    Linear(LinearRegression),
}

impl FittedModel {
    fn threshold(&self, rule: StumpThresholdRule) -> Option<f64> {
        let threshold = match self {
            FittedModel::Stump(tree) => match rule {
                StumpThresholdRule::SplitThreshold => {
                    if tree.is_leaf(0) {
                        return None;
                    }
                    tree.threshold[0]
                }
                StumpThresholdRule::LegacyFeatureIndex => {
                    tree.feature[0].map_or(TREE_UNDEFINED, |f| f as f64)
                }
            },
            FittedModel::Logistic(m) => m.decision_threshold(),
            FittedModel::Linear(m) => m.decision_threshold(),
        };
        threshold.is_finite().then_some(threshold)
    }
}

/// Fits one single-feature model per column of `x_node` to the 0/1 routing
/// `target` and returns the best column with its threshold.
///
/// The first column reaching the best score wins. Returns `None` when no
/// usable threshold comes out of the winner.
pub fn fit_local_split(
    x_node: ArrayView2<f64>,
    target: &[usize],
    weights: ArrayView1<f64>,
    task: PredictionTask,
    node_model: NodeModel,
    rule: StumpThresholdRule,
) -> FitResult<Option<LocalSplit>> {
    let target_real: Array1<f64> = target.iter().map(|&t| t as f64).collect();
    let target_codes: Array1<usize> = Array1::from(target.to_vec());

    let mut best: Option<(usize, f64, FittedModel)> = None;
    for feature in 0..x_node.ncols() {
        let column = x_node.slice(s![.., feature..feature + 1]);
        let values = x_node.column(feature);

        let (model, score) = match (node_model, task) {
            (NodeModel::Stump, PredictionTask::Classification) => {
                let tree = DecisionTree::new(DecisionTreeParams::stump()).fit(
                    column,
                    TreeTargets::Classes {
                        classes: target_codes.view(),
                        n_classes: 2,
                    },
                    Some(weights),
                )?;
                let predicted: Vec<usize> = column
                    .rows()
                    .into_iter()
                    .map(|row| argmax(tree.predict_row(row)))
                    .collect();
                let score = weighted_accuracy(target, &predicted, Some(weights));
                (FittedModel::Stump(tree), score)
            }
            (NodeModel::Stump, PredictionTask::Regression) => {
                let y = target_real.view().insert_axis(Axis(1));
                let tree = DecisionTree::new(DecisionTreeParams::stump()).fit(
                    column,
                    TreeTargets::Values(y),
                    Some(weights),
                )?;
                let predicted: Array1<f64> = column
                    .rows()
                    .into_iter()
                    .map(|row| tree.predict_row(row)[0])
                    .collect();
                let score = weighted_r2(target_real.view(), predicted.view(), Some(weights));
                (FittedModel::Stump(tree), score)
            }
            (NodeModel::Linear, PredictionTask::Classification) => {
                let Some(m) = LogisticRegression::fit(values, target_real.view(), weights) else {
                    continue;
                };
                let score = m.score(values, target_real.view(), weights);
                (FittedModel::Logistic(m), score)
            }
            (NodeModel::Linear, PredictionTask::Regression) => {
                let Some(m) = LinearRegression::fit(values, target_real.view(), weights) else {
                    continue;
                };
                let score = m.score(values, target_real.view(), weights);
                (FittedModel::Linear(m), score)
            }
        };

        if best.as_ref().is_none_or(|(_, s, _)| score > *s) {
            best = Some((feature, score, model));
        }
    }

    Ok(best.and_then(|(feature, score, model)| {
        model.threshold(rule).map(|threshold| LocalSplit {
            feature,
            threshold,
            score,
        })
    }))
}

/// Index of the first maximal entry.
pub fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, v) in values.iter().enumerate() {
        if *v > values[best] {
            best = i;
        }
    }
    best
}
