use crate::classifiers::additive_trees::multi_output_encoder::{
    MultiOutputEncoder, shares_dimension, tensor_shape, unravel_argmax,
};
use crate::classifiers::additive_trees::nodes::NodeArena;
use crate::classifiers::additive_trees::stump_builder::StumpBuilder;
use crate::classifiers::cart::{CartStumpFitter, NodeId, StumpFitter};
use crate::classifiers::learner::Learner;
use crate::core::dataset::{
    Dataset, check_feature_count, check_same_rows, check_sample_weight, class_codes_from_real,
};
use crate::core::errors::{FitError, FitResult};
use crate::core::prediction_task::PredictionTask;
use crate::utils::memory::{MemoryMeter, MemorySized};
use ndarray::{Array2, ArrayD, ArrayView1, ArrayView2, Axis, IxDyn};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::mem::size_of;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct AdditiveTreeGrowerConfig {
    #[schemars(
        title = "Max Interaction Order",
        description = "Largest output subset one tree may target (None = all outputs)",
        range(min = 1)
    )]
    pub max_interaction_order: Option<usize>,

    #[schemars(
        title = "Max Rules",
        description = "Total number of splits across all trees (None = unlimited)"
    )]
    pub max_rules: Option<usize>,

    #[schemars(
        title = "Min Impurity Decrease",
        description = "Stop when the best remaining split reduces impurity by less than this"
    )]
    pub min_impurity_decrease: f64,

    #[schemars(title = "Task")]
    pub task: PredictionTask,

    #[schemars(
        title = "Clip Probabilities",
        description = "Clamp summed predictions into [0, 1]"
    )]
    pub clip_probabilities: bool,
}

impl Default for AdditiveTreeGrowerConfig {
    fn default() -> Self {
        Self {
            max_interaction_order: None,
            max_rules: Some(12),
            min_impurity_decrease: 0.0,
            task: PredictionTask::Classification,
            clip_probabilities: false,
        }
    }
}

impl AdditiveTreeGrowerConfig {
    pub fn validate(&self) -> FitResult<()> {
        if self.max_interaction_order == Some(0) {
            return Err(FitError::config(
                "max_interaction_order",
                "must be at least 1",
            ));
        }
        if !self.min_impurity_decrease.is_finite() {
            return Err(FitError::config("min_impurity_decrease", "must be finite"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CommittedSplit {
    pub tree_index: usize,
    pub node: NodeId,
    pub impurity_reduction: f64,
}

#[derive(Debug, Clone)]
struct Forest {
    arena: NodeArena,
    roots: Vec<Option<NodeId>>,
    interactions: Vec<Vec<usize>>,
    levels: Vec<usize>,
    n_features: usize,
    committed: Vec<CommittedSplit>,
}

impl Forest {
    fn predict_tree(&self, root: NodeId, x: ArrayView2<f64>) -> ArrayD<f64> {
        let mut preds = ArrayD::<f64>::zeros(IxDyn(&tensor_shape(&self.levels, x.nrows())));
        for (i, row) in x.rows().into_iter().enumerate() {
            preds
                .index_axis_mut(Axis(0), i)
                .assign(self.arena.predict_row(root, row));
        }
        preds
    }

    fn predict_sum(&self, x: ArrayView2<f64>) -> ArrayD<f64> {
        let mut total = ArrayD::<f64>::zeros(IxDyn(&tensor_shape(&self.levels, x.nrows())));
        for root in self.roots.iter().flatten() {
            total += &self.predict_tree(*root, x);
        }
        total
    }

    fn fmt_tree(
        &self,
        f: &mut Formatter<'_>,
        root: NodeId,
        feature_names: Option<&[String]>,
    ) -> fmt::Result {
        for (id, depth) in self.arena.walk(root) {
            let node = self.arena.get(id);
            let indent = "\t".repeat(depth);
            let label = |feature: usize| match feature_names.and_then(|n| n.get(feature)) {
                Some(name) => name.clone(),
                None => format!("X_{feature}"),
            };
            match node.feature {
                Some(feature) if node.is_root => writeln!(
                    f,
                    "{indent}{} <= {:.3} (Tree #{} root)",
                    label(feature),
                    node.threshold,
                    node.tree_index
                )?,
                Some(feature) if !node.is_leaf() => writeln!(
                    f,
                    "{indent}{} <= {:.3} (split)",
                    label(feature),
                    node.threshold
                )?,
                _ => {
                    let best = unravel_argmax(node.value.view())
                        .iter()
                        .map(|c| c.to_string())
                        .collect::<Vec<_>>()
                        .join(" ");
                    writeln!(f, "{indent}Val: [{best}] (leaf)")?
                }
            }
        }
        Ok(())
    }
}

/// Greedy sum-of-trees grower over multi-output categorical targets.
///
/// One tree per output subset competes for splits; after each commit every
/// remaining candidate is re-fit to its tree's residual.
pub struct AdditiveTreeGrower {
    config: AdditiveTreeGrowerConfig,
    stump_fitter: Box<dyn StumpFitter>,
    feature_names: Option<Vec<String>>,
    forest: Option<Forest>,
}

impl AdditiveTreeGrower {
    pub fn new(config: AdditiveTreeGrowerConfig) -> Self {
        Self::with_stump_fitter(config, Box::new(CartStumpFitter::new()))
    }

    pub fn with_stump_fitter(
        config: AdditiveTreeGrowerConfig,
        stump_fitter: Box<dyn StumpFitter>,
    ) -> Self {
        Self {
            config,
            stump_fitter,
            feature_names: None,
            forest: None,
        }
    }

    pub fn config(&self) -> &AdditiveTreeGrowerConfig {
        &self.config
    }

    pub fn set_feature_names(&mut self, names: Option<Vec<String>>) {
        self.feature_names = names;
    }

    pub fn is_fitted(&self) -> bool {
        self.forest.is_some()
    }

    pub fn complexity(&self) -> usize {
        self.forest.as_ref().map_or(0, |f| f.committed.len())
    }

    pub fn committed_splits(&self) -> &[CommittedSplit] {
        self.forest
            .as_ref()
            .map(|f| f.committed.as_slice())
            .unwrap_or_default()
    }

    /// Root of every tree, `None` for trees that never received a split.
    pub fn trees(&self) -> &[Option<NodeId>] {
        self.forest
            .as_ref()
            .map(|f| f.roots.as_slice())
            .unwrap_or_default()
    }

    pub fn nodes(&self) -> Option<&NodeArena> {
        self.forest.as_ref().map(|f| &f.arena)
    }

    pub fn levels(&self) -> &[usize] {
        self.forest
            .as_ref()
            .map(|f| f.levels.as_slice())
            .unwrap_or_default()
    }

    pub fn interactions(&self) -> &[Vec<usize>] {
        self.forest
            .as_ref()
            .map(|f| f.interactions.as_slice())
            .unwrap_or_default()
    }

    /// Fits the forest to integer class codes `y` (one column per output).
    ///
    /// Any previous fit is discarded first, so a failed fit leaves the model unfit.
    pub fn fit(
        &mut self,
        x: ArrayView2<f64>,
        y: ArrayView2<f64>,
        sample_weight: Option<ArrayView1<f64>>,
    ) -> FitResult<()> {
        self.forest = None;
        self.config.validate()?;
        if !self.config.task.is_classification() {
            return Err(FitError::Unsupported(
                "additive tree regression is not implemented".into(),
            ));
        }
        check_same_rows(x.nrows(), y.nrows())?;
        check_sample_weight(x.nrows(), sample_weight)?;
        if let Some(names) = &self.feature_names
            && names.len() != x.ncols()
        {
            return Err(FitError::shape(
                format!("{} feature names", x.ncols()),
                format!("{} feature names", names.len()),
            ));
        }

        let encoder = MultiOutputEncoder::new(
            class_codes_from_real(y)?,
            self.config.max_interaction_order,
        )?;
        let builder = StumpBuilder::new(self.stump_fitter.as_ref(), x, &encoder, sample_weight);
        let interactions = encoder.interactions().to_vec();
        let n_trees = interactions.len();
        let all_rows = vec![true; x.nrows()];

        let mut forest = Forest {
            arena: NodeArena::new(),
            roots: vec![None; n_trees],
            interactions,
            levels: encoder.levels().to_vec(),
            n_features: x.ncols(),
            committed: Vec::new(),
        };

        let mut pool: Vec<NodeId> = Vec::new();
        for (tree_index, dims) in forest.interactions.iter().enumerate() {
            let target = encoder.flatten(encoder.one_hot(), dims);
            let mut node = builder.construct(target.view(), &all_rows, tree_index)?;
            node.is_root = true;
            if node.impurity_reduction.is_some() {
                pool.push(forest.arena.push(node));
            }
        }
        sort_pool(&mut pool, &forest.arena);

        loop {
            if let Some(max_rules) = self.config.max_rules
                && forest.committed.len() >= max_rules
            {
                break;
            }
            let Some(id) = pool.pop() else {
                break;
            };
            let Some(impurity_reduction) = forest.arena.get(id).impurity_reduction else {
                continue;
            };
            if impurity_reduction < self.config.min_impurity_decrease {
                break;
            }

            let node = forest.arena.get(id);
            let tree_index = node.tree_index;
            if node.is_root {
                forest.roots[tree_index] = Some(id);
            }
            if let Some((left, right)) = forest.arena.promote_candidate_children(id) {
                pool.push(left);
                pool.push(right);
            }
            forest.committed.push(CommittedSplit {
                tree_index,
                node: id,
                impurity_reduction,
            });
            debug!(
                tree = tree_index,
                node = id,
                impurity_reduction,
                splits = forest.committed.len(),
                "committed split"
            );

            let targets = residual_targets(&forest, &encoder, x);
            let mut refreshed = Vec::with_capacity(pool.len());
            for id in pool {
                let refitted = {
                    let node = forest.arena.get(id);
                    builder.construct(
                        targets[node.tree_index].view(),
                        &node.sample_mask,
                        node.tree_index,
                    )?
                };
                let node = forest.arena.get_mut(id);
                node.refresh_from(refitted);
                if node.impurity_reduction.is_some() {
                    refreshed.push(id);
                }
            }
            pool = refreshed;
            sort_pool(&mut pool, &forest.arena);
        }

        info!(
            splits = forest.committed.len(),
            trees = forest.roots.iter().flatten().count(),
            "additive trees fitted"
        );
        self.forest = Some(forest);
        Ok(())
    }

    pub fn predict_proba(&self, x: ArrayView2<f64>) -> FitResult<ArrayD<f64>> {
        let forest = self.checked_forest(x)?;
        let mut preds = forest.predict_sum(x);
        if self.config.clip_probabilities {
            preds.mapv_inplace(|v| v.clamp(0.0, 1.0));
        }
        Ok(preds)
    }

    /// Class codes per output: the multi-index of each row's first maximal entry.
    pub fn predict(&self, x: ArrayView2<f64>) -> FitResult<Array2<usize>> {
        let proba = self.predict_proba(x)?;
        let n_outputs = self.levels().len();
        let mut out = Array2::<usize>::zeros((x.nrows(), n_outputs));
        for (i, mut row) in out.rows_mut().into_iter().enumerate() {
            let codes = unravel_argmax(proba.index_axis(Axis(0), i));
            for (dst, src) in row.iter_mut().zip(codes) {
                *dst = src;
            }
        }
        Ok(out)
    }

    fn fitted_forest(&self) -> FitResult<&Forest> {
        if !self.config.task.is_classification() {
            return Err(FitError::Unsupported(
                "additive tree regression is not implemented".into(),
            ));
        }
        let forest = self.forest.as_ref().ok_or(FitError::NotFitted)?;
        Ok(forest)
    }

    fn checked_forest(&self, x: ArrayView2<f64>) -> FitResult<&Forest> {
        let forest = self.fitted_forest()?;
        check_feature_count(forest.n_features, x)?;
        Ok(forest)
    }
}

/// Ascending by impurity reduction; the stable sort keeps insertion order
/// among ties so the last inserted is popped first.
fn sort_pool(pool: &mut [NodeId], arena: &NodeArena) {
    pool.sort_by(|&a, &b| {
        let ra = arena.get(a).impurity_reduction.unwrap_or(f64::NEG_INFINITY);
        let rb = arena.get(b).impurity_reduction.unwrap_or(f64::NEG_INFINITY);
        ra.total_cmp(&rb)
    });
}

/// Flattened residual target for every tree: the one-hot target minus the
/// predictions of the other trees sharing an output with it.
fn residual_targets(
    forest: &Forest,
    encoder: &MultiOutputEncoder,
    x: ArrayView2<f64>,
) -> Vec<Array2<f64>> {
    let predictions: Vec<Option<ArrayD<f64>>> = forest
        .roots
        .iter()
        .map(|root| root.map(|r| forest.predict_tree(r, x)))
        .collect();

    forest
        .interactions
        .iter()
        .enumerate()
        .map(|(t, dims)| {
            let mut residual = encoder.one_hot().clone();
            for (other, other_dims) in forest.interactions.iter().enumerate() {
                if other == t || !shares_dimension(dims, other_dims) {
                    continue;
                }
                if let Some(pred) = &predictions[other] {
                    residual -= pred;
                }
            }
            encoder.flatten(&residual, dims)
        })
        .collect()
}

impl Learner for AdditiveTreeGrower {
    fn fit(&mut self, dataset: &Dataset) -> FitResult<()> {
        if dataset.feature_names.is_some() {
            self.feature_names = dataset.feature_names.clone();
        }
        AdditiveTreeGrower::fit(
            self,
            dataset.features.view(),
            dataset.targets.view(),
            dataset.sample_weight.as_ref().map(|w| w.view()),
        )
    }

    fn predict_targets(&self, x: ArrayView2<f64>) -> FitResult<Array2<f64>> {
        Ok(self.predict(x)?.mapv(|c| c as f64))
    }

    fn task(&self) -> PredictionTask {
        self.config.task
    }

    fn complexity(&self) -> usize {
        AdditiveTreeGrower::complexity(self)
    }

    fn calc_memory_size(&self) -> usize {
        self.deep_size()
    }
}

impl MemorySized for AdditiveTreeGrower {
    fn inline_size(&self) -> usize {
        size_of::<Self>()
    }

    fn extra_heap_size(&self, meter: &mut MemoryMeter) -> usize {
        let mut total = meter.measure_field(&self.feature_names);
        if let Some(forest) = &self.forest {
            total += size_of::<Forest>();
            total += meter.measure_field(&forest.arena);
            total += forest.roots.capacity() * size_of::<Option<NodeId>>();
            total += meter.measure_field(&forest.levels);
            total += forest.committed.capacity() * size_of::<CommittedSplit>();
            total += forest.interactions.capacity() * size_of::<Vec<usize>>();
            total += forest
                .interactions
                .iter()
                .map(|d| d.capacity() * size_of::<usize>())
                .sum::<usize>();
        }
        total
    }
}

impl Display for AdditiveTreeGrower {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let Some(forest) = &self.forest else {
            return writeln!(f, "AdditiveTreeGrower (unfitted)");
        };
        writeln!(f, "> ------------------------------")?;
        writeln!(f, "> Additive tree sums")?;
        writeln!(
            f,
            ">\tPredictions are made by summing the \"Val\" reached by traversing each tree"
        )?;
        writeln!(f, "> ------------------------------")?;
        let mut first = true;
        for root in forest.roots.iter().flatten() {
            if !first {
                writeln!(f, "\t+")?;
            }
            first = false;
            forest.fmt_tree(f, *root, self.feature_names.as_deref())?;
        }
        Ok(())
    }
}
