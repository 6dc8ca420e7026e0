use crate::classifiers::cart::{DecisionTree, DecisionTreeParams, NodeId, TreeStructure, TreeTargets};
use crate::classifiers::learner::Learner;
use crate::classifiers::tao::node_model::{
    ModelType, NodeModel, StumpThresholdRule, argmax, fit_local_split,
};
use crate::classifiers::tao::node_paths::{node_paths, rows_reaching};
use crate::core::dataset::{Dataset, check_feature_count, check_same_rows};
use crate::core::errors::{FitError, FitResult};
use crate::core::prediction_task::PredictionTask;
use crate::evaluation::metrics::weighted_r2;
use crate::utils::memory::{MemoryMeter, MemorySized};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::mem::size_of;
use tracing::{debug, info, trace};

pub const DEFAULT_SEED: u64 = 42;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct PathOptimizerConfig {
    #[schemars(title = "Model Type")]
    pub model_type: ModelType,

    #[schemars(
        title = "Regularization",
        description = "Penalty for node-wise linear models (stored, currently unused)"
    )]
    pub reg_param: f64,

    #[schemars(title = "Sweeps", description = "Maximum number of optimization sweeps")]
    pub n_iters: usize,

    #[schemars(title = "Initial Tree", description = "Parameters of the tree fit before optimizing")]
    pub initial_tree: DecisionTreeParams,

    #[schemars(
        title = "Randomize Tree",
        description = "Shuffle split features and reset thresholds to medians before optimizing"
    )]
    pub randomize_tree: bool,

    #[schemars(title = "Random Seed")]
    pub random_seed: u64,

    #[schemars(
        title = "Min Node Samples",
        description = "Internal nodes reached by fewer rows are left alone"
    )]
    pub min_node_samples_tao: usize,

    #[schemars(
        title = "Min Leaf Samples",
        description = "Regression leaves reached by fewer rows keep their value"
    )]
    pub min_leaf_samples_tao: usize,

    #[schemars(title = "Node Model")]
    pub node_model: NodeModel,

    #[schemars(
        title = "Weight Errors",
        description = "Weight each row by how much its routing choice matters"
    )]
    pub weight_errors: bool,

    #[schemars(title = "Stump Threshold Rule")]
    pub stump_threshold: StumpThresholdRule,

    #[schemars(title = "Task")]
    pub task: PredictionTask,
}

impl Default for PathOptimizerConfig {
    fn default() -> Self {
        Self {
            model_type: ModelType::Cart,
            reg_param: 1e-3,
            n_iters: 20,
            initial_tree: DecisionTreeParams::with_max_leaf_nodes(15),
            randomize_tree: false,
            random_seed: DEFAULT_SEED,
            min_node_samples_tao: 3,
            min_leaf_samples_tao: 2,
            node_model: NodeModel::Stump,
            weight_errors: true,
            stump_threshold: StumpThresholdRule::SplitThreshold,
            task: PredictionTask::Classification,
        }
    }
}

impl PathOptimizerConfig {
    pub fn validate(&self) -> FitResult<()> {
        if !self.reg_param.is_finite() || self.reg_param < 0.0 {
            return Err(FitError::config("reg_param", "must be finite and non-negative"));
        }
        self.initial_tree.validate()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SweepRecord {
    pub updates: usize,
    pub score: f64,
}

#[derive(Debug, Clone)]
struct TrainingData {
    x: Array2<f64>,
    /// Class indices for classification, raw values for regression.
    y: Array1<f64>,
}

/// Alternating optimization of a fixed-topology tree.
///
/// Each sweep visits every node; an internal node's split is replaced by the
/// best single-feature split for routing its rows to the better subtree, and
/// the change is kept only if the whole tree scores strictly better.
pub struct PathOptimizer {
    config: PathOptimizerConfig,
    rng: StdRng,
    feature_names: Option<Vec<String>>,
    tree: Option<TreeStructure>,
    classes: Vec<f64>,
    data: Option<TrainingData>,
    history: Vec<SweepRecord>,
}

impl PathOptimizer {
    pub fn new(config: PathOptimizerConfig) -> Self {
        let rng = StdRng::seed_from_u64(config.random_seed);
        Self {
            config,
            rng,
            feature_names: None,
            tree: None,
            classes: Vec::new(),
            data: None,
            history: Vec::new(),
        }
    }

    pub fn with_random_source(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    pub fn config(&self) -> &PathOptimizerConfig {
        &self.config
    }

    pub fn set_feature_names(&mut self, names: Option<Vec<String>>) {
        self.feature_names = names;
    }

    pub fn tree(&self) -> Option<&TreeStructure> {
        self.tree.as_ref()
    }

    pub fn classes(&self) -> &[f64] {
        &self.classes
    }

    pub fn history(&self) -> &[SweepRecord] {
        &self.history
    }

    pub fn fit(&mut self, x: ArrayView2<f64>, y: ArrayView1<f64>) -> FitResult<()> {
        self.reset();
        self.config.validate()?;
        check_same_rows(x.nrows(), y.len())?;
        if x.nrows() == 0 {
            return Err(FitError::shape("at least one sample", "0 samples"));
        }
        let (classes, encoded) = encode_targets(self.config.task, y)?;

        let builder = DecisionTree::new(self.config.initial_tree.clone());
        let mut tree = match self.config.task {
            PredictionTask::Classification => {
                let codes: Array1<usize> = encoded.mapv(|c| c as usize);
                builder.fit(
                    x,
                    TreeTargets::Classes {
                        classes: codes.view(),
                        n_classes: classes.len(),
                    },
                    None,
                )?
            }
            PredictionTask::Regression => {
                builder.fit(x, TreeTargets::Values(encoded.view().insert_axis(Axis(1))), None)?
            }
        };
        if self.config.randomize_tree {
            randomize_tree(&mut tree, x, &mut self.rng);
        }

        self.optimize(tree, classes, x, encoded)
    }

    /// Optimizes a tree fit elsewhere. Leaf values must match the task:
    /// one proportion per sorted distinct label, or a single regression value.
    pub fn fit_from_tree(
        &mut self,
        tree: TreeStructure,
        x: ArrayView2<f64>,
        y: ArrayView1<f64>,
    ) -> FitResult<()> {
        self.reset();
        self.config.validate()?;
        check_same_rows(x.nrows(), y.len())?;
        tree.check_topology()?;
        if let Some(f) = tree.feature.iter().flatten().find(|&&f| f >= x.ncols()) {
            return Err(FitError::shape(
                format!("split features below {}", x.ncols()),
                format!("split on feature {f}"),
            ));
        }
        let (classes, encoded) = encode_targets(self.config.task, y)?;
        let expected = match self.config.task {
            PredictionTask::Classification => classes.len(),
            PredictionTask::Regression => 1,
        };
        if let Some(v) = tree.value.iter().find(|v| v.len() != expected) {
            return Err(FitError::shape(
                format!("{expected} values per node"),
                format!("{} values", v.len()),
            ));
        }

        self.optimize(tree, classes, x, encoded)
    }

    pub fn sweep(&mut self) -> FitResult<usize> {
        let (Some(tree), Some(data)) = (self.tree.as_mut(), self.data.as_ref()) else {
            return Err(FitError::NotFitted);
        };
        let record = run_sweep(&self.config, tree, data.x.view(), data.y.view())?;
        self.history.push(record);
        Ok(record.updates)
    }

    pub fn predict(&self, x: ArrayView2<f64>) -> FitResult<Array1<f64>> {
        let tree = self.checked_tree(x)?;
        let out: Array1<f64> = x
            .rows()
            .into_iter()
            .map(|row| {
                let value = tree.predict_row(row);
                match self.config.task {
                    PredictionTask::Classification => self.classes[argmax(value)],
                    PredictionTask::Regression => value[0],
                }
            })
            .collect();
        Ok(out)
    }

    /// Leaf class proportions per row, one column per entry of [`Self::classes`].
    pub fn predict_proba(&self, x: ArrayView2<f64>) -> FitResult<Array2<f64>> {
        if !self.config.task.is_classification() {
            return Err(FitError::Unsupported(
                "class probabilities need a classification task".into(),
            ));
        }
        let tree = self.checked_tree(x)?;
        let mut out = Array2::<f64>::zeros((x.nrows(), self.classes.len()));
        for (mut dst, row) in out.rows_mut().into_iter().zip(x.rows()) {
            for (d, v) in dst.iter_mut().zip(tree.predict_row(row)) {
                *d = *v;
            }
        }
        Ok(out)
    }

    fn checked_tree(&self, x: ArrayView2<f64>) -> FitResult<&TreeStructure> {
        let (Some(tree), Some(data)) = (self.tree.as_ref(), self.data.as_ref()) else {
            return Err(FitError::NotFitted);
        };
        check_feature_count(data.x.ncols(), x)?;
        Ok(tree)
    }

    fn reset(&mut self) {
        self.tree = None;
        self.data = None;
        self.classes.clear();
        self.history.clear();
    }

    fn optimize(
        &mut self,
        mut tree: TreeStructure,
        classes: Vec<f64>,
        x: ArrayView2<f64>,
        y: Array1<f64>,
    ) -> FitResult<()> {
        let mut history = Vec::new();
        for _ in 0..self.config.n_iters {
            let record = run_sweep(&self.config, &mut tree, x, y.view())?;
            history.push(record);
            if record.updates == 0 {
                break;
            }
        }
        info!(
            sweeps = history.len(),
            score = history.last().map(|r| r.score),
            nodes = tree.node_count(),
            "tree optimized"
        );

        self.tree = Some(tree);
        self.classes = classes;
        self.data = Some(TrainingData { x: x.to_owned(), y });
        self.history = history;
        Ok(())
    }
}

fn encode_targets(
    task: PredictionTask,
    y: ArrayView1<f64>,
) -> FitResult<(Vec<f64>, Array1<f64>)> {
    if let Some((row, &value)) = y.iter().enumerate().find(|(_, v)| !v.is_finite()) {
        return Err(FitError::InvalidTarget {
            row,
            column: 0,
            value,
            reason: "targets must be finite",
        });
    }
    match task {
        PredictionTask::Regression => Ok((Vec::new(), y.to_owned())),
        PredictionTask::Classification => {
            let mut classes = y.to_vec();
            classes.sort_by(f64::total_cmp);
            classes.dedup();
            let encoded = y.mapv(|v| {
                classes
                    .binary_search_by(|c| c.total_cmp(&v))
                    .unwrap_or_default() as f64
            });
            Ok((classes, encoded))
        }
    }
}

fn randomize_tree(tree: &mut TreeStructure, x: ArrayView2<f64>, rng: &mut StdRng) {
    let internal: Vec<NodeId> = tree.internal_nodes().collect();
    let mut features: Vec<usize> = internal.iter().filter_map(|&n| tree.feature[n]).collect();
    features.shuffle(rng);
    for (&node, feature) in internal.iter().zip(features) {
        tree.feature[node] = Some(feature);
        tree.threshold[node] = median(x.column(feature));
    }
}

fn median(values: ArrayView1<f64>) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let n = sorted.len();
    match n {
        0 => f64::NAN,
        _ if n % 2 == 1 => sorted[n / 2],
        _ => (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0,
    }
}

fn routing_error(task: PredictionTask, value: &[f64], y: f64) -> f64 {
    match task {
        PredictionTask::Classification => 1.0 - value.get(y as usize).copied().unwrap_or(0.0),
        PredictionTask::Regression => (y - value[0]).abs(),
    }
}

/// Routing target (0 left, 1 right) and sample weight of one row. Ties go left.
fn routing_choice(err_left: f64, err_right: f64, weight_errors: bool) -> (usize, f64) {
    let side = usize::from(err_right < err_left);
    let weight = if weight_errors {
        (err_left - err_right).abs()
    } else {
        1.0
    };
    (side, weight)
}

fn tree_score(
    task: PredictionTask,
    tree: &TreeStructure,
    x: ArrayView2<f64>,
    y: ArrayView1<f64>,
) -> f64 {
    match task {
        PredictionTask::Classification => {
            let correct = x
                .rows()
                .into_iter()
                .zip(y.iter())
                .filter(|(row, yi)| argmax(tree.predict_row(*row)) as f64 == **yi)
                .count();
            correct as f64 / y.len().max(1) as f64
        }
        PredictionTask::Regression => {
            let predicted: Array1<f64> =
                x.rows().into_iter().map(|row| tree.predict_row(row)[0]).collect();
            weighted_r2(y, predicted.view(), None)
        }
    }
}

fn run_sweep(
    config: &PathOptimizerConfig,
    tree: &mut TreeStructure,
    x: ArrayView2<f64>,
    y: ArrayView1<f64>,
) -> FitResult<SweepRecord> {
    let task = config.task;
    let mut updates = 0;

    for (node, path) in node_paths(tree) {
        let rows = rows_reaching(tree, x, &path);

        let (Some(left), Some(right)) = (tree.children_left[node], tree.children_right[node])
        else {
            if !task.is_classification() && rows.len() >= config.min_leaf_samples_tao {
                let mean = rows.iter().map(|&r| y[r]).sum::<f64>() / rows.len() as f64;
                tree.value[node] = vec![mean];
            }
            continue;
        };
        if rows.len() < config.min_node_samples_tao {
            trace!(node, rows = rows.len(), "too few rows, node skipped");
            continue;
        }

        let mut target = Vec::with_capacity(rows.len());
        let mut weights = Vec::with_capacity(rows.len());
        for &r in &rows {
            let row = x.row(r);
            let err_left = routing_error(task, tree.predict_from(left, row), y[r]);
            let err_right = routing_error(task, tree.predict_from(right, row), y[r]);
            let (side, weight) = routing_choice(err_left, err_right, config.weight_errors);
            target.push(side);
            weights.push(weight);
        }
        let weights = Array1::from(weights);
        if weights.sum() <= 0.0 {
            trace!(node, "routing is indifferent, node skipped");
            continue;
        }

        let x_node = x.select(Axis(0), &rows);
        let Some(split) = fit_local_split(
            x_node.view(),
            &target,
            weights.view(),
            task,
            config.node_model,
            config.stump_threshold,
        )?
        else {
            trace!(node, "no usable local split, node skipped");
            continue;
        };

        let old_feature = tree.feature[node];
        let old_threshold = tree.threshold[node];
        let old_score = tree_score(task, tree, x, y);
        tree.feature[node] = Some(split.feature);
        tree.threshold[node] = split.threshold;
        let new_score = tree_score(task, tree, x, y);

        if new_score > old_score {
            updates += 1;
            debug!(
                node,
                feature = split.feature,
                threshold = split.threshold,
                old_score,
                new_score,
                "split updated"
            );
        } else {
            tree.feature[node] = old_feature;
            tree.threshold[node] = old_threshold;
        }
    }

    let score = tree_score(task, tree, x, y);
    debug!(updates, score, "sweep finished");
    Ok(SweepRecord { updates, score })
}

impl Learner for PathOptimizer {
    fn fit(&mut self, dataset: &Dataset) -> FitResult<()> {
        if dataset.feature_names.is_some() {
            self.feature_names = dataset.feature_names.clone();
        }
        let y = dataset.single_target()?;
        PathOptimizer::fit(self, dataset.features.view(), y.view())
    }

    fn predict_targets(&self, x: ArrayView2<f64>) -> FitResult<Array2<f64>> {
        Ok(self.predict(x)?.insert_axis(Axis(1)))
    }

    fn task(&self) -> PredictionTask {
        self.config.task
    }

    fn complexity(&self) -> usize {
        self.tree.as_ref().map_or(0, |t| t.internal_nodes().count())
    }

    fn calc_memory_size(&self) -> usize {
        self.deep_size()
    }
}

impl MemorySized for PathOptimizer {
    fn inline_size(&self) -> usize {
        size_of::<Self>()
    }

    fn extra_heap_size(&self, meter: &mut MemoryMeter) -> usize {
        let mut total = meter.measure_field(&self.feature_names);
        if let Some(tree) = &self.tree {
            total += meter.measure_field(tree);
        }
        total += meter.measure_field(&self.classes);
        total += self.history.capacity() * size_of::<SweepRecord>();
        total
    }
}

impl PathOptimizer {
    fn feature_label(&self, feature: usize) -> String {
        match self.feature_names.as_ref().and_then(|n| n.get(feature)) {
            Some(name) => name.clone(),
            None => format!("X_{feature}"),
        }
    }

    fn fmt_node(
        &self,
        f: &mut Formatter<'_>,
        tree: &TreeStructure,
        node: NodeId,
        depth: usize,
    ) -> fmt::Result {
        let indent = "|   ".repeat(depth);
        match (
            tree.children_left[node],
            tree.children_right[node],
            tree.feature[node],
        ) {
            (Some(left), Some(right), Some(feature)) => {
                let name = self.feature_label(feature);
                let threshold = tree.threshold[node];
                writeln!(f, "{indent}|--- {name} <= {threshold:.3}")?;
                self.fmt_node(f, tree, left, depth + 1)?;
                writeln!(f, "{indent}|--- {name} >  {threshold:.3}")?;
                self.fmt_node(f, tree, right, depth + 1)
            }
            _ => {
                let value = &tree.value[node];
                match self.config.task {
                    PredictionTask::Classification => {
                        let class = self.classes.get(argmax(value)).copied().unwrap_or(f64::NAN);
                        writeln!(f, "{indent}|--- class: {class}")
                    }
                    PredictionTask::Regression => {
                        writeln!(f, "{indent}|--- value: [{:.3}]", value[0])
                    }
                }
            }
        }
    }
}

impl Display for PathOptimizer {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match &self.tree {
            Some(tree) => self.fmt_node(f, tree, 0, 0),
            None => writeln!(f, "PathOptimizer (unfitted)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifiers::cart::TREE_UNDEFINED;
    use crate::testing::fixtures::{approx_eq, separable_on_first_feature};
    use ndarray::array;

    /// Splits on the noise feature, so it only scores 0.5.
    fn bad_tree() -> TreeStructure {
        let mut tree = TreeStructure::new();
        let root = tree.add_leaf(0.5, 8, 8.0, vec![0.5, 0.5]);
        let left = tree.add_leaf(0.0, 4, 4.0, vec![1.0, 0.0]);
        let right = tree.add_leaf(0.0, 4, 4.0, vec![0.0, 1.0]);
        tree.set_split(root, 1, 0.5, left, right);
        tree
    }

    fn optimizer(config: PathOptimizerConfig) -> PathOptimizer {
        PathOptimizer::new(config)
    }

    fn checkerboard() -> (Array2<f64>, Array1<f64>) {
        let mut rows = Vec::new();
        let mut labels = Vec::new();
        for i in 0..3 {
            for j in 0..3 {
                rows.extend([i as f64, j as f64]);
                labels.push(((i + j) % 2) as f64);
            }
        }
        (
            Array2::from_shape_vec((9, 2), rows).unwrap(),
            Array1::from(labels),
        )
    }

    #[test]
    fn relocates_a_bad_split_and_converges() {
        let (x, y) = separable_on_first_feature();
        let mut tao = optimizer(PathOptimizerConfig::default());
        tao.fit_from_tree(bad_tree(), x.view(), y.column(0)).unwrap();

        let tree = tao.tree().unwrap();
        assert_eq!(tree.feature[0], Some(0));
        assert!(approx_eq(tree.threshold[0], 0.5, 1e-9));
        assert_eq!(
            tao.history(),
            &[
                SweepRecord {
                    updates: 1,
                    score: 1.0
                },
                SweepRecord {
                    updates: 0,
                    score: 1.0
                },
            ]
        );
        assert_eq!(tao.predict(x.view()).unwrap(), y.column(0));
    }

    #[test]
    fn routing_prefers_the_lower_error_and_weights_by_the_gap() {
        assert_eq!(routing_choice(0.2, 0.7, true), (0, 0.5));
        assert_eq!(routing_choice(0.9, 0.4, true), (1, 0.5));
        assert_eq!(routing_choice(0.3, 0.3, true), (0, 0.0));
        assert_eq!(routing_choice(0.3, 0.3, false), (0, 1.0));
        assert_eq!(routing_choice(1.0, 0.0, false), (1, 1.0));
        assert_eq!(routing_choice(0.0, 1.0, false), (0, 1.0));
    }

    #[test]
    fn different_split_without_a_better_score_is_reverted() {
        let x = array![[0.0], [1.0], [2.0], [3.0], [4.0], [5.0], [6.0]];
        let y = array![0.0, 0.0, 0.0, 1.0, 0.0, 1.0, 1.0];
        let mut tree = TreeStructure::new();
        let root = tree.add_leaf(0.49, 7, 7.0, vec![4.0 / 7.0, 3.0 / 7.0]);
        let left = tree.add_leaf(0.32, 5, 5.0, vec![1.0, 0.0]);
        let right = tree.add_leaf(0.0, 2, 2.0, vec![0.0, 1.0]);
        tree.set_split(root, 0, 4.5, left, right);

        // Pure leaves make the routing target the label itself, with unit weights.
        let target: Vec<usize> = y.iter().map(|&v| v as usize).collect();
        let proposal = fit_local_split(
            x.view(),
            &target,
            Array1::ones(7).view(),
            PredictionTask::Classification,
            NodeModel::Stump,
            StumpThresholdRule::SplitThreshold,
        )
        .unwrap()
        .unwrap();
        assert_eq!(proposal.feature, 0);
        assert!(approx_eq(proposal.threshold, 2.5, 1e-9));

        let mut tao = optimizer(PathOptimizerConfig::default());
        tao.fit_from_tree(tree.clone(), x.view(), y.view()).unwrap();
        assert_eq!(tao.tree().unwrap(), &tree);
        assert_eq!(
            tao.history(),
            &[SweepRecord {
                updates: 0,
                score: 6.0 / 7.0
            }]
        );
    }

    #[test]
    fn legacy_threshold_rule_uses_the_feature_index() {
        let (x, y) = separable_on_first_feature();
        let mut tao = optimizer(PathOptimizerConfig {
            stump_threshold: StumpThresholdRule::LegacyFeatureIndex,
            ..Default::default()
        });
        tao.fit_from_tree(bad_tree(), x.view(), y.column(0)).unwrap();

        let tree = tao.tree().unwrap();
        assert_eq!(tree.feature[0], Some(0));
        assert_eq!(tree.threshold[0], 0.0);
        let last = tao.history().last().unwrap();
        assert_eq!(last.updates, 0);
        assert!(approx_eq(last.score, 0.625, 1e-12));
    }

    #[test]
    fn linear_node_model_finds_the_same_feature() {
        let (x, y) = separable_on_first_feature();
        let mut tao = optimizer(PathOptimizerConfig {
            node_model: NodeModel::Linear,
            ..Default::default()
        });
        tao.fit_from_tree(bad_tree(), x.view(), y.column(0)).unwrap();

        let tree = tao.tree().unwrap();
        assert_eq!(tree.feature[0], Some(0));
        assert!(tree.threshold[0] > 0.3 && tree.threshold[0] < 0.7);
        assert_eq!(tao.history()[0].score, 1.0);
    }

    #[test]
    fn sweep_scores_never_decrease() {
        let (x, y) = checkerboard();
        let mut tao = optimizer(PathOptimizerConfig {
            randomize_tree: true,
            ..Default::default()
        });
        tao.fit(x.view(), y.view()).unwrap();
        let scores: Vec<f64> = tao.history().iter().map(|r| r.score).collect();
        assert!(!scores.is_empty());
        assert!(scores.windows(2).all(|w| w[1] >= w[0]));
    }

    #[test]
    fn converged_tree_is_left_unchanged() {
        let (x, y) = separable_on_first_feature();
        let mut tao = optimizer(PathOptimizerConfig::default());
        tao.fit_from_tree(bad_tree(), x.view(), y.column(0)).unwrap();

        let before = tao.tree().unwrap().clone();
        assert_eq!(tao.sweep().unwrap(), 0);
        assert_eq!(tao.tree().unwrap(), &before);
        assert_eq!(tao.history().len(), 3);
    }

    #[test]
    fn fitted_cart_that_is_already_optimal_needs_one_sweep() {
        let (x, y) = separable_on_first_feature();
        let mut tao = optimizer(PathOptimizerConfig::default());
        tao.fit(x.view(), y.column(0)).unwrap();

        assert_eq!(
            tao.history(),
            &[SweepRecord {
                updates: 0,
                score: 1.0
            }]
        );
        assert_eq!(tao.predict(x.view()).unwrap(), y.column(0));
    }

    #[test]
    fn arbitrary_labels_round_trip() {
        let (x, _) = separable_on_first_feature();
        let y = array![-1.0, -1.0, -1.0, -1.0, 5.0, 5.0, 5.0, 5.0];
        let mut tao = optimizer(PathOptimizerConfig::default());
        tao.fit(x.view(), y.view()).unwrap();

        assert_eq!(tao.classes(), &[-1.0, 5.0]);
        assert_eq!(tao.predict(x.view()).unwrap(), y);
        let proba = tao.predict_proba(x.view()).unwrap();
        assert_eq!(proba.shape(), &[8, 2]);
        for row in proba.rows() {
            assert!(approx_eq(row.sum(), 1.0, 1e-12));
        }
    }

    #[test]
    fn regression_leaves_move_to_their_means() {
        let x = array![[0.0], [1.0], [2.0], [3.0]];
        let y = array![0.0, 0.0, 10.0, 10.0];
        let mut tree = TreeStructure::new();
        let root = tree.add_leaf(25.0, 4, 4.0, vec![5.0]);
        let left = tree.add_leaf(25.0, 2, 2.0, vec![5.0]);
        let right = tree.add_leaf(25.0, 2, 2.0, vec![5.0]);
        tree.set_split(root, 0, 1.5, left, right);

        let mut tao = optimizer(PathOptimizerConfig {
            task: PredictionTask::Regression,
            ..Default::default()
        });
        tao.fit_from_tree(tree, x.view(), y.view()).unwrap();

        let tree = tao.tree().unwrap();
        assert_eq!(tree.value[left], vec![0.0]);
        assert_eq!(tree.value[right], vec![10.0]);
        assert_eq!(tao.predict(x.view()).unwrap(), y);
        assert_eq!(tao.history()[0].score, 1.0);
        assert!(matches!(
            tao.predict_proba(x.view()),
            Err(FitError::Unsupported(_))
        ));
    }

    #[test]
    fn small_regression_leaves_keep_their_value() {
        let x = array![[0.0], [1.0], [2.0], [3.0]];
        let y = array![0.0, 0.0, 10.0, 10.0];
        let mut tree = TreeStructure::new();
        let root = tree.add_leaf(25.0, 4, 4.0, vec![5.0]);
        let left = tree.add_leaf(25.0, 2, 2.0, vec![5.0]);
        let right = tree.add_leaf(25.0, 2, 2.0, vec![5.0]);
        tree.set_split(root, 0, 1.5, left, right);

        let mut tao = optimizer(PathOptimizerConfig {
            task: PredictionTask::Regression,
            min_leaf_samples_tao: 3,
            ..Default::default()
        });
        tao.fit_from_tree(tree, x.view(), y.view()).unwrap();
        assert_eq!(tao.tree().unwrap().value[left], vec![5.0]);
    }

    #[test]
    fn nodes_with_few_rows_are_skipped() {
        let (x, y) = separable_on_first_feature();
        let mut tao = optimizer(PathOptimizerConfig {
            min_node_samples_tao: 9,
            ..Default::default()
        });
        tao.fit_from_tree(bad_tree(), x.view(), y.column(0)).unwrap();
        assert_eq!(tao.tree().unwrap(), &bad_tree());
        assert_eq!(
            tao.history(),
            &[SweepRecord {
                updates: 0,
                score: 0.5
            }]
        );
    }

    #[test]
    fn randomized_start_uses_medians_and_keeps_features() {
        let (x, y) = checkerboard();
        let plain = PathOptimizerConfig {
            n_iters: 0,
            ..Default::default()
        };
        let mut reference = optimizer(plain.clone());
        reference.fit(x.view(), y.view()).unwrap();

        let randomized = PathOptimizerConfig {
            randomize_tree: true,
            random_seed: 7,
            ..plain
        };
        let mut a = optimizer(randomized.clone());
        a.fit(x.view(), y.view()).unwrap();
        let mut b = optimizer(randomized.clone()).with_random_source(StdRng::seed_from_u64(7));
        b.fit(x.view(), y.view()).unwrap();
        assert_eq!(a.tree(), b.tree());

        let tree = a.tree().unwrap();
        let original = reference.tree().unwrap();
        let mut shuffled: Vec<usize> = tree.internal_nodes().filter_map(|n| tree.feature[n]).collect();
        let mut kept: Vec<usize> = original
            .internal_nodes()
            .filter_map(|n| original.feature[n])
            .collect();
        shuffled.sort_unstable();
        kept.sort_unstable();
        assert_eq!(shuffled, kept);

        for node in 0..tree.node_count() {
            match tree.feature[node] {
                Some(f) => assert_eq!(tree.threshold[node], median(x.column(f))),
                None => assert_eq!(tree.threshold[node], TREE_UNDEFINED),
            }
        }
    }

    #[test]
    fn median_of_even_and_odd_lengths() {
        assert_eq!(median(array![3.0, 1.0, 2.0].view()), 2.0);
        assert_eq!(median(array![4.0, 1.0, 2.0, 3.0].view()), 2.5);
    }

    #[test]
    fn unfitted_and_mismatched_inputs_fail() {
        let (x, y) = separable_on_first_feature();
        let mut tao = optimizer(PathOptimizerConfig::default());
        assert!(matches!(tao.predict(x.view()), Err(FitError::NotFitted)));
        assert!(matches!(tao.sweep(), Err(FitError::NotFitted)));

        let mut three_class = bad_tree();
        three_class.value[1] = vec![1.0, 0.0, 0.0];
        assert!(matches!(
            tao.fit_from_tree(three_class, x.view(), y.column(0)),
            Err(FitError::InputShape { .. })
        ));

        let mut dangling = TreeStructure::new();
        let root = dangling.add_leaf(0.5, 8, 8.0, vec![0.5, 0.5]);
        let left = dangling.add_leaf(0.0, 4, 4.0, vec![1.0, 0.0]);
        dangling.set_split(root, 0, 0.5, left, 7);
        assert!(matches!(
            tao.fit_from_tree(dangling, x.view(), y.column(0)),
            Err(FitError::InputShape { .. })
        ));

        let nan = array![0.0, f64::NAN, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0];
        assert!(matches!(
            tao.fit(x.view(), nan.view()),
            Err(FitError::InvalidTarget { row: 1, .. })
        ));

        tao.fit(x.view(), y.column(0)).unwrap();
        let narrow = array![[0.0]];
        assert!(matches!(
            tao.predict(narrow.view()),
            Err(FitError::InputShape { .. })
        ));
    }

    #[test]
    fn negative_regularization_is_rejected() {
        let (x, y) = separable_on_first_feature();
        let mut tao = optimizer(PathOptimizerConfig {
            reg_param: -1.0,
            ..Default::default()
        });
        assert!(matches!(
            tao.fit(x.view(), y.column(0)),
            Err(FitError::Configuration { .. })
        ));
    }

    #[test]
    fn display_renders_both_branches() {
        let (x, y) = separable_on_first_feature();
        let mut tao = optimizer(PathOptimizerConfig::default());
        tao.fit(x.view(), y.column(0)).unwrap();

        let text = tao.to_string();
        assert!(text.contains("|--- X_0 <= 0.500"));
        assert!(text.contains("|--- X_0 >  0.500"));
        assert!(text.contains("|   |--- class: 0"));
        assert!(text.contains("|   |--- class: 1"));
    }

    #[test]
    fn learner_interface_scores_one_output() {
        let (x, y) = separable_on_first_feature();
        let dataset = Dataset::new(x, y).unwrap();
        let mut tao = optimizer(PathOptimizerConfig::default());
        Learner::fit(&mut tao, &dataset).unwrap();
        assert_eq!(tao.score(&dataset).unwrap(), vec![1.0]);
        assert_eq!(Learner::complexity(&tao), 1);
        assert!(tao.calc_memory_size() > 0);
    }
}
