use crate::classifiers::cart::split_criteria::{
    GiniSplitCriterion, MseSplitCriterion, SplitCriterion,
};
use crate::classifiers::cart::tree_structure::{NodeId, TreeStructure};
use crate::core::dataset::{check_same_rows, check_sample_weight};
use crate::core::errors::{FitError, FitResult};
use ndarray::{ArrayView1, ArrayView2};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Nodes at or below this impurity are never split.
pub const IMPURITY_EPSILON: f64 = f64::EPSILON;

/// Feature values closer than this are treated as equal when placing thresholds.
pub const FEATURE_THRESHOLD: f64 = 1e-7;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct DecisionTreeParams {
    #[schemars(title = "Max Depth", description = "Maximum tree depth (None = unlimited)")]
    pub max_depth: Option<usize>,

    #[schemars(
        title = "Max Leaf Nodes",
        description = "Grow best-first until this many leaves exist (None = unlimited)",
        range(min = 2)
    )]
    pub max_leaf_nodes: Option<usize>,

    #[schemars(
        title = "Min Samples Split",
        description = "Minimum rows a node needs to be split",
        range(min = 2)
    )]
    pub min_samples_split: usize,

    #[schemars(
        title = "Min Samples Leaf",
        description = "Minimum rows on each side of a split",
        range(min = 1)
    )]
    pub min_samples_leaf: usize,
}

impl Default for DecisionTreeParams {
    fn default() -> Self {
        Self {
            max_depth: None,
            max_leaf_nodes: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
        }
    }
}

impl DecisionTreeParams {
    pub fn stump() -> Self {
        Self {
            max_depth: Some(1),
            ..Self::default()
        }
    }

    pub fn with_max_leaf_nodes(max_leaf_nodes: usize) -> Self {
        Self {
            max_leaf_nodes: Some(max_leaf_nodes),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> FitResult<()> {
        if let Some(n) = self.max_leaf_nodes
            && n < 2
        {
            return Err(FitError::config("max_leaf_nodes", "must be at least 2"));
        }
        if self.min_samples_split < 2 {
            return Err(FitError::config("min_samples_split", "must be at least 2"));
        }
        if self.min_samples_leaf < 1 {
            return Err(FitError::config("min_samples_leaf", "must be at least 1"));
        }
        Ok(())
    }
}

/// What the tree is fit to.
#[derive(Debug, Clone, Copy)]
pub enum TreeTargets<'a> {
    /// Class indices in `0..n_classes`, scored with Gini impurity.
    Classes {
        classes: ArrayView1<'a, usize>,
        n_classes: usize,
    },
    /// One column per output, scored with mean squared error.
    Values(ArrayView2<'a, f64>),
}

impl TreeTargets<'_> {
    fn n_rows(&self) -> usize {
        match self {
            TreeTargets::Classes { classes, .. } => classes.len(),
            TreeTargets::Values(values) => values.nrows(),
        }
    }
}

struct SplitCandidate {
    feature: usize,
    threshold: f64,
    merit: f64,
}

struct FrontierEntry {
    node: NodeId,
    depth: usize,
    rows: Vec<usize>,
    split: SplitCandidate,
    priority: f64,
}

/// CART builder growing a [`TreeStructure`] best-first.
///
/// Features are scanned in ascending order and the first strictly best split
/// wins, so fitting is deterministic.
pub struct DecisionTree {
    params: DecisionTreeParams,
}

impl DecisionTree {
    pub fn new(params: DecisionTreeParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &DecisionTreeParams {
        &self.params
    }

    pub fn fit(
        &self,
        x: ArrayView2<f64>,
        targets: TreeTargets<'_>,
        sample_weight: Option<ArrayView1<f64>>,
    ) -> FitResult<TreeStructure> {
        self.params.validate()?;
        check_same_rows(x.nrows(), targets.n_rows())?;
        check_sample_weight(x.nrows(), sample_weight)?;
        if x.nrows() == 0 {
            return Err(FitError::shape("at least one sample", "0 samples"));
        }
        if let TreeTargets::Classes { classes, n_classes } = targets
            && let Some(&bad) = classes.iter().find(|&&c| c >= n_classes)
        {
            return Err(FitError::shape(
                format!("class indices below {n_classes}"),
                format!("class index {bad}"),
            ));
        }

        let criterion: Box<dyn SplitCriterion + '_> = match targets {
            TreeTargets::Classes { classes, n_classes } => {
                Box::new(GiniSplitCriterion::new(classes, n_classes))
            }
            TreeTargets::Values(values) => Box::new(MseSplitCriterion::new(values)),
        };
        let weights: Vec<f64> = match sample_weight {
            Some(w) => w.to_vec(),
            None => vec![1.0; x.nrows()],
        };
        let total_weight: f64 = weights.iter().sum();

        let builder = Builder {
            params: &self.params,
            x,
            criterion: criterion.as_ref(),
            weights: &weights,
            total_weight,
        };
        Ok(builder.build())
    }
}

// Views are invariant over their data lifetime, so `x` gets its own.
struct Builder<'a, 'x> {
    params: &'a DecisionTreeParams,
    x: ArrayView2<'x, f64>,
    criterion: &'a dyn SplitCriterion,
    weights: &'a [f64],
    total_weight: f64,
}

impl Builder<'_, '_> {
    fn build(&self) -> TreeStructure {
        let mut tree = TreeStructure::new();
        let mut frontier: Vec<FrontierEntry> = Vec::new();

        let all_rows: Vec<usize> = (0..self.x.nrows()).collect();
        self.add_node(&mut tree, &mut frontier, all_rows, 0);
        let mut n_leaves = 1;

        loop {
            if let Some(max_leaves) = self.params.max_leaf_nodes
                && n_leaves >= max_leaves
            {
                break;
            }
            let Some(best) = Self::pop_best(&mut frontier) else {
                break;
            };

            let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = best
                .rows
                .iter()
                .copied()
                .partition(|&r| self.x[[r, best.split.feature]] <= best.split.threshold);

            let left = self.add_node(&mut tree, &mut frontier, left_rows, best.depth + 1);
            let right = self.add_node(&mut tree, &mut frontier, right_rows, best.depth + 1);
            tree.set_split(best.node, best.split.feature, best.split.threshold, left, right);
            n_leaves += 1;
        }

        tree
    }

    fn pop_best(frontier: &mut Vec<FrontierEntry>) -> Option<FrontierEntry> {
        let mut best: Option<usize> = None;
        for (i, entry) in frontier.iter().enumerate() {
            match best {
                Some(b) if frontier[b].priority >= entry.priority => {}
                _ => best = Some(i),
            }
        }
        best.map(|i| frontier.remove(i))
    }

    fn add_node(
        &self,
        tree: &mut TreeStructure,
        frontier: &mut Vec<FrontierEntry>,
        rows: Vec<usize>,
        depth: usize,
    ) -> NodeId {
        let mut stats = vec![0.0; self.criterion.stats_len()];
        let mut weight = 0.0;
        for &r in &rows {
            self.criterion.accumulate(&mut stats, r, self.weights[r]);
            weight += self.weights[r];
        }
        let impurity = self.criterion.impurity(&stats, weight);
        let value = self.criterion.node_value(&stats, weight);
        let node = tree.add_leaf(impurity, rows.len(), weight, value);

        let n = rows.len();
        let splittable = n >= self.params.min_samples_split
            && n >= 2 * self.params.min_samples_leaf
            && self.params.max_depth.is_none_or(|d| depth < d)
            && impurity > IMPURITY_EPSILON;
        if !splittable {
            return node;
        }

        if let Some(split) = self.find_best_split(&rows, &stats, weight) {
            let priority = if self.total_weight > 0.0 {
                weight / self.total_weight * split.merit
            } else {
                0.0
            };
            frontier.push(FrontierEntry {
                node,
                depth,
                rows,
                split,
                priority,
            });
        }
        node
    }

    fn find_best_split(
        &self,
        rows: &[usize],
        parent_stats: &[f64],
        parent_weight: f64,
    ) -> Option<SplitCandidate> {
        let n = rows.len();
        let min_leaf = self.params.min_samples_leaf;
        let mut best: Option<SplitCandidate> = None;
        let mut sorted = rows.to_vec();
        let mut left_stats = vec![0.0; parent_stats.len()];
        let mut right_stats = vec![0.0; parent_stats.len()];

        for feature in 0..self.x.ncols() {
            let column = self.x.column(feature);
            sorted.sort_by(|&a, &b| column[a].total_cmp(&column[b]));
            if column[sorted[n - 1]] <= column[sorted[0]] + FEATURE_THRESHOLD {
                continue;
            }

            left_stats.iter_mut().for_each(|s| *s = 0.0);
            let mut left_weight = 0.0;

            for i in 0..n - 1 {
                let row = sorted[i];
                self.criterion
                    .accumulate(&mut left_stats, row, self.weights[row]);
                left_weight += self.weights[row];

                let current = column[row];
                let next = column[sorted[i + 1]];
                if next <= current + FEATURE_THRESHOLD {
                    continue;
                }
                let n_left = i + 1;
                if n_left < min_leaf || n - n_left < min_leaf {
                    continue;
                }
                let right_weight = parent_weight - left_weight;
                if left_weight <= 0.0 || right_weight <= 0.0 {
                    continue;
                }
                for (r, (p, l)) in right_stats
                    .iter_mut()
                    .zip(parent_stats.iter().zip(left_stats.iter()))
                {
                    *r = p - l;
                }

                let merit = self.criterion.get_merit_of_split(
                    (parent_stats, parent_weight),
                    (&left_stats, left_weight),
                    (&right_stats, right_weight),
                );
                if best.as_ref().is_none_or(|b| merit > b.merit) {
                    let mut threshold = current / 2.0 + next / 2.0;
                    if threshold == next || !threshold.is_finite() {
                        threshold = current;
                    }
                    best = Some(SplitCandidate {
                        feature,
                        threshold,
                        merit,
                    });
                }
            }
        }

        best
    }
}
