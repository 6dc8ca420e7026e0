/// Node-quality measure driving split selection.
///
/// A criterion reads its targets by row index and summarizes a set of rows
/// as a fixed-length vector of weighted sufficient statistics, so split
/// scanning can move rows from one side to the other incrementally.
pub trait SplitCriterion {
    fn stats_len(&self) -> usize;

    /// Adds `row` with `weight` to `stats`; a negative weight removes it.
    fn accumulate(&self, stats: &mut [f64], row: usize, weight: f64);

    fn impurity(&self, stats: &[f64], weight_sum: f64) -> f64;

    /// Per-node prediction payload (class proportions or per-output means).
    fn node_value(&self, stats: &[f64], weight_sum: f64) -> Vec<f64>;

    /// Impurity decrease of a binary split, children weighted by their share of the parent.
    fn get_merit_of_split(
        &self,
        parent: (&[f64], f64),
        left: (&[f64], f64),
        right: (&[f64], f64),
    ) -> f64 {
        let (parent_stats, parent_weight) = parent;
        if parent_weight <= 0.0 {
            return 0.0;
        }
        let (left_stats, left_weight) = left;
        let (right_stats, right_weight) = right;
        self.impurity(parent_stats, parent_weight)
            - (left_weight / parent_weight) * self.impurity(left_stats, left_weight)
            - (right_weight / parent_weight) * self.impurity(right_stats, right_weight)
    }
}
