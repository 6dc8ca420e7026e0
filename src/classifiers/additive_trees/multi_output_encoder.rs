use crate::core::errors::{FitError, FitResult};
use ndarray::{Array2, ArrayD, ArrayViewD, Axis, IxDyn};

/// One-hot encoding of integer-coded multi-output targets, plus the
/// per-interaction flattened views the additive trees are fit to.
///
/// Column `j` has `levels[j] = max(column j) + 1` classes. The one-hot tensor
/// has shape `(n_samples, levels[0], .., levels[k-1])`.
#[derive(Debug, Clone)]
pub struct MultiOutputEncoder {
    levels: Vec<usize>,
    codes: Array2<usize>,
    one_hot: ArrayD<f64>,
    interactions: Vec<Vec<usize>>,
}

impl MultiOutputEncoder {
    pub fn new(codes: Array2<usize>, max_interaction_order: Option<usize>) -> FitResult<Self> {
        if codes.nrows() == 0 || codes.ncols() == 0 {
            return Err(FitError::shape(
                "at least one sample and one output",
                format!("{}x{} targets", codes.nrows(), codes.ncols()),
            ));
        }
        if max_interaction_order == Some(0) {
            return Err(FitError::config(
                "max_interaction_order",
                "must be at least 1",
            ));
        }

        let levels: Vec<usize> = codes
            .columns()
            .into_iter()
            .map(|c| c.iter().copied().max().unwrap_or(0) + 1)
            .collect();

        let mut shape = Vec::with_capacity(levels.len() + 1);
        shape.push(codes.nrows());
        shape.extend(&levels);
        let mut one_hot = ArrayD::<f64>::zeros(IxDyn(&shape));
        for (i, row) in codes.rows().into_iter().enumerate() {
            let mut index = Vec::with_capacity(shape.len());
            index.push(i);
            index.extend(row.iter());
            one_hot[index.as_slice()] = 1.0;
        }

        let n_outputs = levels.len();
        let order = max_interaction_order.map_or(n_outputs, |m| m.min(n_outputs));
        let interactions = interaction_subsets(n_outputs, order);

        Ok(Self {
            levels,
            codes,
            one_hot,
            interactions,
        })
    }

    pub fn levels(&self) -> &[usize] {
        &self.levels
    }

    pub fn one_hot(&self) -> &ArrayD<f64> {
        &self.one_hot
    }

    pub fn interactions(&self) -> &[Vec<usize>] {
        &self.interactions
    }

    /// Sums `tensor` over every output axis not in `dims` and flattens the
    /// remaining axes row by row.
    pub fn flatten(&self, tensor: &ArrayD<f64>, dims: &[usize]) -> Array2<f64> {
        let mut aggregated = tensor.clone();
        for axis in (0..self.levels.len()).rev().filter(|d| !dims.contains(d)) {
            aggregated = aggregated.sum_axis(Axis(axis + 1));
        }

        let n = tensor.shape()[0];
        let width: usize = dims.iter().map(|&d| self.levels[d]).product();
        let mut flat = Array2::<f64>::zeros((n, width));
        for (i, mut row) in flat.rows_mut().into_iter().enumerate() {
            let sample = aggregated.index_axis(Axis(0), i);
            for (dst, src) in row.iter_mut().zip(sample.iter()) {
                *dst = *src;
            }
        }
        flat
    }

    pub fn class_proportions(&self, mask: &[bool]) -> ArrayD<f64> {
        let mut value = ArrayD::<f64>::zeros(IxDyn(&self.levels));
        let mut count = 0usize;
        for (row, _) in self
            .codes
            .rows()
            .into_iter()
            .zip(mask)
            .filter(|(_, m)| **m)
        {
            let index: Vec<usize> = row.to_vec();
            value[index.as_slice()] += 1.0;
            count += 1;
        }
        if count > 0 {
            value.mapv_inplace(|v| v / count as f64);
        }
        value
    }
}

pub fn tensor_shape(levels: &[usize], n_rows: usize) -> Vec<usize> {
    let mut shape = Vec::with_capacity(levels.len() + 1);
    shape.push(n_rows);
    shape.extend(levels);
    shape
}

/// All subsets of `0..n_outputs` of size `1..=max_order`, by size then
/// lexicographically.
pub fn interaction_subsets(n_outputs: usize, max_order: usize) -> Vec<Vec<usize>> {
    let mut out = Vec::new();
    for size in 1..=max_order.min(n_outputs) {
        let mut combo: Vec<usize> = (0..size).collect();
        loop {
            out.push(combo.clone());
            // rightmost position that can still advance
            let Some(pos) = (0..size).rev().find(|&i| combo[i] < n_outputs - size + i) else {
                break;
            };
            combo[pos] += 1;
            for i in pos + 1..size {
                combo[i] = combo[i - 1] + 1;
            }
        }
    }
    out
}

pub fn shares_dimension(a: &[usize], b: &[usize]) -> bool {
    a.iter().any(|d| b.contains(d))
}

/// Multi-index of the first maximal entry, in row-major order.
pub fn unravel_argmax(tensor: ArrayViewD<f64>) -> Vec<usize> {
    let mut best = 0;
    let mut best_value = f64::NEG_INFINITY;
    for (flat, &v) in tensor.iter().enumerate() {
        if v > best_value {
            best = flat;
            best_value = v;
        }
    }

    let shape = tensor.shape();
    let mut index = vec![0; shape.len()];
    for (d, &len) in shape.iter().enumerate().rev() {
        if len > 0 {
            index[d] = best % len;
            best /= len;
        }
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn levels_and_one_hot_from_codes() {
        let enc = MultiOutputEncoder::new(array![[0, 2], [1, 0]], None).unwrap();
        assert_eq!(enc.levels(), &[2, 3]);
        assert_eq!(enc.one_hot().shape(), &[2, 2, 3]);
        assert_eq!(enc.one_hot()[[0, 0, 2]], 1.0);
        assert_eq!(enc.one_hot()[[1, 1, 0]], 1.0);
        assert_eq!(enc.one_hot().sum(), 2.0);
    }

    #[test]
    fn subsets_by_size_then_lexicographic() {
        assert_eq!(
            interaction_subsets(3, 3),
            vec![
                vec![0],
                vec![1],
                vec![2],
                vec![0, 1],
                vec![0, 2],
                vec![1, 2],
                vec![0, 1, 2],
            ]
        );
        assert_eq!(interaction_subsets(3, 1), vec![vec![0], vec![1], vec![2]]);
    }

    #[test]
    fn interaction_order_is_clamped() {
        let enc = MultiOutputEncoder::new(array![[0, 1]], Some(5)).unwrap();
        assert_eq!(enc.interactions().len(), 3);
    }

    #[test]
    fn zero_interaction_order_is_rejected() {
        let err = MultiOutputEncoder::new(array![[0]], Some(0)).unwrap_err();
        assert!(matches!(err, FitError::Configuration { .. }));
    }

    #[test]
    fn flatten_marginalises_other_outputs() {
        let enc = MultiOutputEncoder::new(array![[0, 2], [1, 0]], None).unwrap();

        let first = enc.flatten(enc.one_hot(), &[0]);
        assert_eq!(first, array![[1.0, 0.0], [0.0, 1.0]]);

        let second = enc.flatten(enc.one_hot(), &[1]);
        assert_eq!(second, array![[0.0, 0.0, 1.0], [1.0, 0.0, 0.0]]);

        let joint = enc.flatten(enc.one_hot(), &[0, 1]);
        assert_eq!(joint.shape(), &[2, 6]);
        assert_eq!(joint[[0, 2]], 1.0);
        assert_eq!(joint[[1, 3]], 1.0);
    }

    #[test]
    fn proportions_over_masked_rows() {
        let enc = MultiOutputEncoder::new(array![[0, 1], [0, 1], [1, 0]], None).unwrap();
        let p = enc.class_proportions(&[true, true, true]);
        assert!((p[[0, 1]] - 2.0 / 3.0).abs() < 1e-12);
        assert!((p[[1, 0]] - 1.0 / 3.0).abs() < 1e-12);

        let none = enc.class_proportions(&[false, false, false]);
        assert_eq!(none.sum(), 0.0);
    }

    #[test]
    fn argmax_takes_first_maximum() {
        let t = array![[0.2, 0.5, 0.5], [0.5, 0.1, 0.0]].into_dyn();
        assert_eq!(unravel_argmax(t.view()), vec![0, 1]);
        let flat = array![0.0, 3.0, 1.0].into_dyn();
        assert_eq!(unravel_argmax(flat.view()), vec![1]);
    }

    #[test]
    fn dimension_sharing() {
        assert!(shares_dimension(&[0, 1], &[1]));
        assert!(!shares_dimension(&[0], &[1, 2]));
    }
}
