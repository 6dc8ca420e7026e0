use ndarray::{Array2, array};

/// `x = 0..4`, binary target split between 1 and 2.
pub fn four_point_binary() -> (Array2<f64>, Array2<f64>) {
    (
        array![[0.0], [1.0], [2.0], [3.0]],
        array![[0.0], [0.0], [1.0], [1.0]],
    )
}

/// `x = 0..8`, classes `[0, 0, 1, 1, 1, 1, 2, 2]`.
pub fn eight_point_three_class() -> (Array2<f64>, Array2<f64>) {
    let x = Array2::from_shape_fn((8, 1), |(i, _)| i as f64);
    let y = array![[0.0], [0.0], [1.0], [1.0], [1.0], [1.0], [2.0], [2.0]];
    (x, y)
}

/// 2x2 grid where output 0 copies `x0` and output 1 copies `x1`.
pub fn independent_grid() -> (Array2<f64>, Array2<f64>) {
    let x = array![[0.0, 0.0], [0.0, 1.0], [1.0, 0.0], [1.0, 1.0]];
    let y = x.clone();
    (x, y)
}

/// Eight rows separable on `x0 <= 0.5`; `x1` is noise.
pub fn separable_on_first_feature() -> (Array2<f64>, Array2<f64>) {
    let x = array![
        [0.0, 0.9],
        [0.1, 0.1],
        [0.2, 0.8],
        [0.3, 0.2],
        [0.7, 0.7],
        [0.8, 0.3],
        [0.9, 0.6],
        [1.0, 0.4],
    ];
    let y = array![[0.0], [0.0], [0.0], [0.0], [1.0], [1.0], [1.0], [1.0]];
    (x, y)
}

pub fn approx_eq(a: f64, b: f64, eps: f64) -> bool {
    (a - b).abs() <= eps
}
