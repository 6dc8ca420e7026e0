use ndarray::ArrayView1;

const MAX_ITERATIONS: usize = 100;
const GRADIENT_TOLERANCE: f64 = 1e-10;
const HESSIAN_RIDGE: f64 = 1e-12;

/// Weighted binary logistic regression on a single feature, fit by Newton-Raphson.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LogisticRegression {
    pub coef: f64,
    pub intercept: f64,
}

fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

impl LogisticRegression {
    /// `y` holds 0/1 labels; returns `None` when the total weight is zero.
    pub fn fit(x: ArrayView1<f64>, y: ArrayView1<f64>, weights: ArrayView1<f64>) -> Option<Self> {
        let total: f64 = weights.sum();
        if total <= 0.0 {
            return None;
        }

        let mut model = Self::default();
        for _ in 0..MAX_ITERATIONS {
            let (mut g_w, mut g_b) = (0.0, 0.0);
            let (mut h_ww, mut h_wb, mut h_bb) = (0.0, 0.0, 0.0);
            for ((&xi, &yi), &si) in x.iter().zip(y.iter()).zip(weights.iter()) {
                let p = sigmoid(model.coef * xi + model.intercept);
                let r = si * (p - yi);
                g_w += r * xi;
                g_b += r;
                let h = si * p * (1.0 - p);
                h_ww += h * xi * xi;
                h_wb += h * xi;
                h_bb += h;
            }
            if (g_w * g_w + g_b * g_b).sqrt() < GRADIENT_TOLERANCE {
                break;
            }

            h_ww += HESSIAN_RIDGE;
            h_bb += HESSIAN_RIDGE;
            let det = h_ww * h_bb - h_wb * h_wb;
            if det.abs() <= f64::MIN_POSITIVE {
                break;
            }
            let step_w = (h_bb * g_w - h_wb * g_b) / det;
            let step_b = (h_ww * g_b - h_wb * g_w) / det;
            if !step_w.is_finite() || !step_b.is_finite() {
                break;
            }
            model.coef -= step_w;
            model.intercept -= step_b;
        }
        Some(model)
    }

    pub fn predict_label(&self, x: f64) -> f64 {
        if sigmoid(self.coef * x + self.intercept) >= 0.5 { 1.0 } else { 0.0 }
    }

    /// Weighted accuracy of the 0/1 predictions.
    pub fn score(&self, x: ArrayView1<f64>, y: ArrayView1<f64>, weights: ArrayView1<f64>) -> f64 {
        let total: f64 = weights.sum();
        if total <= 0.0 {
            return 0.0;
        }
        let correct: f64 = x
            .iter()
            .zip(y.iter())
            .zip(weights.iter())
            .filter(|((xi, yi), _)| self.predict_label(**xi) == **yi)
            .map(|(_, w)| *w)
            .sum();
        correct / total
    }

    /// Feature value where the predicted probability crosses one half.
    pub fn decision_threshold(&self) -> f64 {
        -self.intercept / self.coef
    }
}
