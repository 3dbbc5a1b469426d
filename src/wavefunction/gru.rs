//! Gated recurrent cell and dense softmax head.
//!
//! Both layers work on batches laid out column-wise: a hidden state is an
//! `H × B` matrix, an input is `K × B`. Forward passes that need gradients
//! return a cache; the matching `backward` accumulates parameter gradients
//! into a zero-initialized layer of the same shape and returns the gradient
//! with respect to the incoming hidden state.

use nalgebra::{DMatrix, DVector};
use rand::Rng;
use rand_distr::Uniform;
use serde::{Deserialize, Serialize};

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

fn add_bias(m: &mut DMatrix<f64>, b: &DVector<f64>) {
    for mut col in m.column_iter_mut() {
        col += b;
    }
}

/// GRU cell:
///
/// ```text
/// r  = σ(W_ir x + W_hr h + b_r)
/// z  = σ(W_iz x + W_hz h + b_z)
/// n  = tanh(W_in x + b_in + r ⊙ (W_hn h + b_hn))
/// h' = (1 - z) ⊙ n + z ⊙ h
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GruCell {
    pub w_ir: DMatrix<f64>,
    pub w_iz: DMatrix<f64>,
    pub w_in: DMatrix<f64>,
    pub w_hr: DMatrix<f64>,
    pub w_hz: DMatrix<f64>,
    pub w_hn: DMatrix<f64>,
    pub b_r: DVector<f64>,
    pub b_z: DVector<f64>,
    pub b_in: DVector<f64>,
    pub b_hn: DVector<f64>,
}

/// Activations of one cell step, kept for the backward pass.
#[derive(Debug, Clone)]
pub struct GruStep {
    x: DMatrix<f64>,
    h_prev: DMatrix<f64>,
    r: DMatrix<f64>,
    z: DMatrix<f64>,
    /// `W_hn h + b_hn`, before the reset gate is applied.
    g: DMatrix<f64>,
    n: DMatrix<f64>,
}

impl GruCell {
    pub fn zeros(input_size: usize, hidden_size: usize) -> Self {
        Self {
            w_ir: DMatrix::zeros(hidden_size, input_size),
            w_iz: DMatrix::zeros(hidden_size, input_size),
            w_in: DMatrix::zeros(hidden_size, input_size),
            w_hr: DMatrix::zeros(hidden_size, hidden_size),
            w_hz: DMatrix::zeros(hidden_size, hidden_size),
            w_hn: DMatrix::zeros(hidden_size, hidden_size),
            b_r: DVector::zeros(hidden_size),
            b_z: DVector::zeros(hidden_size),
            b_in: DVector::zeros(hidden_size),
            b_hn: DVector::zeros(hidden_size),
        }
    }

    /// Uniform(-1/√H, 1/√H) initialization for every weight and bias.
    pub fn random<R: Rng + ?Sized>(input_size: usize, hidden_size: usize, rng: &mut R) -> Self {
        let k = 1.0 / (hidden_size as f64).sqrt();
        let dist = Uniform::new(-k, k);
        Self {
            w_ir: DMatrix::from_distribution(hidden_size, input_size, &dist, rng),
            w_iz: DMatrix::from_distribution(hidden_size, input_size, &dist, rng),
            w_in: DMatrix::from_distribution(hidden_size, input_size, &dist, rng),
            w_hr: DMatrix::from_distribution(hidden_size, hidden_size, &dist, rng),
            w_hz: DMatrix::from_distribution(hidden_size, hidden_size, &dist, rng),
            w_hn: DMatrix::from_distribution(hidden_size, hidden_size, &dist, rng),
            b_r: DVector::from_distribution(hidden_size, &dist, rng),
            b_z: DVector::from_distribution(hidden_size, &dist, rng),
            b_in: DVector::from_distribution(hidden_size, &dist, rng),
            b_hn: DVector::from_distribution(hidden_size, &dist, rng),
        }
    }

    pub fn hidden_size(&self) -> usize {
        self.w_hr.nrows()
    }

    /// Advance the hidden state by one step. `x` is `K × B`, `h` is `H × B`.
    pub fn step(&self, x: &DMatrix<f64>, h: &DMatrix<f64>) -> DMatrix<f64> {
        self.step_cached(x, h).0
    }

    /// Same as [`step`](Self::step), also returning the activations.
    pub fn step_cached(&self, x: &DMatrix<f64>, h: &DMatrix<f64>) -> (DMatrix<f64>, GruStep) {
        let mut a_r = &self.w_ir * x + &self.w_hr * h;
        add_bias(&mut a_r, &self.b_r);
        let r = a_r.map(sigmoid);

        let mut a_z = &self.w_iz * x + &self.w_hz * h;
        add_bias(&mut a_z, &self.b_z);
        let z = a_z.map(sigmoid);

        let mut g = &self.w_hn * h;
        add_bias(&mut g, &self.b_hn);
        let mut a_n = &self.w_in * x + r.component_mul(&g);
        add_bias(&mut a_n, &self.b_in);
        let n = a_n.map(f64::tanh);

        let h_next = n.zip_zip_map(&z, h, |n, z, h| (1.0 - z) * n + z * h);
        let cache = GruStep { x: x.clone(), h_prev: h.clone(), r, z, g, n };
        (h_next, cache)
    }

    /// Backpropagate `dh_next` (gradient w.r.t. the step output) through one step.
    ///
    /// Parameter gradients are added into `grad`; the return value is the
    /// gradient w.r.t. the previous hidden state.
    pub fn backward(&self, cache: &GruStep, dh_next: &DMatrix<f64>, grad: &mut GruCell) -> DMatrix<f64> {
        let GruStep { x, h_prev, r, z, g, n } = cache;

        let dn = dh_next.zip_map(z, |d, z| d * (1.0 - z));
        let dz = dh_next.zip_zip_map(h_prev, n, |d, h, n| d * (h - n));
        let mut dh_prev = dh_next.component_mul(z);

        let da_n = dn.zip_map(n, |d, n| d * (1.0 - n * n));
        grad.w_in += &da_n * x.transpose();
        grad.b_in += da_n.column_sum();

        let dr = da_n.component_mul(g);
        let dg = da_n.component_mul(r);
        grad.w_hn += &dg * h_prev.transpose();
        grad.b_hn += dg.column_sum();
        dh_prev += self.w_hn.tr_mul(&dg);

        let da_z = dz.zip_map(z, |d, z| d * z * (1.0 - z));
        grad.w_iz += &da_z * x.transpose();
        grad.w_hz += &da_z * h_prev.transpose();
        grad.b_z += da_z.column_sum();
        dh_prev += self.w_hz.tr_mul(&da_z);

        let da_r = dr.zip_map(r, |d, r| d * r * (1.0 - r));
        grad.w_ir += &da_r * x.transpose();
        grad.w_hr += &da_r * h_prev.transpose();
        grad.b_r += da_r.column_sum();
        dh_prev += self.w_hr.tr_mul(&da_r);

        dh_prev
    }

    pub fn buffers(&self) -> [&[f64]; 10] {
        [
            self.w_ir.as_slice(),
            self.w_iz.as_slice(),
            self.w_in.as_slice(),
            self.w_hr.as_slice(),
            self.w_hz.as_slice(),
            self.w_hn.as_slice(),
            self.b_r.as_slice(),
            self.b_z.as_slice(),
            self.b_in.as_slice(),
            self.b_hn.as_slice(),
        ]
    }

    pub fn buffers_mut(&mut self) -> [&mut [f64]; 10] {
        [
            self.w_ir.as_mut_slice(),
            self.w_iz.as_mut_slice(),
            self.w_in.as_mut_slice(),
            self.w_hr.as_mut_slice(),
            self.w_hz.as_mut_slice(),
            self.w_hn.as_mut_slice(),
            self.b_r.as_mut_slice(),
            self.b_z.as_mut_slice(),
            self.b_in.as_mut_slice(),
            self.b_hn.as_mut_slice(),
        ]
    }
}

/// Affine projection from the hidden state to `K` logits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dense {
    pub w: DMatrix<f64>,
    pub b: DVector<f64>,
}

impl Dense {
    pub fn zeros(input_size: usize, output_size: usize) -> Self {
        Self {
            w: DMatrix::zeros(output_size, input_size),
            b: DVector::zeros(output_size),
        }
    }

    pub fn random<R: Rng + ?Sized>(input_size: usize, output_size: usize, rng: &mut R) -> Self {
        let k = 1.0 / (input_size as f64).sqrt();
        let dist = Uniform::new(-k, k);
        Self {
            w: DMatrix::from_distribution(output_size, input_size, &dist, rng),
            b: DVector::from_distribution(output_size, &dist, rng),
        }
    }

    pub fn forward(&self, h: &DMatrix<f64>) -> DMatrix<f64> {
        let mut logits = &self.w * h;
        add_bias(&mut logits, &self.b);
        logits
    }

    /// Accumulate parameter gradients for `dlogits` and return the gradient w.r.t. `h`.
    pub fn backward(&self, h: &DMatrix<f64>, dlogits: &DMatrix<f64>, grad: &mut Dense) -> DMatrix<f64> {
        grad.w += dlogits * h.transpose();
        grad.b += dlogits.column_sum();
        self.w.tr_mul(dlogits)
    }

    pub fn buffers(&self) -> [&[f64]; 2] {
        [self.w.as_slice(), self.b.as_slice()]
    }

    pub fn buffers_mut(&mut self) -> [&mut [f64]; 2] {
        [self.w.as_mut_slice(), self.b.as_mut_slice()]
    }
}

/// Column-wise softmax of a `K × B` logit matrix.
pub fn softmax_columns(logits: &DMatrix<f64>) -> DMatrix<f64> {
    let mut probs = logits.clone();
    for mut col in probs.column_iter_mut() {
        let max = col.max();
        col.apply(|v| *v = (*v - max).exp());
        let total = col.sum();
        col /= total;
    }
    probs
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_softmax_columns_normalized() {
        let logits = DMatrix::from_column_slice(2, 3, &[0.0, 0.0, 1.0, -1.0, 800.0, 799.0]);
        let probs = softmax_columns(&logits);
        for col in probs.column_iter() {
            assert_relative_eq!(col.sum(), 1.0, epsilon = 1e-12);
        }
        assert_relative_eq!(probs[(0, 0)], 0.5, epsilon = 1e-12);
        assert_relative_eq!(probs[(0, 2)], 1.0 / (1.0 + (-1.0f64).exp()), epsilon = 1e-12);
    }

    #[test]
    fn test_zero_weights_keep_half_state() {
        // With all-zero parameters z = 1/2 and n = 0, so h' = h / 2.
        let cell = GruCell::zeros(2, 3);
        let x = DMatrix::from_column_slice(2, 1, &[1.0, 0.0]);
        let h = DMatrix::from_column_slice(3, 1, &[0.4, -0.2, 1.0]);
        let h_next = cell.step(&x, &h);
        assert_relative_eq!(h_next, h * 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_cell_backward_matches_finite_difference() {
        let mut rng = StdRng::seed_from_u64(7);
        let cell = GruCell::random(2, 4, &mut rng);
        let x = DMatrix::from_column_slice(2, 2, &[1.0, 0.0, 0.0, 1.0]);
        let h = DMatrix::from_fn(4, 2, |i, j| 0.1 * (i as f64) - 0.2 * (j as f64));
        let upstream = DMatrix::from_fn(4, 2, |i, j| 0.3 + 0.1 * (i as f64) * (j as f64 + 1.0));

        let objective = |c: &GruCell, h: &DMatrix<f64>| c.step(&x, h).component_mul(&upstream).sum();

        let (_, cache) = cell.step_cached(&x, &h);
        let mut grad = GruCell::zeros(2, 4);
        let dh = cell.backward(&cache, &upstream, &mut grad);

        let eps = 1e-6;
        for (k, analytic) in grad.buffers().iter().enumerate() {
            for idx in 0..analytic.len() {
                let mut plus = cell.clone();
                plus.buffers_mut()[k][idx] += eps;
                let mut minus = cell.clone();
                minus.buffers_mut()[k][idx] -= eps;
                let numeric = (objective(&plus, &h) - objective(&minus, &h)) / (2.0 * eps);
                assert_relative_eq!(analytic[idx], numeric, epsilon = 1e-7);
            }
        }

        for idx in 0..h.len() {
            let mut plus = h.clone();
            plus[idx] += eps;
            let mut minus = h.clone();
            minus[idx] -= eps;
            let numeric = (objective(&cell, &plus) - objective(&cell, &minus)) / (2.0 * eps);
            assert_relative_eq!(dh[idx], numeric, epsilon = 1e-7);
        }
    }
}
