//! Autoregressive RNN wavefunction.
//!
//! `P(s) = Π_j P(s_j | s_0 … s_{j-1})`, each conditional produced by the same
//! GRU cell and softmax head. The chain starts from a zero input and a zero
//! hidden state; the amplitude is `ψ(s) = √P(s)`.

use nalgebra::DMatrix;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, WeightedIndex};
use serde::{Deserialize, Serialize};
use crate::error::{Result, VmcError};
use crate::grad::Tracked;
use super::gru::{softmax_columns, Dense, GruCell, GruStep};
use super::spins::SpinConfigs;
use super::traits::{Autoregressive, OptimizableWfn};

/// Local Hilbert space dimension (ground / Rydberg).
pub const LOCAL_DIM: usize = 2;

/// Added to every probability before taking its logarithm.
pub const PROB_FLOOR: f64 = 1e-10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RnnWavefunction {
    num_sites: usize,
    cell: GruCell,
    head: Dense,
}

/// Forward activations of a teacher-forced pass.
#[derive(Debug, Clone)]
pub struct RnnTape {
    configs: SpinConfigs,
    steps: Vec<GruStep>,
    hidden: Vec<DMatrix<f64>>,
    probs: Vec<DMatrix<f64>>,
}

impl RnnWavefunction {
    pub fn new<R: Rng + ?Sized>(num_sites: usize, num_hidden: usize, rng: &mut R) -> Result<Self> {
        if num_sites == 0 || num_hidden == 0 {
            return Err(VmcError::InvalidConfiguration(format!(
                "need at least one site and one hidden unit, got {} sites, {} hidden",
                num_sites, num_hidden
            )));
        }
        Ok(Self {
            num_sites,
            cell: GruCell::random(LOCAL_DIM, num_hidden, rng),
            head: Dense::random(num_hidden, LOCAL_DIM, rng),
        })
    }

    /// Initialize from a fixed seed.
    pub fn with_seed(num_sites: usize, num_hidden: usize, seed: u64) -> Result<Self> {
        let mut rng = StdRng::seed_from_u64(seed);
        Self::new(num_sites, num_hidden, &mut rng)
    }

    pub fn num_hidden(&self) -> usize {
        self.cell.hidden_size()
    }

    fn zero_parameters(&self) -> (GruCell, Dense) {
        let hidden = self.num_hidden();
        (GruCell::zeros(LOCAL_DIM, hidden), Dense::zeros(hidden, LOCAL_DIM))
    }

    /// Input fed to the cell at site `j`: one-hot of `s_{j-1}`, or zeros at `j = 0`.
    fn shifted_input(configs: &SpinConfigs, j: usize) -> DMatrix<f64> {
        let mut x = DMatrix::zeros(LOCAL_DIM, configs.batch_size());
        if j > 0 {
            for b in 0..configs.batch_size() {
                x[(configs.get(b, j - 1) as usize, b)] = 1.0;
            }
        }
        x
    }

    fn accumulate_log_probs(probs: &DMatrix<f64>, configs: &SpinConfigs, j: usize, log_p: &mut [f64]) {
        for (b, lp) in log_p.iter_mut().enumerate() {
            let s = configs.get(b, j) as usize;
            *lp += (probs[(s, b)] + PROB_FLOOR).ln();
        }
    }

    fn buffers(&self) -> impl Iterator<Item = &[f64]> {
        self.cell.buffers().into_iter().chain(self.head.buffers())
    }
}

/// Flatten layer gradients in the same order as [`OptimizableWfn::get_params`].
fn flatten(cell: &GruCell, head: &Dense) -> Vec<f64> {
    cell.buffers()
        .into_iter()
        .chain(head.buffers())
        .flat_map(|buf| buf.iter().copied())
        .collect()
}

impl Autoregressive for RnnWavefunction {
    fn num_sites(&self) -> usize {
        self.num_sites
    }

    fn sample<R: Rng + ?Sized>(&self, batch_size: usize, rng: &mut R) -> Result<(SpinConfigs, Vec<f64>)> {
        let mut configs = SpinConfigs::zeros(self.num_sites, batch_size);
        let mut log_p = vec![0.0; batch_size];
        let mut h = DMatrix::zeros(self.num_hidden(), batch_size);
        let mut x = DMatrix::zeros(LOCAL_DIM, batch_size);

        for j in 0..self.num_sites {
            h = self.cell.step(&x, &h);
            let probs = softmax_columns(&self.head.forward(&h));

            x = DMatrix::zeros(LOCAL_DIM, batch_size);
            for b in 0..batch_size {
                let dist = WeightedIndex::new(probs.column(b).iter().copied()).map_err(|e| {
                    VmcError::NumericalInstability(format!(
                        "invalid conditional at site {}: {}",
                        j, e
                    ))
                })?;
                let s = dist.sample(rng);
                configs.set(b, j, s as u8)?;
                x[(s, b)] = 1.0;
            }
            Self::accumulate_log_probs(&probs, &configs, j, &mut log_p);
        }

        Ok((configs, log_p))
    }

    fn log_amplitude(&self, configs: &SpinConfigs) -> Result<Vec<f64>> {
        configs.check_sites(self.num_sites)?;
        let batch_size = configs.batch_size();
        let mut log_p = vec![0.0; batch_size];
        let mut h = DMatrix::zeros(self.num_hidden(), batch_size);

        for j in 0..self.num_sites {
            h = self.cell.step(&Self::shifted_input(configs, j), &h);
            let probs = softmax_columns(&self.head.forward(&h));
            Self::accumulate_log_probs(&probs, configs, j, &mut log_p);
        }

        Ok(log_p.into_iter().map(|lp| 0.5 * lp).collect())
    }
}

impl OptimizableWfn for RnnWavefunction {
    type Tape = RnnTape;

    fn num_params(&self) -> usize {
        self.buffers().map(|buf| buf.len()).sum()
    }

    fn get_params(&self) -> Vec<f64> {
        flatten(&self.cell, &self.head)
    }

    fn set_params(&mut self, params: &[f64]) -> Result<()> {
        let expected = self.num_params();
        if params.len() != expected {
            return Err(VmcError::ShapeMismatch {
                what: "parameter vector",
                expected,
                found: params.len(),
            });
        }

        let mut offset = 0;
        for buf in self.cell.buffers_mut().into_iter().chain(self.head.buffers_mut()) {
            let len = buf.len();
            buf.copy_from_slice(&params[offset..offset + len]);
            offset += len;
        }
        Ok(())
    }

    fn log_amplitude_tracked(&self, configs: &SpinConfigs) -> Result<Tracked<RnnTape>> {
        configs.check_sites(self.num_sites)?;
        let batch_size = configs.batch_size();
        let mut log_p = vec![0.0; batch_size];
        let mut h = DMatrix::zeros(self.num_hidden(), batch_size);
        let mut steps = Vec::with_capacity(self.num_sites);
        let mut hidden = Vec::with_capacity(self.num_sites);
        let mut probs_per_site = Vec::with_capacity(self.num_sites);

        for j in 0..self.num_sites {
            let (h_next, step) = self.cell.step_cached(&Self::shifted_input(configs, j), &h);
            h = h_next;
            let probs = softmax_columns(&self.head.forward(&h));
            Self::accumulate_log_probs(&probs, configs, j, &mut log_p);

            steps.push(step);
            hidden.push(h.clone());
            probs_per_site.push(probs);
        }

        let values = log_p.into_iter().map(|lp| 0.5 * lp).collect();
        let tape = RnnTape {
            configs: configs.clone(),
            steps,
            hidden,
            probs: probs_per_site,
        };
        Ok(Tracked::new(values, tape))
    }

    fn backward(&self, tracked: &Tracked<RnnTape>, cotangent: &[f64]) -> Result<Vec<f64>> {
        let tape = tracked.tape();
        let batch_size = tape.configs.batch_size();
        if cotangent.len() != batch_size {
            return Err(VmcError::ShapeMismatch {
                what: "cotangent batch",
                expected: batch_size,
                found: cotangent.len(),
            });
        }

        let (mut grad_cell, mut grad_head) = self.zero_parameters();
        let mut dh_carry = DMatrix::zeros(self.num_hidden(), batch_size);

        for j in (0..self.num_sites).rev() {
            // d/dlogit_k of ln(p_s + ε) = p_s (δ_sk - p_k) / (p_s + ε)
            let probs = &tape.probs[j];
            let mut dlogits = DMatrix::zeros(LOCAL_DIM, batch_size);
            for b in 0..batch_size {
                let s = tape.configs.get(b, j) as usize;
                let p_s = probs[(s, b)];
                let scale = 0.5 * cotangent[b] * p_s / (p_s + PROB_FLOOR);
                for k in 0..LOCAL_DIM {
                    let delta = if k == s { 1.0 } else { 0.0 };
                    dlogits[(k, b)] = scale * (delta - probs[(k, b)]);
                }
            }

            let dh = self.head.backward(&tape.hidden[j], &dlogits, &mut grad_head) + &dh_carry;
            dh_carry = self.cell.backward(&tape.steps[j], &dh, &mut grad_cell);
        }

        let grad = flatten(&grad_cell, &grad_head);
        if grad.iter().any(|g| !g.is_finite()) {
            return Err(VmcError::NumericalInstability("non-finite parameter gradient".into()));
        }
        Ok(grad)
    }
}
