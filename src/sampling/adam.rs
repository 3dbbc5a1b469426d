//! Adam optimizer over a flat parameter vector.
//!
//! Kingma & Ba 2015, with bias-corrected first and second moments and no
//! weight decay.

use serde::{Deserialize, Serialize};
use crate::error::{Result, VmcError};

/// Adam hyperparameters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AdamConfig {
    pub beta1: f64,
    pub beta2: f64,
    pub eps: f64,
}

impl Default for AdamConfig {
    fn default() -> Self {
        AdamConfig {
            beta1: 0.9,
            beta2: 0.999,
            eps: 1e-8,
        }
    }
}

/// Moment buffers and step counter for one parameter vector.
#[derive(Clone, Debug)]
pub struct Adam {
    pub config: AdamConfig,
    m: Vec<f64>,
    v: Vec<f64>,
    step: u32,
}

impl Adam {
    pub fn new(n_params: usize, config: AdamConfig) -> Self {
        Adam {
            config,
            m: vec![0.0; n_params],
            v: vec![0.0; n_params],
            step: 0,
        }
    }

    /// Number of updates applied so far.
    pub fn steps(&self) -> u32 {
        self.step
    }

    /// Apply one update in place: `p ← p - lr · m̂ / (√v̂ + eps)`.
    pub fn step(&mut self, params: &mut [f64], grads: &[f64], lr: f64) -> Result<()> {
        if params.len() != self.m.len() || grads.len() != self.m.len() {
            return Err(VmcError::ShapeMismatch {
                what: "optimizer parameters",
                expected: self.m.len(),
                found: if params.len() != self.m.len() { params.len() } else { grads.len() },
            });
        }

        let AdamConfig { beta1, beta2, eps } = self.config;
        self.step += 1;
        let t = self.step as i32;
        let bc1_inv = 1.0 / (1.0 - beta1.powi(t));
        let bc2_inv = 1.0 / (1.0 - beta2.powi(t));

        for i in 0..params.len() {
            let g = grads[i];
            self.m[i] = beta1 * self.m[i] + (1.0 - beta1) * g;
            self.v[i] = beta2 * self.v[i] + (1.0 - beta2) * g * g;
            let m_hat = self.m[i] * bc1_inv;
            let v_hat = self.v[i] * bc2_inv;
            params[i] -= lr * m_hat / (v_hat.sqrt() + eps);
        }
        Ok(())
    }
}
