//! Wave function traits for autoregressive VMC.
//!
//! `Autoregressive` covers the two evaluation paths every ansatz needs
//! (ancestral sampling and teacher-forced scoring); `OptimizableWfn` adds
//! parameter access and reverse-mode gradients of the log-amplitude.

use rand::Rng;
use crate::error::{Result, VmcError};
use crate::grad::Tracked;
use super::spins::SpinConfigs;

/// A normalized distribution over spin strings with exact sampling and scoring.
pub trait Autoregressive {
    /// Length of every configuration.
    fn num_sites(&self) -> usize;

    /// Draw `batch_size` configurations and their total log-probabilities `log P(s)`.
    fn sample<R: Rng + ?Sized>(&self, batch_size: usize, rng: &mut R) -> Result<(SpinConfigs, Vec<f64>)>;

    /// `log ψ(s) = ½ log P(s)` for arbitrary configurations.
    fn log_amplitude(&self, configs: &SpinConfigs) -> Result<Vec<f64>>;
}

/// Trait for wavefunctions with trainable parameters.
///
/// Parameters are exchanged as one flat vector in a fixed order, so the
/// optimizer never needs to know the layer structure.
pub trait OptimizableWfn: Autoregressive {
    /// Activations recorded by [`log_amplitude_tracked`](Self::log_amplitude_tracked).
    type Tape;

    /// Number of variational parameters.
    fn num_params(&self) -> usize;

    /// Get current parameter values.
    fn get_params(&self) -> Vec<f64>;

    /// Set parameter values.
    fn set_params(&mut self, params: &[f64]) -> Result<()>;

    /// `log ψ(s)` with the tape needed for [`backward`](Self::backward).
    fn log_amplitude_tracked(&self, configs: &SpinConfigs) -> Result<Tracked<Self::Tape>>;

    /// Gradient of `Σ_b cotangent[b] · log ψ(s_b)` with respect to the parameters.
    fn backward(&self, tracked: &Tracked<Self::Tape>, cotangent: &[f64]) -> Result<Vec<f64>>;

    /// Central finite-difference version of [`backward`](Self::backward).
    fn numerical_gradient(&self, configs: &SpinConfigs, cotangent: &[f64], h: f64) -> Result<Vec<f64>>
    where
        Self: Clone,
    {
        if cotangent.len() != configs.batch_size() {
            return Err(VmcError::ShapeMismatch {
                what: "cotangent batch",
                expected: configs.batch_size(),
                found: cotangent.len(),
            });
        }

        let objective = |wfn: &Self| -> Result<f64> {
            let values = wfn.log_amplitude(configs)?;
            Ok(values.iter().zip(cotangent).map(|(v, c)| v * c).sum())
        };

        let params = self.get_params();
        let mut probe = self.clone();
        let mut grad = vec![0.0; params.len()];
        for i in 0..params.len() {
            let mut shifted = params.clone();
            shifted[i] = params[i] + h;
            probe.set_params(&shifted)?;
            let fwd = objective(&probe)?;
            shifted[i] = params[i] - h;
            probe.set_params(&shifted)?;
            let bwd = objective(&probe)?;
            grad[i] = (fwd - bwd) / (2.0 * h);
        }
        Ok(grad)
    }
}
