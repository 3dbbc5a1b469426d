//! Traits for Monte Carlo sampling.

use crate::error::Result;
use crate::wavefunction::{Autoregressive, SpinConfigs};

/// Trait for computing local energies of sampled configurations.
pub trait EnergyCalculator {
    /// Number of sites the Hamiltonian acts on.
    fn num_sites(&self) -> usize;

    /// `E_loc(s) = Σ_s' ⟨s|H|s'⟩ ψ(s')/ψ(s)` for every configuration in the batch.
    ///
    /// `log_amplitudes` must be `log ψ` of `configs` under `wfn`; it is used as
    /// the denominator of every off-diagonal ratio and is never recomputed.
    fn local_energy<W: Autoregressive>(
        &self,
        wfn: &W,
        configs: &SpinConfigs,
        log_amplitudes: &[f64],
    ) -> Result<Vec<f64>>;
}
