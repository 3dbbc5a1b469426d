//! Rydberg atom array on a square lattice.
//!
//! ```text
//! H = -Ω/2 Σ_j σˣ_j - δ Σ_j n_j + Σ_{i<j} V_ij n_i n_j
//! ```
//!
//! with a van der Waals tail `V_ij = V / r_ij⁶` truncated after the third
//! neighbour shell (r = 1, √2, 2).

use serde::{Deserialize, Serialize};
use crate::error::{Result, VmcError};
use crate::sampling::EnergyCalculator;
use crate::wavefunction::{Autoregressive, SpinConfigs};
use super::lattice::{Bond, Lattice};

/// `1/r⁶` at r = √2.
pub const NNN_FACTOR: f64 = 1.0 / 8.0;
/// `1/r⁶` at r = 2.
pub const NNNN_FACTOR: f64 = 1.0 / 64.0;
/// Prefactor of the Rabi drive in front of Ω.
pub const RABI_FACTOR: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RydbergCouplings {
    /// Nearest-neighbour interaction strength `V`.
    pub v: f64,
    /// Rabi frequency `Ω`.
    pub omega: f64,
    /// Detuning `δ`.
    pub delta: f64,
}

impl Default for RydbergCouplings {
    fn default() -> Self {
        Self { v: 7.0, omega: 1.0, delta: 1.0 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RydbergArray {
    pub lattice: Lattice,
    pub couplings: RydbergCouplings,
}

fn bond_sum(config: &[u8], bonds: &[Bond]) -> f64 {
    bonds
        .iter()
        .map(|&(i, j)| config[i] as f64 * config[j] as f64)
        .sum()
}

impl RydbergArray {
    pub fn new(lattice: Lattice, couplings: RydbergCouplings) -> Self {
        Self { lattice, couplings }
    }

    /// Diagonal part of `H` for a single configuration.
    pub fn diagonal_energy(&self, config: &[u8]) -> f64 {
        let RydbergCouplings { v, delta, .. } = self.couplings;
        let occupation: f64 = config.iter().map(|&s| s as f64).sum();

        -delta * occupation
            + v * bond_sum(config, self.lattice.nearest())
            + v * NNN_FACTOR * bond_sum(config, self.lattice.next_nearest())
            + v * NNNN_FACTOR * bond_sum(config, self.lattice.next_next_nearest())
    }

    pub fn diagonal_energies(&self, configs: &SpinConfigs) -> Result<Vec<f64>> {
        configs.check_sites(self.num_sites())?;
        Ok(configs.iter().map(|c| self.diagonal_energy(c)).collect())
    }
}

impl EnergyCalculator for RydbergArray {
    fn num_sites(&self) -> usize {
        self.lattice.num_sites()
    }

    fn local_energy<W: Autoregressive>(
        &self,
        wfn: &W,
        configs: &SpinConfigs,
        log_amplitudes: &[f64],
    ) -> Result<Vec<f64>> {
        let n = self.num_sites();
        if wfn.num_sites() != n {
            return Err(VmcError::ShapeMismatch {
                what: "wavefunction sites",
                expected: n,
                found: wfn.num_sites(),
            });
        }
        configs.check_sites(n)?;
        if log_amplitudes.len() != configs.batch_size() {
            return Err(VmcError::ShapeMismatch {
                what: "log-amplitude batch",
                expected: configs.batch_size(),
                found: log_amplitudes.len(),
            });
        }

        let mut energies = self.diagonal_energies(configs)?;
        let rabi = -RABI_FACTOR * self.couplings.omega;

        // One full forward pass per flipped site.
        for site in 0..n {
            let flipped = configs.flipped(site);
            let log_flipped = wfn.log_amplitude(&flipped)?;
            for ((e, lf), lp) in energies.iter_mut().zip(&log_flipped).zip(log_amplitudes) {
                *e += rabi * (lf - lp).exp();
            }
        }

        Ok(energies)
    }
}
