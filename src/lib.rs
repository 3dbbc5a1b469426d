//! Rydberg RNN - variational Monte Carlo with an autoregressive RNN wavefunction.
//!
//! This crate estimates ground states of Rydberg atom arrays on open square
//! lattices. A GRU-based autoregressive model gives exact samples and exact
//! log-amplitudes; the VMC trainer minimizes the energy with a baselined
//! score-function gradient and Adam.

pub mod error;
pub mod grad;
pub mod wavefunction;
pub mod systems;
pub mod sampling;
pub mod io;

#[cfg(test)]
mod tests;

// Re-export commonly used types at crate root
pub use error::{Result, VmcError};
pub use grad::{Detached, Tracked};
pub use wavefunction::{Autoregressive, OptimizableWfn, RnnWavefunction, SpinConfigs};
pub use systems::{Lattice, RydbergArray, RydbergCouplings};
pub use sampling::{EnergyCalculator, Adam, AdamConfig, EpochStats, SamplingStats, VmcParams, VmcResults, VmcTrainer};
pub use io::{read_config, write_trajectory, save_checkpoint, load_checkpoint, RunConfig};
