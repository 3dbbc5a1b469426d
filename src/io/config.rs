//! YAML run configuration, trajectory output and checkpoints.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use serde::{Deserialize, Serialize};
use crate::error::{Result, VmcError};
use crate::sampling::{EpochStats, VmcParams};
use crate::systems::{Lattice, RydbergArray, RydbergCouplings};
use crate::wavefunction::RnnWavefunction;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LatticeConfig {
    pub lx: usize,
    pub ly: usize,
}

impl Default for LatticeConfig {
    fn default() -> Self {
        Self { lx: 4, ly: 4 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub num_hidden: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self { num_hidden: 32 }
    }
}

/// Everything needed to set up and run one training job.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub lattice: LatticeConfig,
    pub hamiltonian: RydbergCouplings,
    pub model: ModelConfig,
    pub training: VmcParams,
}

impl RunConfig {
    pub fn validate(&self) -> Result<()> {
        if self.lattice.lx == 0 || self.lattice.ly == 0 {
            return Err(VmcError::InvalidConfiguration(format!(
                "lattice dimensions must be positive, got {}x{}",
                self.lattice.lx, self.lattice.ly
            )));
        }
        if self.model.num_hidden == 0 {
            return Err(VmcError::InvalidConfiguration("num_hidden must be positive".into()));
        }
        let RydbergCouplings { v, omega, delta } = self.hamiltonian;
        if ![v, omega, delta].iter().all(|c| c.is_finite()) {
            return Err(VmcError::InvalidConfiguration("couplings must be finite".into()));
        }
        self.training.validate()
    }

    pub fn build_hamiltonian(&self) -> Result<RydbergArray> {
        let lattice = Lattice::new(self.lattice.lx, self.lattice.ly)?;
        Ok(RydbergArray::new(lattice, self.hamiltonian))
    }

    /// Fresh wavefunction initialized from the training seed.
    pub fn build_wavefunction(&self) -> Result<RnnWavefunction> {
        RnnWavefunction::with_seed(
            self.lattice.lx * self.lattice.ly,
            self.model.num_hidden,
            self.training.seed,
        )
    }
}

/// Read and validate a YAML run configuration. Missing fields take defaults.
pub fn read_config<P: AsRef<Path>>(path: P) -> Result<RunConfig> {
    let reader = BufReader::new(File::open(path)?);
    let config: RunConfig = serde_yaml::from_reader(reader)?;
    config.validate()?;
    Ok(config)
}

/// Write the per-epoch (energy, variance) sequence as YAML.
pub fn write_trajectory<P: AsRef<Path>>(path: P, trajectory: &[EpochStats]) -> Result<()> {
    let writer = BufWriter::new(File::create(path)?);
    serde_yaml::to_writer(writer, trajectory)?;
    Ok(())
}

pub fn save_checkpoint<P: AsRef<Path>>(path: P, wfn: &RnnWavefunction) -> Result<()> {
    let writer = BufWriter::new(File::create(path)?);
    serde_yaml::to_writer(writer, wfn)?;
    Ok(())
}

pub fn load_checkpoint<P: AsRef<Path>>(path: P) -> Result<RnnWavefunction> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_yaml::from_reader(reader)?)
}

// example of yaml file
// lattice:
//   lx: 4
//   ly: 4
// hamiltonian:
//   v: 7.0
//   omega: 1.0
//   delta: 1.0
// model:
//   num_hidden: 32
// training:
//   epochs: 1000
//   n_samples: 500
//   learning_rate: 0.001
//   seed: 1234
