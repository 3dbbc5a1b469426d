//! Sampling module - VMC training of autoregressive wavefunctions.

mod traits;
mod adam;
mod vmc;

pub use traits::EnergyCalculator;
pub use adam::{Adam, AdamConfig};
pub use vmc::{
    autocorrelation_time, blocking_error, vmc_loss, EpochStats, SamplingStats, VmcLoss,
    VmcParams, VmcResults, VmcTrainer,
};
