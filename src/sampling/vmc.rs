//! Variational Monte Carlo training loop.
//!
//! Each epoch draws exact samples from the autoregressive ansatz, evaluates
//! local energies and takes one Adam step along the score-function estimate
//!
//! ```text
//! ∂⟨H⟩/∂θ ≈ 2/B Σ_b (E_loc(s_b) - E₀) ∂log ψ(s_b)/∂θ
//! ```
//!
//! with the batch mean `E₀` as a variance-reducing baseline.

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use crate::error::{Result, VmcError};
use crate::grad::{Detached, Tracked};
use crate::wavefunction::OptimizableWfn;
use super::adam::{Adam, AdamConfig};
use super::traits::EnergyCalculator;

/// Parameters for a VMC training run.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VmcParams {
    pub epochs: usize,
    pub n_samples: usize,
    pub learning_rate: f64,
    pub seed: u64,
    /// Log a progress line every this many epochs (0 disables).
    pub log_interval: usize,
}

impl Default for VmcParams {
    fn default() -> Self {
        Self {
            epochs: 1000,
            n_samples: 500,
            learning_rate: 1e-3,
            seed: 1234,
            log_interval: 50,
        }
    }
}

impl VmcParams {
    pub fn validate(&self) -> Result<()> {
        if self.n_samples == 0 {
            return Err(VmcError::InvalidConfiguration("n_samples must be positive".into()));
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(VmcError::InvalidConfiguration(format!(
                "learning rate must be positive, got {}",
                self.learning_rate
            )));
        }
        Ok(())
    }
}

/// Energy density and its variance for one epoch.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct EpochStats {
    pub epoch: usize,
    pub energy: f64,
    pub variance: f64,
}

/// Results from a single VMC sampling run.
#[derive(Clone, Debug)]
pub struct SamplingStats {
    /// Mean energy per site
    pub energy: f64,
    /// Variance of local energy per site
    pub variance: f64,
    /// Standard error of the mean
    pub error: f64,
    /// Number of samples
    pub n_samples: usize,
}

/// Summary of a finished training run.
#[derive(Clone, Debug)]
pub struct VmcResults {
    /// Mean energy density over the trailing quarter of the run.
    pub energy: f64,
    pub error: f64,
    pub autocorrelation_time: f64,
    pub trajectory: Vec<EpochStats>,
}

/// Scalar VMC loss and its gradient with respect to each `log ψ(s_b)`.
#[derive(Clone, Debug)]
pub struct VmcLoss {
    pub value: f64,
    pub cotangent: Vec<f64>,
}

/// `loss = mean(2 log ψ · E_loc - 2 E₀ · log ψ)`.
///
/// Only `log_psi` carries a tape; energies and baseline enter as constants.
pub fn vmc_loss<T>(
    log_psi: &Tracked<T>,
    local_energies: &Detached<Vec<f64>>,
    baseline: Detached<f64>,
) -> Result<VmcLoss> {
    let batch = log_psi.len();
    if local_energies.len() != batch {
        return Err(VmcError::ShapeMismatch {
            what: "local energy batch",
            expected: batch,
            found: local_energies.len(),
        });
    }
    if batch == 0 {
        return Err(VmcError::InvalidConfiguration("empty sample batch".into()));
    }

    let e0 = *baseline;
    let scale = 1.0 / batch as f64;
    let value = log_psi
        .values()
        .iter()
        .zip(local_energies.iter())
        .map(|(lp, e)| 2.0 * lp * e - 2.0 * e0 * lp)
        .sum::<f64>()
        * scale;
    if !value.is_finite() {
        return Err(VmcError::NumericalInstability(format!("loss is {}", value)));
    }

    let cotangent = local_energies.iter().map(|e| 2.0 * (e - e0) * scale).collect();
    Ok(VmcLoss { value, cotangent })
}

fn mean_and_variance(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, variance)
}

/// Estimate autocorrelation time using initial positive sequence.
pub fn autocorrelation_time(energies: &[f64]) -> f64 {
    let n = energies.len();
    if n < 2 {
        return 1.0;
    }
    let (mean, var) = mean_and_variance(energies);
    if var == 0.0 {
        return 1.0;
    }

    let mut autocorr = 1.0;
    for t in 1..n / 2 {
        let auto_t: f64 = energies[..n - t].iter()
            .zip(energies[t..].iter())
            .map(|(&x, &y)| (x - mean) * (y - mean))
            .sum::<f64>() / ((n - t) as f64 * var);

        if auto_t < 0.0 {
            break;
        }
        autocorr += 2.0 * auto_t;
    }
    autocorr
}

/// Standard error of the mean using blocks of `2τ` samples.
pub fn blocking_error(energies: &[f64], autocorrelation_time: f64) -> f64 {
    let block_size = ((2.0 * autocorrelation_time).ceil() as usize).max(1);
    let n_blocks = energies.len() / block_size;

    if n_blocks < 2 {
        return 0.0;
    }

    let block_means: Vec<f64> = energies
        .chunks_exact(block_size)
        .map(|block| block.iter().sum::<f64>() / block_size as f64)
        .collect();

    let (_, variance) = mean_and_variance(&block_means);
    let variance = variance * n_blocks as f64 / (n_blocks - 1) as f64;
    (variance / n_blocks as f64).sqrt()
}

/// VMC optimizer for an autoregressive wavefunction.
pub struct VmcTrainer<W: OptimizableWfn, H: EnergyCalculator> {
    wavefunction: W,
    hamiltonian: H,
    params: VmcParams,
    optimizer: Adam,
    rng: StdRng,
    trajectory: Vec<EpochStats>,
}

impl<W: OptimizableWfn, H: EnergyCalculator> VmcTrainer<W, H> {
    pub fn new(wavefunction: W, hamiltonian: H, params: VmcParams) -> Result<Self> {
        params.validate()?;
        if wavefunction.num_sites() != hamiltonian.num_sites() {
            return Err(VmcError::ShapeMismatch {
                what: "wavefunction sites",
                expected: hamiltonian.num_sites(),
                found: wavefunction.num_sites(),
            });
        }

        let optimizer = Adam::new(wavefunction.num_params(), AdamConfig::default());
        Ok(Self {
            wavefunction,
            hamiltonian,
            params,
            optimizer,
            rng: StdRng::seed_from_u64(params.seed),
            trajectory: Vec::with_capacity(params.epochs),
        })
    }

    pub fn wavefunction(&self) -> &W {
        &self.wavefunction
    }

    pub fn trajectory(&self) -> &[EpochStats] {
        &self.trajectory
    }

    pub fn into_wavefunction(self) -> W {
        self.wavefunction
    }

    /// Run one training iteration and append its statistics to the trajectory.
    pub fn step(&mut self) -> Result<EpochStats> {
        let n_sites = self.wavefunction.num_sites() as f64;

        let (configs, _) = self.wavefunction.sample(self.params.n_samples, &mut self.rng)?;
        let log_psi = self.wavefunction.log_amplitude_tracked(&configs)?;

        let local_energies = self.hamiltonian.local_energy(
            &self.wavefunction,
            &configs,
            &log_psi.detach(),
        )?;
        let (e0, _) = mean_and_variance(&local_energies);

        let densities: Vec<f64> = local_energies.iter().map(|e| e / n_sites).collect();
        let (energy, variance) = mean_and_variance(&densities);

        let loss = vmc_loss(&log_psi, &Detached::new(local_energies), Detached::new(e0))?;
        let grads = self.wavefunction.backward(&log_psi, &loss.cotangent)?;

        let mut theta = self.wavefunction.get_params();
        self.optimizer.step(&mut theta, &grads, self.params.learning_rate)?;
        self.wavefunction.set_params(&theta)?;

        let stats = EpochStats {
            epoch: self.trajectory.len(),
            energy,
            variance,
        };
        debug!(epoch = stats.epoch, loss = loss.value, "vmc step");
        self.trajectory.push(stats);
        Ok(stats)
    }

    /// Train for the configured number of epochs.
    pub fn run(&mut self) -> Result<VmcResults> {
        info!(
            sites = self.wavefunction.num_sites(),
            params = self.wavefunction.num_params(),
            epochs = self.params.epochs,
            samples = self.params.n_samples,
            lr = self.params.learning_rate,
            "starting VMC training"
        );
        if self.params.epochs < 16 {
            warn!(
                epochs = self.params.epochs,
                "trailing window too short for a blocking error estimate"
            );
        }

        for _ in 0..self.params.epochs {
            let stats = self.step()?;
            let interval = self.params.log_interval;
            if interval > 0 && (stats.epoch + 1) % interval == 0 {
                info!(
                    "epoch {:5}: E/N = {:10.6}, var = {:.6}",
                    stats.epoch + 1, stats.energy, stats.variance
                );
            }
        }

        let results = self.compute_results();
        info!(
            "final E/N = {:.6} ± {:.6} (tau = {:.2})",
            results.energy, results.error, results.autocorrelation_time
        );
        Ok(results)
    }

    /// Summarize the trailing quarter of the trajectory.
    pub fn compute_results(&self) -> VmcResults {
        let energies: Vec<f64> = self.trajectory.iter().map(|s| s.energy).collect();
        let tail_len = (energies.len() / 4).max(1).min(energies.len());
        let tail = &energies[energies.len() - tail_len..];

        let (energy, autocorrelation_time, error) = if tail.is_empty() {
            (f64::NAN, 1.0, 0.0)
        } else {
            let (energy, _) = mean_and_variance(tail);
            let tau = autocorrelation_time(tail);
            (energy, tau, blocking_error(tail, tau))
        };

        VmcResults {
            energy,
            error,
            autocorrelation_time,
            trajectory: self.trajectory.clone(),
        }
    }

    /// Sample the current wavefunction without updating it.
    pub fn estimate_energy(&mut self, n_samples: usize) -> Result<SamplingStats> {
        if n_samples == 0 {
            return Err(VmcError::InvalidConfiguration("n_samples must be positive".into()));
        }
        let n_sites = self.wavefunction.num_sites() as f64;
        let (configs, log_p) = self.wavefunction.sample(n_samples, &mut self.rng)?;
        let log_psi: Vec<f64> = log_p.iter().map(|lp| 0.5 * lp).collect();
        let energies: Vec<f64> = self.hamiltonian
            .local_energy(&self.wavefunction, &configs, &log_psi)?
            .into_iter()
            .map(|e| e / n_sites)
            .collect();

        let (energy, variance) = mean_and_variance(&energies);
        Ok(SamplingStats {
            energy,
            variance,
            error: (variance / n_samples as f64).sqrt(),
            n_samples,
        })
    }
}
