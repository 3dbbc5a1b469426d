use approx::assert_relative_eq;
use nalgebra::DMatrix;

use crate::io::RunConfig;
use crate::sampling::{EnergyCalculator, VmcParams, VmcTrainer};
use crate::systems::{Lattice, RydbergArray, RydbergCouplings};
use crate::wavefunction::{Autoregressive, OptimizableWfn, RnnWavefunction, SpinConfigs};

/// Dense Hamiltonian in the basis ordered like `SpinConfigs::enumerate`.
fn dense_hamiltonian(ham: &RydbergArray) -> DMatrix<f64> {
    let n = ham.num_sites();
    let all = SpinConfigs::enumerate(n).unwrap();
    let dim = all.batch_size();
    let mut h = DMatrix::zeros(dim, dim);
    for b in 0..dim {
        h[(b, b)] = ham.diagonal_energy(all.config(b));
        for site in 0..n {
            let other = b ^ (1 << (n - 1 - site));
            h[(b, other)] = -0.5 * ham.couplings.omega;
        }
    }
    h
}

/// `⟨ψ|H|ψ⟩` from local energies over the full basis.
fn exact_expectation(wfn: &RnnWavefunction, ham: &RydbergArray) -> f64 {
    let all = SpinConfigs::enumerate(wfn.num_sites()).unwrap();
    let log_psi = wfn.log_amplitude(&all).unwrap();
    let energies = ham.local_energy(wfn, &all, &log_psi).unwrap();
    log_psi.iter()
        .zip(&energies)
        .map(|(lp, e)| (2.0 * lp).exp() * e)
        .sum()
}

fn small_array() -> RydbergArray {
    RydbergArray::new(
        Lattice::new(2, 3).unwrap(),
        RydbergCouplings { v: 7.0, omega: 1.0, delta: 1.0 },
    )
}

#[test]
fn test_local_energy_agrees_with_dense_matrix() {
    let ham = small_array();
    let wfn = RnnWavefunction::with_seed(6, 6, 31).unwrap();
    let h = dense_hamiltonian(&ham);

    let all = SpinConfigs::enumerate(6).unwrap();
    let psi: Vec<f64> = wfn.log_amplitude(&all).unwrap().iter().map(|lp| lp.exp()).collect();
    let psi = nalgebra::DVector::from_vec(psi);
    let reference = psi.dot(&(&h * &psi));

    assert_relative_eq!(exact_expectation(&wfn, &ham), reference, epsilon = 1e-9);
}

#[test]
fn test_variational_bound_during_training() {
    let ham = small_array();
    let ground = dense_hamiltonian(&ham).symmetric_eigen().eigenvalues.min();

    let wfn = RnnWavefunction::with_seed(6, 8, 2).unwrap();
    let initial = exact_expectation(&wfn, &ham);
    assert!(initial >= ground - 1e-9);

    let params = VmcParams { epochs: 200, n_samples: 200, learning_rate: 0.01, seed: 8, log_interval: 0 };
    let mut trainer = VmcTrainer::new(wfn, ham.clone(), params).unwrap();
    trainer.run().unwrap();

    let trained = exact_expectation(trainer.wavefunction(), &ham);
    assert!(trained >= ground - 1e-9, "trained energy {} below ground {}", trained, ground);
    assert!(trained < initial, "energy did not improve: {} -> {}", initial, trained);
}

#[test]
fn test_sample_frequencies_follow_probabilities() {
    let wfn = RnnWavefunction::with_seed(3, 4, 12).unwrap();
    let all = SpinConfigs::enumerate(3).unwrap();
    let probs: Vec<f64> = wfn.log_amplitude(&all).unwrap().iter().map(|lp| (2.0 * lp).exp()).collect();

    let mut rng = <rand::rngs::StdRng as rand::SeedableRng>::seed_from_u64(77);
    let n_samples = 40_000;
    let (configs, _) = wfn.sample(n_samples, &mut rng).unwrap();
    let mut counts = [0usize; 8];
    for config in configs.iter() {
        let index = config.iter().fold(0, |acc, &s| (acc << 1) | s as usize);
        counts[index] += 1;
    }

    for (count, p) in counts.iter().zip(&probs) {
        let freq = *count as f64 / n_samples as f64;
        let sigma = (p * (1.0 - p) / n_samples as f64).sqrt();
        assert!((freq - p).abs() < 5.0 * sigma + 1e-3, "freq {} vs p {}", freq, p);
    }
}

#[test]
fn test_run_config_builds_consistent_system() {
    let config = RunConfig::default();
    let ham = config.build_hamiltonian().unwrap();
    let wfn = config.build_wavefunction().unwrap();
    assert_eq!(ham.num_sites(), 16);
    assert_eq!(wfn.num_sites(), 16);
    assert_eq!(wfn.num_hidden(), 32);
    assert!(wfn.num_params() > 0);
}

/// Full 4x4 benchmark; takes minutes in release mode.
#[test]
#[ignore]
fn test_4x4_converges_to_reference_energy() {
    let config = RunConfig::default();
    let wfn = config.build_wavefunction().unwrap();
    let ham = config.build_hamiltonian().unwrap();
    let mut trainer = VmcTrainer::new(wfn, ham, config.training).unwrap();
    let results = trainer.run().unwrap();

    assert_eq!(results.trajectory.len(), 1000);
    assert!(
        (results.energy - (-0.4578)).abs() < 0.01,
        "energy density {} ± {}",
        results.energy,
        results.error
    );
}
