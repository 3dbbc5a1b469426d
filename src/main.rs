use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use rydberg_rnn::{read_config, save_checkpoint, write_trajectory, RunConfig, VmcTrainer};

/// Ground-state search for a Rydberg array with an RNN wavefunction
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// YAML run configuration (defaults to the 4x4, V=7 benchmark)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Lattice extent along x
    #[arg(long)]
    lx: Option<usize>,

    /// Lattice extent along y
    #[arg(long)]
    ly: Option<usize>,

    /// Number of training epochs
    #[arg(short, long)]
    epochs: Option<usize>,

    /// Samples per epoch
    #[arg(short, long)]
    samples: Option<usize>,

    /// GRU hidden units
    #[arg(long)]
    hidden: Option<usize>,

    /// Adam learning rate
    #[arg(long)]
    lr: Option<f64>,

    /// Random seed for initialization and sampling
    #[arg(long)]
    seed: Option<u64>,

    /// Write the (epoch, energy, variance) trajectory here
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Save the trained wavefunction here
    #[arg(long)]
    checkpoint: Option<PathBuf>,
}

impl Args {
    fn run_config(&self) -> rydberg_rnn::Result<RunConfig> {
        let mut config = match &self.config {
            Some(path) => read_config(path)?,
            None => RunConfig::default(),
        };

        if let Some(lx) = self.lx {
            config.lattice.lx = lx;
        }
        if let Some(ly) = self.ly {
            config.lattice.ly = ly;
        }
        if let Some(epochs) = self.epochs {
            config.training.epochs = epochs;
        }
        if let Some(samples) = self.samples {
            config.training.n_samples = samples;
        }
        if let Some(hidden) = self.hidden {
            config.model.num_hidden = hidden;
        }
        if let Some(lr) = self.lr {
            config.training.learning_rate = lr;
        }
        if let Some(seed) = self.seed {
            config.training.seed = seed;
        }

        config.validate()?;
        Ok(config)
    }
}

fn run(args: &Args) -> rydberg_rnn::Result<()> {
    let config = args.run_config()?;
    let ham = config.build_hamiltonian()?;
    let wfn = config.build_wavefunction()?;

    println!("Rydberg array VMC");
    println!("-----------------");
    println!("  Lattice:         {}x{}", config.lattice.lx, config.lattice.ly);
    println!("  V / Omega / delta: {} / {} / {}",
        config.hamiltonian.v, config.hamiltonian.omega, config.hamiltonian.delta);
    println!("  Hidden units:    {}", config.model.num_hidden);
    println!("  Epochs:          {}", config.training.epochs);
    println!("  Samples/epoch:   {}", config.training.n_samples);
    println!("  Learning rate:   {:.1e}", config.training.learning_rate);
    println!("  Seed:            {}", config.training.seed);
    println!();

    let mut trainer = VmcTrainer::new(wfn, ham, config.training)?;
    let results = trainer.run()?;

    println!("Final energy density: {:.6} ± {:.6}", results.energy, results.error);
    println!("Autocorrelation time: {:.2} epochs", results.autocorrelation_time);

    if let Some(path) = &args.output {
        write_trajectory(path, &results.trajectory)?;
        info!(path = %path.display(), "wrote trajectory");
    }
    if let Some(path) = &args.checkpoint {
        save_checkpoint(path, &trainer.into_wavefunction())?;
        info!(path = %path.display(), "saved checkpoint");
    }
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
