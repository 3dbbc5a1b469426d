//! Wavefunction module - autoregressive ansatz and its building blocks.

mod traits;
mod spins;
mod gru;
mod rnn;

pub use traits::{Autoregressive, OptimizableWfn};
pub use spins::{SpinConfigs, MAX_ENUMERATED_SITES};
pub use gru::{softmax_columns, Dense, GruCell, GruStep};
pub use rnn::{RnnTape, RnnWavefunction, LOCAL_DIM, PROB_FLOOR};
