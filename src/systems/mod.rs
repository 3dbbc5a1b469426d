//! Systems module - lattices and Hamiltonians for VMC calculations.

mod lattice;
mod rydberg;

pub use lattice::{build_bonds, Bond, Lattice};
pub use rydberg::{RydbergArray, RydbergCouplings, NNNN_FACTOR, NNN_FACTOR, RABI_FACTOR};
