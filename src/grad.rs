//! Differentiable vs. detached values.
//!
//! A [`Tracked`] value carries the forward tape needed to backpropagate into
//! the wavefunction parameters. [`Detached`] is a plain copy with no tape;
//! the VMC loss only accepts local energies and the baseline in this form so
//! that no gradient can flow through them.

use std::ops::Deref;

/// Per-configuration values plus the tape recorded while computing them.
#[derive(Clone, Debug)]
pub struct Tracked<T> {
    values: Vec<f64>,
    tape: T,
}

impl<T> Tracked<T> {
    pub fn new(values: Vec<f64>, tape: T) -> Self {
        Self { values, tape }
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn tape(&self) -> &T {
        &self.tape
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Copy the values out without the tape.
    pub fn detach(&self) -> Detached<Vec<f64>> {
        Detached(self.values.clone())
    }
}

/// A value that gradients never flow through.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Detached<T>(T);

impl<T> Detached<T> {
    pub fn new(value: T) -> Self {
        Detached(value)
    }

    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> Deref for Detached<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}
