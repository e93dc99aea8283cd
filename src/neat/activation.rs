//! Node activation functions

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Activation applied to a node's aggregated input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    Sigmoid,
    Tanh,
    Relu,
    Identity,
    Clamped,
}

impl Activation {
    /// Evaluate the activation.
    ///
    /// Sigmoid and tanh are steepened (x5 and x2.5) and their input clamped to
    /// +-60 so large weights saturate instead of overflowing.
    pub fn apply(&self, z: f64) -> f64 {
        match self {
            Activation::Sigmoid => {
                let z = (5.0 * z).clamp(-60.0, 60.0);
                1.0 / (1.0 + (-z).exp())
            }
            Activation::Tanh => (2.5 * z).clamp(-60.0, 60.0).tanh(),
            Activation::Relu => z.max(0.0),
            Activation::Identity => z,
            Activation::Clamped => z.clamp(-1.0, 1.0),
        }
    }

    /// Pick one of `options` at random, falling back to `self` when empty
    pub fn choose<R: Rng>(&self, options: &[Activation], rng: &mut R) -> Activation {
        options.choose(rng).copied().unwrap_or(*self)
    }
}
