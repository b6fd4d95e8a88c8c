use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::math::matrix::Matrix;

/// Weight initialization strategy for a layer.
///
/// The random source is always supplied by the caller, so a seeded
/// `StdRng` yields a fully deterministic network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Initializer {
    /// Uniform on [-1, 1).
    #[default]
    Uniform,
    He,
    Xavier,
}

impl Initializer {
    /// Weights of shape `fan_in x fan_out`.
    pub fn weights<R: Rng + ?Sized>(self, fan_in: usize, fan_out: usize, rng: &mut R) -> Result<Matrix> {
        match self {
            Initializer::Uniform => Matrix::random(fan_in, fan_out, rng),
            Initializer::He => Matrix::he(fan_in, fan_out, fan_in, rng),
            Initializer::Xavier => Matrix::xavier(fan_in, fan_out, fan_in, rng),
        }
    }

    /// Biases of shape `1 x fan_out`. He and Xavier start from zero.
    pub fn biases<R: Rng + ?Sized>(self, fan_out: usize, rng: &mut R) -> Result<Matrix> {
        match self {
            Initializer::Uniform => Matrix::random(1, fan_out, rng),
            Initializer::He | Initializer::Xavier => Matrix::zeros(1, fan_out),
        }
    }
}
