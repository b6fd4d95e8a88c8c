use serde::{Serialize, Deserialize};
use std::f64::consts::{E, PI};

use crate::math::matrix::Matrix;

/// A named scalar function and its derivative, for activations the built-in
/// set does not cover.
///
/// `derivative` must be taken with respect to the pre-activation value.
/// Custom activations compare equal by name.
#[derive(Debug, Clone, Copy)]
pub struct CustomActivation {
    pub name: &'static str,
    pub function: fn(f64) -> f64,
    pub derivative: fn(f64) -> f64,
}

impl PartialEq for CustomActivation {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ActivationFunction {
    Sigmoid,
    ReLU,
    LeakyReLU { alpha: f64 },
    /// `sin`, with `cos` as its derivative.
    Sin,
    /// `cos`, with `-sin` as its derivative.
    Cos,
    Tanh,
    Identity,
    Elu { alpha: f64 },
    Gelu,
    Swish,
    /// Registered at runtime; cannot appear in a saved `NetworkSpec`.
    #[serde(skip)]
    Custom(CustomActivation),
}

impl ActivationFunction {
    /// Registers a custom activation from a function/derivative pair.
    pub fn custom(name: &'static str, function: fn(f64) -> f64, derivative: fn(f64) -> f64) -> Self {
        ActivationFunction::Custom(CustomActivation { name, function, derivative })
    }

    pub fn function(&self, x: f64) -> f64 {
        match self {
            ActivationFunction::Sigmoid => 1.0 / (1.0 + E.powf(-x)),
            ActivationFunction::ReLU => if x > 0.0 { x } else { 0.0 },
            ActivationFunction::LeakyReLU { alpha } => if x > 0.0 { x } else { alpha * x },
            ActivationFunction::Sin => x.sin(),
            ActivationFunction::Cos => x.cos(),
            ActivationFunction::Tanh => x.tanh(),
            ActivationFunction::Identity => x,
            ActivationFunction::Elu { alpha } => {
                if x > 0.0 { x } else { alpha * (E.powf(x) - 1.0) }
            }
            ActivationFunction::Gelu => {
                let c = (2.0_f64 / PI).sqrt();
                0.5 * x * (1.0 + (c * (x + 0.044715 * x.powi(3))).tanh())
            }
            ActivationFunction::Swish => x / (1.0 + E.powf(-x)),
            ActivationFunction::Custom(custom) => (custom.function)(x),
        }
    }

    /// Derivative with respect to the pre-activation input `x`.
    pub fn derivative(&self, x: f64) -> f64 {
        match self {
            ActivationFunction::Sigmoid => {
                let fx = self.function(x);
                fx * (1.0 - fx)
            },
            ActivationFunction::ReLU => if x > 0.0 { 1.0 } else { 0.0 },
            ActivationFunction::LeakyReLU { alpha } => if x > 0.0 { 1.0 } else { *alpha },
            ActivationFunction::Sin => x.cos(),
            ActivationFunction::Cos => -x.sin(),
            ActivationFunction::Tanh => {
                let t = x.tanh();
                1.0 - t * t
            }
            ActivationFunction::Identity => 1.0,
            ActivationFunction::Elu { alpha } => {
                if x > 0.0 { 1.0 } else { alpha * E.powf(x) }
            }
            ActivationFunction::Gelu => {
                let c = (2.0_f64 / PI).sqrt();
                let inner = c * (x + 0.044715 * x.powi(3));
                let tanh_inner = inner.tanh();
                let sech2 = 1.0 - tanh_inner * tanh_inner;
                let d_inner = c * (1.0 + 3.0 * 0.044715 * x.powi(2));
                0.5 * tanh_inner + 0.5 * x * sech2 * d_inner + 0.5
            }
            ActivationFunction::Swish => {
                let sig = 1.0 / (1.0 + E.powf(-x));
                sig + x * sig * (1.0 - sig)
            }
            ActivationFunction::Custom(custom) => (custom.derivative)(x),
        }
    }

    /// Applies the activation to every element.
    pub fn apply(&self, z: &Matrix) -> Matrix {
        z.map(|x| self.function(x))
    }

    /// Element-wise derivative of a pre-activation matrix.
    pub fn derive(&self, z: &Matrix) -> Matrix {
        z.map(|x| self.derivative(x))
    }
}
