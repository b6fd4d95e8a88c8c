use rand::Rng;

use crate::{
    activation::activation::ActivationFunction,
    error::{NnError, Result},
    math::{init::Initializer, matrix::Matrix},
};

/// Intermediate values of one layer's forward pass.
#[derive(Debug, Clone)]
pub struct LayerTrace {
    /// z = x·W + b, shape batch x size
    pub pre_activation: Matrix,
    /// a = f(z), same shape
    pub post_activation: Matrix,
}

/// Fully connected layer: `f(x·W + b)`.
#[derive(Debug, Clone)]
pub struct Layer {
    /// input_size x size
    pub weights: Matrix,
    /// 1 x size
    pub biases: Matrix,
    pub activator: ActivationFunction,
}

impl Layer {
    pub fn new<R: Rng + ?Sized>(
        size: usize,
        input_size: usize,
        activation: ActivationFunction,
        init: Initializer,
        rng: &mut R,
    ) -> Result<Layer> {
        Ok(Layer {
            weights: init.weights(input_size, size, rng)?,
            biases: init.biases(size, rng)?,
            activator: activation,
        })
    }

    /// Builds a layer from explicit parameters; `biases` must be 1 x weights.cols.
    pub fn from_parameters(weights: Matrix, biases: Matrix, activation: ActivationFunction) -> Result<Layer> {
        if biases.rows() != 1 || biases.cols() != weights.cols() {
            return Err(NnError::shape("layer biases", weights.shape(), biases.shape()));
        }
        Ok(Layer { weights, biases, activator: activation })
    }

    pub fn input_size(&self) -> usize {
        self.weights.rows()
    }

    pub fn size(&self) -> usize {
        self.weights.cols()
    }

    /// Forward pass over a batch (batch x input_size). The layer itself is
    /// not modified; the intermediates are returned for backprop.
    pub fn activate(&self, inputs: &Matrix) -> Result<LayerTrace> {
        let pre_activation = inputs.dot(&self.weights)?.add(&self.biases)?;
        let post_activation = self.activator.apply(&pre_activation);
        Ok(LayerTrace { pre_activation, post_activation })
    }

    /// Gates the incoming error by this layer's activation derivative:
    /// δ = error ⊙ f'(z).
    pub fn delta(&self, error: &Matrix, trace: &LayerTrace) -> Result<Matrix> {
        error.mult(&self.activator.derive(&trace.pre_activation))
    }

    /// Returns (weights_grad, biases_grad) for a layer delta.
    ///
    /// `inputs` is what this layer saw in the forward pass. Bias gradients
    /// are summed over the batch so they keep the 1 x size shape.
    pub fn compute_gradients(&self, delta: &Matrix, inputs: &Matrix) -> Result<(Matrix, Matrix)> {
        let weights_grad = inputs.transpose().dot(delta)?;
        let biases_grad = delta.sum_rows();
        Ok((weights_grad, biases_grad))
    }

    /// Applies pre-computed gradients scaled by lr.
    pub fn apply_gradients(&mut self, weights_grad: &Matrix, biases_grad: &Matrix, lr: f64) -> Result<()> {
        self.weights = self.weights.sub(&weights_grad.scale(lr))?;
        self.biases = self.biases.sub(&biases_grad.scale(lr))?;
        Ok(())
    }
}
