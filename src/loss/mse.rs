use crate::error::{NnError, Result};
use crate::math::matrix::Matrix;

/// Squared-error loss for one sample (or batch) of predictions.
pub struct MseLoss;

impl MseLoss {
    /// Scalar loss: sum((predicted - expected)²) over every element.
    ///
    /// Not divided by the output width; `NeuralNet::cost` averages over
    /// samples only.
    pub fn loss(predicted: &Matrix, expected: &Matrix) -> Result<f64> {
        check_shapes(predicted, expected)?;
        Ok(predicted.values().iter().zip(expected.values())
            .map(|(a, b)| (a - b).powi(2))
            .sum())
    }

    /// Output error fed into the backward pass: predicted - expected.
    pub fn derivative(predicted: &Matrix, expected: &Matrix) -> Result<Matrix> {
        check_shapes(predicted, expected)?;
        predicted.sub(expected)
    }
}

fn check_shapes(predicted: &Matrix, expected: &Matrix) -> Result<()> {
    if predicted.shape() != expected.shape() {
        return Err(NnError::shape("loss", predicted.shape(), expected.shape()));
    }
    Ok(())
}
