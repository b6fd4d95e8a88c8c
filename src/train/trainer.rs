use crate::{error::Result, math::matrix::Matrix, network::network::NeuralNet};

/// One epoch of per-sample gradient descent: a `backprop` step for each
/// (input, expected) pair, in order.
pub fn train_epoch(
    network: &mut NeuralNet,
    inputs: &[Matrix],
    expected_outputs: &[Matrix],
    learning_rate: f64,
) -> Result<()> {
    for (input, expected) in inputs.iter().zip(expected_outputs) {
        network.backprop(input, expected, learning_rate)?;
    }
    Ok(())
}
