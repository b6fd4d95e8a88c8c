use rand::Rng;
use tracing::debug;

use crate::{
    error::{NnError, Result},
    layers::dense::{Layer, LayerTrace},
    loss::mse::MseLoss,
    math::matrix::Matrix,
    network::spec::{LayerSpec, NetworkSpec},
    optim::sgd::Sgd,
};

/// Every layer's intermediates from one forward pass, plus the input that
/// started it.
#[derive(Debug, Clone)]
pub struct ForwardTrace {
    pub inputs: Matrix,
    pub layers: Vec<LayerTrace>,
}

impl ForwardTrace {
    /// The network output (last layer's activation).
    pub fn output(&self) -> &Matrix {
        self.layers
            .last()
            .map_or(&self.inputs, |trace| &trace.post_activation)
    }

    /// What layer `i` received: the raw input for the first layer, the
    /// previous activation otherwise.
    pub fn layer_input(&self, i: usize) -> &Matrix {
        if i == 0 {
            &self.inputs
        } else {
            &self.layers[i - 1].post_activation
        }
    }
}

/// A stack of dense layers trained by per-step gradient descent on the
/// squared error.
#[derive(Debug, Clone)]
pub struct NeuralNet {
    input_size: usize,
    /// `[input_size, layer_0.size, layer_1.size, ...]`
    neurons: Vec<usize>,
    layers: Vec<Layer>,
}

impl NeuralNet {
    /// Builds a randomly initialized network using the thread-local RNG.
    pub fn new(input_size: usize, layer_specs: &[LayerSpec]) -> Result<NeuralNet> {
        NeuralNet::with_rng(input_size, layer_specs, &mut rand::thread_rng())
    }

    /// Builds a network drawing initial weights from `rng`.
    pub fn with_rng<R: Rng + ?Sized>(
        input_size: usize,
        layer_specs: &[LayerSpec],
        rng: &mut R,
    ) -> Result<NeuralNet> {
        if input_size == 0 {
            return Err(NnError::invalid("input_size must be positive"));
        }
        if layer_specs.is_empty() {
            return Err(NnError::invalid("a network needs at least one layer"));
        }

        let mut layers = Vec::with_capacity(layer_specs.len());
        let mut fan_in = input_size;
        for spec in layer_specs {
            layers.push(Layer::new(spec.neurons, fan_in, spec.activation, spec.init, rng)?);
            fan_in = spec.neurons;
        }

        NeuralNet::from_layers(input_size, layers)
    }

    pub fn from_spec<R: Rng + ?Sized>(spec: &NetworkSpec, rng: &mut R) -> Result<NeuralNet> {
        spec.validate()?;
        let net = NeuralNet::with_rng(spec.input_size, &spec.layers, rng)?;
        debug!(name = %spec.name, "built network from spec");
        Ok(net)
    }

    /// Assembles a network from existing layers, checking that each layer's
    /// input width matches the previous output width.
    pub fn from_layers(input_size: usize, layers: Vec<Layer>) -> Result<NeuralNet> {
        if layers.is_empty() {
            return Err(NnError::invalid("a network needs at least one layer"));
        }

        let mut neurons = Vec::with_capacity(layers.len() + 1);
        neurons.push(input_size);
        for layer in &layers {
            let prev = *neurons.last().unwrap_or(&input_size);
            if layer.input_size() != prev {
                return Err(NnError::shape("layer chain", (prev, layer.size()), layer.weights.shape()));
            }
            neurons.push(layer.size());
        }

        debug!(?neurons, parameters = count_parameters(&layers), "network ready");
        Ok(NeuralNet { input_size, neurons, layers })
    }

    pub fn input_size(&self) -> usize {
        self.input_size
    }

    pub fn output_size(&self) -> usize {
        self.neurons[self.neurons.len() - 1]
    }

    /// Layer widths, input width first.
    pub fn neurons(&self) -> &[usize] {
        &self.neurons
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Replaces layer `index`, keeping the width chain intact: the new layer
    /// must map the same input width to the same output width.
    pub fn set_layer(&mut self, index: usize, layer: Layer) -> Result<()> {
        if index >= self.layers.len() {
            return Err(NnError::invalid(format!(
                "layer index {index} out of range for {} layers",
                self.layers.len()
            )));
        }
        let expected = (self.neurons[index], self.neurons[index + 1]);
        if layer.weights.shape() != expected {
            return Err(NnError::shape("set_layer", expected, layer.weights.shape()));
        }
        self.layers[index] = layer;
        Ok(())
    }

    /// Total number of trainable weights and biases.
    pub fn num_parameters(&self) -> usize {
        count_parameters(&self.layers)
    }

    /// Runs `inputs` (batch x input_size) through every layer.
    pub fn forward(&self, inputs: &Matrix) -> Result<Matrix> {
        let mut current = inputs.clone();
        for layer in &self.layers {
            current = layer.activate(&current)?.post_activation;
        }
        Ok(current)
    }

    /// Forward pass that keeps every layer's pre- and post-activation values.
    pub fn forward_trace(&self, inputs: &Matrix) -> Result<ForwardTrace> {
        let mut traces: Vec<LayerTrace> = Vec::with_capacity(self.layers.len());
        for layer in &self.layers {
            let trace = layer.activate(traces.last().map_or(inputs, |t| &t.post_activation))?;
            traces.push(trace);
        }
        Ok(ForwardTrace { inputs: inputs.clone(), layers: traces })
    }

    /// Mean over samples of the summed squared error.
    ///
    /// A NaN result is returned as-is; deciding whether it ends training is
    /// up to the caller.
    pub fn cost(&self, inputs_batch: &[Matrix], outputs_batch: &[Matrix]) -> Result<f64> {
        if inputs_batch.is_empty() {
            return Err(NnError::invalid("cost needs at least one sample"));
        }
        if inputs_batch.len() != outputs_batch.len() {
            return Err(NnError::invalid(format!(
                "{} inputs but {} expected outputs",
                inputs_batch.len(),
                outputs_batch.len()
            )));
        }

        let mut total = 0.0;
        for (inputs, expected) in inputs_batch.iter().zip(outputs_batch) {
            total += MseLoss::loss(&self.forward(inputs)?, expected)?;
        }
        Ok(total / inputs_batch.len() as f64)
    }

    /// One gradient-descent step on `inputs` / `expected_outputs`.
    ///
    /// Gradients of each layer are applied as soon as they are computed,
    /// walking from the output layer back to the first. The error handed to
    /// layer `i` is projected through layer `i + 1`'s weights after that
    /// layer has already been updated in this sweep.
    pub fn backprop(&mut self, inputs: &Matrix, expected_outputs: &Matrix, learning_rate: f64) -> Result<()> {
        let trace = self.forward_trace(inputs)?;
        let optimizer = Sgd::new(learning_rate);

        let mut error = MseLoss::derivative(trace.output(), expected_outputs)?;

        for i in (0..self.layers.len()).rev() {
            let delta = self.layers[i].delta(&error, &trace.layers[i])?;
            let (weights_grad, biases_grad) =
                self.layers[i].compute_gradients(&delta, trace.layer_input(i))?;

            optimizer.step(&mut self.layers[i], &weights_grad, &biases_grad)?;

            if i > 0 {
                error = delta.dot(&self.layers[i].weights.transpose())?;
            }
        }

        Ok(())
    }
}

fn count_parameters(layers: &[Layer]) -> usize {
    layers
        .iter()
        .map(|l| l.weights.values().len() + l.biases.values().len())
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activation::activation::ActivationFunction;
    use approx::assert_abs_diff_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn seeded_net(seed: u64) -> NeuralNet {
        NeuralNet::with_rng(
            2,
            &[
                LayerSpec::new(3, ActivationFunction::Tanh),
                LayerSpec::new(2, ActivationFunction::Sigmoid),
            ],
            &mut StdRng::seed_from_u64(seed),
        )
        .unwrap()
    }

    fn row(values: &[f64]) -> Matrix {
        Matrix::row_vector(values.to_vec()).unwrap()
    }

    #[test]
    fn construction_wires_widths() {
        let net = seeded_net(0);
        assert_eq!(net.neurons(), &[2, 3, 2]);
        assert_eq!(net.input_size(), 2);
        assert_eq!(net.output_size(), 2);
        assert_eq!(net.layers()[0].weights.shape(), (2, 3));
        assert_eq!(net.layers()[1].weights.shape(), (3, 2));
        assert_eq!(net.num_parameters(), 2 * 3 + 3 + 3 * 2 + 2);
    }

    #[test]
    fn construction_rejects_bad_arguments() {
        let tanh = [LayerSpec::new(1, ActivationFunction::Tanh)];
        assert!(matches!(NeuralNet::new(0, &tanh), Err(NnError::InvalidArgument(_))));
        assert!(matches!(NeuralNet::new(2, &[]), Err(NnError::InvalidArgument(_))));
        assert!(NeuralNet::new(2, &[LayerSpec::new(0, ActivationFunction::Tanh)]).is_err());
    }

    #[test]
    fn from_layers_checks_chain() {
        let a = Layer::from_parameters(Matrix::zeros(2, 3).unwrap(), Matrix::zeros(1, 3).unwrap(), ActivationFunction::Identity).unwrap();
        let b = Layer::from_parameters(Matrix::zeros(4, 1).unwrap(), Matrix::zeros(1, 1).unwrap(), ActivationFunction::Identity).unwrap();
        assert!(matches!(NeuralNet::from_layers(2, vec![a.clone(), b]), Err(NnError::ShapeMismatch { .. })));
        assert!(matches!(NeuralNet::from_layers(5, vec![a]), Err(NnError::ShapeMismatch { .. })));
    }

    #[test]
    fn same_seed_same_network() {
        let x = row(&[0.3, -0.7]);
        assert_eq!(seeded_net(11).forward(&x).unwrap(), seeded_net(11).forward(&x).unwrap());
    }

    #[test]
    fn forward_matches_trace_output() {
        let net = seeded_net(1);
        let x = Matrix::new(3, 2, vec![0.0, 1.0, 1.0, 0.0, 0.5, 0.5]).unwrap();
        let out = net.forward(&x).unwrap();
        let trace = net.forward_trace(&x).unwrap();
        assert_eq!(out.shape(), (3, 2));
        assert_eq!(trace.output(), &out);
        assert_eq!(trace.layers.len(), 2);
        assert_eq!(trace.layer_input(0), &x);
        assert_eq!(trace.layer_input(1), &trace.layers[0].post_activation);
    }

    #[test]
    fn forward_rejects_wrong_width() {
        let err = seeded_net(0).forward(&row(&[1.0, 2.0, 3.0])).unwrap_err();
        assert!(matches!(err, NnError::ShapeMismatch { op: "dot", .. }));
    }

    #[test]
    fn cost_is_zero_on_exact_predictions() {
        // Zero weights and identity activation: output == biases.
        let layer = Layer::from_parameters(
            Matrix::zeros(2, 2).unwrap(),
            row(&[0.25, -1.5]),
            ActivationFunction::Identity,
        )
        .unwrap();
        let net = NeuralNet::from_layers(2, vec![layer]).unwrap();
        let xs = [row(&[0.0, 1.0]), row(&[3.0, -2.0])];
        let ys = [row(&[0.25, -1.5]), row(&[0.25, -1.5])];
        assert_eq!(net.cost(&xs, &ys).unwrap(), 0.0);

        let off = [row(&[1.25, -1.5]), row(&[0.25, 0.5])];
        // (1² + 2²) / 2 samples
        assert_abs_diff_eq!(net.cost(&xs, &off).unwrap(), 2.5);
    }

    #[test]
    fn cost_is_non_negative() {
        let net = seeded_net(5);
        let mut rng = StdRng::seed_from_u64(99);
        for _ in 0..20 {
            let xs = [Matrix::random(1, 2, &mut rng).unwrap()];
            let ys = [Matrix::random(1, 2, &mut rng).unwrap()];
            assert!(net.cost(&xs, &ys).unwrap() >= 0.0);
        }
    }

    #[test]
    fn cost_rejects_empty_or_unpaired_batches() {
        let net = seeded_net(0);
        assert!(matches!(net.cost(&[], &[]), Err(NnError::InvalidArgument(_))));
        assert!(matches!(
            net.cost(&[row(&[0.0, 0.0])], &[]),
            Err(NnError::InvalidArgument(_))
        ));
    }

    #[test]
    fn backprop_decreases_cost_for_small_step() {
        let mut net = seeded_net(3);
        let x = [row(&[0.5, -0.3])];
        let y = [row(&[0.9, 0.1])];
        let before = net.cost(&x, &y).unwrap();
        net.backprop(&x[0], &y[0], 0.01).unwrap();
        let after = net.cost(&x, &y).unwrap();
        assert!(after < before, "cost went from {before} to {after}");
    }

    fn assert_values(m: &Matrix, expected: &[f64]) {
        assert_eq!(m.values().len(), expected.len());
        for (a, b) in m.values().iter().zip(expected) {
            assert_abs_diff_eq!(a, b, epsilon = 1e-12);
        }
    }

    #[test]
    fn backprop_projects_error_through_updated_weights() {
        let hidden = Layer::from_parameters(
            Matrix::new(2, 2, vec![0.5, -0.3, 0.8, 0.1]).unwrap(),
            Matrix::zeros(1, 2).unwrap(),
            ActivationFunction::Identity,
        )
        .unwrap();
        let output = Layer::from_parameters(
            Matrix::new(2, 1, vec![0.7, -0.6]).unwrap(),
            Matrix::zeros(1, 1).unwrap(),
            ActivationFunction::Identity,
        )
        .unwrap();
        let mut net = NeuralNet::from_layers(2, vec![hidden, output]).unwrap();

        net.backprop(&row(&[1.0, 2.0]), &row(&[3.0]), 0.2).unwrap();

        // a0 = [2.1, -0.1], out = 1.53, delta1 = -1.47
        // W1' = W1 - 0.2 * a0ᵀ·delta1 = [1.3174, -0.6294]
        assert_values(&net.layers[1].weights, &[1.3174, -0.6294]);
        assert_values(&net.layers[1].biases, &[0.294]);

        // delta0 = delta1 · W1'ᵀ = [-1.936578, 0.925218]
        assert_values(&net.layers[0].weights, &[0.8873156, -0.4850436, 1.5746312, -0.2700872]);
        assert_values(&net.layers[0].biases, &[0.3873156, -0.1850436]);
    }

    #[test]
    fn set_layer_keeps_width_chain() {
        let mut net = seeded_net(6);
        let replacement = Layer::from_parameters(
            Matrix::filled(3, 2, 0.5).unwrap(),
            Matrix::zeros(1, 2).unwrap(),
            ActivationFunction::Identity,
        )
        .unwrap();
        net.set_layer(1, replacement.clone()).unwrap();
        assert_eq!(net.layers()[1].weights, replacement.weights);

        let too_wide = Layer::from_parameters(
            Matrix::zeros(3, 4).unwrap(),
            Matrix::zeros(1, 4).unwrap(),
            ActivationFunction::Identity,
        )
        .unwrap();
        let before = net.clone();
        assert!(matches!(net.set_layer(1, too_wide.clone()), Err(NnError::ShapeMismatch { op: "set_layer", .. })));
        assert!(matches!(net.set_layer(2, too_wide), Err(NnError::InvalidArgument(_))));
        assert_eq!(net.layers()[1].weights, before.layers()[1].weights);
        assert_eq!(net.neurons(), &[2, 3, 2]);
        net.backprop(&row(&[0.1, 0.2]), &row(&[0.0, 1.0]), 0.1).unwrap();
    }

    #[test]
    fn backprop_leaves_network_intact_on_shape_error() {
        let mut net = seeded_net(2);
        let before = net.clone();
        let err = net.backprop(&row(&[0.1, 0.2]), &row(&[1.0]), 0.1).unwrap_err();
        assert!(matches!(err, NnError::ShapeMismatch { op: "loss", .. }));
        assert_eq!(net.layers[0].weights, before.layers[0].weights);
    }

    #[test]
    fn mini_batch_backprop_keeps_bias_shape() {
        let mut net = seeded_net(4);
        let x = Matrix::new(2, 2, vec![0.0, 1.0, 1.0, 0.0]).unwrap();
        let y = Matrix::new(2, 2, vec![1.0, 0.0, 0.0, 1.0]).unwrap();
        net.backprop(&x, &y, 0.1).unwrap();
        for layer in net.layers() {
            assert_eq!(layer.biases.rows(), 1);
        }
    }
}
