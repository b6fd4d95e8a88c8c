use ferrite_mlp::{
    ActivationFunction, LayerSpec, Matrix, NetworkSpec, NeuralNet, TrainConfig, TrainOutcome,
    train_until,
};
use tracing_subscriber::EnvFilter;

// XOR demo. Pass a NetworkSpec JSON path to train a different 2-in/1-out
// topology on the same data:
//   cargo run -- my_spec.json
fn main() -> ferrite_mlp::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let spec = match std::env::args().nth(1) {
        Some(path) => NetworkSpec::load_json(&path)?,
        None => NetworkSpec::new("xor", 2, vec![
            LayerSpec::new(4, ActivationFunction::Tanh),
            LayerSpec::new(2, ActivationFunction::Tanh),
            LayerSpec::new(1, ActivationFunction::Tanh),
        ]),
    };

    let mut network = NeuralNet::from_spec(&spec, &mut rand::thread_rng())?;

    let inputs = vec![
        Matrix::row_vector(vec![0.0, 0.0])?,
        Matrix::row_vector(vec![0.0, 1.0])?,
        Matrix::row_vector(vec![1.0, 0.0])?,
        Matrix::row_vector(vec![1.0, 1.0])?,
    ];
    let expected_outputs = vec![
        Matrix::row_vector(vec![0.0])?,
        Matrix::row_vector(vec![1.0])?,
        Matrix::row_vector(vec![1.0])?,
        Matrix::row_vector(vec![0.0])?,
    ];

    let outcome = train_until(&mut network, &inputs, &expected_outputs, &TrainConfig::default())?;

    match outcome {
        TrainOutcome::Diverged { epoch } => println!("epoch: {epoch}, cost: NaN"),
        other => println!("epoch: {}, cost: {}", other.epoch(), other.cost()),
    }

    for input in &inputs {
        println!("{:?} -> {:?}", input.values(), network.forward(input)?.values());
    }

    Ok(())
}
