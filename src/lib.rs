pub mod error;
pub mod math;
pub mod activation;
pub mod layers;
pub mod network;
pub mod loss;
pub mod optim;
pub mod train;

// Convenience re-exports
pub use error::{NnError, Result};
pub use math::{Initializer, Matrix};
pub use activation::activation::ActivationFunction;
pub use layers::dense::{Layer, LayerTrace};
pub use network::network::{ForwardTrace, NeuralNet};
pub use network::spec::{LayerSpec, NetworkSpec};
pub use loss::mse::MseLoss;
pub use optim::sgd::Sgd;
pub use train::{train_epoch, train_until, EpochStats, TrainConfig, TrainOutcome};
