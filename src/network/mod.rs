pub mod network;
pub mod spec;

pub use network::{ForwardTrace, NeuralNet};
pub use spec::{LayerSpec, NetworkSpec};
