use std::sync::atomic::Ordering;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::error::{NnError, Result};
use crate::math::matrix::Matrix;
use crate::network::network::NeuralNet;
use crate::train::epoch_stats::EpochStats;
use crate::train::train_config::TrainConfig;
use crate::train::trainer::train_epoch;

/// How a `train_until` run ended.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TrainOutcome {
    /// Cost dropped below the threshold at the start of `epoch`.
    Converged { epoch: usize, cost: f64 },
    /// Cost became NaN at the start of `epoch`.
    Diverged { epoch: usize },
    /// `max_epochs` epochs ran without converging.
    MaxEpochsReached { epoch: usize, cost: f64 },
    /// The stop flag was raised or the progress receiver went away.
    /// `cost` is the last measured cost, never NaN.
    Stopped { epoch: usize, cost: f64 },
}

impl TrainOutcome {
    /// Number of epochs whose updates were applied.
    pub fn epoch(&self) -> usize {
        match *self {
            TrainOutcome::Converged { epoch, .. }
            | TrainOutcome::Diverged { epoch }
            | TrainOutcome::MaxEpochsReached { epoch, .. }
            | TrainOutcome::Stopped { epoch, .. } => epoch,
        }
    }

    /// Last measured cost (NaN for `Diverged`).
    pub fn cost(&self) -> f64 {
        match *self {
            TrainOutcome::Diverged { .. } => f64::NAN,
            TrainOutcome::Converged { cost, .. }
            | TrainOutcome::MaxEpochsReached { cost, .. }
            | TrainOutcome::Stopped { cost, .. } => cost,
        }
    }

    /// Converged or Diverged: the run reached a natural end state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TrainOutcome::Converged { .. } | TrainOutcome::Diverged { .. })
    }
}

/// Trains `network` until its cost falls below `config.cost_threshold`,
/// the cost turns NaN, or `config.max_epochs` epochs have run.
///
/// Each epoch first measures the cost over the whole dataset and then
/// applies one `backprop` step per sample, in order.
///
/// # Early termination
/// The loop also stops early if:
/// - the `progress_tx` receiver has been dropped, **or**
/// - `config.stop_flag` is set to `true`.
pub fn train_until(
    network: &mut NeuralNet,
    inputs: &[Matrix],
    labels: &[Matrix],
    config: &TrainConfig,
) -> Result<TrainOutcome> {
    if config.max_epochs == 0 {
        return Err(NnError::invalid("max_epochs must be at least 1"));
    }

    for epoch in 1..=config.max_epochs {
        let cost = network.cost(inputs, labels)?;

        if cost.is_nan() {
            warn!(epoch, "cost diverged to NaN");
            return Ok(TrainOutcome::Diverged { epoch });
        }
        if cost < config.cost_threshold {
            info!(epoch, cost, "cost below threshold");
            return Ok(TrainOutcome::Converged { epoch, cost });
        }
        if stop_requested(config) {
            info!(epoch = epoch - 1, cost, "training stopped");
            return Ok(TrainOutcome::Stopped { epoch: epoch - 1, cost });
        }

        let t_start = Instant::now();
        train_epoch(network, inputs, labels, config.learning_rate)?;
        let elapsed_ms = t_start.elapsed().as_millis() as u64;

        if epoch % 1000 == 0 {
            debug!(epoch, cost, "training");
        }

        if let Some(ref tx) = config.progress_tx {
            // Receiver dropped: nobody is watching any more.
            if tx.send(EpochStats { epoch, cost, elapsed_ms }).is_err() {
                info!(epoch, cost, "progress receiver dropped, stopping");
                return Ok(TrainOutcome::Stopped { epoch, cost });
            }
        }
    }

    let cost = network.cost(inputs, labels)?;
    info!(epochs = config.max_epochs, cost, "reached epoch limit");
    Ok(TrainOutcome::MaxEpochsReached { epoch: config.max_epochs, cost })
}

fn stop_requested(config: &TrainConfig) -> bool {
    config
        .stop_flag
        .as_ref()
        .is_some_and(|flag| flag.load(Ordering::Relaxed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activation::activation::ActivationFunction;
    use crate::layers::dense::Layer;
    use crate::network::spec::LayerSpec;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::sync::atomic::AtomicBool;
    use std::sync::{mpsc, Arc};

    fn row(values: &[f64]) -> Matrix {
        Matrix::row_vector(values.to_vec()).unwrap()
    }

    fn linear_data() -> (Vec<Matrix>, Vec<Matrix>) {
        let xs = vec![row(&[0.0]), row(&[0.5]), row(&[1.0])];
        let ys = vec![row(&[0.1]), row(&[0.35]), row(&[0.6])];
        (xs, ys)
    }

    fn linear_net() -> NeuralNet {
        NeuralNet::with_rng(
            1,
            &[LayerSpec::new(1, ActivationFunction::Identity)],
            &mut StdRng::seed_from_u64(17),
        )
        .unwrap()
    }

    #[test]
    fn converges_on_a_linear_fit() {
        let (xs, ys) = linear_data();
        let mut net = linear_net();
        let outcome = train_until(&mut net, &xs, &ys, &TrainConfig::new(20_000, 0.1, 1e-8)).unwrap();
        assert!(matches!(outcome, TrainOutcome::Converged { .. }), "{outcome:?}");
        assert!(outcome.cost() < 1e-8);
        assert!(net.cost(&xs, &ys).unwrap() < 1e-8);
    }

    #[test]
    fn epoch_limit_is_reported() {
        let (xs, ys) = linear_data();
        let mut net = linear_net();
        let outcome = train_until(&mut net, &xs, &ys, &TrainConfig::new(3, 0.01, 0.0)).unwrap();
        assert!(matches!(outcome, TrainOutcome::MaxEpochsReached { epoch: 3, .. }));
        assert!(!outcome.is_terminal());
    }

    #[test]
    fn nan_cost_is_divergence_not_error() {
        let layer = Layer::from_parameters(
            Matrix::filled(1, 1, f64::NAN).unwrap(),
            Matrix::zeros(1, 1).unwrap(),
            ActivationFunction::Identity,
        )
        .unwrap();
        let mut net = NeuralNet::from_layers(1, vec![layer]).unwrap();
        let (xs, ys) = linear_data();
        let outcome = train_until(&mut net, &xs, &ys, &TrainConfig::default()).unwrap();
        assert_eq!(outcome, TrainOutcome::Diverged { epoch: 1 });
        assert!(outcome.is_terminal());
        assert!(outcome.cost().is_nan());
    }

    #[test]
    fn progress_is_streamed_per_epoch() {
        let (xs, ys) = linear_data();
        let mut net = linear_net();
        let (tx, rx) = mpsc::channel();
        let mut config = TrainConfig::new(5, 0.01, 0.0);
        config.progress_tx = Some(tx);
        train_until(&mut net, &xs, &ys, &config).unwrap();
        drop(config);

        let stats: Vec<EpochStats> = rx.iter().collect();
        assert_eq!(stats.len(), 5);
        assert_eq!(stats[0].epoch, 1);
        assert!(stats[4].cost < stats[0].cost);
    }

    #[test]
    fn dropped_receiver_stops_training() {
        let (xs, ys) = linear_data();
        let mut net = linear_net();
        let (tx, rx) = mpsc::channel();
        drop(rx);
        let mut config = TrainConfig::new(50, 0.01, 0.0);
        config.progress_tx = Some(tx);
        let outcome = train_until(&mut net, &xs, &ys, &config).unwrap();
        assert!(matches!(outcome, TrainOutcome::Stopped { epoch: 1, .. }));
    }

    #[test]
    fn stop_flag_halts_before_first_epoch() {
        let (xs, ys) = linear_data();
        let mut net = linear_net();
        let before = net.clone();
        let mut config = TrainConfig::new(50, 0.01, 0.0);
        config.stop_flag = Some(Arc::new(AtomicBool::new(true)));
        let initial = net.cost(&xs, &ys).unwrap();
        let outcome = train_until(&mut net, &xs, &ys, &config).unwrap();
        assert_eq!(outcome, TrainOutcome::Stopped { epoch: 0, cost: initial });
        assert!(!outcome.cost().is_nan());
        assert_eq!(net.layers()[0].weights, before.layers()[0].weights);
    }

    #[test]
    fn empty_dataset_is_rejected() {
        let mut net = linear_net();
        let err = train_until(&mut net, &[], &[], &TrainConfig::default()).unwrap_err();
        assert!(matches!(err, NnError::InvalidArgument(_)));
    }
}
