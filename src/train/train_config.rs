use std::sync::mpsc;
use std::sync::{Arc, atomic::AtomicBool};
use crate::train::epoch_stats::EpochStats;

/// Configuration for a `train_until` run.
///
/// # Fields
/// - `max_epochs`     — upper bound on full passes over the training data
/// - `learning_rate`  — fixed step size for every backprop call
/// - `cost_threshold` — training stops once the epoch cost drops below this
/// - `progress_tx`    — optional channel sender; one `EpochStats` is sent per
///                      completed epoch.  If the receiver is dropped the loop
///                      stops early.
/// - `stop_flag`      — optional atomic flag; when set to `true` from another
///                      thread the loop stops before the next epoch.
#[derive(Debug, Clone)]
pub struct TrainConfig {
    pub max_epochs: usize,
    pub learning_rate: f64,
    pub cost_threshold: f64,
    pub progress_tx: Option<mpsc::Sender<EpochStats>>,
    pub stop_flag: Option<Arc<AtomicBool>>,
}

impl TrainConfig {
    /// Creates a `TrainConfig` with no progress channel and no stop flag.
    pub fn new(max_epochs: usize, learning_rate: f64, cost_threshold: f64) -> Self {
        TrainConfig {
            max_epochs,
            learning_rate,
            cost_threshold,
            progress_tx: None,
            stop_flag: None,
        }
    }
}

impl Default for TrainConfig {
    fn default() -> Self {
        TrainConfig::new(100_000, 0.2, 1e-4)
    }
}
