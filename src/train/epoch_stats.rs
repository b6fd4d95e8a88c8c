use serde::{Serialize, Deserialize};

/// Per-epoch statistics emitted by `train_until`.
///
/// When a `progress_tx` channel is configured in `TrainConfig`, the loop
/// sends one `EpochStats` value after every completed epoch, which is enough
/// to drive a live cost-over-time chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochStats {
    /// 1-based epoch number.
    pub epoch: usize,
    /// Cost measured at the start of this epoch, before its updates.
    pub cost: f64,
    /// Wall-clock duration of the epoch's updates in milliseconds.
    pub elapsed_ms: u64,
}
