//! Run parameters and result containers.

use std::fmt;

use serde::{Deserialize, Serialize};
use tessera_matrix::DenseBlock;

/// Which replication scheme a run uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Variant {
    /// Replicate sparse column groups; one dense block per rank.
    #[default]
    ColA,
    /// Also replicate dense blocks across skewed second groups. Requires
    /// `c²` to divide `P`.
    InnerAbc,
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variant::ColA => write!(f, "col-a"),
            Variant::InnerAbc => write!(f, "inner-abc"),
        }
    }
}

/// What the run produces once the product is complete.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FinalMode {
    /// Gather the full result at the root.
    Print,
    /// Count result entries `>=` the threshold.
    CountGe(f64),
    /// Produce nothing.
    Silent,
}

impl FinalMode {
    /// A threshold takes precedence over printing.
    pub fn select(threshold: Option<f64>, verbose: bool) -> Self {
        match (threshold, verbose) {
            (Some(g), _) => FinalMode::CountGe(g),
            (None, true) => FinalMode::Print,
            (None, false) => FinalMode::Silent,
        }
    }
}

/// Everything a rank needs to take part in a run, besides the matrix.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunParams {
    /// Dense generator seed.
    pub seed: u32,
    /// Replication factor `c`.
    pub replication: usize,
    /// Exponent `k` in `Aᵏ · B`.
    pub power: usize,
    pub variant: Variant,
    pub final_mode: FinalMode,
}

/// Result delivered at the root.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Matrix(DenseBlock),
    Count(u64),
}

/// Wall-clock time spent in each phase, in milliseconds.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PhaseTimings {
    pub init_ms: f64,
    pub replicate_ms: f64,
    pub compute_ms: f64,
    pub finalize_ms: f64,
}

impl PhaseTimings {
    pub fn total_ms(&self) -> f64 {
        self.init_ms + self.replicate_ms + self.compute_ms + self.finalize_ms
    }
}

/// One rank's view of a finished run.
#[derive(Debug)]
pub struct Completion {
    /// `Some` on the root unless the run was silent.
    pub outcome: Option<Outcome>,
    pub timings: PhaseTimings,
}
