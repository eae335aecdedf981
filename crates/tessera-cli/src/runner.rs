//! Run driver: launches the ranks and collects the root's outcome.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

use tessera_comm::{CommError, LocalCluster};
use tessera_compute::create_engine;
use tessera_core::{AlgorithmError, Outcome, PhaseTimings, RunParams};
use tessera_matrix::parsers::csr::load_csr;

use crate::config::Job;

/// Results from a run.
pub struct RunOutput {
    pub outcome: Option<Outcome>,
    /// Per-rank phase timings, in rank order.
    pub timings: Vec<PhaseTimings>,
}

/// Launch `job.ranks` ranks and run the job on each.
pub fn run_job(job: &Job) -> Result<RunOutput> {
    let engine = create_engine(job.engine, job.threads).context("Cannot create multiply engine")?;
    log::info!("Engine: {}", engine.engine_info().name);

    let cluster = LocalCluster::new(job.ranks)?;
    let results = cluster.run(|world| {
        tessera_core::run(&world, &job.params, engine.as_ref(), || {
            load_csr(&job.file).map_err(|e| format!("{}: {}", job.file.display(), e))
        })
    })?;

    let mut completions = Vec::with_capacity(results.len());
    let mut failures = Vec::new();
    for (rank, result) in results.into_iter().enumerate() {
        match result {
            Ok(completion) => completions.push(completion),
            Err(e) => failures.push((rank, e)),
        }
    }
    if let Some((rank, error)) = root_cause(failures) {
        return Err(anyhow::Error::new(error).context(format!("Rank {} failed", rank)));
    }

    let mut outcome = None;
    let mut timings = Vec::with_capacity(completions.len());
    for completion in completions {
        outcome = outcome.or(completion.outcome);
        timings.push(completion.timings);
    }
    Ok(RunOutput { outcome, timings })
}

/// Pick the failure that caused the others.
///
/// A failing rank releases its peers with aborts or disconnects, so those
/// are reported only when nothing else went wrong.
fn root_cause(failures: Vec<(usize, AlgorithmError)>) -> Option<(usize, AlgorithmError)> {
    let is_consequence = |e: &AlgorithmError| {
        matches!(
            e,
            AlgorithmError::Comm(CommError::Aborted { .. } | CommError::Disconnected { .. })
        )
    };
    let mut first = None;
    for (rank, error) in failures {
        if !is_consequence(&error) {
            return Some((rank, error));
        }
        first.get_or_insert((rank, error));
    }
    first
}

/// JSON summary of a run.
#[derive(Debug, Serialize)]
pub struct RunReport {
    pub file: PathBuf,
    pub ranks: usize,
    pub engine: String,
    pub params: RunParams,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimension: Option<usize>,
    pub timings: Vec<PhaseTimings>,
}

impl RunReport {
    pub fn new(job: &Job, output: &RunOutput) -> Self {
        let (count, dimension) = match &output.outcome {
            Some(Outcome::Count(count)) => (Some(*count), None),
            Some(Outcome::Matrix(block)) => (None, Some(block.original_dim())),
            None => (None, None),
        };
        Self {
            file: job.file.clone(),
            ranks: job.ranks,
            engine: job.engine.to_string(),
            params: job.params.clone(),
            count,
            dimension,
            timings: output.timings.clone(),
        }
    }
}

/// Write a run report as pretty-printed JSON.
pub fn write_report(report: &RunReport, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(report)
        .map_err(|e| anyhow::anyhow!("JSON serialisation error: {}", e))?;
    std::fs::write(path, json)
        .with_context(|| format!("Cannot write report {}", path.display()))?;

    log::info!("Report written to: {}", path.display());
    Ok(())
}
