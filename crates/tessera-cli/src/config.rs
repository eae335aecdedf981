//! Job configuration: optional TOML job files merged with command-line flags.
//!
//! ```toml
//! [input]
//! file = "matrix.csr"
//! seed = 42
//!
//! [run]
//! replication = 2
//! exponent = 3
//! ranks = 8
//! variant = "inner-abc"   # or "col-a"
//! engine = "cpu"          # or "naive"
//!
//! [output]
//! verbose = true
//! ge = 0.5
//! report = "report.json"
//! ```
//!
//! Relative paths in a job file are resolved against the file's directory.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Args;
use serde::Deserialize;

use tessera_compute::EngineType;
use tessera_core::{FinalMode, RunParams, Variant};

/// Flags of the `run` subcommand. Each one overrides the job file.
#[derive(Debug, Default, Args)]
pub struct RunArgs {
    /// Sparse matrix file in CSR text format.
    #[arg(short = 'f', long = "file")]
    pub file: Option<PathBuf>,
    /// Seed for the dense matrix generator (> 0).
    #[arg(short = 's', long)]
    pub seed: Option<u32>,
    /// Replication group size c.
    #[arg(short = 'c', long = "replication")]
    pub replication: Option<usize>,
    /// Exponent k in A^k * B.
    #[arg(short = 'e', long = "exponent")]
    pub exponent: Option<usize>,
    /// Print the number of result entries >= this value.
    #[arg(short = 'g', long = "ge")]
    pub ge: Option<f64>,
    /// Print the result matrix.
    #[arg(short = 'v', long)]
    pub verbose: bool,
    /// Use the InnerABC variant (replicate A, B and C).
    #[arg(short = 'i', long = "inner")]
    pub inner: bool,
    /// Use the parallel multiply engine.
    #[arg(short = 'm', long = "parallel")]
    pub parallel: bool,
    /// Number of ranks.
    #[arg(short = 'p', long = "ranks")]
    pub ranks: Option<usize>,
    /// Worker threads for the parallel engine.
    #[arg(long)]
    pub threads: Option<usize>,
    /// Write a JSON run report to this path.
    #[arg(long)]
    pub report: Option<PathBuf>,
}

/// Top-level job file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobConfig {
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub run: RunConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InputConfig {
    pub file: Option<PathBuf>,
    pub seed: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    #[serde(default = "default_one")]
    pub replication: usize,
    pub exponent: Option<usize>,
    #[serde(default = "default_one")]
    pub ranks: usize,
    #[serde(default)]
    pub variant: Variant,
    /// Multiply engine: "naive" or "cpu". Default: "naive".
    #[serde(default = "default_engine")]
    pub engine: String,
    pub threads: Option<usize>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            replication: 1,
            exponent: None,
            ranks: 1,
            variant: Variant::default(),
            engine: default_engine(),
            threads: None,
        }
    }
}

fn default_one() -> usize {
    1
}
fn default_engine() -> String {
    "naive".into()
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    #[serde(default)]
    pub verbose: bool,
    pub ge: Option<f64>,
    pub report: Option<PathBuf>,
}

/// A fully resolved and validated job.
#[derive(Debug, Clone)]
pub struct Job {
    pub file: PathBuf,
    pub ranks: usize,
    pub params: RunParams,
    pub engine: EngineType,
    pub threads: Option<usize>,
    pub report: Option<PathBuf>,
}

impl Job {
    /// Merge flags over the job file and validate the result.
    pub fn resolve(config: JobConfig, args: RunArgs) -> Result<Self> {
        let Some(file) = args.file.or(config.input.file) else {
            bail!("-f (sparse matrix file) is required");
        };

        let seed = args.seed.or(config.input.seed).unwrap_or(0);
        if seed == 0 {
            bail!("-s (dense matrix seed) is required and must be > 0");
        }
        let replication = args.replication.unwrap_or(config.run.replication);
        if replication == 0 {
            bail!("-c (replication group size) must be > 0");
        }
        let power = args.exponent.or(config.run.exponent).unwrap_or(0);
        if power == 0 {
            bail!("-e (exponent) is required and must be > 0");
        }
        let ranks = args.ranks.unwrap_or(config.run.ranks);
        if ranks == 0 {
            bail!("-p (rank count) must be > 0");
        }

        let variant = if args.inner {
            Variant::InnerAbc
        } else {
            config.run.variant
        };
        let engine = if args.parallel {
            EngineType::Cpu
        } else {
            config
                .run
                .engine
                .parse()
                .context("Invalid engine in job file")?
        };
        let final_mode = FinalMode::select(
            args.ge.or(config.output.ge),
            args.verbose || config.output.verbose,
        );

        Ok(Self {
            file,
            ranks,
            params: RunParams {
                seed,
                replication,
                power,
                variant,
                final_mode,
            },
            engine,
            threads: args.threads.or(config.run.threads),
            report: args.report.or(config.output.report),
        })
    }
}

/// Load and parse a TOML job file.
pub fn load_config(path: &Path) -> Result<JobConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Cannot read job file {}", path.display()))?;
    let mut config: JobConfig = toml::from_str(&content)
        .with_context(|| format!("Invalid job file {}", path.display()))?;

    let base = path.parent().unwrap_or_else(|| Path::new(""));
    for relative in [&mut config.input.file, &mut config.output.report]
        .into_iter()
        .flatten()
    {
        if relative.is_relative() {
            *relative = base.join(&*relative);
        }
    }
    Ok(config)
}
