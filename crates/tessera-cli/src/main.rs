//! Tessera command-line interface.
//!
//! Multiply a sparse matrix file against a generated dense matrix:
//! ```sh
//! tessera-cli run -f matrix.csr -s 42 -c 2 -e 3 -p 8 -v
//! tessera-cli run job.toml -g 0.5 --report report.json
//! tessera-cli validate -f matrix.csr
//! tessera-cli generate -s 3 -n 4
//! ```

mod config;
mod runner;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

use tessera_core::Outcome;
use tessera_matrix::DenseBlock;

#[derive(Parser)]
#[command(name = "tessera-cli")]
#[command(about = "Tessera: 1.5D replicated sparse-dense matrix multiplication")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute A^k * B across a group of ranks.
    Run {
        /// Optional TOML job file; flags override its values.
        config: Option<PathBuf>,
        #[command(flatten)]
        args: config::RunArgs,
    },
    /// Parse a sparse matrix file and print its summary.
    Validate {
        /// Sparse matrix file in CSR text format.
        #[arg(short = 'f', long = "file")]
        file: PathBuf,
    },
    /// Print the dense generator's matrix for a seed.
    Generate {
        /// Generator seed.
        #[arg(short = 's', long)]
        seed: u32,
        /// Matrix dimension.
        #[arg(short = 'n', long)]
        size: usize,
    },
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config, args } => {
            let job_config = match &config {
                Some(path) => config::load_config(path)?,
                None => config::JobConfig::default(),
            };
            let job = config::Job::resolve(job_config, args)?;
            log::info!(
                "Running {} on {} ranks (c={}, k={}, engine={})",
                job.file.display(),
                job.ranks,
                job.params.replication,
                job.params.power,
                job.engine
            );

            let output = runner::run_job(&job)?;
            match &output.outcome {
                Some(Outcome::Matrix(block)) => print!("{}", block),
                Some(Outcome::Count(count)) => println!("{}", count),
                None => {}
            }

            if let Some(path) = &job.report {
                runner::write_report(&runner::RunReport::new(&job, &output), path)?;
            }
            Ok(())
        }
        Commands::Validate { file } => {
            let matrix = tessera_matrix::parsers::csr::load_csr(&file)
                .with_context(|| format!("Invalid matrix file {}", file.display()))?;
            let max_row = (0..matrix.dim())
                .map(|r| matrix.row_len(r))
                .max()
                .unwrap_or(0);
            println!("Matrix is valid: {}", file.display());
            println!("  dimension:        {}", matrix.dim());
            println!("  nonzeros:         {}", matrix.nnz());
            println!("  max row nonzeros: {}", max_row);
            Ok(())
        }
        Commands::Generate { seed, size } => {
            print!("{}", DenseBlock::generate(size, size, 0, size, seed));
            Ok(())
        }
    }
}
