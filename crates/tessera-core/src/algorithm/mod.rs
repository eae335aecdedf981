//! Phase operations of the replicated multiplication and the run driver.
//!
//! A run moves through `Init → Replicate → Compute × k → Final → Done`. The
//! variants differ in how they replicate and finalise; the shared building
//! blocks (scatter, turn-taking replication, ring rotation and the two-level
//! gather) live here.
//!
//! Every rank calls the same sequence of collectives with the same groups,
//! so the control flow below must not depend on rank-local data except
//! where a group root acts alone.

pub mod col_a;
pub mod inner_abc;

pub use col_a::ColA;
pub use inner_abc::InnerAbc;

use std::fmt;
use std::mem;
use std::time::Instant;

use tessera_comm::{CommError, PhaseTag, ProcessGroup};
use tessera_compute::{ComputeError, LocalMultiplyEngine};
use tessera_matrix::partition::{self, SplitAxis};
use tessera_matrix::{DenseBlock, SparseMatrix};
use thiserror::Error;

use crate::layout::GroupLayout;
use crate::types::{Completion, FinalMode, Outcome, PhaseTimings, RunParams, Variant};

/// Errors that end a run.
#[derive(Debug, Error)]
pub enum AlgorithmError {
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Cannot load input matrix: {0}")]
    Input(String),

    #[error("Communication failed: {0}")]
    Comm(#[from] CommError),

    #[error("Local multiply failed: {0}")]
    Compute(#[from] ComputeError),
}

/// Data owned by one rank during a run.
#[derive(Debug)]
pub struct AlgorithmState {
    /// Problem dimension.
    pub n: usize,
    /// Dimension of the dense operands, a multiple of `c`.
    pub padded_n: usize,
    pub power: usize,
    /// Resident sparse fragment.
    pub a: SparseMatrix,
    /// Dense input block.
    pub b: DenseBlock,
    /// Dense output block.
    pub c: DenseBlock,
}

impl AlgorithmState {
    /// Start the next power round: the previous output becomes the input.
    pub fn swap_roles(&mut self) {
        mem::swap(&mut self.b, &mut self.c);
        self.c.fill_zero();
    }
}

/// The four phase operations of a replication scheme.
pub trait Replication {
    fn layout(&self) -> &GroupLayout;

    /// Load and distribute A, then generate this rank's dense blocks.
    ///
    /// `loader` runs on the root only. If it fails every other rank is
    /// released with an abort notice.
    fn initialize<L, E>(
        &self,
        world: &ProcessGroup,
        params: &RunParams,
        loader: L,
    ) -> Result<AlgorithmState, AlgorithmError>
    where
        L: FnOnce() -> Result<SparseMatrix, E>,
        E: fmt::Display,
    {
        let layout = self.layout();
        let a_full = if world.is_root() {
            match loader() {
                Ok(matrix) => Some(matrix),
                Err(e) => {
                    let reason = e.to_string();
                    world.abort(&reason, PhaseTag::Setup)?;
                    return Err(AlgorithmError::Input(reason));
                }
            }
        } else {
            None
        };

        let n = world.broadcast(a_full.as_ref().map(SparseMatrix::dim), 0, PhaseTag::Setup)?;
        let a = scatter(world, a_full, n)?;

        let padded_n = layout.padded_dim(n);
        let range = partition::block_range(padded_n, world.size(), layout.dense_part(world.rank()));
        let b = DenseBlock::generate(padded_n, n, range.start, range.len(), params.seed);
        let c = DenseBlock::zeros(padded_n, n, range.start, range.len());

        log::debug!(
            "Rank {} holds {} nonzeros and dense columns {:?}",
            world.rank(),
            a.nnz(),
            b.column_range()
        );

        Ok(AlgorithmState {
            n,
            padded_n,
            power: params.power,
            a,
            b,
            c,
        })
    }

    /// Build the replicated operands inside the replication groups.
    fn replicate(
        &self,
        world: &ProcessGroup,
        state: &mut AlgorithmState,
    ) -> Result<(), AlgorithmError>;

    /// Run every power round.
    fn compute(
        &self,
        world: &ProcessGroup,
        state: &mut AlgorithmState,
        engine: &dyn LocalMultiplyEngine,
    ) -> Result<(), AlgorithmError>;

    /// Deliver the result at the root according to `mode`.
    fn finalize(
        &self,
        world: &ProcessGroup,
        state: AlgorithmState,
        mode: FinalMode,
    ) -> Result<Option<Outcome>, AlgorithmError>;
}

/// Compute `Aᵏ · B` on every rank of `world`.
///
/// All ranks must call this with the same parameters. The configuration is
/// checked before any message is exchanged.
pub fn run<L, E>(
    world: &ProcessGroup,
    params: &RunParams,
    engine: &dyn LocalMultiplyEngine,
    loader: L,
) -> Result<Completion, AlgorithmError>
where
    L: FnOnce() -> Result<SparseMatrix, E>,
    E: fmt::Display,
{
    let layout = GroupLayout::new(world.size(), params.replication, params.variant)?;
    if params.power == 0 {
        return Err(AlgorithmError::Configuration(
            "exponent must be positive".into(),
        ));
    }

    match params.variant {
        Variant::ColA => drive(&ColA::new(layout), world, params, engine, loader),
        Variant::InnerAbc => drive(&InnerAbc::new(layout), world, params, engine, loader),
    }
}

fn drive<R, L, E>(
    algorithm: &R,
    world: &ProcessGroup,
    params: &RunParams,
    engine: &dyn LocalMultiplyEngine,
    loader: L,
) -> Result<Completion, AlgorithmError>
where
    R: Replication,
    L: FnOnce() -> Result<SparseMatrix, E>,
    E: fmt::Display,
{
    let mut timings = PhaseTimings::default();
    let root = world.is_root();

    let started = Instant::now();
    let mut state = algorithm.initialize(world, params, loader)?;
    timings.init_ms = elapsed_ms(started);
    if root {
        log::info!(
            "Initialised {} run: n={}, P={}, c={}",
            params.variant,
            state.n,
            world.size(),
            params.replication
        );
    }

    let started = Instant::now();
    algorithm.replicate(world, &mut state)?;
    timings.replicate_ms = elapsed_ms(started);
    if root {
        log::info!("Replication complete");
    }

    let started = Instant::now();
    algorithm.compute(world, &mut state, engine)?;
    timings.compute_ms = elapsed_ms(started);
    if root {
        log::info!("Computed {} power round(s)", state.power);
    }

    let started = Instant::now();
    let outcome = algorithm.finalize(world, state, params.final_mode)?;
    timings.finalize_ms = elapsed_ms(started);

    Ok(Completion { outcome, timings })
}

fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1e3
}

/// Split A by column block at the root and hand fragment `i` to rank `i`.
fn scatter(
    world: &ProcessGroup,
    matrix: Option<SparseMatrix>,
    n: usize,
) -> Result<SparseMatrix, CommError> {
    let Some(matrix) = matrix else {
        return world.receive(0, PhaseTag::Scatter);
    };

    let mut own = SparseMatrix::empty(n);
    for (rank, fragment) in partition::split(&matrix, world.size(), SplitAxis::Columns)
        .into_iter()
        .enumerate()
    {
        if rank == world.rank() {
            own = fragment;
        } else {
            world.send(fragment, rank, PhaseTag::Scatter)?;
        }
    }
    Ok(own)
}

/// Give every member the union of all members' sparse fragments.
///
/// Members broadcast their own fragment in rank order; what is received is
/// merged into the local copy.
fn replicate_sparse(group: &ProcessGroup, own: SparseMatrix) -> Result<SparseMatrix, CommError> {
    if group.size() == 1 {
        return Ok(own);
    }

    let mut merged = own.clone();
    for root in 0..group.size() {
        let value = (group.rank() == root).then(|| own.clone());
        let fragment = group.broadcast_framed(value, root, PhaseTag::ReplicateA)?;
        if root != group.rank() {
            merged = SparseMatrix::merge(&merged, &fragment);
        }
    }
    Ok(merged)
}

/// Give every member the concatenation of all members' dense blocks.
fn replicate_dense(group: &ProcessGroup, own: DenseBlock) -> Result<DenseBlock, CommError> {
    if group.size() == 1 {
        return Ok(own);
    }

    let mut own = Some(own);
    let mut blocks = Vec::with_capacity(group.size());
    for root in 0..group.size() {
        let value = if group.rank() == root { own.take() } else { None };
        blocks.push(group.broadcast_framed(value, root, PhaseTag::ReplicateB)?);
    }
    Ok(DenseBlock::merge(blocks).expect("replication group is never empty"))
}

/// Move the resident fragment one hop along the ring.
///
/// Even positions send before receiving and odd positions the reverse, so
/// blocking transfers cannot form a cycle.
fn rotate(ring: &ProcessGroup, fragment: &mut SparseMatrix) -> Result<(), CommError> {
    let size = ring.size();
    if size == 1 {
        return Ok(());
    }

    let next = (ring.rank() + 1) % size;
    let prev = (ring.rank() + size - 1) % size;
    if ring.rank() % 2 == 0 {
        ring.send(mem::take(fragment), next, PhaseTag::Rotate)?;
        *fragment = ring.receive(prev, PhaseTag::Rotate)?;
    } else {
        let incoming = ring.receive(prev, PhaseTag::Rotate)?;
        ring.send(mem::replace(fragment, incoming), next, PhaseTag::Rotate)?;
    }
    Ok(())
}

/// Multiply-accumulate then rotate, `steps` times.
fn systolic_steps(
    ring: &ProcessGroup,
    state: &mut AlgorithmState,
    engine: &dyn LocalMultiplyEngine,
    steps: usize,
) -> Result<(), AlgorithmError> {
    for _ in 0..steps {
        engine.multiply_accumulate(&state.a, &state.b, &mut state.c)?;
        rotate(ring, &mut state.a)?;
    }
    Ok(())
}

/// Two-level gather of the result at world rank 0.
///
/// Each fragment group's root merges its members' blocks; group roots then
/// send their merged block to world rank 0, which concatenates them in
/// column order.
fn gather_result(
    world: &ProcessGroup,
    fragment_group: &ProcessGroup,
    block: DenseBlock,
) -> Result<Option<DenseBlock>, CommError> {
    let merged = fragment_group
        .gather(block, 0, PhaseTag::GatherGroup)?
        .and_then(DenseBlock::merge);
    let leaders = world.split(usize::from(!fragment_group.is_root()))?;

    let Some(merged) = merged else {
        return Ok(None);
    };
    log::debug!(
        "Group leader {} merged columns {:?}",
        world.rank(),
        merged.column_range()
    );

    Ok(leaders
        .gather(merged, 0, PhaseTag::GatherRoot)?
        .and_then(|mut blocks| {
            blocks.sort_by_key(DenseBlock::column_base);
            DenseBlock::merge(blocks)
        }))
}

/// Sum per-rank counts at world rank 0.
fn count_total(world: &ProcessGroup, count: u64) -> Result<Option<u64>, CommError> {
    Ok(world
        .gather(count, 0, PhaseTag::CountGe)?
        .map(|counts| counts.into_iter().sum()))
}
