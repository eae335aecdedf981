//! Replicated A and replicated B/C.
//!
//! On top of the first-group replication of A, the `c` members of each second
//! group share one dense block made of their generated parts. Each member
//! walks only `P / c²` ring steps per round, starting from a different first
//! group, and the partial products are summed across the second group at the
//! end of every round so all members enter the next round with the same C.
//!
//! Printing gathers C within each second group, whose members hold identical
//! replicas, so the group merge is a same-range merge.

use tessera_comm::{PhaseTag, ProcessGroup};
use tessera_compute::LocalMultiplyEngine;
use tessera_matrix::DenseBlock;

use super::{
    count_total, gather_result, replicate_dense, replicate_sparse, systolic_steps,
    AlgorithmError, AlgorithmState, Replication,
};
use crate::layout::GroupLayout;
use crate::types::{FinalMode, Outcome};

#[derive(Debug, Clone)]
pub struct InnerAbc {
    layout: GroupLayout,
}

impl InnerAbc {
    pub fn new(layout: GroupLayout) -> Self {
        Self { layout }
    }

    fn second_group(&self, world: &ProcessGroup) -> Result<ProcessGroup, AlgorithmError> {
        let group = world.split(self.layout.second_group(world.rank()))?;
        debug_assert_eq!(group.rank(), self.layout.position(world.rank()));
        Ok(group)
    }
}

/// Sum `block` across `group` and give every member the total.
fn all_reduce(group: &ProcessGroup, block: &mut DenseBlock) -> Result<(), AlgorithmError> {
    if group.size() == 1 {
        return Ok(());
    }

    let partial = std::mem::take(block);
    let total = group
        .gather(partial, 0, PhaseTag::ReduceC)?
        .and_then(|blocks| {
            blocks.into_iter().reduce(|mut sum, other| {
                sum.add_block(&other);
                sum
            })
        });
    *block = group.broadcast(total, 0, PhaseTag::ReduceC)?;
    Ok(())
}

impl Replication for InnerAbc {
    fn layout(&self) -> &GroupLayout {
        &self.layout
    }

    fn replicate(
        &self,
        world: &ProcessGroup,
        state: &mut AlgorithmState,
    ) -> Result<(), AlgorithmError> {
        let first = world.split(self.layout.first_group(world.rank()))?;
        let own = std::mem::take(&mut state.a);
        state.a = replicate_sparse(&first, own)?;

        let second = self.second_group(world)?;
        let own = std::mem::take(&mut state.b);
        state.b = replicate_dense(&second, own)?;
        state.c = DenseBlock::zeros(
            state.padded_n,
            state.n,
            state.b.column_base(),
            state.b.column_count(),
        );

        log::debug!(
            "Rank {} shares dense columns {:?} with {:?}",
            world.rank(),
            state.b.column_range(),
            second.members()
        );
        Ok(())
    }

    fn compute(
        &self,
        world: &ProcessGroup,
        state: &mut AlgorithmState,
        engine: &dyn LocalMultiplyEngine,
    ) -> Result<(), AlgorithmError> {
        let ring = world.split(self.layout.offset(world.rank()))?;
        let second = self.second_group(world)?;
        for round in 0..state.power {
            if round > 0 {
                state.swap_roles();
            }
            systolic_steps(&ring, state, engine, self.layout.ring_steps())?;
            all_reduce(&second, &mut state.c)?;
        }
        Ok(())
    }

    fn finalize(
        &self,
        world: &ProcessGroup,
        state: AlgorithmState,
        mode: FinalMode,
    ) -> Result<Option<Outcome>, AlgorithmError> {
        match mode {
            FinalMode::Silent => Ok(None),
            FinalMode::CountGe(threshold) => {
                let rows = self.layout.count_rows(world.rank(), state.n);
                let count = state.c.count_at_least(threshold, rows);
                Ok(count_total(world, count)?.map(Outcome::Count))
            }
            FinalMode::Print => {
                let second = self.second_group(world)?;
                Ok(gather_result(world, &second, state.c)?.map(Outcome::Matrix))
            }
        }
    }
}
