//! Column-replicated A.
//!
//! Each first group of `c` ranks replicates the union of its sparse column
//! fragments. Every rank keeps one dense column block of `P` and, each round,
//! meets all `P / c` group blocks of A as they circulate the ring.
//!
//! Printing gathers C within each first group, whose members hold distinct
//! column blocks, so the group merge concatenates them.

use tessera_comm::ProcessGroup;
use tessera_compute::LocalMultiplyEngine;

use super::{
    count_total, gather_result, replicate_sparse, systolic_steps, AlgorithmError,
    AlgorithmState, Replication,
};
use crate::layout::GroupLayout;
use crate::types::{FinalMode, Outcome};

#[derive(Debug, Clone)]
pub struct ColA {
    layout: GroupLayout,
}

impl ColA {
    pub fn new(layout: GroupLayout) -> Self {
        Self { layout }
    }
}

impl Replication for ColA {
    fn layout(&self) -> &GroupLayout {
        &self.layout
    }

    fn replicate(
        &self,
        world: &ProcessGroup,
        state: &mut AlgorithmState,
    ) -> Result<(), AlgorithmError> {
        let group = world.split(self.layout.first_group(world.rank()))?;
        let own = std::mem::take(&mut state.a);
        state.a = replicate_sparse(&group, own)?;
        Ok(())
    }

    fn compute(
        &self,
        world: &ProcessGroup,
        state: &mut AlgorithmState,
        engine: &dyn LocalMultiplyEngine,
    ) -> Result<(), AlgorithmError> {
        let ring = world.split(self.layout.offset(world.rank()))?;
        for round in 0..state.power {
            if round > 0 {
                state.swap_roles();
            }
            systolic_steps(&ring, state, engine, self.layout.ring_steps())?;
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
                let group = world.split(self.layout.first_group(world.rank()))?;
                Ok(gather_result(world, &group, state.c)?.map(Outcome::Matrix))
            }
        }
    }
}
