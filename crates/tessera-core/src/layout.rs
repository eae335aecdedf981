//! Group arithmetic for a `(P, c)` arrangement of ranks.
//!
//! With `q = P / c` and `m = P / c²`, rank `r` has
//!
//! | Quantity | Value |
//! |----------|-------|
//! | first group `f` | `r / c` |
//! | offset `j` | `r % c` |
//! | second group `s` | `(f + j·m) mod q` |
//!
//! Ranks sharing `f` replicate sparse fragments. Ranks sharing `j` form a ring
//! of size `q` ordered by `f`. Ranks sharing `s` (InnerABC only) replicate
//! dense blocks: each second group holds exactly one rank per offset, all from
//! different first groups, so their `m`-step windows around the ring tile it.

use std::ops::Range;

use tessera_matrix::partition;

use crate::algorithm::AlgorithmError;
use crate::types::Variant;

/// Validated rank arrangement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupLayout {
    world_size: usize,
    replication: usize,
    variant: Variant,
}

impl GroupLayout {
    /// Check that `replication` tiles `world_size` for `variant`.
    pub fn new(
        world_size: usize,
        replication: usize,
        variant: Variant,
    ) -> Result<Self, AlgorithmError> {
        if world_size == 0 {
            return Err(AlgorithmError::Configuration(
                "at least one rank is required".into(),
            ));
        }
        if replication == 0 {
            return Err(AlgorithmError::Configuration(
                "replication factor must be positive".into(),
            ));
        }
        if world_size % replication != 0 {
            return Err(AlgorithmError::Configuration(format!(
                "replication factor {} does not divide {} ranks",
                replication, world_size
            )));
        }
        if variant == Variant::InnerAbc && world_size % (replication * replication) != 0 {
            return Err(AlgorithmError::Configuration(format!(
                "inner-abc needs c² = {} to divide {} ranks",
                replication * replication,
                world_size
            )));
        }
        Ok(Self {
            world_size,
            replication,
            variant,
        })
    }

    pub fn world_size(&self) -> usize {
        self.world_size
    }

    pub fn replication(&self) -> usize {
        self.replication
    }

    /// Number of first groups, which is also the ring length.
    pub fn ring_size(&self) -> usize {
        self.world_size / self.replication
    }

    /// Ring steps between consecutive second-group windows (`P / c²`).
    pub fn skew(&self) -> usize {
        self.ring_size() / self.replication
    }

    /// Multiply-and-rotate steps per power round.
    pub fn ring_steps(&self) -> usize {
        match self.variant {
            Variant::ColA => self.ring_size(),
            Variant::InnerAbc => self.skew(),
        }
    }

    pub fn first_group(&self, rank: usize) -> usize {
        rank / self.replication
    }

    pub fn offset(&self, rank: usize) -> usize {
        rank % self.replication
    }

    pub fn second_group(&self, rank: usize) -> usize {
        (self.first_group(rank) + self.offset(rank) * self.skew()) % self.ring_size()
    }

    /// World ranks of second group `group`, ascending.
    pub fn second_group_members(&self, group: usize) -> Vec<usize> {
        let q = self.ring_size();
        let mut members: Vec<usize> = (0..self.replication)
            .map(|j| {
                let f = (group % q + q * self.replication - (j * self.skew()) % q) % q;
                f * self.replication + j
            })
            .collect();
        members.sort_unstable();
        members
    }

    /// Index of `rank` inside its second group, ordered by world rank.
    pub fn position(&self, rank: usize) -> usize {
        let f = self.first_group(rank);
        let s = self.second_group(rank);
        let q = self.ring_size();
        (0..self.replication)
            .map(|j| (s + q - (j * self.skew()) % q) % q)
            .filter(|&other| other < f)
            .count()
    }

    /// Column part of `P` whose dense block `rank` generates.
    ///
    /// For InnerABC the parts of one second group are consecutive, in
    /// member order.
    pub fn dense_part(&self, rank: usize) -> usize {
        match self.variant {
            Variant::ColA => rank,
            Variant::InnerAbc => self.second_group(rank) * self.replication + self.position(rank),
        }
    }

    /// `n` rounded up to a multiple of `c`.
    pub fn padded_dim(&self, n: usize) -> usize {
        n.div_ceil(self.replication) * self.replication
    }

    /// Rows whose threshold count `rank` contributes.
    ///
    /// InnerABC replicas hold identical blocks and split the rows between
    /// them; ColA ranks count every row.
    pub fn count_rows(&self, rank: usize, n: usize) -> Range<usize> {
        match self.variant {
            Variant::ColA => 0..n,
            Variant::InnerAbc => partition::block_range(n, self.replication, self.position(rank)),
        }
    }
}
