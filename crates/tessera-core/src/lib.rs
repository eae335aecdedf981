//! # Tessera Core
//!
//! Distributed computation of `C = Aᵏ · B` for a sparse square `A` and a
//! dense, generated `B`, over `P` ranks with replication factor `c`.
//!
//! ## Architecture
//!
//! Ranks are arranged in `P / c` first groups of `c` consecutive ranks. A is
//! cut into `P` column fragments and every first group replicates the union
//! of its members' fragments. Fragments then travel around rings of ranks
//! that share the same offset inside their first group, meeting each dense
//! block held along the ring. Both variants implement the
//! [`algorithm::Replication`] trait:
//!
//! - [`algorithm::ColA`] keeps one dense column block per rank.
//! - [`algorithm::InnerAbc`] additionally replicates dense blocks across
//!   skewed second groups, so each rank only walks `P / c²` ring steps.
//!
//! ## Modules
//!
//! - [`types`]: run parameters, final modes and results.
//! - [`layout`]: group arithmetic for a `(P, c)` arrangement.
//! - [`algorithm`]: phase operations and the [`algorithm::run`] driver.

pub mod algorithm;
pub mod layout;
pub mod types;

pub use algorithm::{run, AlgorithmError};
pub use layout::GroupLayout;
pub use types::{Completion, FinalMode, Outcome, PhaseTimings, RunParams, Variant};
