//! # Tessera Comm
//!
//! Message passing between the ranks of a Tessera run. This crate provides
//! a [`ProcessGroup`] abstraction that isolates the algorithm from how ranks
//! are launched and wired together.
//!
//! ## Model
//!
//! Every operation is a synchronous rendezvous: a send completes only once
//! the peer has posted the matching receive. Messages between an ordered pair
//! of ranks arrive in send order and carry a [`PhaseTag`]; a receive that
//! finds a message from another phase fails instead of misinterpreting it.
//! There are no timeouts and no retries. Any transport failure is fatal.
//!
//! ## Transports
//!
//! | Transport | Type | Status |
//! |-----------|------|--------|
//! | Thread per rank | [`LocalCluster`] | Implemented |

pub mod cluster;
pub mod group;
pub mod message;

pub use cluster::LocalCluster;
pub use group::ProcessGroup;
pub use message::{Header, Message, Payload, PayloadKind, PhaseTag};

use thiserror::Error;

/// Errors originating from the messaging layer. All of them are fatal to a run.
#[derive(Debug, Error)]
pub enum CommError {
    #[error("Rank {peer} disconnected during {tag}")]
    Disconnected { peer: usize, tag: PhaseTag },

    #[error("Expected a {expected} message from rank {peer}, got {found}")]
    PhaseMismatch {
        peer: usize,
        expected: PhaseTag,
        found: PhaseTag,
    },

    #[error("Expected a {expected:?} payload from rank {peer}, got {found:?}")]
    UnexpectedPayload {
        peer: usize,
        expected: PayloadKind,
        found: PayloadKind,
    },

    #[error("Payload from rank {peer} does not match its header")]
    FrameMismatch { peer: usize },

    #[error("Run aborted by rank {peer}: {reason}")]
    Aborted { peer: usize, reason: String },

    #[error("Rank {rank} is outside a group of size {size}")]
    InvalidRank { rank: usize, size: usize },

    #[error("Rank {0} cannot message itself")]
    SelfMessage(usize),

    #[error("Broadcast root {0} supplied no value")]
    MissingBroadcastValue(usize),

    #[error("Rank {0} panicked")]
    RankPanicked(usize),

    #[error("A cluster needs at least one rank")]
    EmptyCluster,

    #[error("Failed to spawn rank thread: {0}")]
    Spawn(#[from] std::io::Error),
}
