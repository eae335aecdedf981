//! # Tessera Compute
//!
//! Local multiply engines for the Tessera workspace. The distributed
//! algorithm in `tessera-core` calls the [`LocalMultiplyEngine`] trait once per
//! systolic step and never depends on how the product is evaluated.
//!
//! ## Available engines
//!
//! | Engine | Feature flag | Status |
//! |--------|-------------|--------|
//! | Naive (sequential) | always | Implemented |
//! | CPU (Rayon) | `cpu` (default) | Implemented |

pub mod engine;
pub mod naive;

#[cfg(feature = "cpu")]
pub mod cpu;

pub use engine::{create_engine, ComputeError, EngineInfo, EngineType, LocalMultiplyEngine};
pub use naive::NaiveEngine;

#[cfg(feature = "cpu")]
pub use cpu::CpuEngine;
