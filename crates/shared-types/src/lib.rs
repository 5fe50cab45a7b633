//! # Shared Types Crate
//!
//! Chain primitives shared between the consensus core, its adapters and the
//! workspace test suite.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: header layout and hashing live here so every
//!   crate computes identical seal hashes.
//! - **Consensus Subset Only**: the header carries just the fields the
//!   validator-rotation rules read.

pub mod entities;

pub use entities::*;
