//! Adapters layer (Hexagonal Architecture)
//!
//! Concrete implementations of the outbound ports.

mod broadcast;
mod ecdsa;
mod entropy;
mod extra_codec;
mod header_store;
mod snapshot_cache;

pub use broadcast::*;
pub use ecdsa::*;
pub use entropy::*;
pub use extra_codec::*;
pub use header_store::*;
pub use snapshot_cache::*;
