//! Domain layer for the Parlia consensus core
//!
//! - fork: hard-fork activation rules
//! - validator / snapshot: validator set and signing history per chain position
//! - turn: in-turn rotation and difficulty sentinels
//! - backoff: production delays and minimum block times
//! - verifier: staged header validation

mod backoff;
mod error;
mod fork;
mod snapshot;
mod turn;
mod validator;
mod verifier;

pub use backoff::*;
pub use error::*;
pub use fork::*;
pub use snapshot::*;
pub use turn::*;
pub use validator::*;
pub use verifier::*;
