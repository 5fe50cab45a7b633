//! # Parlia Consensus Test Suite
//!
//! ## Structure
//!
//! ```text
//! tests/
//! ├── src/integration/
//! │   ├── scenarios.rs   # End-to-end rotation, backoff and epoch scenarios
//! │   └── properties.rs  # Property tests over the scheduling rules
//! └── benches/
//!     └── consensus_benchmarks.rs
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p parlia-tests
//! cargo test -p parlia-tests integration::scenarios::
//! cargo bench -p parlia-tests
//! ```

pub mod integration;

/// Install a test subscriber honoring `RUST_LOG`. Safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}
