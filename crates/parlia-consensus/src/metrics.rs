//! # Consensus Metrics
//!
//! Prometheus metrics for monitoring header import and block production.
//!
//! ## Usage
//!
//! Enable with the `metrics` feature:
//! ```toml
//! parlia-consensus = { path = "...", features = ["metrics"] }
//! ```
//!
//! ## Metrics Exported
//!
//! - `parlia_headers_verified_total` - Headers accepted by the verifier
//! - `parlia_headers_rejected_total` - Headers rejected, labeled by error kind
//! - `parlia_entropy_fallbacks_total` - Pre-fork wiggles that fell back to the fixed backoff
//! - `parlia_snapshot_cache_hits_total` / `parlia_snapshot_cache_misses_total`
//! - `parlia_blocks_sealed_total` / `parlia_blocks_abandoned_total`

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
use prometheus::{register_int_counter, register_int_counter_vec, IntCounter, IntCounterVec};

#[cfg(feature = "metrics")]
lazy_static! {
    pub static ref HEADERS_VERIFIED: IntCounter = register_int_counter!(
        "parlia_headers_verified_total",
        "Total number of headers accepted by the verifier"
    )
    .expect("Failed to create HEADERS_VERIFIED metric");

    /// Rejected headers, labeled by error kind
    pub static ref HEADERS_REJECTED: IntCounterVec = register_int_counter_vec!(
        "parlia_headers_rejected_total",
        "Total number of headers rejected",
        &["kind"]
    )
    .expect("Failed to create HEADERS_REJECTED metric");

    pub static ref ENTROPY_FALLBACKS: IntCounter = register_int_counter!(
        "parlia_entropy_fallbacks_total",
        "Pre-fork backoffs computed without random jitter"
    )
    .expect("Failed to create ENTROPY_FALLBACKS metric");

    pub static ref SNAPSHOT_CACHE_HITS: IntCounter = register_int_counter!(
        "parlia_snapshot_cache_hits_total",
        "Snapshot lookups served from cache"
    )
    .expect("Failed to create SNAPSHOT_CACHE_HITS metric");

    pub static ref SNAPSHOT_CACHE_MISSES: IntCounter = register_int_counter!(
        "parlia_snapshot_cache_misses_total",
        "Snapshot lookups not found in cache"
    )
    .expect("Failed to create SNAPSHOT_CACHE_MISSES metric");

    pub static ref BLOCKS_SEALED: IntCounter = register_int_counter!(
        "parlia_blocks_sealed_total",
        "Blocks sealed and broadcast by the local validator"
    )
    .expect("Failed to create BLOCKS_SEALED metric");

    pub static ref BLOCKS_ABANDONED: IntCounter = register_int_counter!(
        "parlia_blocks_abandoned_total",
        "Sealing attempts abandoned because a new head arrived"
    )
    .expect("Failed to create BLOCKS_ABANDONED metric");
}

#[cfg(feature = "metrics")]
pub fn record_header_verified() {
    HEADERS_VERIFIED.inc();
}

#[cfg(feature = "metrics")]
pub fn record_header_rejected(kind: &str) {
    HEADERS_REJECTED.with_label_values(&[kind]).inc();
}

#[cfg(feature = "metrics")]
pub fn record_entropy_fallback() {
    ENTROPY_FALLBACKS.inc();
}

#[cfg(feature = "metrics")]
pub fn record_snapshot_cache_hit() {
    SNAPSHOT_CACHE_HITS.inc();
}

#[cfg(feature = "metrics")]
pub fn record_snapshot_cache_miss() {
    SNAPSHOT_CACHE_MISSES.inc();
}

#[cfg(feature = "metrics")]
pub fn record_block_sealed() {
    BLOCKS_SEALED.inc();
}

#[cfg(feature = "metrics")]
pub fn record_block_abandoned() {
    BLOCKS_ABANDONED.inc();
}

// No-op implementations when metrics feature is disabled
#[cfg(not(feature = "metrics"))]
pub fn record_header_verified() {}

#[cfg(not(feature = "metrics"))]
pub fn record_header_rejected(_kind: &str) {}

#[cfg(not(feature = "metrics"))]
pub fn record_entropy_fallback() {}

#[cfg(not(feature = "metrics"))]
pub fn record_snapshot_cache_hit() {}

#[cfg(not(feature = "metrics"))]
pub fn record_snapshot_cache_miss() {}

#[cfg(not(feature = "metrics"))]
pub fn record_block_sealed() {}

#[cfg(not(feature = "metrics"))]
pub fn record_block_abandoned() {}
