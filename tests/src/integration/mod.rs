//! Cross-crate consensus scenarios

mod properties;
mod scenarios;
