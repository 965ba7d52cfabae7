#![deny(missing_docs)]

//! Chunked translation with content-filter recovery for feed digests.

/// Chat-completion client abstraction and HTTP adapter.
pub mod completion;
/// Environment-driven configuration management.
pub mod config;
/// Structured logging and tracing setup.
pub mod logging;
/// Translation activity counters.
pub mod metrics;
/// Chunking, classification, recovery, and batch translation.
pub mod translation;
