//! Ledgerflow Config
//!
//! This crate contains the serializable configuration types for ledgerflow.
//! They describe *what* a caller wants created and *how* the orchestrator
//! should behave, before any plan is built.
//!
//! Configuration can be loaded from:
//! - JSON files (via CLI with `--config=orchestrator.json`)
//! - Caller-constructed values when ledgerflow is embedded as a library
//!
//! The plan builder turns [`CreationParams`] into an ordered list of steps,
//! and the orchestrator reads [`OrchestratorConfig`] for its concurrency and
//! confirmation policy.

mod error;
mod orchestrator;
mod params;

pub use error::ConfigError;
pub use orchestrator::{ConcurrencyPolicy, DEFAULT_FINALITY_WINDOW_MS, OrchestratorConfig};
pub use params::{CreationParams, ResourceKind};
