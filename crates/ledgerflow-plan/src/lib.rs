//! Ledgerflow Plan
//!
//! This crate provides the planned representation of a creation run.
//! A plan is an ordered list of [`StepDescriptor`]s derived from
//! [`CreationParams`](ledgerflow_config::CreationParams) alone, so the same
//! params always yield the same plan shape.
//!
//! Each step carries a pure completion predicate evaluated against a
//! [`ResourceSnapshot`], the on-ledger view of the resource. On resume the
//! orchestrator uses these predicates to decide which steps are already done.

mod context;
mod error;
mod ids;
mod plan;
mod snapshot;
mod step;

pub use context::{Produced, RunContext};
pub use error::PlanError;
pub use ids::{Address, ResourceId, Signature};
pub use plan::{PlanBuilder, WorkflowPlan};
pub use snapshot::ResourceSnapshot;
pub use step::{StepDescriptor, StepKind, StepStatus};
