//! Resumable creation orchestrator for ledgerflow.
//!
//! Drives a resource-creation workflow made of dependent, signed ledger
//! operations. Each step may fail or be interrupted between broadcast and
//! confirmation, so the orchestrator plans steps from params, executes each
//! pending step once, and resumes from on-ledger state after a halt.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       Orchestrator                          │
//! │  - run(RunRequest, cancel) → RunOutcome                     │
//! │  - single-flight per resource / per fresh run               │
//! │  - reports progress to a ProgressSink                       │
//! └─────────────────────────────────────────────────────────────┘
//!              │                               │
//!              ▼                               ▼
//! ┌───────────────────────────┐   ┌─────────────────────────────┐
//! │  PlanBuilder              │   │  StateProbeAdapter          │
//! │  - params → WorkflowPlan  │   │  - probe(token) → completed │
//! └───────────────────────────┘   └─────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       StepExecutor                          │
//! │  - build → sign+submit → await finality                     │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use ledgerflow_orchestrator::{Collaborators, Orchestrator, RunOutcome, RunRequest};
//! use tokio_util::sync::CancellationToken;
//!
//! let orchestrator = Orchestrator::new(Collaborators::shared(ledger), config)?;
//!
//! match orchestrator.run(RunRequest::Fresh(params.clone()), CancellationToken::new()).await? {
//!     RunOutcome::Completed(summary) => println!("created {}", summary.resource_address),
//!     RunOutcome::Halted(halted) => {
//!         // Later, once the user is ready to retry:
//!         let token = halted.resume_token.expect("resource was created");
//!         orchestrator.run(RunRequest::Resume(params, token), CancellationToken::new()).await?;
//!     }
//! }
//! ```

mod error;
mod events;
mod executor;
mod flight;
mod orchestrator;
mod probe;
mod request;
mod state;

pub use error::{OrchestratorError, StepError};
pub use events::{ChannelSink, NoopSink, ProgressReport, ProgressSink, RunPhase, TracingSink};
pub use executor::{ExecuteError, StageCallback, StepExecutor, StepOutcome};
pub use flight::{FlightGuard, FlightKey, SingleFlight};
pub use orchestrator::{Collaborators, Orchestrator};
pub use probe::{ProbedState, StateProbeAdapter};
pub use request::{HaltedRun, ResumeToken, RunOutcome, RunRequest, RunSummary};
pub use state::RunState;
