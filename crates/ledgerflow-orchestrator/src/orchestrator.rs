//! Orchestrator implementation.

use std::sync::Arc;
use std::time::Duration;

use ledgerflow_config::{CreationParams, OrchestratorConfig};
use ledgerflow_ledger::{SignerSubmitter, StateProber, TransactionBuilder};
use ledgerflow_plan::{PlanBuilder, Signature, StepKind, StepStatus, WorkflowPlan};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::error::OrchestratorError;
use crate::events::{NoopSink, ProgressSink, RunPhase};
use crate::executor::{ExecuteError, StepExecutor};
use crate::flight::{FlightGuard, FlightKey, SingleFlight};
use crate::probe::StateProbeAdapter;
use crate::request::{HaltedRun, RunOutcome, RunRequest, RunSummary};
use crate::state::RunState;

/// The external capabilities a run consumes.
#[derive(Clone)]
pub struct Collaborators {
  pub builder: Arc<dyn TransactionBuilder>,
  pub submitter: Arc<dyn SignerSubmitter>,
  pub prober: Arc<dyn StateProber>,
}

impl Collaborators {
  /// Use one value for all three capabilities.
  pub fn shared<L>(ledger: Arc<L>) -> Self
  where
    L: TransactionBuilder + SignerSubmitter + StateProber + 'static,
  {
    Self {
      builder: ledger.clone(),
      submitter: ledger.clone(),
      prober: ledger,
    }
  }
}

/// Drives creation runs.
///
/// Generic over `S: ProgressSink` the way callers choose how to observe
/// progress. Use `Orchestrator::new()` to discard reports, or
/// `Orchestrator::with_sink()` to receive them.
///
/// `run` is re-entrant: after a `Halted` outcome, call it again with a
/// [`RunRequest::Resume`] to continue from the first unconfirmed step.
pub struct Orchestrator<S: ProgressSink = NoopSink> {
  planner: PlanBuilder,
  prober: StateProbeAdapter,
  executor: StepExecutor,
  flights: SingleFlight,
  config: OrchestratorConfig,
  sink: S,
}

impl Orchestrator<NoopSink> {
  /// Create an orchestrator that discards progress reports.
  pub fn new(
    collaborators: Collaborators,
    config: OrchestratorConfig,
  ) -> Result<Self, OrchestratorError> {
    Self::with_sink(collaborators, config, NoopSink)
  }
}

impl<S: ProgressSink> Orchestrator<S> {
  /// Create an orchestrator with a custom progress sink.
  pub fn with_sink(
    collaborators: Collaborators,
    config: OrchestratorConfig,
    sink: S,
  ) -> Result<Self, OrchestratorError> {
    config.validate()?;
    let confirm_timeout = config.confirm_timeout_ms.map(Duration::from_millis);

    Ok(Self {
      planner: PlanBuilder::new(),
      prober: StateProbeAdapter::new(collaborators.prober),
      executor: StepExecutor::new(
        collaborators.builder,
        collaborators.submitter,
        confirm_timeout,
      ),
      flights: SingleFlight::new(),
      config,
      sink,
    })
  }

  pub fn config(&self) -> &OrchestratorConfig {
    &self.config
  }

  pub fn sink(&self) -> &S {
    &self.sink
  }

  /// The plan a run with `params` would follow.
  pub fn preview(&self, params: &CreationParams) -> Result<WorkflowPlan, OrchestratorError> {
    Ok(self.planner.build(params)?)
  }

  /// Run (or resume) a creation workflow.
  ///
  /// Returns `Completed` or `Halted` for runs that got as far as executing.
  /// Planning, probe, concurrency, context and cancellation failures are
  /// returned as errors and attempt no further steps.
  #[instrument(name = "creation_run", skip_all, fields(mode = request.mode()))]
  pub async fn run(
    &self,
    request: RunRequest,
    cancel: CancellationToken,
  ) -> Result<RunOutcome, OrchestratorError> {
    let mut guards = vec![
      self
        .flights
        .acquire(request.flight_key(), self.config.concurrency)
        .await?,
    ];

    info!(
      mode = request.mode(),
      kind = ?request.params().kind,
      name = %request.params().name,
      "run_started"
    );

    let mut state = self.prepare(&request).await?;
    let fresh = matches!(request, RunRequest::Fresh(_));

    let result = self
      .execute_plan(&mut state, request.params(), fresh, &mut guards, &cancel)
      .await;

    match &result {
      Ok(RunOutcome::Completed(summary)) => {
        info!(
          resource_id = %summary.resource_id,
          steps_executed = summary.steps_executed(),
          "run_completed"
        );
      }
      Ok(RunOutcome::Halted(halted)) => {
        warn!(
          failed_index = halted.failed_index,
          step = %halted.failed_step,
          error = %halted.error,
          "run_halted"
        );
      }
      Err(e) => {
        warn!(error = %e, "run_aborted");
      }
    }

    result
  }

  /// Build the plan and, when resuming, merge in on-ledger completion.
  async fn prepare(&self, request: &RunRequest) -> Result<RunState, OrchestratorError> {
    let plan = self.planner.build(request.params())?;

    match request {
      RunRequest::Fresh(_) => Ok(RunState::fresh(plan)),
      RunRequest::Resume(_, token) => {
        plan.verify_shape(&token.steps)?;
        let probed = self.prober.probe(token, &plan).await?;
        debug!(
          resource_id = %probed.snapshot.resource_id,
          completed = ?probed.completed,
          "resuming from probed state"
        );
        Ok(RunState::resumed(plan, &probed.completed, probed.context))
      }
    }
  }

  /// Execute every pending step in order, stopping at the first failure.
  async fn execute_plan(
    &self,
    state: &mut RunState,
    params: &CreationParams,
    fresh: bool,
    guards: &mut Vec<FlightGuard>,
    cancel: &CancellationToken,
  ) -> Result<RunOutcome, OrchestratorError> {
    state.phase = RunPhase::Executing;
    self.sink.report(state.report());
    if state.all_confirmed() {
      debug!("every step already confirmed");
    }

    let mut signatures = Vec::new();
    let steps = state.plan.steps.clone();

    for step in steps {
      let index = step.index;
      if state.statuses[index] == StepStatus::Confirmed {
        debug!(index, step = %step.kind, "step already confirmed, skipping");
        continue;
      }

      if cancel.is_cancelled() {
        warn!(index, "run cancelled before step");
        return Err(OrchestratorError::Cancelled {
          resume_token: state.resume_token(),
        });
      }

      if let Some(field) = state.context.missing_for(step.kind) {
        return Err(OrchestratorError::MissingContext {
          step: step.kind,
          field,
        });
      }

      state.current_index = Some(index);
      let context = state.context.clone();
      info!(index, step = %step.kind, label = step.label(), "step_started");

      let result = {
        let sink = &self.sink;
        let mut on_stage = |status: StepStatus, signature: Option<&Signature>| {
          if let Some(signature) = signature {
            state.record_signature(signature);
          }
          if state.advance(index, status) {
            sink.report(state.report());
          }
        };
        self
          .executor
          .execute(&step, params, &context, &mut on_stage, cancel)
          .await
      };

      match result {
        Ok(outcome) => {
          state.advance(index, StepStatus::Confirmed);
          state.context.merge(outcome.produced);

          if let Some(field) = state.context.missing_after(step.kind) {
            return Err(OrchestratorError::MissingContext {
              step: step.kind,
              field,
            });
          }

          // Claim the new resource before anyone can learn its id, so a
          // resume for it cannot run alongside this run.
          if fresh
            && step.kind == StepKind::CreateResource
            && let Some(resource_id) = state.context.resource_id
          {
            guards.push(self.flights.try_acquire(FlightKey::Resource(resource_id))?);
          }

          info!(
            index,
            step = %step.kind,
            signature = %outcome.signature,
            "step_confirmed"
          );
          signatures.push((index, outcome.signature));
          self.sink.report(state.report());
        }
        Err(ExecuteError::Step(error)) => {
          state.advance(index, StepStatus::Failed);
          state.phase = RunPhase::Halted;
          self.sink.report(state.report());

          return Ok(RunOutcome::Halted(HaltedRun {
            failed_index: index,
            failed_step: step.kind,
            statuses: state.statuses.clone(),
            context: state.context.clone(),
            resume_token: state.resume_token_after(error.produced()),
            error,
          }));
        }
        Err(ExecuteError::Cancelled {
          signature,
          produced,
        }) => {
          warn!(
            index,
            signature = ?signature.as_ref().map(|s| s.0.as_str()),
            "run cancelled during step"
          );
          let pending = signature.is_some().then_some(&produced);
          return Err(OrchestratorError::Cancelled {
            resume_token: state.resume_token_after(pending),
          });
        }
      }
    }

    let resource_id = state
      .context
      .resource_id
      .ok_or(OrchestratorError::MissingContext {
        step: StepKind::CreateResource,
        field: "resource_id",
      })?;
    let resource_address =
      state
        .context
        .resource_address
        .clone()
        .ok_or(OrchestratorError::MissingContext {
          step: StepKind::CreateResource,
          field: "resource_address",
        })?;

    state.current_index = None;
    state.phase = RunPhase::Completed;
    self.sink.report(state.report());

    Ok(RunOutcome::Completed(RunSummary {
      resource_id,
      resource_address,
      statuses: state.statuses.clone(),
      signatures,
    }))
  }
}
