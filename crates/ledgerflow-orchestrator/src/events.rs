//! Progress reports and sinks.
//!
//! A report is emitted after every status transition so callers can render
//! progress and capture the resume token as soon as the resource exists.

use ledgerflow_plan::{Address, ResourceId, Signature, StepKind, StepStatus};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::info;

use crate::request::ResumeToken;

/// Orchestrator state machine phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
  NotStarted,
  Planning,
  Executing,
  Completed,
  Halted,
}

/// Snapshot of a run's progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressReport {
  pub phase: RunPhase,
  pub plan_length: usize,
  pub current_index: Option<usize>,
  pub steps: Vec<StepKind>,
  pub statuses: Vec<StepStatus>,
  pub resource_id: Option<ResourceId>,
  pub resource_address: Option<Address>,
  pub first_signature: Option<Signature>,
}

impl ProgressReport {
  /// Token for resuming from this point, once the resource exists.
  pub fn resume_token(&self) -> Option<ResumeToken> {
    let resource_id = self.resource_id?;
    let resource_address = self.resource_address.clone()?;
    Some(ResumeToken::new(resource_id, resource_address).pinned(self.steps.clone()))
  }
}

/// Receives progress reports during a run.
///
/// Reports are purely observational; the orchestrator never reads anything
/// back from the sink.
pub trait ProgressSink: Send + Sync {
  fn report(&self, report: ProgressReport);
}

/// A sink that discards all reports.
#[derive(Debug, Clone, Default)]
pub struct NoopSink;

impl ProgressSink for NoopSink {
  fn report(&self, _report: ProgressReport) {}
}

/// A sink that forwards reports to an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
  // Unbounded so a slow consumer never stalls a step. Volume is a handful of
  // reports per step.
  sender: mpsc::UnboundedSender<ProgressReport>,
}

impl ChannelSink {
  pub fn new(sender: mpsc::UnboundedSender<ProgressReport>) -> Self {
    Self { sender }
  }

  /// Create a sink together with its receiving end.
  pub fn channel() -> (Self, mpsc::UnboundedReceiver<ProgressReport>) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (Self { sender }, receiver)
  }
}

impl ProgressSink for ChannelSink {
  fn report(&self, report: ProgressReport) {
    // Receiver may have been dropped
    let _ = self.sender.send(report);
  }
}

/// A sink that logs each report as a structured event.
#[derive(Debug, Clone, Default)]
pub struct TracingSink;

impl ProgressSink for TracingSink {
  fn report(&self, report: ProgressReport) {
    let statuses: Vec<String> = report.statuses.iter().map(|s| s.to_string()).collect();
    info!(
      phase = ?report.phase,
      current_index = ?report.current_index,
      statuses = ?statuses,
      resource_id = ?report.resource_id.map(|id| id.0),
      "progress"
    );
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn report(resource_id: Option<ResourceId>) -> ProgressReport {
    ProgressReport {
      phase: RunPhase::Executing,
      plan_length: 2,
      current_index: Some(1),
      steps: vec![StepKind::CreateResource, StepKind::CreateSubResource],
      statuses: vec![StepStatus::Confirmed, StepStatus::Signing],
      resource_id,
      resource_address: resource_id.map(|id| Address::new(format!("res-{}", id))),
      first_signature: None,
    }
  }

  #[test]
  fn test_resume_token_requires_resource() {
    assert!(report(None).resume_token().is_none());
  }

  #[test]
  fn test_resume_token_pins_plan_shape() {
    let token = report(Some(ResourceId(3))).resume_token().unwrap();
    assert_eq!(token.resource_id, ResourceId(3));
    assert_eq!(token.steps.len(), 2);
  }

  #[tokio::test]
  async fn test_channel_sink_forwards_reports() {
    let (sink, mut receiver) = ChannelSink::channel();
    sink.report(report(None));
    assert_eq!(receiver.recv().await.unwrap().plan_length, 2);
  }

  #[test]
  fn test_channel_sink_ignores_dropped_receiver() {
    let (sink, receiver) = ChannelSink::channel();
    drop(receiver);
    sink.report(report(None));
  }
}
