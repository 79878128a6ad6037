mod ledger_file;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use ledger_file::LedgerFile;
use ledgerflow_config::{CreationParams, OrchestratorConfig};
use ledgerflow_ledger::{Fault, MemoryLedger, StateProber};
use ledgerflow_orchestrator::{
  Collaborators, Orchestrator, OrchestratorError, ResumeToken, RunOutcome, RunRequest, TracingSink,
};
use ledgerflow_plan::{ResourceId, StepKind};

/// Ledgerflow - resumable multi-step resource creation
#[derive(Parser)]
#[command(name = "ledgerflow")]
#[command(version, about, long_about = None)]
struct Cli {
  /// Path to the data directory (default: ~/.ledgerflow)
  #[arg(long, global = true)]
  data_dir: Option<PathBuf>,

  /// Path to an orchestrator config file (JSON)
  #[arg(long, global = true)]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Create a new resource
  Run {
    /// Path to the creation params file (JSON)
    params_file: PathBuf,

    /// Inject a fault into the simulated ledger, e.g. `fund:broadcast_failed`
    #[arg(long = "fail", value_parser = parse_fault)]
    faults: Vec<(StepKind, Fault)>,
  },

  /// Resume a halted run
  Resume {
    /// Path to the creation params file (JSON)
    params_file: PathBuf,

    /// Path to the resume token printed by a halted run (JSON)
    token_file: PathBuf,

    /// Inject a fault into the simulated ledger, e.g. `fund:broadcast_failed`
    #[arg(long = "fail", value_parser = parse_fault)]
    faults: Vec<(StepKind, Fault)>,
  },

  /// Print the on-ledger state of a resource
  Inspect {
    /// The resource id to probe
    resource_id: u64,
  },
}

fn main() -> Result<()> {
  let cli = Cli::parse();

  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
    .with_writer(std::io::stderr)
    .init();

  let data_dir = match cli.data_dir {
    Some(dir) => dir,
    None => dirs::home_dir()
      .context("could not determine home directory")?
      .join(".ledgerflow"),
  };

  let rt = tokio::runtime::Runtime::new()?;

  match cli.command {
    Some(Commands::Run {
      params_file,
      faults,
    }) => rt.block_on(async {
      let config = load_config(cli.config.as_deref()).await?;
      let params = load_params(&params_file).await?;
      execute(RunRequest::Fresh(params), config, &faults, &data_dir).await
    }),
    Some(Commands::Resume {
      params_file,
      token_file,
      faults,
    }) => rt.block_on(async {
      let config = load_config(cli.config.as_deref()).await?;
      let params = load_params(&params_file).await?;
      let token = load_token(&token_file).await?;
      execute(RunRequest::Resume(params, token), config, &faults, &data_dir).await
    }),
    Some(Commands::Inspect { resource_id }) => {
      rt.block_on(async { inspect(ResourceId(resource_id), &data_dir).await })
    }
    None => {
      println!("ledgerflow - use --help to see available commands");
      Ok(())
    }
  }
}

async fn execute(
  request: RunRequest,
  config: OrchestratorConfig,
  faults: &[(StepKind, Fault)],
  data_dir: &Path,
) -> Result<()> {
  let file = LedgerFile::new(data_dir);
  let ledger = Arc::new(MemoryLedger::from_state(file.load().await?));
  for (kind, fault) in faults {
    ledger.inject(*kind, *fault);
  }

  let orchestrator = Orchestrator::with_sink(Collaborators::shared(ledger.clone()), config, TracingSink)
    .context("failed to create orchestrator")?;

  let plan = orchestrator.preview(request.params())?;
  eprintln!("Plan: {}", format_steps(&plan.shape()));

  let cancel = CancellationToken::new();
  let on_interrupt = cancel.clone();
  tokio::spawn(async move {
    if tokio::signal::ctrl_c().await.is_ok() {
      on_interrupt.cancel();
    }
  });

  let result = orchestrator.run(request, cancel).await;

  // Whatever landed stays landed, even when the run did not finish.
  file.save(&ledger.state()).await?;
  tracing::debug!(path = %file.path().display(), "ledger state saved");

  match result {
    Ok(RunOutcome::Completed(summary)) => {
      eprintln!(
        "Created resource {} at {} ({} steps executed)",
        summary.resource_id,
        summary.resource_address,
        summary.steps_executed()
      );
      println!("{}", serde_json::to_string_pretty(&summary)?);
      Ok(())
    }
    Ok(RunOutcome::Halted(halted)) => {
      eprintln!(
        "Halted at step {} ({}): {}",
        halted.failed_index, halted.failed_step, halted.error
      );
      if halted.error.was_broadcast() {
        eprintln!("The operation was broadcast and may still land; resume to re-check the ledger");
      }
      match &halted.resume_token {
        Some(token) => {
          eprintln!("Save the token below and pass it to `ledgerflow resume`");
          println!("{}", serde_json::to_string_pretty(token)?);
        }
        None if halted.error.was_broadcast() => {
          eprintln!("The operation did not declare its resource; inspect the ledger before retrying")
        }
        None => eprintln!("Nothing was created; start a new run"),
      }
      bail!("run halted at step {}", halted.failed_index)
    }
    Err(OrchestratorError::Cancelled { resume_token }) => {
      if let Some(token) = resume_token {
        println!("{}", serde_json::to_string_pretty(&token)?);
      }
      bail!("run cancelled")
    }
    Err(e) => Err(e).context("run failed"),
  }
}

async fn inspect(resource_id: ResourceId, data_dir: &Path) -> Result<()> {
  let ledger = MemoryLedger::from_state(LedgerFile::new(data_dir).load().await?);
  let snapshot = ledger
    .probe(resource_id)
    .await
    .with_context(|| format!("failed to probe resource {}", resource_id))?;

  println!("{}", serde_json::to_string_pretty(&snapshot)?);
  Ok(())
}

async fn load_config(path: Option<&Path>) -> Result<OrchestratorConfig> {
  let Some(path) = path else {
    return Ok(OrchestratorConfig::default());
  };
  let content = tokio::fs::read_to_string(path)
    .await
    .with_context(|| format!("failed to read config file: {}", path.display()))?;
  OrchestratorConfig::from_json(&content)
    .with_context(|| format!("invalid config file: {}", path.display()))
}

async fn load_params(path: &Path) -> Result<CreationParams> {
  let content = tokio::fs::read_to_string(path)
    .await
    .with_context(|| format!("failed to read params file: {}", path.display()))?;
  CreationParams::from_json(&content)
    .with_context(|| format!("invalid params file: {}", path.display()))
}

async fn load_token(path: &Path) -> Result<ResumeToken> {
  let content = tokio::fs::read_to_string(path)
    .await
    .with_context(|| format!("failed to read token file: {}", path.display()))?;
  serde_json::from_str(&content)
    .with_context(|| format!("failed to parse token file: {}", path.display()))
}

/// Parse `<step>:<fault>`, both in snake_case.
fn parse_fault(input: &str) -> Result<(StepKind, Fault), String> {
  let (step, fault) = input
    .split_once(':')
    .ok_or_else(|| format!("expected <step>:<fault>, got '{}'", input))?;
  let step: StepKind = serde_json::from_value(serde_json::Value::String(step.to_string()))
    .map_err(|_| format!("unknown step '{}'", step))?;
  let fault: Fault = serde_json::from_value(serde_json::Value::String(fault.to_string()))
    .map_err(|_| format!("unknown fault '{}'", fault))?;
  Ok((step, fault))
}

fn format_steps(steps: &[StepKind]) -> String {
  steps
    .iter()
    .map(|s| s.to_string())
    .collect::<Vec<_>>()
    .join(" -> ")
}
