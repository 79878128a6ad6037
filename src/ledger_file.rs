//! Simulated ledger state kept in the data directory between invocations.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use ledgerflow_ledger::LedgerState;

const LEDGER_FILE: &str = "ledger.json";

pub struct LedgerFile {
  path: PathBuf,
}

impl LedgerFile {
  pub fn new(data_dir: &Path) -> Self {
    Self {
      path: data_dir.join(LEDGER_FILE),
    }
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  /// Load saved state, or an empty ledger if nothing was saved yet.
  pub async fn load(&self) -> Result<LedgerState> {
    match tokio::fs::read_to_string(&self.path).await {
      Ok(content) => serde_json::from_str(&content)
        .with_context(|| format!("failed to parse ledger state: {}", self.path.display())),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(LedgerState::default()),
      Err(e) => Err(e)
        .with_context(|| format!("failed to read ledger state: {}", self.path.display())),
    }
  }

  pub async fn save(&self, state: &LedgerState) -> Result<()> {
    if let Some(parent) = self.path.parent() {
      tokio::fs::create_dir_all(parent)
        .await
        .with_context(|| format!("failed to create data directory: {}", parent.display()))?;
    }
    let content = serde_json::to_string_pretty(state)?;
    tokio::fs::write(&self.path, content)
      .await
      .with_context(|| format!("failed to write ledger state: {}", self.path.display()))
  }
}
