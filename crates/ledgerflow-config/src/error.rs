use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to parse configuration: {0}")]
  Parse(#[from] serde_json::Error),

  #[error(
    "confirm timeout of {timeout_ms}ms is shorter than the finality window of {finality_window_ms}ms"
  )]
  TimeoutBelowFinality {
    timeout_ms: u64,
    finality_window_ms: u64,
  },

  #[error("resource name must not be empty")]
  EmptyName,
}
