// src/error.rs
use std::{path::PathBuf, process::ExitStatus};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EpicError {
  #[error("IO Error: {0}")]
  Io(#[from] std::io::Error),

  #[error("JSON Error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("Could not parse '{path}': {source}")]
  DocumentParse {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },

  #[error("'{path}' has version {version}, which this build does not understand (supported: {supported:?})")]
  UnsupportedVersion {
    path: PathBuf,
    version: u64,
    supported: &'static [u32],
  },

  #[error("No '{0}' found, please initialize a project first.")]
  MissingDocument(&'static str),

  #[error("package.json manifest not found in '{0}'")]
  ManifestNotFound(PathBuf),

  #[error("Unknown command '{0}' in transaction log")]
  UnknownCommand(String),

  #[error("Invalid parameters for '{command}': {source}")]
  InvalidParams {
    command: String,
    #[source]
    source: serde_json::Error,
  },

  #[error("Invalid name '{name}': {reason}")]
  InvalidName { name: String, reason: String },

  #[error("Template error: {0}")]
  Render(String),

  #[error("Error walking directory '{path}': {source}")]
  WalkDirError {
    path: PathBuf,
    #[source]
    source: walkdir::Error,
  },

  #[error("Command Execution Error for step '{step_name}': {source}")]
  CommandExecError {
    step_name: String,
    #[source]
    source: Box<dyn std::error::Error + Send + Sync>,
  },

  #[error("Command for step '{step_name}' failed with status {status}. Stderr: {stderr}")]
  CommandFailedStatus {
    step_name: String,
    status: ExitStatus,
    stderr: String,
  },

  #[error("Step '{step}' failed: {source}")]
  Step {
    step: String,
    #[source]
    source: Box<EpicError>,
  },

  #[error("User interaction failed: {0}")]
  DialoguerError(#[from] dialoguer::Error),
}

impl EpicError {
  pub fn command_exec_error<E>(step_name: &str, error: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    EpicError::CommandExecError {
      step_name: step_name.to_string(),
      source: Box::new(error),
    }
  }

  /// Wraps an error with the title of the step it escaped from.
  pub fn in_step(self, step: &str) -> Self {
    EpicError::Step {
      step: step.to_string(),
      source: Box::new(self),
    }
  }

  /// The innermost error, looking through step wrappers.
  pub fn root(&self) -> &EpicError {
    match self {
      EpicError::Step { source, .. } => source.root(),
      other => other,
    }
  }
}
