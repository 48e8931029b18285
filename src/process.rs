// src/process.rs
use std::io::ErrorKind;
use std::path::Path;
use std::process::Output;
use std::time::Duration;

use duct::cmd;
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, error, info, trace, warn};

use crate::error::EpicError;

/// Runs external programs (git, package managers). Blocks until the program exits.
pub trait CommandRunner {
  /// Runs `program args..` in `dir`. A non-zero exit is an error.
  fn run(&self, step_name: &str, program: &str, args: &[&str], dir: &Path)
    -> Result<Output, EpicError>;

  /// Whether `program` can be started at all.
  fn is_available(&self, program: &str) -> bool;
}

/// Spawns real processes through duct.
#[derive(Debug, Default)]
pub struct DuctRunner;

impl CommandRunner for DuctRunner {
  fn run(
    &self,
    step_name: &str,
    program: &str,
    args: &[&str],
    dir: &Path,
  ) -> Result<Output, EpicError> {
    let command_line = format!("{} {}", program, args.join(" "));
    info!(
      "Executing: Step '{}', Command: `{}` in {}",
      step_name,
      command_line,
      dir.display()
    );

    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
      spinner.set_style(style);
    }
    spinner.set_message(format!("Running `{}`...", command_line));
    spinner.enable_steady_tick(Duration::from_millis(100));

    // unchecked() so a non-zero exit still returns the captured Output
    let result = cmd(program, args)
      .dir(dir)
      .stdout_capture()
      .stderr_capture()
      .unchecked()
      .run();
    spinner.finish_and_clear();

    let output = match result {
      Ok(output) => output,
      Err(e) => {
        error!("Failed to start command for step '{}': {}", step_name, e);
        if e.kind() == ErrorKind::NotFound {
          return Err(EpicError::CommandExecError {
            step_name: step_name.to_string(),
            source: format!("Command not found: {}", program).into(),
          });
        }
        return Err(EpicError::command_exec_error(step_name, e));
      }
    };

    if log::log_enabled!(log::Level::Trace) {
      trace!(
        "Step '{}' stdout:\n{}",
        step_name,
        String::from_utf8_lossy(&output.stdout)
      );
      trace!(
        "Step '{}' stderr:\n{}",
        step_name,
        String::from_utf8_lossy(&output.stderr)
      );
    }

    if !output.status.success() {
      let stderr_string = String::from_utf8_lossy(&output.stderr).to_string();
      warn!(
        "Step '{}' failed with status: {:?}. Stderr: {}",
        step_name,
        output.status.code(),
        stderr_string.lines().next().unwrap_or("<empty stderr>")
      );
      return Err(EpicError::CommandFailedStatus {
        step_name: step_name.to_string(),
        status: output.status,
        stderr: stderr_string,
      });
    }

    debug!("Step '{}' finished. Status: {:?}", step_name, output.status);
    Ok(output)
  }

  fn is_available(&self, program: &str) -> bool {
    let available = cmd(program, ["--version"])
      .stdout_null()
      .stderr_null()
      .unchecked()
      .run()
      .is_ok_and(|o| o.status.success());
    debug!("Program '{}' available: {}", program, available);
    available
  }
}
