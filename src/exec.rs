//! Process execution behind the [`Executor`] trait.
use anyhow::{Context, Result, bail};
use std::path::Path;
use std::process::{Command, Output};

/// Result of a command execution.
#[derive(Debug, Clone, Default)]
pub struct ExecResult {
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
    /// Whether the process exited zero.
    pub success: bool,
    /// Exit code, if the process exited normally.
    pub code: Option<i32>,
}

impl From<Output> for ExecResult {
    fn from(output: Output) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            success: output.status.success(),
            code: output.status.code(),
        }
    }
}

/// Runs external programs. Swapped for a stub in tests.
pub trait Executor: Send + Sync + std::fmt::Debug {
    /// Run in `dir`, failing on a non-zero exit.
    ///
    /// # Errors
    ///
    /// Returns an error if the program cannot be started or exits non-zero.
    fn run_in(&self, dir: &Path, program: &str, args: &[&str]) -> Result<ExecResult>;

    /// Run in `dir` and return the result whatever the exit status.
    ///
    /// # Errors
    ///
    /// Returns an error only if the program cannot be started.
    fn run_in_unchecked(&self, dir: &Path, program: &str, args: &[&str]) -> Result<ExecResult>;

    /// Run in `dir` with inherited stdio and return the exit code.
    ///
    /// # Errors
    ///
    /// Returns an error only if the program cannot be started.
    fn run_in_streaming(&self, dir: &Path, program: &str, args: &[&str]) -> Result<i32>;

    /// Check if a program is available on PATH.
    fn which(&self, program: &str) -> bool;
}

/// [`Executor`] backed by [`std::process::Command`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemExecutor;

impl Executor for SystemExecutor {
    fn run_in(&self, dir: &Path, program: &str, args: &[&str]) -> Result<ExecResult> {
        let result = self.run_in_unchecked(dir, program, args)?;
        if !result.success {
            bail!(
                "{program} in {} failed (exit {}): {}",
                dir.display(),
                result.code.unwrap_or(-1),
                result.stderr.trim()
            );
        }
        Ok(result)
    }

    fn run_in_unchecked(&self, dir: &Path, program: &str, args: &[&str]) -> Result<ExecResult> {
        let output = Command::new(program)
            .args(args)
            .current_dir(dir)
            .output()
            .with_context(|| format!("failed to execute: {program}"))?;
        Ok(ExecResult::from(output))
    }

    fn run_in_streaming(&self, dir: &Path, program: &str, args: &[&str]) -> Result<i32> {
        let status = Command::new(program)
            .args(args)
            .current_dir(dir)
            .status()
            .with_context(|| format!("failed to execute: {program}"))?;
        Ok(status.code().unwrap_or(1))
    }

    fn which(&self, program: &str) -> bool {
        which::which(program).is_ok()
    }
}
