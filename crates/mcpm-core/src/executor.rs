//! Install and uninstall step execution
//!
//! Steps run in manifest order as child processes of the platform shell,
//! synchronously, with the package directory as working directory. The first
//! non-zero exit stops the run; later steps are reported as not run. Effects
//! of steps that already ran are not rolled back.
//!
//! Validation happens in [`prepare`], before anything runs: an unsupported
//! step type or an unknown `${VAR}` in any step fails the whole list.

use std::path::Path;
use std::process::Command;

use mcpm_meta::Step;

use crate::inputs::ResolvedInputs;
use crate::substitute::{substitute, substitute_lenient};
use crate::{Error, Result};

/// A step whose command is fully substituted and ready to run.
#[derive(Clone, PartialEq, Eq)]
pub struct PreparedStep {
    pub index: usize,
    command: String,
    display: String,
}

impl PreparedStep {
    /// The command as run. May contain secret values.
    pub fn command(&self) -> &str {
        &self.command
    }

    /// The command with secret values masked, for logs and prompts.
    pub fn display(&self) -> &str {
        &self.display
    }
}

impl std::fmt::Debug for PreparedStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreparedStep")
            .field("index", &self.index)
            .field("command", &self.display)
            .finish()
    }
}

/// Outcome of one step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepStatus {
    Succeeded,
    Failed { exit_code: Option<i32> },
    /// An earlier step failed.
    NotRun,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepOutcome {
    pub index: usize,
    /// Redacted command line.
    pub command: String,
    pub status: StepStatus,
    /// Stdout followed by stderr, redacted.
    pub output: String,
}

/// Per-step record of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionReport {
    pub outcomes: Vec<StepOutcome>,
}

impl ExecutionReport {
    /// True when every step ran and exited zero.
    pub fn succeeded(&self) -> bool {
        self.outcomes
            .iter()
            .all(|o| o.status == StepStatus::Succeeded)
    }

    /// The step that stopped the run, if any.
    pub fn failure(&self) -> Option<&StepOutcome> {
        self.outcomes
            .iter()
            .find(|o| matches!(o.status, StepStatus::Failed { .. }))
    }

    /// Number of steps that were started.
    pub fn executed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.status != StepStatus::NotRun)
            .count()
    }

    /// Turn a failed run into [`Error::NonZeroExit`].
    pub fn ensure_success(self) -> Result<Self> {
        match self.failure() {
            Some(StepOutcome {
                index,
                command,
                status: StepStatus::Failed { exit_code },
                output,
            }) => Err(Error::NonZeroExit {
                index: *index,
                command: command.clone(),
                exit_code: *exit_code,
                output: output.clone(),
            }),
            _ => Ok(self),
        }
    }
}

/// Validate and substitute every step without running anything.
pub fn prepare(steps: &[Step], values: &ResolvedInputs) -> Result<Vec<PreparedStep>> {
    if let Some((index, step)) = steps
        .iter()
        .enumerate()
        .find(|(_, s)| matches!(s, Step::Unsupported { .. }))
    {
        return Err(Error::UnsupportedStepType {
            index,
            kind: step.kind().to_string(),
        });
    }

    let mut prepared = Vec::with_capacity(steps.len());
    let mut unknown: Vec<String> = Vec::new();

    for (index, step) in steps.iter().enumerate() {
        let Step::Shell { command } = step else {
            continue;
        };
        match substitute(command, values) {
            Ok(command) => prepared.push(PreparedStep {
                index,
                display: values.redact(&command),
                command,
            }),
            Err(Error::UnknownVariable { names }) => {
                for name in names {
                    if !unknown.contains(&name) {
                        unknown.push(name);
                    }
                }
            }
            Err(e) => return Err(e),
        }
    }

    if !unknown.is_empty() {
        return Err(Error::UnknownVariable { names: unknown });
    }
    Ok(prepared)
}

/// Commands as they would run, with unknown placeholders left visible.
pub fn preview(steps: &[Step], values: &ResolvedInputs) -> Vec<String> {
    steps
        .iter()
        .map(|step| match step {
            Step::Shell { command } => values.redact(&substitute_lenient(command, values).value),
            Step::Unsupported { kind } => format!("<unsupported step type '{kind}'>"),
        })
        .collect()
}

/// Run prepared steps in `workdir`, stopping at the first failure.
///
/// A step that exits non-zero is recorded in the report, not returned as an
/// error; call [`ExecutionReport::ensure_success`] for that. Only a failure to
/// start the shell at all is an error here.
pub fn run_prepared(
    steps: &[PreparedStep],
    workdir: &Path,
    values: &ResolvedInputs,
) -> Result<ExecutionReport> {
    let mut report = ExecutionReport::default();
    let mut failed = false;

    for step in steps {
        if failed {
            report.outcomes.push(StepOutcome {
                index: step.index,
                command: step.display.clone(),
                status: StepStatus::NotRun,
                output: String::new(),
            });
            continue;
        }

        tracing::info!(step = step.index + 1, command = %step.display, "running step");
        let output = shell(&step.command)
            .current_dir(workdir)
            .output()
            .map_err(|source| Error::StepSpawn {
                index: step.index,
                source,
            })?;

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));
        let combined = values.redact(&combined);

        let status = if output.status.success() {
            StepStatus::Succeeded
        } else {
            failed = true;
            tracing::warn!(
                step = step.index + 1,
                exit_code = ?output.status.code(),
                "step failed, skipping remaining steps"
            );
            StepStatus::Failed {
                exit_code: output.status.code(),
            }
        };

        report.outcomes.push(StepOutcome {
            index: step.index,
            command: step.display.clone(),
            status,
            output: combined,
        });
    }

    Ok(report)
}

/// [`prepare`] then [`run_prepared`].
pub fn run(steps: &[Step], values: &ResolvedInputs, workdir: &Path) -> Result<ExecutionReport> {
    let prepared = prepare(steps, values)?;
    run_prepared(&prepared, workdir, values)
}

#[cfg(windows)]
fn shell(command: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.arg("/C").arg(command);
    cmd
}

#[cfg(not(windows))]
fn shell(command: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command);
    cmd
}
