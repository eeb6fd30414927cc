//! The job registry: an ordered, append-only log of submissions.
//!
//! Every submission renders a script, goes through the
//! [`CommandRunner`](crate::runner::CommandRunner), and is appended as a
//! [`JobRecord`]. The registry can be persisted to a JSON file and
//! reloaded later with ids and order preserved exactly, and the whole
//! log can be replayed through the runner without growing it.

use std::fs;
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::RegistryConfig;
use crate::error::{RegistryError, Result};
use crate::runner::{CommandLine, CommandRunner, Outcome, Shell, SystemShell};
use crate::script::ScriptGenerator;

/// Launch status of a registered job.
///
/// `executed`/`failed` describe the launch attempt only; the cluster-side
/// lifecycle of the job (queued, running, completed) is not tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobStatus {
    Submitted,
    Executed,
    Failed,
    SkippedDryRun,
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Submitted => write!(f, "submitted"),
            JobStatus::Executed => write!(f, "executed"),
            JobStatus::Failed => write!(f, "failed"),
            JobStatus::SkippedDryRun => write!(f, "skipped-dry-run"),
        }
    }
}

/// One entry in the registry: a submitted command with its rendered
/// script and launch outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRecord {
    /// Position in the log, contiguous from 1. Defines replay order.
    pub sequence_id: u64,
    /// The exact command line supplied by the caller
    pub raw_command: CommandLine,
    /// The submission script as it was (or would have been) handed to
    /// the scheduler
    pub script_text: String,
    pub job_name: String,
    pub output_dir: String,
    pub dry_run: bool,
    pub status: JobStatus,
    pub submitted_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

/// Per-submission overrides. Anything left `None` falls back to the
/// registry defaults.
#[derive(Debug, Clone, Default)]
pub struct SubmitOverrides {
    pub job_name: Option<String>,
    pub output_dir: Option<String>,
    pub dry_run: Option<bool>,
}

impl SubmitOverrides {
    pub fn with_job_name(mut self, job_name: impl Into<String>) -> Self {
        self.job_name = Some(job_name.into());
        self
    }

    pub fn with_output_dir(mut self, output_dir: impl Into<String>) -> Self {
        self.output_dir = Some(output_dir.into());
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = Some(dry_run);
        self
    }
}

/// On-disk shape of a saved registry.
#[derive(Debug, Serialize, Deserialize)]
struct PersistedRegistry {
    defaults: RegistryConfig,
    records: Vec<JobRecord>,
}

/// The owning aggregate: registry defaults plus the ordered submission
/// log. Not safe for concurrent mutation; callers that need concurrent
/// submission must serialize access externally.
#[derive(Debug)]
pub struct JobRegistry<S: Shell = SystemShell> {
    config: RegistryConfig,
    records: Vec<JobRecord>,
    runner: CommandRunner<S>,
    generator: ScriptGenerator,
}

impl JobRegistry<SystemShell> {
    /// Create an empty registry executing through the host shell.
    pub fn new(config: RegistryConfig) -> Self {
        Self::with_runner(config, CommandRunner::new())
    }

    /// Load a previously saved registry from `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::load_with_runner(path, CommandRunner::new())
    }
}

impl<S: Shell> JobRegistry<S> {
    /// Create an empty registry with a caller-supplied runner.
    pub fn with_runner(config: RegistryConfig, runner: CommandRunner<S>) -> Self {
        let generator = ScriptGenerator::new(config.resources.clone());
        Self {
            config,
            records: Vec::new(),
            runner,
            generator,
        }
    }

    /// Load a previously saved registry, executing through a
    /// caller-supplied runner.
    ///
    /// Loading only reconstructs state, it never executes anything.
    /// Structural problems (malformed JSON, ids not contiguous from 1)
    /// are rejected as [`RegistryError::CorruptData`]; there is no
    /// best-effort repair.
    pub fn load_with_runner(path: impl AsRef<Path>, runner: CommandRunner<S>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|e| RegistryError::Io {
            operation: "load",
            path: path.to_path_buf(),
            source: e,
        })?;
        let persisted: PersistedRegistry =
            serde_json::from_slice(&bytes).map_err(|e| RegistryError::CorruptData {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        validate_records(path, &persisted.records)?;

        tracing::info!(
            path = %path.display(),
            records = persisted.records.len(),
            "registry loaded"
        );
        let generator = ScriptGenerator::new(persisted.defaults.resources.clone());
        Ok(Self {
            config: persisted.defaults,
            records: persisted.records,
            runner,
            generator,
        })
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Submit one logical job: render its script, run (or simulate) it,
    /// append the record. At-most-once per call, no retry.
    pub fn submit(
        &mut self,
        command: impl Into<CommandLine>,
        overrides: SubmitOverrides,
    ) -> Result<&JobRecord> {
        let command = command.into();
        let sequence_id = self.records.len() as u64 + 1;
        let job_name = overrides
            .job_name
            .unwrap_or_else(|| format!("{}-{}", self.config.job_name_prefix, sequence_id));
        let output_dir = overrides
            .output_dir
            .unwrap_or_else(|| self.config.output_dir.clone());
        let dry_run = overrides.dry_run.unwrap_or(self.config.dry_run);

        let script_text = self.generator.render(&job_name, &output_dir, &command)?;
        if dry_run {
            tracing::info!(job_name = %job_name, script = %script_text, "rendered submission script");
        }
        let outcome = self.runner.run(&command, dry_run)?;

        tracing::info!(
            sequence_id,
            job_name = %job_name,
            status = %outcome.status,
            "job recorded"
        );
        let record = JobRecord {
            sequence_id,
            raw_command: command,
            script_text,
            job_name,
            output_dir,
            dry_run,
            status: outcome.status,
            submitted_at: Utc::now(),
            exit_code: outcome.exit_code,
            output: if outcome.output.is_empty() {
                None
            } else {
                Some(outcome.output)
            },
        };
        self.records.push(record);
        Ok(self.records.last().expect("record just appended"))
    }

    /// Ordered, read-only snapshot of the submission log.
    pub fn list(&self) -> &[JobRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The command line of every record, in sequence order.
    pub fn get_executed_commands(&self) -> Vec<&CommandLine> {
        self.records.iter().map(|r| &r.raw_command).collect()
    }

    /// Log one summary line per record.
    pub fn print_summary(&self) {
        for record in &self.records {
            tracing::info!(
                sequence_id = record.sequence_id,
                job_name = %record.job_name,
                status = %record.status,
                command = %record.raw_command,
                "registered job"
            );
        }
    }

    /// Persist the registry to `path`, atomically.
    ///
    /// The file is written next to its destination and renamed into
    /// place, so an interrupted save never corrupts a previously valid
    /// registry. Two processes saving to the same path concurrently is
    /// undefined behavior and must be avoided by the caller.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let persisted = PersistedRegistry {
            defaults: self.config.clone(),
            records: self.records.clone(),
        };
        let io_err = |e: std::io::Error| RegistryError::Io {
            operation: "save",
            path: path.to_path_buf(),
            source: e,
        };

        let bytes = serde_json::to_vec_pretty(&persisted).map_err(|e| {
            io_err(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
        })?;
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(io_err)?;
        tmp.write_all(&bytes).map_err(io_err)?;
        tmp.persist(path).map_err(|e| io_err(e.error))?;

        tracing::info!(
            path = %path.display(),
            records = self.records.len(),
            "registry saved"
        );
        Ok(())
    }

    /// Replay every record, in sequence order, through the runner.
    ///
    /// Each record is re-run with its original `raw_command`; the stored
    /// script is reused verbatim for dry-run logging, never re-rendered,
    /// so the replay matches what was originally submitted even if the
    /// template logic has changed since. The log itself is untouched:
    /// no records are appended and no statuses are rewritten, but side
    /// effects of re-running commands are real.
    ///
    /// `dry_run_override`, when supplied, takes precedence over each
    /// record's stored `dry_run` flag.
    pub fn re_execute_all(&self, dry_run_override: Option<bool>) -> Result<Vec<Outcome>> {
        let mut outcomes = Vec::with_capacity(self.records.len());
        for record in &self.records {
            let dry_run = dry_run_override.unwrap_or(record.dry_run);
            if dry_run {
                tracing::info!(
                    sequence_id = record.sequence_id,
                    script = %record.script_text,
                    "replaying submission script"
                );
            }
            outcomes.push(self.runner.run(&record.raw_command, dry_run)?);
        }
        Ok(outcomes)
    }
}

/// Reject any record list whose sequence ids are not exactly 1..=N in
/// order. This covers duplicates, gaps, reordering, and renumbering.
fn validate_records(path: &Path, records: &[JobRecord]) -> Result<()> {
    for (index, record) in records.iter().enumerate() {
        let expected = index as u64 + 1;
        if record.sequence_id != expected {
            return Err(RegistryError::CorruptData {
                path: path.to_path_buf(),
                reason: format!(
                    "sequence id {} at position {} (expected {})",
                    record.sequence_id, index, expected
                ),
            });
        }
        if record.raw_command.is_empty() {
            return Err(RegistryError::CorruptData {
                path: path.to_path_buf(),
                reason: format!("record {} has an empty command", record.sequence_id),
            });
        }
    }
    Ok(())
}
