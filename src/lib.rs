//! Submission-script generation and a durable job registry for SLURM
//! batch clusters.
//!
//! Submissions flow through [`JobRegistry::submit`]: the script is
//! rendered, the command is run (or simulated in dry-run mode) through
//! the host shell, and the outcome is appended to an ordered log that
//! can be saved, reloaded, and replayed.

pub mod config;
pub mod error;
pub mod registry;
pub mod runner;
pub mod script;

pub use config::{RegistryConfig, ResourceOptions};
pub use error::{RegistryError, Result};
pub use registry::{JobRecord, JobRegistry, JobStatus, SubmitOverrides};
pub use runner::{CommandLine, CommandRunner, Outcome, Shell, SystemShell};
pub use script::ScriptGenerator;
