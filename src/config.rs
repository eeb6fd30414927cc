use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Resource directives rendered into the `#SBATCH` header of a
/// submission script.
///
/// Every populated field maps to exactly one directive line. Options the
/// struct does not model go into [`extra`](Self::extra) and are passed
/// through verbatim as `#SBATCH --{key}={value}` lines, so scheduler
/// features added after this crate keep working without a code change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceOptions {
    /// Partition (queue) to submit to
    pub partition: Option<String>,
    /// Node list or node count expression
    pub nodes: Option<String>,
    /// Number of tasks
    pub ntasks: Option<u32>,
    /// CPUs allocated per task
    pub cpus_per_task: Option<u32>,
    /// Memory allocation (e.g., "16G")
    pub mem: Option<String>,
    /// Wall-clock time limit (e.g., "02:00:00")
    pub time: Option<String>,
    /// Mail address; also enables BEGIN,END,FAIL notifications
    pub mail_user: Option<String>,
    /// Nodes the scheduler must not place the job on
    pub exclude: Option<String>,
    /// Unrecognized directives, passed through in key order
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

impl ResourceOptions {
    pub fn with_partition(mut self, partition: impl Into<String>) -> Self {
        self.partition = Some(partition.into());
        self
    }

    pub fn with_mem(mut self, mem: impl Into<String>) -> Self {
        self.mem = Some(mem.into());
        self
    }

    pub fn with_time(mut self, time: impl Into<String>) -> Self {
        self.time = Some(time.into());
        self
    }

    pub fn with_cpus_per_task(mut self, cpus: u32) -> Self {
        self.cpus_per_task = Some(cpus);
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

/// Registry-level defaults applied to every submission unless overridden
/// per call. Persisted alongside the records so a reloaded registry
/// submits with the configuration that produced them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Directory the rendered scripts reference for logs and chdir
    pub output_dir: String,
    /// Prefix for generated job names ("{prefix}-{sequence_id}")
    pub job_name_prefix: String,
    /// Default dry-run flag. True until explicitly armed.
    pub dry_run: bool,
    /// Default resource directives for script rendering
    #[serde(default)]
    pub resources: ResourceOptions,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            output_dir: "slurm_output".to_string(),
            job_name_prefix: "job".to_string(),
            dry_run: true,
            resources: ResourceOptions::default(),
        }
    }
}

impl RegistryConfig {
    pub fn new(output_dir: impl Into<String>, job_name_prefix: impl Into<String>) -> Self {
        Self {
            output_dir: output_dir.into(),
            job_name_prefix: job_name_prefix.into(),
            ..Default::default()
        }
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_resources(mut self, resources: ResourceOptions) -> Self {
        self.resources = resources;
        self
    }
}
