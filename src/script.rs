use crate::config::ResourceOptions;
use crate::error::{RegistryError, Result};
use crate::runner::CommandLine;

/// Renders sbatch submission scripts.
///
/// Rendering is pure text generation: identical inputs produce
/// byte-identical output and no files or directories are created. The
/// `%j` placeholders in the log file names are substituted by the
/// scheduler at run time.
#[derive(Debug, Clone, Default)]
pub struct ScriptGenerator {
    resources: ResourceOptions,
}

impl ScriptGenerator {
    pub fn new(resources: ResourceOptions) -> Self {
        Self { resources }
    }

    /// Render the script for one logical job.
    ///
    /// Header: one `#SBATCH` line per configured resource option, then
    /// the path directives derived from `output_dir` and `job_name`,
    /// then the command(s), one per line, in submission order.
    pub fn render(
        &self,
        job_name: &str,
        output_dir: &str,
        command: &CommandLine,
    ) -> Result<String> {
        if job_name.trim().is_empty() {
            return Err(RegistryError::InvalidArgument {
                operation: "render",
                reason: "job name must not be empty".to_string(),
            });
        }

        let res = &self.resources;
        let mut script = String::from("#!/bin/bash\n");
        script.push_str(&format!("#SBATCH --job-name={job_name}\n"));
        if let Some(partition) = &res.partition {
            script.push_str(&format!("#SBATCH --partition={partition}\n"));
        }
        if let Some(mail_user) = &res.mail_user {
            script.push_str("#SBATCH --mail-type=BEGIN,END,FAIL\n");
            script.push_str(&format!("#SBATCH --mail-user={mail_user}\n"));
        }
        if let Some(nodes) = &res.nodes {
            script.push_str(&format!("#SBATCH --nodes={nodes}\n"));
        }
        if let Some(ntasks) = res.ntasks {
            script.push_str(&format!("#SBATCH --ntasks={ntasks}\n"));
        }
        if let Some(cpus) = res.cpus_per_task {
            script.push_str(&format!("#SBATCH --cpus-per-task={cpus}\n"));
        }
        if let Some(mem) = &res.mem {
            script.push_str(&format!("#SBATCH --mem={mem}\n"));
        }
        if let Some(time) = &res.time {
            script.push_str(&format!("#SBATCH --time={time}\n"));
        }
        if let Some(exclude) = &res.exclude {
            script.push_str(&format!("#SBATCH --exclude={exclude}\n"));
        }
        // pass-through directives, already in key order
        for (key, value) in &res.extra {
            script.push_str(&format!("#SBATCH --{key}={value}\n"));
        }
        script.push_str(&format!("#SBATCH --chdir={output_dir}/{job_name}/\n"));
        script.push_str(&format!("#SBATCH --output={job_name}_%j.log\n"));
        script.push_str(&format!("#SBATCH --error={job_name}_%j.err\n"));

        script.push('\n');
        for cmd in command.commands() {
            script.push_str(cmd);
            script.push('\n');
        }

        Ok(script)
    }
}
