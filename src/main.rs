use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use sbatchreg::config::{RegistryConfig, ResourceOptions};
use sbatchreg::registry::{JobRecord, JobRegistry, SubmitOverrides};
use sbatchreg::runner::CommandLine;

#[derive(Parser, Debug)]
#[command(name = "sbatchreg")]
#[command(version)]
#[command(about = "Generate sbatch submission scripts and keep a durable registry of every job")]
#[command(propagate_version = true)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Submit a command (or an ordered sequence) as one job
    Submit(SubmitArgs),

    /// List all registered jobs
    List {
        #[command(flatten)]
        registry: RegistryArgs,
    },

    /// Show one record in full, including its rendered script
    Show {
        #[command(flatten)]
        registry: RegistryArgs,

        /// Sequence id of the record
        sequence_id: u64,
    },

    /// Re-execute every registered job, in sequence order
    Replay {
        #[command(flatten)]
        registry: RegistryArgs,

        /// Actually execute, overriding each record's stored dry-run flag
        #[arg(long, conflicts_with = "dry_run")]
        execute: bool,

        /// Simulate only, overriding each record's stored dry-run flag
        #[arg(long)]
        dry_run: bool,
    },
}

// =============================================================================
// Shared Arguments
// =============================================================================

#[derive(Parser, Debug)]
struct RegistryArgs {
    /// Path to the registry file
    #[arg(long, short = 'r', default_value = "sbatch_registry.json")]
    registry: PathBuf,

    /// Output format
    #[arg(long, short = 'o', default_value = "table")]
    output: OutputFormat,
}

#[derive(Debug, Clone, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Parser, Debug)]
struct SubmitArgs {
    #[command(flatten)]
    registry: RegistryArgs,

    /// Command(s) to submit; several strings form one sequential job
    #[arg(required = true, num_args = 1..)]
    command: Vec<String>,

    /// Job name (default: "{prefix}-{sequence_id}")
    #[arg(long)]
    job_name: Option<String>,

    /// Output directory referenced by the rendered script
    #[arg(long)]
    output_dir: Option<String>,

    /// Actually execute instead of using the registry's dry-run default
    #[arg(long, conflicts_with = "dry_run")]
    execute: bool,

    /// Simulate only, whatever the registry default says
    #[arg(long)]
    dry_run: bool,

    // === Defaults applied when the registry file does not exist yet ===
    /// Partition directive for new registries
    #[arg(long)]
    partition: Option<String>,

    /// Memory directive for new registries (e.g. "16G")
    #[arg(long)]
    mem: Option<String>,

    /// Time-limit directive for new registries (e.g. "02:00:00")
    #[arg(long)]
    time: Option<String>,

    /// CPUs-per-task directive for new registries
    #[arg(long)]
    cpus_per_task: Option<u32>,

    /// Extra directive for new registries, as key=value; repeatable
    #[arg(long = "sbatch", value_name = "KEY=VALUE")]
    sbatch: Vec<String>,
}

// =============================================================================
// JSON Output Types
// =============================================================================

#[derive(Serialize)]
struct RecordOutput {
    sequence_id: u64,
    job_name: String,
    status: String,
    dry_run: bool,
    command: String,
    exit_code: Option<i32>,
}

#[derive(Serialize)]
struct ListOutput {
    records: Vec<RecordOutput>,
}

#[derive(Serialize)]
struct ReplayItemOutput {
    sequence_id: u64,
    status: String,
    exit_code: Option<i32>,
}

// =============================================================================
// Helper Functions
// =============================================================================

fn record_output(record: &JobRecord) -> RecordOutput {
    RecordOutput {
        sequence_id: record.sequence_id,
        job_name: record.job_name.clone(),
        status: record.status.to_string(),
        dry_run: record.dry_run,
        command: record.raw_command.to_shell(),
        exit_code: record.exit_code,
    }
}

fn dry_run_override(execute: bool, dry_run: bool) -> Option<bool> {
    if execute {
        Some(false)
    } else if dry_run {
        Some(true)
    } else {
        None
    }
}

fn parse_extra_directives(pairs: &[String]) -> Result<ResourceOptions, String> {
    let mut resources = ResourceOptions::default();
    for pair in pairs {
        match pair.split_once('=') {
            Some((key, value)) if !key.is_empty() => {
                resources.extra.insert(key.to_string(), value.to_string());
            }
            _ => return Err(format!("invalid --sbatch directive `{pair}`, expected key=value")),
        }
    }
    Ok(resources)
}

fn print_record_table(records: &[&JobRecord]) {
    if records.is_empty() {
        println!("No jobs registered.");
        return;
    }

    println!("{:<4} {:<16} {:<16} {:<5} COMMAND", "ID", "STATUS", "NAME", "DRY");
    println!("{}", "-".repeat(70));
    for record in records {
        let command = record.raw_command.to_shell();
        // Truncate command if too long
        let cmd_display = if command.len() > 28 {
            format!("{}...", &command[..25])
        } else {
            command
        };
        println!(
            "{:<4} {:<16} {:<16} {:<5} {}",
            record.sequence_id,
            record.status.to_string(),
            record.job_name,
            if record.dry_run { "yes" } else { "no" },
            cmd_display
        );
    }
}

// =============================================================================
// Command Handlers
// =============================================================================

fn handle_submit(args: SubmitArgs) -> Result<(), Box<dyn std::error::Error>> {
    let path = &args.registry.registry;

    let mut registry = if path.exists() {
        JobRegistry::load(path)?
    } else {
        let mut resources = parse_extra_directives(&args.sbatch)?;
        resources.partition = args.partition.clone();
        resources.mem = args.mem.clone();
        resources.time = args.time.clone();
        resources.cpus_per_task = args.cpus_per_task;
        JobRegistry::new(RegistryConfig::default().with_resources(resources))
    };

    let command = if args.command.len() == 1 {
        CommandLine::from(args.command[0].clone())
    } else {
        CommandLine::from(args.command.clone())
    };

    let overrides = SubmitOverrides {
        job_name: args.job_name.clone(),
        output_dir: args.output_dir.clone(),
        dry_run: dry_run_override(args.execute, args.dry_run),
    };

    let record = registry.submit(command, overrides)?;
    let output = record_output(record);
    match args.registry.output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&output)?),
        OutputFormat::Table => {
            println!("Job {} recorded as `{}` ({})", output.sequence_id, output.job_name, output.status);
            if let Some(exit_code) = output.exit_code {
                println!("Exit code: {exit_code}");
            }
        }
    }

    registry.save(path)?;
    Ok(())
}

fn handle_list(args: RegistryArgs) -> Result<(), Box<dyn std::error::Error>> {
    let registry = JobRegistry::load(&args.registry)?;

    match args.output {
        OutputFormat::Json => {
            let output = ListOutput {
                records: registry.list().iter().map(record_output).collect(),
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Table => {
            let records: Vec<&JobRecord> = registry.list().iter().collect();
            print_record_table(&records);
        }
    }
    Ok(())
}

fn handle_show(args: RegistryArgs, sequence_id: u64) -> Result<(), Box<dyn std::error::Error>> {
    let registry = JobRegistry::load(&args.registry)?;
    let record = registry
        .list()
        .iter()
        .find(|r| r.sequence_id == sequence_id)
        .ok_or_else(|| format!("no record with sequence id {sequence_id}"))?;

    match args.output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(record)?),
        OutputFormat::Table => {
            println!("Sequence ID:  {}", record.sequence_id);
            println!("Job Name:     {}", record.job_name);
            println!("Status:       {}", record.status);
            println!("Submitted:    {}", record.submitted_at);
            println!("Dry Run:      {}", record.dry_run);
            println!("Output Dir:   {}", record.output_dir);
            println!("Command:      {}", record.raw_command.to_shell());
            if let Some(exit_code) = record.exit_code {
                println!("Exit Code:    {exit_code}");
            }
            if let Some(output) = &record.output {
                println!("Output:");
                for line in output.lines() {
                    println!("  {line}");
                }
            }
            println!("Script:");
            for line in record.script_text.lines() {
                println!("  {line}");
            }
        }
    }
    Ok(())
}

fn handle_replay(
    args: RegistryArgs,
    execute: bool,
    dry_run: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let registry = JobRegistry::load(&args.registry)?;
    let outcomes = registry.re_execute_all(dry_run_override(execute, dry_run))?;

    match args.output {
        OutputFormat::Json => {
            let items: Vec<ReplayItemOutput> = registry
                .list()
                .iter()
                .zip(&outcomes)
                .map(|(record, outcome)| ReplayItemOutput {
                    sequence_id: record.sequence_id,
                    status: outcome.status.to_string(),
                    exit_code: outcome.exit_code,
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&items)?);
        }
        OutputFormat::Table => {
            if outcomes.is_empty() {
                println!("Nothing to replay.");
            }
            for (record, outcome) in registry.list().iter().zip(&outcomes) {
                println!(
                    "{:<4} {:<16} {}",
                    record.sequence_id,
                    outcome.status.to_string(),
                    record.raw_command.to_shell()
                );
            }
        }
    }
    Ok(())
}

// =============================================================================
// Main Entry Point
// =============================================================================

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    match args.command {
        Commands::Submit(submit_args) => handle_submit(submit_args)?,
        Commands::List { registry } => handle_list(registry)?,
        Commands::Show {
            registry,
            sequence_id,
        } => handle_show(registry, sequence_id)?,
        Commands::Replay {
            registry,
            execute,
            dry_run,
        } => handle_replay(registry, execute, dry_run)?,
    }

    Ok(())
}
