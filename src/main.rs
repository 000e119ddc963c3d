// SPDX-License-Identifier: PMPL-1.0-or-later
//! Accessguard CLI - rule-based accessibility validation for HTML documents

use accessguard::config::{self, RunConfig};
use accessguard::dom::{DocumentSource, FileSource};
use accessguard::report::{generate_batch_report, generate_report, AuditReport, OutputFormat};
use accessguard::rules::default_registry;
use accessguard::runner::{Auditor, MutationBatch};
use accessguard::validator::Validator;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::sync::mpsc;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

/// Rule-based accessibility validation for HTML documents
#[derive(Parser)]
#[command(name = "accessguard")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Audit one or more HTML files
    Check {
        /// Files to audit
        #[arg(required = true)]
        files: Vec<PathBuf>,

        #[command(flatten)]
        run: RunArgs,

        /// Output file (stdout if not specified)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Re-audit a file whenever it changes
    Watch {
        /// File to watch
        file: PathBuf,

        #[command(flatten)]
        run: RunArgs,

        /// Modification-time polling interval
        #[arg(long, default_value_t = 500)]
        interval_ms: u64,
    },

    /// List the registered rules
    Rules {
        /// Enable verbose logging
        #[arg(long, short)]
        verbose: bool,
    },
}

/// Options shared by the auditing commands
#[derive(clap::Args)]
struct RunArgs {
    /// Configuration file (TOML or YAML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output format (defaults to the configured report format)
    #[arg(long)]
    format: Option<FormatArg>,

    /// CSS selector restricting the audit to one subtree
    #[arg(long)]
    context: Option<String>,

    /// Audit hidden elements too
    #[arg(long)]
    include_hidden: bool,

    /// Enable verbose logging
    #[arg(long, short)]
    verbose: bool,
}

impl RunArgs {
    fn load(&self) -> anyhow::Result<RunConfig> {
        let path = self.config.clone().unwrap_or_else(config::default_config_path);
        let mut config = config::load_config(&path)?;
        if let Some(context) = &self.context {
            config.context = Some(context.clone());
        }
        if self.include_hidden {
            config.include_hidden = true;
        }
        Ok(config)
    }

    fn output_format(&self, config: &RunConfig) -> OutputFormat {
        self.format
            .map(OutputFormat::from)
            .unwrap_or_else(|| OutputFormat::from_config(&config.report_format))
    }
}

/// Output format CLI argument
#[derive(Debug, Clone, Copy, ValueEnum)]
enum FormatArg {
    /// Human-readable text
    Text,
    /// Structured JSON
    Json,
    /// SARIF for IDE/CI
    Sarif,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Text => OutputFormat::Text,
            FormatArg::Json => OutputFormat::Json,
            FormatArg::Sarif => OutputFormat::Sarif,
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("accessguard=debug")
    } else {
        EnvFilter::new("accessguard=warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Check { files, run, output } => {
            init_logging(run.verbose);
            let config = run.load()?;
            let auditor = Auditor::new(default_registry());

            let mut reports = Vec::with_capacity(files.len());
            for file in &files {
                reports.push(audit_file(&auditor, file, &config)?);
            }

            let rendered = generate_batch_report(&reports, run.output_format(&config));
            write_output(&rendered, output.as_deref())?;

            if reports.iter().any(AuditReport::has_errors) {
                std::process::exit(1);
            }
        }

        Commands::Watch { file, run, interval_ms } => {
            init_logging(run.verbose);
            let mut config = run.load()?;
            config.watch_dom_changes = true;
            let format = run.output_format(&config);

            let (tx, rx) = mpsc::channel(16);
            tokio::spawn(poll_modifications(file.clone(), Duration::from_millis(interval_ms), tx));

            let auditor = Auditor::new(default_registry());
            let source = FileSource::new(&file);
            let label = source.describe();
            let mut validator = Validator::new();
            auditor
                .watch(&source, &config, &mut validator, rx, |outcome, validator| {
                    let report = AuditReport::build(&label, outcome, validator, auditor.registry(), &config.rules);
                    match format {
                        OutputFormat::Text => println!(
                            "{}: {} report(s), SCORE: {}/100",
                            report.source,
                            report.reports.len(),
                            report.score
                        ),
                        _ => println!("{}", generate_report(&report, format)),
                    }
                })
                .await?;
        }

        Commands::Rules { verbose } => {
            init_logging(verbose);
            let registry = default_registry();
            for rule in registry.iter() {
                let d = rule.descriptor();
                println!("{:<22} {:<9} {:<18} {}", d.id, d.severity.as_str(), d.category, d.selector);
                for link in &d.links {
                    println!("    {}", link);
                }
            }
        }
    }

    Ok(())
}

/// One independent audit: fresh Validator, snapshot, run, tally
fn audit_file(auditor: &Auditor, path: &Path, config: &RunConfig) -> anyhow::Result<AuditReport> {
    let source = FileSource::new(path);
    let document = source.snapshot()?;
    let mut validator = Validator::new();
    let outcome = auditor.run(&document, config, &mut validator)?;
    Ok(AuditReport::build(&source.describe(), &outcome, &validator, auditor.registry(), &config.rules))
}

/// Send a mutation batch each time the file's modification time changes
async fn poll_modifications(path: PathBuf, every: Duration, tx: mpsc::Sender<MutationBatch>) {
    let mut last = modified(&path);
    let mut ticker = tokio::time::interval(every);
    loop {
        ticker.tick().await;
        let current = modified(&path);
        if current.is_some() && current != last {
            debug!("{} changed", path.display());
            last = current;
            if tx.send(MutationBatch::new(1)).await.is_err() {
                break;
            }
        }
    }
}

fn modified(path: &Path) -> Option<SystemTime> {
    match std::fs::metadata(path).and_then(|m| m.modified()) {
        Ok(time) => Some(time),
        Err(e) => {
            warn!("Cannot stat {}: {}", path.display(), e);
            None
        }
    }
}

/// Write output to file or stdout
fn write_output(content: &str, path: Option<&Path>) -> anyhow::Result<()> {
    match path {
        Some(p) => {
            std::fs::write(p, content)?;
            eprintln!("Report written to {}", p.display());
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
