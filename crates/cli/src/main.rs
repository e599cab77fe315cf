//! dlfmt Bridge CLI - Runs the dlfmt executable with bounded concurrency
//!
//! Each subcommand maps to one dlfmt operation. Several paths may be given;
//! they run concurrently, at most `--max-concurrency` processes at a time.

mod console;
mod logging;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::{Read, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use dlfmt_core::application::{CommandService, ConcurrencyGate, DocumentFormatter, ProcessRunner};
use dlfmt_core::config::{
    ENV_BUNDLE_DIR, ENV_FORMAT_MODE, ENV_MAX_CONCURRENCY, ENV_PATH, ENV_TIMEOUT_MS,
};
use dlfmt_core::domain::{FormatMode, Operation};
use dlfmt_core::port::time_provider::SystemTimeProvider;
use dlfmt_core::port::{LogSink, TaskExecutor};
use dlfmt_core::RunnerConfig;
use dlfmt_infra_system::{FileSink, FsExecutableResolver, SubprocessExecutor, WriterSink};

use console::ConsoleNotifier;

#[derive(Parser)]
#[command(name = "dlfmt-bridge")]
#[command(about = "Run the dlfmt formatter on files and directories", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the dlfmt executable (overrides the bundled binary)
    #[arg(long = "dlfmt-path", global = true, env = ENV_PATH)]
    dlfmt_path: Option<String>,

    /// Directory containing the bundled bin/ folder (default: next to this binary)
    #[arg(long, global = true, env = ENV_BUNDLE_DIR)]
    bundle_dir: Option<String>,

    /// Maximum number of dlfmt processes running at once
    #[arg(long, global = true, env = ENV_MAX_CONCURRENCY)]
    max_concurrency: Option<String>,

    /// Kill dlfmt after this many milliseconds (0 = never)
    #[arg(long, global = true, env = ENV_TIMEOUT_MS)]
    timeout_ms: Option<String>,

    /// Default mode for format-stdin (auto | manual)
    #[arg(long, global = true, env = ENV_FORMAT_MODE)]
    format_mode: Option<String>,

    /// Append dlfmt output to this file instead of stderr
    #[arg(long, global = true, env = "DLFMT_LOG_FILE")]
    log_file: Option<PathBuf>,

    /// Diagnostic log format (pretty | json)
    #[arg(long, global = true, env = "DLFMT_LOG_FORMAT", default_value = "pretty")]
    log_format: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Format one or more files
    FormatFile {
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Use manual formatting rules
        #[arg(long)]
        manual: bool,
    },

    /// Format every file in one or more directories
    FormatDir {
        /// Directories (default: current directory)
        paths: Vec<PathBuf>,

        /// Use manual formatting rules
        #[arg(long)]
        manual: bool,
    },

    /// Compress one or more files
    CompressFile {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Compress every file in one or more directories
    CompressDir {
        /// Directories (default: current directory)
        paths: Vec<PathBuf>,
    },

    /// Run a declarative JSON task file
    JsonTask {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Format text read from stdin and write the result to stdout
    FormatStdin {
        /// Override the configured format mode (auto | manual)
        #[arg(long)]
        mode: Option<String>,
    },
}

impl Cli {
    /// Flags win over environment variables (clap resolves `env`)
    fn runner_config(&self) -> Result<RunnerConfig> {
        let config = RunnerConfig::from_lookup(|key| match key {
            ENV_PATH => self.dlfmt_path.clone(),
            ENV_BUNDLE_DIR => self.bundle_dir.clone(),
            ENV_MAX_CONCURRENCY => self.max_concurrency.clone(),
            ENV_TIMEOUT_MS => self.timeout_ms.clone(),
            ENV_FORMAT_MODE => self.format_mode.clone(),
            _ => None,
        })?;
        Ok(config)
    }

    fn sink(&self) -> Result<Arc<dyn LogSink>> {
        let sink: Arc<dyn LogSink> = match &self.log_file {
            Some(path) => Arc::new(
                FileSink::open(path)
                    .with_context(|| format!("Failed to open log file {}", path.display()))?,
            ),
            None => Arc::new(WriterSink::stderr()),
        };
        Ok(sink)
    }
}

fn mode(manual: bool) -> FormatMode {
    if manual {
        FormatMode::Manual
    } else {
        FormatMode::Auto
    }
}

fn or_current_dir(paths: Vec<PathBuf>) -> Vec<PathBuf> {
    if paths.is_empty() {
        vec![PathBuf::from(".")]
    } else {
        paths
    }
}

fn default_bundle_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|p| p.to_path_buf()))
        .unwrap_or_else(|| PathBuf::from("."))
}

fn operations(command: Commands) -> Vec<Operation> {
    match command {
        Commands::FormatFile { paths, manual } => paths
            .into_iter()
            .map(|path| Operation::FormatFile {
                path,
                mode: mode(manual),
            })
            .collect(),
        Commands::FormatDir { paths, manual } => or_current_dir(paths)
            .into_iter()
            .map(|path| Operation::FormatDirectory {
                path,
                mode: mode(manual),
            })
            .collect(),
        Commands::CompressFile { paths } => paths
            .into_iter()
            .map(|path| Operation::CompressFile { path })
            .collect(),
        Commands::CompressDir { paths } => or_current_dir(paths)
            .into_iter()
            .map(|path| Operation::CompressDirectory { path })
            .collect(),
        Commands::JsonTask { paths } => paths
            .into_iter()
            .map(|path| Operation::JsonTask { path })
            .collect(),
        Commands::FormatStdin { .. } => Vec::new(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1. Initialize logging
    logging::init_logging(&cli.log_format)?;

    // 2. Load configuration
    let config = cli.runner_config()?;
    info!(
        version = dlfmt_core::VERSION,
        max_concurrency = config.max_concurrency,
        timeout = ?config.timeout,
        "dlfmt bridge starting"
    );

    // 3. Setup dependencies (DI wiring)
    let sink = cli.sink()?;
    let time_provider = Arc::new(SystemTimeProvider);
    let executor: Arc<dyn TaskExecutor> = Arc::new(SubprocessExecutor::new(time_provider.clone()));
    let gate = ConcurrencyGate::try_new(config.max_concurrency)?;
    let runner = Arc::new(ProcessRunner::new(gate, executor));
    let resolver = Arc::new(FsExecutableResolver::new(
        config.executable_override.clone(),
        config.bundle_dir.clone().unwrap_or_else(default_bundle_dir),
    ));

    // 4. Dispatch
    if let Commands::FormatStdin { mode } = &cli.command {
        let mode = match mode {
            Some(m) => m.parse()?,
            None => config.format_mode,
        };

        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read stdin")?;

        let formatter = DocumentFormatter::new(runner, resolver, sink, time_provider)
            .with_deadline(config.timeout);
        let formatted = formatter.format_text(&text, mode).await?;

        let mut stdout = std::io::stdout().lock();
        stdout.write_all(formatted.as_deref().unwrap_or(text.as_str()).as_bytes())?;
        stdout.flush()?;
        return Ok(());
    }

    let service = CommandService::new(runner, resolver, sink, Arc::new(ConsoleNotifier))
        .with_deadline(config.timeout);

    let operations = operations(cli.command);
    let total = operations.len();
    let results = futures::future::join_all(operations.iter().map(|op| service.execute(op))).await;

    let failed = results.iter().filter(|r| r.is_err()).count();
    if failed > 0 {
        anyhow::bail!("{} of {} operations failed", failed, total);
    }

    Ok(())
}
