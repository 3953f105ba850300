use anyhow::{Context, Result};
use appsync_compiler::compile::{CompileContext, CompiledApi};
use appsync_compiler::config::{OutputFormat, Settings};
use appsync_compiler::fs::LocalFs;
use clap::{Parser, ValueEnum};
use std::path::{Path, PathBuf};
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Compile an AppSync API configuration into CloudFormation resources
#[derive(Parser, Debug)]
#[command(name = "appsync-compiler", version, about, long_about = None)]
struct Args {
    /// API configuration file (YAML or JSON)
    config: PathBuf,

    /// Directory schema, template and code paths are relative to
    #[arg(short, long)]
    service_path: Option<PathBuf>,

    /// Write the result to a file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum)]
    format: Option<OutputFormat>,

    /// Log group retention used when the logging block sets none
    #[arg(long)]
    log_retention_in_days: Option<u32>,

    /// Log level for debugging
    #[arg(long, value_enum, default_value = "off")]
    log_level: LogLevel,

    /// Remember --format, --service-path and --log-retention-in-days
    #[arg(long)]
    save_defaults: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_tracing_level(self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}

fn setup_logging(level: LogLevel) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let Some(tracing_level) = level.to_tracing_level() else {
        return Ok(None);
    };

    let log_path = get_log_path();

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("Failed to open log file {:?}", log_path))?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::fmt()
        .with_max_level(tracing_level)
        .with_writer(non_blocking.with_max_level(tracing_level))
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("appsync-compiler started with log level: {:?}", level);
    tracing::info!("Log file: {:?}", log_path);

    Ok(Some(guard))
}

fn get_log_path() -> PathBuf {
    if let Some(config_dir) = Settings::config_dir() {
        return config_dir.join("appsync-compiler.log");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".appsync-compiler").join("appsync-compiler.log");
    }
    PathBuf::from("appsync-compiler.log")
}

fn main() -> Result<()> {
    let args = Args::parse();

    let _log_guard = setup_logging(args.log_level)?;

    let mut settings = Settings::load();
    if args.save_defaults {
        settings.format = args.format.or(settings.format);
        settings.log_retention_in_days = args.log_retention_in_days.or(settings.log_retention_in_days);
        settings.service_path = args.service_path.clone().or(settings.service_path);
        settings.save().context("Failed to save settings")?;
        tracing::info!("Saved defaults: {:?}", settings);
    }

    let format = settings.effective_format(args.format);
    let service_path = settings.effective_service_path(args.service_path.as_deref(), &args.config);
    let log_retention = settings.effective_log_retention(args.log_retention_in_days);

    let content = std::fs::read_to_string(&args.config)
        .with_context(|| format!("Failed to read {}", args.config.display()))?;

    let fs = LocalFs;
    let ctx = CompileContext::new(&fs, service_path, chrono::Utc::now())
        .with_log_retention(log_retention);
    let compiled = appsync_compiler::compile_str(&content, &ctx)
        .with_context(|| format!("Failed to compile {}", args.config.display()))?;

    let rendered = render(&compiled, format)?;
    match &args.output {
        Some(path) => write_output(path, &rendered)?,
        None => println!("{}", rendered),
    }

    Ok(())
}

fn render(compiled: &CompiledApi, format: OutputFormat) -> Result<String> {
    Ok(match format {
        OutputFormat::Json => serde_json::to_string_pretty(compiled)?,
        OutputFormat::Yaml => serde_yaml::to_string(compiled)?,
    })
}

fn write_output(path: &Path, rendered: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(path, rendered).with_context(|| format!("Failed to write {}", path.display()))?;
    tracing::info!("Wrote {}", path.display());
    Ok(())
}
