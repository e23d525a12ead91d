#![forbid(unsafe_code)]

//! `cnd-state` — inspect and maintain the development session registry.
//!
//! A thin front end over the library: resolves configuration, loads the
//! manifest when a command needs one, and prints results.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::error;
use tracing_subscriber::{fmt, EnvFilter};

use cnd_state::models::manifest::DevEnvironment;
use cnd_state::{AppError, GlobalConfig, ManifestLoader, Result, SessionRegistry};

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "cnd-state", about = "Development session registry", version, long_about = None)]
struct Cli {
    /// Optional TOML file overriding state locations.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log output format (text or json).
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Args)]
struct Target {
    /// Path to the manifest file.
    #[arg(short = 'f', long, default_value = "cnd.yml")]
    manifest: PathBuf,

    /// Namespace of the deployment; defaults to the configured namespace.
    #[arg(short = 'n', long)]
    namespace: Option<String>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List recorded sessions.
    List {
        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Show the session for a manifest.
    Status {
        #[command(flatten)]
        target: Target,
    },

    /// Record that an agent is serving the session for a manifest.
    Register {
        #[command(flatten)]
        target: Target,
        /// Handle of the synchronization agent.
        #[arg(long)]
        agent: String,
    },

    /// Detach the agent from a session, keeping the record.
    Stop {
        #[command(flatten)]
        target: Target,
    },

    /// Remove the session for a manifest.
    Delete {
        #[command(flatten)]
        target: Target,
    },

    /// Print the resource names derived from a manifest.
    Names {
        /// Path to the manifest file.
        #[arg(short = 'f', long, default_value = "cnd.yml")]
        manifest: PathBuf,
    },
}

fn main() -> ExitCode {
    let args = Cli::parse();
    if let Err(err) = init_tracing(args.log_format) {
        eprintln!("{err}");
        return ExitCode::FAILURE;
    }

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(%err, "command failed");
            eprintln!("Error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Cli) -> Result<()> {
    let config = match &args.config {
        Some(path) => GlobalConfig::load_from_path(path)?,
        None => GlobalConfig::from_env()?,
    };
    let registry = SessionRegistry::new(config.state_path());

    match args.command {
        Command::List { json } => {
            let sessions = registry.all()?;
            if json {
                let rendered = serde_json::to_string_pretty(&sessions)
                    .map_err(|err| AppError::Io(format!("failed to render sessions: {err}")))?;
                println!("{rendered}");
            } else if sessions.is_empty() {
                println!("No sessions recorded");
            } else {
                for (key, record) in &sessions {
                    let agent = if record.agent_handle.is_empty() {
                        "-"
                    } else {
                        record.agent_handle.as_str()
                    };
                    println!("{key}\t{agent}\t{}", record.folder.display());
                }
            }
        }
        Command::Status { target } => {
            let (namespace, dev) = resolve_target(&config, &target)?;
            let record = registry.get(&namespace, &dev)?;
            println!("folder: {}", record.folder.display());
            println!("agent:  {}", record.agent_handle);
        }
        Command::Register { target, agent } => {
            let (namespace, dev) = resolve_target(&config, &target)?;
            registry.insert(&namespace, &dev, &agent)?;
        }
        Command::Stop { target } => {
            let (namespace, dev) = resolve_target(&config, &target)?;
            registry.stop(&namespace, &dev)?;
        }
        Command::Delete { target } => {
            let (namespace, dev) = resolve_target(&config, &target)?;
            registry.delete(&namespace, &dev)?;
        }
        Command::Names { manifest } => {
            let dev = ManifestLoader::load(&manifest, &config.home_dir)?;
            println!("annotation:     {}", dev.manifest_annotation_key());
            println!("init container: {}", dev.init_sync_container_name());
            println!("volume:         {}", dev.sync_volume_name());
            println!("mount path:     {}", dev.sync_mount_path());
        }
    }

    Ok(())
}

fn resolve_target(config: &GlobalConfig, target: &Target) -> Result<(String, DevEnvironment)> {
    let dev = ManifestLoader::load(&target.manifest, &config.home_dir)?;
    let namespace = target
        .namespace
        .clone()
        .unwrap_or_else(|| config.default_namespace.clone());
    Ok((namespace, dev))
}

fn init_tracing(log_format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let subscriber = fmt().with_env_filter(env_filter).with_writer(std::io::stderr);

    match log_format {
        LogFormat::Text => subscriber
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
        LogFormat::Json => subscriber
            .json()
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
    }

    Ok(())
}
