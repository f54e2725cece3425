//! cloudbridge: operator tool for the configured storage backends.
//!
//! Reads the same environment as the bridge itself (`CLOUDBRIDGE_*` plus
//! `<BACKEND>_<FIELD>` credentials, optionally from `.env`).

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use cloudbridge_cli::{backend_statuses, init_tracing, local_url, remote_path_for_file};
use cloudbridge_core::{AppError, BackendKind, BridgeConfig, ErrorMetadata, LogLevel};
use cloudbridge_services::BridgeContext;
use cloudbridge_storage::{StorageAdapter, StorageAdapterExt};
use serde::Serialize;
use serde_json::json;

#[derive(Parser)]
#[command(name = "cloudbridge", about = "Multi-cloud asset storage bridge")]
struct Cli {
    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List backends, whether they are enabled and configured, and the default
    Backends,
    /// Run a connection test against one backend, or every registered one
    Test {
        /// Backend id (e.g. aws_s3); all registered backends when omitted
        backend: Option<String>,
    },
    /// Upload one file
    Upload {
        /// File under the local storage root
        file: PathBuf,
        /// Backend id; defaults to CLOUDBRIDGE_DEFAULT_BACKEND
        #[arg(long)]
        backend: Option<String>,
        /// Remote path; defaults to the file path relative to the local root
        #[arg(long)]
        remote: Option<String>,
    },
    /// Delete one remote object
    Delete {
        /// Remote path, e.g. 2024/01/photo.jpg
        remote: String,
        #[arg(long)]
        backend: Option<String>,
    },
    /// Print the public URL of a remote path
    Url {
        remote: String,
        #[arg(long)]
        backend: Option<String>,
    },
}

fn print_json(value: &impl Serialize) -> Result<(), AppError> {
    let out = serde_json::to_string_pretty(value)?;
    println!("{}", out);
    Ok(())
}

fn parse_backend(id: Option<&str>, config: &BridgeConfig) -> Result<BackendKind, AppError> {
    match id {
        Some(id) => id
            .parse::<BackendKind>()
            .map_err(|e| AppError::InvalidInput(e.to_string())),
        None => Ok(config.default_backend),
    }
}

fn adapter_for(
    context: &BridgeContext,
    kind: BackendKind,
) -> Result<Arc<dyn StorageAdapter>, AppError> {
    context.registry.get(kind).ok_or_else(|| {
        AppError::Config(format!(
            "{} is not enabled or not fully configured",
            kind.display_name()
        ))
    })
}

async fn run(cli: Cli) -> Result<(), AppError> {
    let config = BridgeConfig::from_env().map_err(|e| AppError::Config(e.to_string()))?;
    let context = BridgeContext::from_config(config)?;
    let config = &context.config;

    match cli.command {
        Commands::Backends => {
            let statuses = backend_statuses(config, &context.registry);
            if cli.json {
                print_json(&statuses)?;
            } else {
                for status in statuses {
                    let state = if status.registered {
                        "ready"
                    } else if status.enabled {
                        "enabled, incomplete"
                    } else {
                        "disabled"
                    };
                    let marker = if status.default { " (default)" } else { "" };
                    println!("{:<16} {:<20} {}{}", status.id, status.name, state, marker);
                    if status.enabled && !status.missing_fields.is_empty() {
                        println!("{:<16} missing: {}", "", status.missing_fields.join(", "));
                    }
                }
            }
        }

        Commands::Test { backend } => {
            let results: BTreeMap<BackendKind, bool> = match backend {
                Some(id) => {
                    let kind = parse_backend(Some(id.as_str()), config)?;
                    let adapter = adapter_for(&context, kind)?;
                    BTreeMap::from([(kind, adapter.check_connection().await)])
                }
                None => context.registry.test_all().await,
            };

            if cli.json {
                print_json(&results)?;
            } else if results.is_empty() {
                println!("No remote backends registered");
            } else {
                for (kind, ok) in &results {
                    println!("{:<16} {}", kind.as_str(), if *ok { "ok" } else { "FAILED" });
                }
            }

            let failed = results.values().filter(|ok| !**ok).count();
            if failed > 0 {
                return Err(AppError::Storage(format!(
                    "{} backend connection test(s) failed",
                    failed
                )));
            }
        }

        Commands::Upload {
            file,
            backend,
            remote,
        } => {
            let kind = parse_backend(backend.as_deref(), config)?;
            let adapter = adapter_for(&context, kind)?;
            let remote_path = match remote {
                Some(remote) => remote,
                None => remote_path_for_file(&config.local_root, &file)?,
            };

            let url = adapter
                .upload_file(&file, &remote_path)
                .await
                .map_err(|e| AppError::Storage(e.to_string()))?;

            if cli.json {
                print_json(&json!({
                    "backend": kind,
                    "remote_path": remote_path,
                    "url": url,
                }))?;
            } else {
                println!("{}", url);
            }
        }

        Commands::Delete { remote, backend } => {
            let kind = parse_backend(backend.as_deref(), config)?;
            let adapter = adapter_for(&context, kind)?;
            adapter
                .delete_file(&remote)
                .await
                .map_err(|e| AppError::Storage(e.to_string()))?;

            if cli.json {
                print_json(&json!({ "backend": kind, "remote_path": remote, "deleted": true }))?;
            } else {
                println!("Deleted {} from {}", remote, kind.display_name());
            }
        }

        Commands::Url { remote, backend } => {
            let kind = parse_backend(backend.as_deref(), config)?;
            let url = if kind.is_local() {
                local_url(config, &remote)
            } else {
                adapter_for(&context, kind)?.get_file_url(&remote).await
            };
            if url.is_empty() {
                return Err(AppError::NotFound(format!(
                    "No URL known for {} on {}",
                    remote,
                    kind.display_name()
                )));
            }

            if cli.json {
                print_json(&json!({ "backend": kind, "remote_path": remote, "url": url }))?;
            } else {
                println!("{}", url);
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        let (code, recoverable) = (e.error_code(), e.is_recoverable());
        match e.log_level() {
            LogLevel::Debug => tracing::debug!(error_code = code, recoverable, "Command failed"),
            LogLevel::Warn => tracing::warn!(error_code = code, recoverable, "Command failed"),
            LogLevel::Error => tracing::error!(error_code = code, recoverable, "Command failed"),
        }
        eprintln!("Error: {}", e.detailed_message());
        std::process::exit(e.exit_code());
    }
}
