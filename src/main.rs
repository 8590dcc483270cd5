//! Clipbatch - Batch Video Transformation
//!
//! Command line entry point. Every transformation prints its JSON response on
//! stdout; progress bars and logs go to stderr and `.clipbatch/log`.

use anyhow::Result;
use clap::Parser;
use std::path::{Path, PathBuf};
use tokio::io::AsyncReadExt;
use tracing::{info, warn, Level};
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use clipbatch::cli::{Args, Commands};
use clipbatch::config::Config;
use clipbatch::display;
use clipbatch::events;
use clipbatch::request::{OperationKind, TransformRequest};
use clipbatch::workflow::Workflow;

const DEFAULT_CONFIG_FILE: &str = "clipbatch.toml";

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    setup_logging(args.verbose)?;

    if let Commands::InitConfig { output, force } = &args.command {
        return init_config(output, *force);
    }

    let config = load_config(args.config.as_deref())?;
    let workflow = Workflow::new(config)?;

    let submission = match args.command {
        Commands::List { folder } => {
            let videos = workflow.list_videos(&folder).await?;
            println!("{}", serde_json::to_string_pretty(&videos)?);
            return Ok(());
        }
        Commands::Check => {
            workflow.check_availability()?;
            let version = workflow.version_info().await?;
            println!("{}", version);
            return Ok(());
        }
        Commands::InitConfig { .. } => return Ok(()),
        Commands::Merge {
            folder,
            output_dir,
            videos,
        } => {
            let request = TransformRequest::new(OperationKind::Merge, folder, videos);
            Submission::Request(with_output(request, output_dir))
        }
        Commands::Trim {
            folder,
            output_dir,
            start,
            duration,
            video,
        } => {
            let mut request = TransformRequest::new(OperationKind::Trim, folder, vec![video]);
            request.parameters.trim_start = start;
            request.parameters.trim_duration = duration;
            Submission::Request(with_output(request, output_dir))
        }
        Commands::Speedup {
            folder,
            output_dir,
            factor,
            videos,
        } => {
            let mut request = TransformRequest::new(OperationKind::Speedup, folder, videos);
            request.parameters.speed_factor = Some(factor.into());
            Submission::Request(with_output(request, output_dir))
        }
        Commands::Timelapse {
            folder,
            output_dir,
            fps,
            videos,
        } => {
            let mut request = TransformRequest::new(OperationKind::Timelapse, folder, videos);
            request.parameters.target_fps = fps.map(Into::into);
            Submission::Request(with_output(request, output_dir))
        }
        Commands::Run { request } => Submission::Json(read_request(&request).await?),
    };

    let (tx, rx) = events::channel();
    let renderer = display::spawn(rx);
    let response = match submission {
        Submission::Request(request) => workflow.handle(request, Some(tx)).await,
        Submission::Json(raw) => workflow.handle_json(&raw, Some(tx)).await,
    };
    // the sender was moved into the workflow and is dropped by now
    if let Err(e) = renderer.await {
        warn!("Progress display ended abnormally: {}", e);
    }

    println!("{}", serde_json::to_string_pretty(&response)?);

    if response.is_success() {
        Ok(())
    } else {
        Err(anyhow::anyhow!("Request failed"))
    }
}

/// A request built from subcommand arguments, or raw JSON still to be parsed
enum Submission {
    Request(TransformRequest),
    Json(String),
}

fn with_output(mut request: TransformRequest, output_dir: Option<PathBuf>) -> TransformRequest {
    request.output_directory = output_dir;
    request
}

/// Read a JSON request from a file, or from stdin when the path is "-"
async fn read_request(path: &Path) -> Result<String> {
    let raw = if path == Path::new("-") {
        let mut raw = String::new();
        tokio::io::stdin().read_to_string(&mut raw).await?;
        raw
    } else {
        tokio::fs::read_to_string(path)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to read request {}: {}", path.display(), e))?
    };
    Ok(raw)
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(config_path) => Config::from_file(config_path)?,
        None => {
            if Path::new(DEFAULT_CONFIG_FILE).exists() {
                info!("Found {} in current directory, loading...", DEFAULT_CONFIG_FILE);
                Config::from_file(DEFAULT_CONFIG_FILE)?
            } else {
                Config::default()
            }
        }
    };
    Ok(config)
}

fn init_config(output: &Path, force: bool) -> Result<()> {
    if output.exists() && !force {
        return Err(anyhow::anyhow!(
            "{} already exists (use --force to overwrite)",
            output.display()
        ));
    }
    Config::default().save_to_file(output)?;
    println!("Wrote default configuration to {}", output.display());
    Ok(())
}

fn setup_logging(verbose: bool) -> Result<()> {
    let log_dir = std::env::current_dir()?.join(".clipbatch").join("log");
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = rolling::daily(&log_dir, "clipbatch.log");
    let (non_blocking_file, guard) = non_blocking(file_appender);
    // flushes on drop; must live until exit
    std::mem::forget(guard);

    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    // stdout carries the JSON response, so console logs go to stderr
    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_file(verbose)
        .with_line_number(verbose);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!(
        "Logging initialized - console: {}, file: {}",
        log_level,
        log_dir.join("clipbatch.log").display()
    );

    Ok(())
}
