use std::env;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::commands;
use crate::config::load_config;

#[derive(Debug, Parser)]
#[command(name = "grimshade", about = "Stylized image processing client")]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the preset catalog
    Presets,
    /// Fetch and print the color tints offered by the service
    Tints(ServiceArgs),
    /// Upload an image and render every preset preview
    Batch(BatchArgs),
    /// Export a full-resolution render of one preset
    Download(DownloadArgs),
    /// Interactive editing session
    Session(SessionArgs),
}

#[derive(Debug, Args, Clone)]
struct ServiceArgs {
    #[arg(long, default_value = "grimshade.yaml")]
    config: PathBuf,
    /// Override the service base URL from the config file
    #[arg(long)]
    service_url: Option<String>,
    #[arg(long)]
    verbose: bool,
}

#[derive(Debug, Args)]
struct BatchArgs {
    #[command(flatten)]
    service: ServiceArgs,
    /// Image to upload
    image: PathBuf,
    /// Color tint applied to every preview
    #[arg(long)]
    tint: Option<String>,
    /// Preserve the source aspect ratio
    #[arg(long)]
    preserve_aspect: bool,
    /// Download every successfully rendered target into this directory
    #[arg(long)]
    download_to: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct DownloadArgs {
    #[command(flatten)]
    service: ServiceArgs,
    /// Image to upload
    image: PathBuf,
    /// Preset name, or "custom" for the live parameter set
    #[arg(long, default_value = "custom")]
    preset: String,
    #[arg(long)]
    tint: Option<String>,
    /// Requested export edge length
    #[arg(long)]
    size: Option<u32>,
    #[arg(long)]
    preserve_aspect: bool,
    /// Output directory
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct SessionArgs {
    #[command(flatten)]
    service: ServiceArgs,
    /// Image to upload
    image: PathBuf,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Presets => {
                commands::presets();
                Ok(())
            }
            Command::Tints(args) => {
                let config = setup(&args)?;
                commands::tints(config).await
            }
            Command::Batch(args) => {
                let config = setup(&args.service)?;
                commands::batch(
                    config,
                    args.image,
                    args.tint,
                    args.preserve_aspect,
                    args.download_to,
                )
                .await
            }
            Command::Download(args) => {
                let mut config = setup(&args.service)?;
                if let Some(size) = args.size {
                    config.output_size = Some(size);
                }
                commands::download(
                    config,
                    args.image,
                    args.preset,
                    args.tint,
                    args.preserve_aspect,
                    args.out,
                )
                .await
            }
            Command::Session(args) => {
                let config = setup(&args.service)?;
                commands::session(config, args.image).await
            }
        }
    }
}

fn setup(args: &ServiceArgs) -> anyhow::Result<crate::config::CliConfig> {
    init_tracing(args.verbose);
    let mut config = load_config(&args.config)?;
    if let Some(url) = &args.service_url {
        config.service_url = url.clone();
    }
    Ok(config)
}

fn init_tracing(verbose: bool) {
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", if verbose { "debug" } else { "warn" });
    }
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
