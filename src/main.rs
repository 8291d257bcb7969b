//! Showroom - interactive viewer for a single glTF model
//!
//! Usage:
//!   showroom [--config <viewer.toml>] [--model <path>] [--environment <path>] [--output-dir <dir>]

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use showroom::config::ViewerConfig;

#[derive(Parser)]
#[command(name = "showroom")]
#[command(about = "Look at a glTF model under an HDR environment and an orbiting spotlight")]
struct Args {
    /// Viewer configuration file (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// glTF or GLB model to show
    #[arg(long)]
    model: Option<PathBuf>,

    /// Equirectangular .hdr environment map
    #[arg(long)]
    environment: Option<PathBuf>,

    /// Directory the screenshot is written to
    #[arg(long)]
    output_dir: Option<PathBuf>,
}

impl Args {
    fn into_config(self) -> Result<ViewerConfig> {
        let mut config = match &self.config {
            Some(path) => ViewerConfig::load(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => ViewerConfig::default(),
        };

        if let Some(model) = self.model {
            config.assets.model = model;
        }
        if let Some(environment) = self.environment {
            config.assets.environment_map = environment;
        }
        if let Some(directory) = self.output_dir {
            config.output.directory = directory;
        }
        Ok(config)
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Args::parse().into_config()?;
    info!(
        "Showing {} under {}",
        config.assets.model.display(),
        config.assets.environment_map.display()
    );

    showroom::app::run(config)
}
