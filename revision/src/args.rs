use std::path::PathBuf;

use clap::Parser;

/// ReVision image-to-image backend
#[derive(Debug, Parser)]
#[command(name = "revision", about = "Upload an image and a prompt, get a reimagined image back")]
pub struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "revision.toml", env = "REVISION_CONFIG")]
    pub config: PathBuf,

    /// Override the listen address
    #[arg(long, env = "REVISION_LISTEN")]
    pub listen: Option<std::net::SocketAddr>,

    /// Override the configured log filter (e.g. `debug`)
    #[arg(long, env = "REVISION_LOG")]
    pub log_level: Option<String>,
}
