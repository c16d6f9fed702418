use std::path::PathBuf;

use clap::Parser;

/// Plays one media file through the bridge.
#[derive(Parser, Debug, PartialEq)]
#[command(name = "player", version)]
pub struct PlayerArgs {
    /// Use the in-process loopback engine instead of libmpv
    #[arg(long)]
    pub loopback: bool,

    /// Bridge configuration file (JSON)
    #[arg(long, value_name = "BRIDGE_JSON")]
    pub config: Option<PathBuf>,

    /// Path to the libmpv shared library
    #[arg(long = "libmpv", value_name = "PATH")]
    pub library: Option<PathBuf>,

    /// Media file or URL to play
    pub media: String,
}
