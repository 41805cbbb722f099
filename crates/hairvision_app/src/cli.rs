use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Debug, Parser, Clone)]
#[command(
    name = "hairvision",
    version,
    about = "Submit portraits to a HairVision backend and follow the reconstruction"
)]
pub struct Cli {
    /// Client configuration file (RON)
    #[arg(long, global = true, default_value = "hairvision.ron", env = "HAIRVISION_CONFIG")]
    pub config: PathBuf,

    /// Where log output goes
    #[arg(long, global = true, value_enum, default_value_t = LogTarget::File, env = "HAIRVISION_LOG")]
    pub log: LogTarget,

    /// Log at debug level
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Backend to talk to; defaults to the configured one
    #[arg(long, global = true, value_enum, env = "HAIRVISION_TARGET")]
    pub target: Option<TargetArg>,

    /// Base URL of the local processing backend
    #[arg(long, global = true, env = "HAIRVISION_LOCAL_URL")]
    pub local_url: Option<String>,

    /// Base URL of the remote processing backend
    #[arg(long, global = true, env = "HAIRVISION_REMOTE_URL")]
    pub remote_url: Option<String>,

    /// Base URL of the local classifier
    #[arg(long, global = true, env = "HAIRVISION_LOCAL_CLASSIFY_URL")]
    pub local_classify_url: Option<String>,

    /// Base URL of the remote classifier
    #[arg(long, global = true, env = "HAIRVISION_REMOTE_CLASSIFY_URL")]
    pub remote_classify_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Upload an image and stream the reconstruction log until it finishes
    Run(RunArgs),
    /// Classify the hairstyle in an image
    Classify {
        /// Image to classify
        file: PathBuf,
    },
    /// Show the backend's process summary
    Status,
    /// List finished jobs recorded on this machine
    History {
        /// Number of most recent entries to show
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
}

#[derive(Debug, Args, Clone)]
pub struct RunArgs {
    /// Image to upload
    pub file: PathBuf,

    /// Download both models into this directory when the job succeeds
    #[arg(long, env = "HAIRVISION_DOWNLOAD_DIR")]
    pub download_dir: Option<PathBuf>,

    /// Do not record the job in the history file
    #[arg(long)]
    pub no_history: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogTarget {
    Terminal,
    File,
    Both,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TargetArg {
    Local,
    Remote,
}
