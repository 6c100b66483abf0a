use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "xkey",
    about = "Secondary-key index for cached objects: replay, digest, config",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Log index activity (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// TOML configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Replay a JSON scenario against an in-memory cache
    Replay(ReplayArgs),
    /// Print the digest of each key
    Digest(DigestArgs),
    /// Print the effective configuration
    Config,
}

#[derive(Args)]
pub struct ReplayArgs {
    pub scenario: PathBuf,
    /// Audit the index after every step
    #[arg(long)]
    pub verify: bool,
}

#[derive(Args)]
pub struct DigestArgs {
    #[arg(required = true)]
    pub keys: Vec<String>,
}
