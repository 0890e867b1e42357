use clap::{Parser, Subcommand};

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to config file
    #[clap(short, long)]
    pub config_path: Option<String>,
    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Follow every shard until each catches up, then exit.
    RunOnce,
    /// Follow every shard continuously, sweeping at a fixed interval.
    Run {
        /// Seconds between sweeps once every shard has caught up.
        #[clap(short, long, default_value_t = 2)]
        interval_secs: u64,
    },
}
