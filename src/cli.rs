use clap::{Parser, Subcommand};

fn get_version() -> &'static str {
    const BASE_VERSION: &str = env!("CARGO_PKG_VERSION");

    // Release builds are tagged; use the tag as-is
    if let Some(tag) = option_env!("PIE_FETCH_GIT_TAG") {
        return tag;
    }

    let commit = option_env!("PIE_FETCH_GIT_COMMIT").unwrap_or("unknown");
    let branch = option_env!("PIE_FETCH_GIT_BRANCH").unwrap_or("unknown");

    // Computed once at startup
    let version = format!("v{}-{} ({})", BASE_VERSION, commit, branch);
    Box::leak(version.into_boxed_str())
}

#[derive(Parser)]
#[command(name = "pie-fetch")]
#[command(about = "Download, verify and install the proxy inference engine")]
#[command(version = get_version(), propagate_version = true)]
pub struct Cli {
    /// Increase verbosity (use multiple times for more detail)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Reduce output to errors only
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the engine binary path, installing it first if needed
    Path,

    /// Install the engine
    #[command(after_help = "Examples:\n  pie-fetch install\n  pie-fetch install --engine-version 1.2.0\n  pie-fetch install --channel beta --force")]
    Install {
        /// Release channel (defaults to the configured channel)
        #[arg(long)]
        channel: Option<String>,
        /// Exact version to install instead of the channel's latest
        #[arg(long = "engine-version", value_name = "VERSION")]
        engine_version: Option<String>,
        /// Reinstall even if the engine is already present
        #[arg(long)]
        force: bool,
    },

    /// Install the channel's latest version if it differs from the installed one
    Update {
        #[arg(long)]
        channel: Option<String>,
    },

    /// Report whether an update is available
    Check {
        #[arg(long)]
        channel: Option<String>,
    },

    /// Show the installed engine version
    Version,

    /// Inspect pie-fetch's configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show the effective settings (config file plus environment)
    Show {
        /// Output format (json, yaml)
        #[arg(long, default_value = "json")]
        format: String,
    },
    /// Print the config file location
    Path,
}
