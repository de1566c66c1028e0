mod cli;

use anyhow::{anyhow, Result};
use clap::Parser;
use cli::{Cli, Commands, ConfigAction};
use console::style;
use pie_fetch::config::{get_config_file_path, load_settings};
use pie_fetch::{EngineInstaller, InstallError, Settings};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = setup_logging(&cli) {
        eprintln!("{} {}", style("error:").red().bold(), e);
        std::process::exit(1);
    }

    if let Err(e) = run(cli).await {
        eprintln!("{} {:#}", style("error:").red().bold(), e);
        let code = e.downcast_ref::<InstallError>().map_or(1, exit_code);
        std::process::exit(code);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut settings = load_settings()?;
    settings.show_progress = !cli.quiet;

    match cli.command {
        Commands::Path => {
            let installer = EngineInstaller::new(&settings)?;
            let path = installer.engine_path().await?;
            println!("{}", path.display());
        }

        Commands::Install {
            channel,
            engine_version,
            force,
        } => {
            if let Some(channel) = channel {
                settings.channel = channel;
            }
            let installer = EngineInstaller::new(&settings)?;

            if force || engine_version.is_some() {
                let version = installer
                    .download_engine(&settings.channel, engine_version.as_deref())
                    .await?;
                status(&format!(
                    "Engine {} installed to {}",
                    version,
                    installer.layout().binary_path().display()
                ));
            } else {
                let path = installer.ensure_installed().await?;
                let version = installer
                    .installed_version()?
                    .unwrap_or_else(|| "unknown".to_string());
                status(&format!("Engine {} is installed at {}", version, path.display()));
            }
        }

        Commands::Update { channel } => {
            let channel = channel.unwrap_or_else(|| settings.channel.clone());
            let installer = EngineInstaller::new(&settings)?;

            if installer.installed_version()?.is_none() {
                return Err(anyhow!(
                    "no engine installed yet; run `pie-fetch install` first"
                ));
            }

            match installer.update(&channel).await? {
                Some(version) => status(&format!("Engine updated to {}", version)),
                None => status("Engine is up to date"),
            }
        }

        Commands::Check { channel } => {
            let channel = channel.unwrap_or_else(|| settings.channel.clone());
            let installer = EngineInstaller::new(&settings)?;

            match installer.check_for_updates(&channel).await? {
                Some(latest) => {
                    let installed = installer.installed_version()?.unwrap_or_default();
                    println!("Update available: {} -> {}", installed, latest);
                    println!("Run `pie-fetch update` to install it.");
                }
                None if installer.installed_version()?.is_none() => {
                    println!("No engine installed.");
                }
                None => println!("Engine is up to date."),
            }
        }

        Commands::Version => {
            let installer = EngineInstaller::new(&settings)?;
            println!("pie-fetch v{}", env!("CARGO_PKG_VERSION"));
            match installer.installed_version()? {
                Some(version) => println!("engine {}", version),
                None => println!("engine not installed"),
            }
        }

        Commands::Config { action } => match action {
            ConfigAction::Show { format } => print_settings(&settings, &format)?,
            ConfigAction::Path => println!("{}", get_config_file_path()?.display()),
        },
    }

    Ok(())
}

fn setup_logging(cli: &Cli) -> Result<()> {
    use tracing_subscriber::{fmt, EnvFilter};

    let level = if cli.quiet {
        "error"
    } else if cli.verbose == 0 {
        "warn"
    } else if cli.verbose == 1 {
        "info"
    } else {
        "debug"
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow!("failed to initialise logging: {}", e))
}

fn status(message: &str) {
    eprintln!("{} {}", style("==>").green().bold(), message);
}

fn print_settings(settings: &Settings, format: &str) -> Result<()> {
    match format {
        "json" => println!("{}", serde_json::to_string_pretty(settings)?),
        "yaml" => print!("{}", serde_yaml::to_string(settings)?),
        other => return Err(anyhow!("unknown format '{}', expected json or yaml", other)),
    }
    Ok(())
}

/// Process exit status for each failure class, so scripts can tell them apart.
fn exit_code(err: &InstallError) -> i32 {
    match err {
        InstallError::Configuration { .. } | InstallError::Settings(_) => 2,
        InstallError::LockTimeout { .. } => 3,
        InstallError::ManifestFetch { .. } => 4,
        InstallError::VersionNotFound { .. } => 5,
        InstallError::Download { .. } => 6,
        InstallError::Integrity { .. } | InstallError::UnverifiedArtifact { .. } => 7,
        InstallError::Extract(_) | InstallError::InstallIncomplete { .. } => 8,
        InstallError::Io(_) => 1,
    }
}
