//! TerraHub configuration resolver
//!
//! Discovers the project's root config, resolves every component and prints
//! the result.

use anyhow::{Context, Result};
use clap::Parser;
use std::fs::OpenOptions;
use terrahub_config::cli::{Cli, Command, parse_scalar};
use terrahub_config::config::{ConfigLoader, Environment, ListOptions, LoaderSettings};
use terrahub_config::format::{format_components, format_forest};
use tracing::{Level, debug, info};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

fn env_filter(level: Level) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level).into())
        .from_env_lossy()
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on --log option
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    match cli.log.as_str() {
        "0" | "off" => {
            // No logging
        }
        "1" | "stdout" => {
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(env_filter(level))
                .with_writer(std::io::stdout)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        "2" | "stderr" => {
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(env_filter(level))
                .with_writer(std::io::stderr)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        filename => {
            // Log to file (append mode)
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(filename)
                .with_context(|| format!("Failed to open log file {}", filename))?;
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(env_filter(level))
                .with_writer(file)
                .with_ansi(false)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }

    // CLI flags override the environment
    let mut settings = LoaderSettings::from_env().context("Failed to read loader settings")?;
    if let Some(dir) = cli.dir {
        settings.start_dir = dir;
    }
    if let Some(env) = cli.env {
        settings = settings.with_environment(Environment::named(env));
    }
    debug!(start = %settings.start_dir.display(), environment = %settings.environment, "Loading configuration");

    let mut loader = ConfigLoader::load_with_settings(settings).context("Failed to discover root config")?;

    match cli.command {
        Command::Root => match loader.root_document() {
            Some(root) => println!("{}", root.path.display()),
            None => println!(
                "Project is not configured: no {} with a `project` section found from {}",
                loader.default_file_name(),
                loader.settings().start_dir.display()
            ),
        },
        Command::List { kind, path } => {
            let options = ListOptions {
                dir: path,
                kind: kind.to_kind(loader.environment()),
            };
            let files = loader
                .list_config(&options)
                .context("Failed to list config files")?;
            for file in files {
                println!("{}", file.display());
            }
        }
        Command::Resolve { format } => {
            let components = loader.resolve().context("Failed to resolve components")?;
            print!("{}", ensure_newline(format_components(components, format)?));
        }
        Command::Tree { format } => {
            let forest = loader.forest().context("Failed to build dependency forest")?;
            print!("{}", ensure_newline(format_forest(&forest, format)?));
        }
        Command::Set { key, value } => {
            loader
                .set_project_value(&key, parse_scalar(&value))
                .with_context(|| format!("Failed to set project.{}", key))?;
            info!(key = %key, "Project setting saved");
        }
    }

    Ok(())
}

fn ensure_newline(mut text: String) -> String {
    if !text.is_empty() && !text.ends_with('\n') {
        text.push('\n');
    }
    text
}
