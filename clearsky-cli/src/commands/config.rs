//! Configuration management CLI commands.
//!
//! Provides `config get`, `config set`, `config list`, `config path` and
//! `config init` for viewing and editing the settings file.

use clap::Subcommand;
use clearsky::config::{ConfigFile, ConfigKey, PipelineConfig};

use crate::error::CliError;

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Get a configuration value
    Get {
        /// Configuration key in format section.key (e.g., strips.narrow_km)
        key: String,
    },

    /// Set a configuration value
    Set {
        /// Configuration key in format section.key (e.g., strips.narrow_km)
        key: String,

        /// Value to set
        value: String,
    },

    /// List all configuration settings
    List,

    /// Show the configuration file path
    Path,

    /// Write a config file holding the defaults
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Run a config subcommand against the default config file.
pub fn run(command: ConfigCommands) -> Result<(), CliError> {
    run_with(command, &ConfigFile::default())
}

fn run_with(command: ConfigCommands, file: &ConfigFile) -> Result<(), CliError> {
    match command {
        ConfigCommands::Get { key } => run_get(file, &key),
        ConfigCommands::Set { key, value } => run_set(file, &key, &value),
        ConfigCommands::List => run_list(file),
        ConfigCommands::Path => {
            println!("{}", file.path().display());
            Ok(())
        }
        ConfigCommands::Init { force } => run_init(file, force),
    }
}

fn parse_key(key: &str) -> Result<ConfigKey, CliError> {
    key.parse().map_err(|_| {
        CliError::Config(format!(
            "Unknown configuration key '{}'. Use 'clearsky config list' to see available keys.",
            key
        ))
    })
}

fn run_get(file: &ConfigFile, key: &str) -> Result<(), CliError> {
    let config_key = parse_key(key)?;
    let value = config_key.get(&file.load()?);

    if value.is_empty() {
        println!("(not set)");
    } else {
        println!("{}", value);
    }
    Ok(())
}

fn run_set(file: &ConfigFile, key: &str, value: &str) -> Result<(), CliError> {
    let config_key = parse_key(key)?;

    let mut config = file.load()?;
    config_key
        .set(&mut config, value)
        .map_err(|e| CliError::Config(e.to_string()))?;
    file.save(&config)?;

    println!("Set {} = {}", config_key, value);
    Ok(())
}

fn run_list(file: &ConfigFile) -> Result<(), CliError> {
    let config = file.load()?;

    println!("Configuration Settings");
    println!("======================");
    println!();

    let mut current_section = "";
    for key in ConfigKey::all() {
        let section = key.section();
        if section != current_section {
            if !current_section.is_empty() {
                println!();
            }
            println!("[{}]", section);
            current_section = section;
        }

        let value = key.get(&config);
        if value.is_empty() {
            println!("  {} = (not set)", key.key_name());
        } else {
            println!("  {} = {}", key.key_name(), value);
        }
    }
    Ok(())
}

fn run_init(file: &ConfigFile, force: bool) -> Result<(), CliError> {
    if file.exists() && !force {
        return Err(CliError::Config(format!(
            "{} already exists. Use --force to overwrite.",
            file.path().display()
        )));
    }
    file.save(&PipelineConfig::default())?;
    println!("Wrote {}", file.path().display());
    Ok(())
}
