//! Options and helpers shared across CLI commands.

use std::path::PathBuf;

use clap::Args;
use clearsky::config::{ConfigFile, PipelineConfig};
use clearsky::source::JsonDataSource;

use crate::error::CliError;

/// Where the input layers come from.
#[derive(Debug, Clone, Default, Args)]
pub struct DataArgs {
    /// Directory holding the order, visibility, inventory and weather files
    #[arg(long, value_name = "DIR")]
    pub data: Option<PathBuf>,

    /// Config file to use instead of the default location
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

impl DataArgs {
    /// Config file named on the command line, or the default one.
    pub fn config_file(&self) -> ConfigFile {
        self.config
            .as_ref()
            .map(|path| ConfigFile::new(path.clone()))
            .unwrap_or_default()
    }

    /// Load configuration and apply the `--data` override.
    pub fn load_config(&self) -> Result<PipelineConfig, CliError> {
        let config = self.config_file().load()?;
        Ok(match &self.data {
            Some(dir) => config.with_data_dir(dir.clone()),
            None => config,
        })
    }

    /// Data source for a loaded configuration.
    pub fn source(config: &PipelineConfig) -> JsonDataSource {
        JsonDataSource::from_settings(&config.data)
    }
}

/// Render an optional number, `"Not found"` when absent.
pub fn format_opt(value: Option<f64>, precision: usize) -> String {
    match value {
        Some(v) => format!("{:.*}", precision, v),
        None => clearsky::model::NOT_FOUND.to_string(),
    }
}
