//! Pipeline configuration and its INI file.
//!
//! Settings live in `~/.config/clearsky/config.ini` (platform config dir):
//!
//! ```ini
//! [selection]
//! respect_ona = true
//! ona_tiers = 35,30,25,20,15
//! days_offset = 0
//!
//! [strips]
//! narrow_km = 15
//! wide_km = 60
//! max_columns = 369
//! max_rows = 853
//! orientation = north_south
//!
//! [cloud]
//! cloud_code = 0
//! threshold = 15
//!
//! [data]
//! directory = data
//! orders = orders.geojson
//! visibility = visibility.geojson
//! inventory = inventory.json
//! weather = weather
//! ```
//!
//! Missing keys fall back to the `DEFAULT_*` values below; command-line flags
//! override whatever the file says.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use ini::Ini;
use tracing::debug;

use crate::cloud::{GridVectorizer, DEFAULT_CLOUD_CODE};
use crate::error::{CsiError, CsiResult};
use crate::metrics::{MetricsCollector, DEFAULT_CLOUD_THRESHOLD};
use crate::tiler::{
    StripOrientation, Tiler, DEFAULT_MAX_COLUMNS, DEFAULT_MAX_ROWS, DEFAULT_NARROW_KM,
    DEFAULT_WIDE_KM,
};
use crate::visibility::{VisibilitySelector, CURRENT_PASS, DEFAULT_ONA_TIERS};

/// Default input directory, relative to the working directory.
pub const DEFAULT_DATA_DIR: &str = "data";

/// Default order layer file name.
pub const DEFAULT_ORDERS_FILE: &str = "orders.geojson";

/// Default visibility layer file name.
pub const DEFAULT_VISIBILITY_FILE: &str = "visibility.geojson";

/// Default inventory log file name.
pub const DEFAULT_INVENTORY_FILE: &str = "inventory.json";

/// Default weather raster file stem (`<stem>_<rev>.json`, then `<stem>.json`).
pub const DEFAULT_WEATHER_STEM: &str = "weather";

/// Visibility selection settings.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionSettings {
    pub respect_ona: bool,
    pub ona_tiers: Vec<i32>,
    pub days_offset: i32,
}

impl Default for SelectionSettings {
    fn default() -> Self {
        Self {
            respect_ona: true,
            ona_tiers: DEFAULT_ONA_TIERS.to_vec(),
            days_offset: CURRENT_PASS,
        }
    }
}

/// Strip tiling settings.
#[derive(Debug, Clone, PartialEq)]
pub struct StripSettings {
    pub narrow_km: f64,
    pub wide_km: f64,
    pub max_columns: usize,
    pub max_rows: usize,
    pub orientation: StripOrientation,
}

impl Default for StripSettings {
    fn default() -> Self {
        Self {
            narrow_km: DEFAULT_NARROW_KM,
            wide_km: DEFAULT_WIDE_KM,
            max_columns: DEFAULT_MAX_COLUMNS,
            max_rows: DEFAULT_MAX_ROWS,
            orientation: StripOrientation::default(),
        }
    }
}

/// Cloud masking and inventory settings.
#[derive(Debug, Clone, PartialEq)]
pub struct CloudSettings {
    pub cloud_code: u8,
    pub threshold: f64,
}

impl Default for CloudSettings {
    fn default() -> Self {
        Self {
            cloud_code: DEFAULT_CLOUD_CODE,
            threshold: DEFAULT_CLOUD_THRESHOLD,
        }
    }
}

/// Input file locations.
#[derive(Debug, Clone, PartialEq)]
pub struct DataSettings {
    pub directory: PathBuf,
    pub orders: String,
    pub visibility: String,
    pub inventory: String,
    pub weather: String,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self {
            directory: PathBuf::from(DEFAULT_DATA_DIR),
            orders: DEFAULT_ORDERS_FILE.to_string(),
            visibility: DEFAULT_VISIBILITY_FILE.to_string(),
            inventory: DEFAULT_INVENTORY_FILE.to_string(),
            weather: DEFAULT_WEATHER_STEM.to_string(),
        }
    }
}

/// Complete pipeline configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineConfig {
    pub selection: SelectionSettings,
    pub strips: StripSettings,
    pub cloud: CloudSettings,
    pub data: DataSettings,
}

impl PipelineConfig {
    /// Enable or disable the ONA tier sweep.
    pub fn with_respect_ona(mut self, respect_ona: bool) -> Self {
        self.selection.respect_ona = respect_ona;
        self
    }

    pub fn with_ona_tiers(mut self, tiers: Vec<i32>) -> Self {
        self.selection.ona_tiers = tiers;
        self
    }

    /// Set the input directory.
    pub fn with_data_dir(mut self, directory: impl Into<PathBuf>) -> Self {
        self.data.directory = directory.into();
        self
    }

    /// Set the strip size in kilometres.
    pub fn with_strip_lengths(mut self, narrow_km: f64, wide_km: f64) -> Self {
        self.strips.narrow_km = narrow_km;
        self.strips.wide_km = wide_km;
        self
    }

    pub fn with_cloud_threshold(mut self, threshold: f64) -> Self {
        self.cloud.threshold = threshold;
        self
    }

    pub fn selector(&self) -> VisibilitySelector {
        VisibilitySelector::new()
            .with_tiers(self.selection.ona_tiers.iter().copied())
            .with_days_offset(self.selection.days_offset)
            .with_respect_ona(self.selection.respect_ona)
    }

    pub fn tiler(&self) -> Tiler {
        Tiler::new(self.strips.narrow_km, self.strips.wide_km)
            .with_max_grid(self.strips.max_columns, self.strips.max_rows)
            .with_orientation(self.strips.orientation)
    }

    pub fn vectorizer(&self) -> GridVectorizer {
        GridVectorizer::new().with_cloud_code(self.cloud.cloud_code)
    }

    pub fn metrics(&self) -> MetricsCollector {
        MetricsCollector::new().with_threshold(self.cloud.threshold)
    }
}

/// Every setting the config file understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKey {
    SelectionRespectOna,
    SelectionOnaTiers,
    SelectionDaysOffset,
    StripsNarrowKm,
    StripsWideKm,
    StripsMaxColumns,
    StripsMaxRows,
    StripsOrientation,
    CloudCode,
    CloudThreshold,
    DataDirectory,
    DataOrders,
    DataVisibility,
    DataInventory,
    DataWeather,
}

impl ConfigKey {
    /// All keys in file order.
    pub fn all() -> &'static [ConfigKey] {
        use ConfigKey::*;
        &[
            SelectionRespectOna,
            SelectionOnaTiers,
            SelectionDaysOffset,
            StripsNarrowKm,
            StripsWideKm,
            StripsMaxColumns,
            StripsMaxRows,
            StripsOrientation,
            CloudCode,
            CloudThreshold,
            DataDirectory,
            DataOrders,
            DataVisibility,
            DataInventory,
            DataWeather,
        ]
    }

    pub fn section(&self) -> &'static str {
        use ConfigKey::*;
        match self {
            SelectionRespectOna | SelectionOnaTiers | SelectionDaysOffset => "selection",
            StripsNarrowKm | StripsWideKm | StripsMaxColumns | StripsMaxRows
            | StripsOrientation => "strips",
            CloudCode | CloudThreshold => "cloud",
            DataDirectory | DataOrders | DataVisibility | DataInventory | DataWeather => "data",
        }
    }

    pub fn key_name(&self) -> &'static str {
        use ConfigKey::*;
        match self {
            SelectionRespectOna => "respect_ona",
            SelectionOnaTiers => "ona_tiers",
            SelectionDaysOffset => "days_offset",
            StripsNarrowKm => "narrow_km",
            StripsWideKm => "wide_km",
            StripsMaxColumns => "max_columns",
            StripsMaxRows => "max_rows",
            StripsOrientation => "orientation",
            CloudCode => "cloud_code",
            CloudThreshold => "threshold",
            DataDirectory => "directory",
            DataOrders => "orders",
            DataVisibility => "visibility",
            DataInventory => "inventory",
            DataWeather => "weather",
        }
    }

    /// Current value rendered as it would appear in the file.
    pub fn get(&self, config: &PipelineConfig) -> String {
        use ConfigKey::*;
        match self {
            SelectionRespectOna => config.selection.respect_ona.to_string(),
            SelectionOnaTiers => config
                .selection
                .ona_tiers
                .iter()
                .map(i32::to_string)
                .collect::<Vec<_>>()
                .join(","),
            SelectionDaysOffset => config.selection.days_offset.to_string(),
            StripsNarrowKm => config.strips.narrow_km.to_string(),
            StripsWideKm => config.strips.wide_km.to_string(),
            StripsMaxColumns => config.strips.max_columns.to_string(),
            StripsMaxRows => config.strips.max_rows.to_string(),
            StripsOrientation => config.strips.orientation.as_config_str().to_string(),
            CloudCode => config.cloud.cloud_code.to_string(),
            CloudThreshold => config.cloud.threshold.to_string(),
            DataDirectory => config.data.directory.display().to_string(),
            DataOrders => config.data.orders.clone(),
            DataVisibility => config.data.visibility.clone(),
            DataInventory => config.data.inventory.clone(),
            DataWeather => config.data.weather.clone(),
        }
    }

    /// Parse `value` and store it.
    pub fn set(&self, config: &mut PipelineConfig, value: &str) -> CsiResult<()> {
        use ConfigKey::*;
        let value = value.trim();
        match self {
            SelectionRespectOna => config.selection.respect_ona = self.parse(value)?,
            SelectionOnaTiers => {
                config.selection.ona_tiers = value
                    .split(',')
                    .map(|t| self.parse(t.trim()))
                    .collect::<CsiResult<Vec<i32>>>()?
            }
            SelectionDaysOffset => config.selection.days_offset = self.parse(value)?,
            StripsNarrowKm => config.strips.narrow_km = self.parse(value)?,
            StripsWideKm => config.strips.wide_km = self.parse(value)?,
            StripsMaxColumns => config.strips.max_columns = self.parse(value)?,
            StripsMaxRows => config.strips.max_rows = self.parse(value)?,
            StripsOrientation => {
                config.strips.orientation =
                    StripOrientation::from_config_str(value).ok_or_else(|| self.invalid(value))?
            }
            CloudCode => config.cloud.cloud_code = self.parse(value)?,
            CloudThreshold => config.cloud.threshold = self.parse(value)?,
            DataDirectory => config.data.directory = PathBuf::from(value),
            DataOrders => config.data.orders = value.to_string(),
            DataVisibility => config.data.visibility = value.to_string(),
            DataInventory => config.data.inventory = value.to_string(),
            DataWeather => config.data.weather = value.to_string(),
        }
        Ok(())
    }

    fn parse<T: FromStr>(&self, value: &str) -> CsiResult<T> {
        value.parse().map_err(|_| self.invalid(value))
    }

    fn invalid(&self, value: &str) -> CsiError {
        CsiError::Config(format!("invalid value '{}' for {}", value, self))
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.section(), self.key_name())
    }
}

impl FromStr for ConfigKey {
    type Err = CsiError;

    fn from_str(s: &str) -> CsiResult<Self> {
        ConfigKey::all()
            .iter()
            .copied()
            .find(|k| k.to_string() == s)
            .ok_or_else(|| CsiError::Config(format!("unknown configuration key '{}'", s)))
    }
}

/// Default location of the config file.
pub fn config_file_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("clearsky")
        .join("config.ini")
}

/// INI-backed storage for [`PipelineConfig`].
#[derive(Debug, Clone)]
pub struct ConfigFile {
    path: PathBuf,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self::new(config_file_path())
    }
}

impl ConfigFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Load the file, or the defaults if it does not exist yet.
    pub fn load(&self) -> CsiResult<PipelineConfig> {
        if !self.exists() {
            debug!(path = %self.path.display(), "No config file, using defaults");
            return Ok(PipelineConfig::default());
        }

        let ini = Ini::load_from_file(&self.path).map_err(|e| {
            CsiError::Config(format!("failed to read {}: {}", self.path.display(), e))
        })?;
        from_ini(&ini)
    }

    /// Write `config`, creating the parent directory if needed.
    pub fn save(&self, config: &PipelineConfig) -> CsiResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| CsiError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        to_ini(config)
            .write_to_file(&self.path)
            .map_err(|source| CsiError::Io {
                path: self.path.clone(),
                source,
            })?;
        debug!(path = %self.path.display(), "Config saved");
        Ok(())
    }
}

fn from_ini(ini: &Ini) -> CsiResult<PipelineConfig> {
    ConfigKey::all()
        .iter()
        .try_fold(PipelineConfig::default(), |mut config, key| -> CsiResult<_> {
            if let Some(value) = ini.get_from(Some(key.section()), key.key_name()) {
                key.set(&mut config, value)?;
            }
            Ok(config)
        })
}

fn to_ini(config: &PipelineConfig) -> Ini {
    let mut ini = Ini::new();
    for key in ConfigKey::all() {
        ini.with_section(Some(key.section()))
            .set(key.key_name(), key.get(config));
    }
    ini
}
