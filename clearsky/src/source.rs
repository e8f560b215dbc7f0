//! Input layers.
//!
//! [`DataSource`] is the seam between the pipeline and wherever the layers
//! live. [`JsonDataSource`] reads them from a directory of GeoJSON / JSON
//! files; [`RevInputs`] holds everything loaded for a batch of revs so each
//! rev runs against explicit, already-parsed inputs.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::cloud::WeatherRaster;
use crate::config::DataSettings;
use crate::error::{CsiError, CsiResult};
use crate::geojson;
use crate::model::{InventoryRecord, Order, RevNumber, VisibilityCell};

/// Supplies the layers a rev is valued against.
pub trait DataSource: Send + Sync {
    /// The full order feed.
    fn orders(&self) -> CsiResult<Vec<Order>>;

    /// Visibility cells for every rev.
    fn visibility_cells(&self) -> CsiResult<Vec<VisibilityCell>>;

    /// Collection inventory log.
    fn inventory(&self) -> CsiResult<Vec<InventoryRecord>>;

    /// Cloud-cover raster for a rev.
    fn weather(&self, rev: RevNumber) -> CsiResult<WeatherRaster>;
}

/// Reads layers from JSON files in one directory.
#[derive(Debug, Clone)]
pub struct JsonDataSource {
    directory: PathBuf,
    files: DataSettings,
}

impl JsonDataSource {
    /// Use the default file names inside `directory`.
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        let directory = directory.into();
        Self {
            files: DataSettings {
                directory: directory.clone(),
                ..Default::default()
            },
            directory,
        }
    }

    /// Use the directory and file names from configuration.
    pub fn from_settings(settings: &DataSettings) -> Self {
        Self {
            directory: settings.directory.clone(),
            files: settings.clone(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn read(&self, file: &str, rev: Option<RevNumber>) -> CsiResult<String> {
        let path = self.directory.join(file);
        if !path.is_file() {
            return Err(CsiError::missing(
                rev,
                path.display().to_string(),
                "file not found",
            ));
        }
        debug!(path = %path.display(), "Reading layer");
        fs::read_to_string(&path).map_err(|source| CsiError::Io { path, source })
    }
}

impl DataSource for JsonDataSource {
    fn orders(&self) -> CsiResult<Vec<Order>> {
        geojson::parse_orders(&self.read(&self.files.orders, None)?)
    }

    fn visibility_cells(&self) -> CsiResult<Vec<VisibilityCell>> {
        geojson::parse_cells(&self.read(&self.files.visibility, None)?)
    }

    fn inventory(&self) -> CsiResult<Vec<InventoryRecord>> {
        geojson::parse("inventory log", &self.read(&self.files.inventory, None)?)
    }

    /// Prefers `<stem>_<rev>.json`, falling back to a shared `<stem>.json`.
    fn weather(&self, rev: RevNumber) -> CsiResult<WeatherRaster> {
        let per_rev = format!("{}_{}.json", self.files.weather, rev);
        let shared = format!("{}.json", self.files.weather);

        let file = [&per_rev, &shared]
            .into_iter()
            .find(|f| self.directory.join(f).is_file())
            .ok_or_else(|| {
                CsiError::missing(
                    Some(rev),
                    self.directory.join(&per_rev).display().to_string(),
                    "no weather raster for this rev",
                )
            })?;

        geojson::parse("weather raster", &self.read(file, Some(rev))?)
    }
}

/// Parsed layers for a batch of revs.
#[derive(Debug, Clone, Default)]
pub struct RevInputs {
    pub orders: Vec<Order>,
    pub cells: Vec<VisibilityCell>,
    pub inventory: Vec<InventoryRecord>,
    weather: BTreeMap<RevNumber, WeatherRaster>,
}

impl RevInputs {
    pub fn new(
        orders: Vec<Order>,
        cells: Vec<VisibilityCell>,
        inventory: Vec<InventoryRecord>,
    ) -> Self {
        Self {
            orders,
            cells,
            inventory,
            weather: BTreeMap::new(),
        }
    }

    /// Attach the weather raster for a rev.
    pub fn with_weather(mut self, rev: RevNumber, raster: WeatherRaster) -> Self {
        self.weather.insert(rev, raster);
        self
    }

    /// Load the shared layers once and a weather raster per rev.
    ///
    /// # Errors
    ///
    /// Fails with [`CsiError::Configuration`] naming the rev and file when a
    /// layer or raster is missing.
    pub fn load<S>(source: &S, revs: &[RevNumber]) -> CsiResult<Self>
    where
        S: DataSource + ?Sized,
    {
        let inputs = revs.iter().try_fold(
            Self::new(source.orders()?, source.visibility_cells()?, source.inventory()?),
            |inputs, &rev| Ok::<_, CsiError>(inputs.with_weather(rev, source.weather(rev)?)),
        )?;

        info!(
            orders = inputs.orders.len(),
            cells = inputs.cells.len(),
            inventory = inputs.inventory.len(),
            revs = revs.len(),
            "Inputs loaded"
        );
        Ok(inputs)
    }

    /// Weather raster for a rev.
    pub fn weather(&self, rev: RevNumber) -> CsiResult<&WeatherRaster> {
        self.weather
            .get(&rev)
            .ok_or_else(|| CsiError::missing(Some(rev), "weather raster", "not loaded"))
    }
}
