//! Where catalogs come from.

use std::fs;
use std::path::{Path, PathBuf};

use cityclue_common::{City, CityClueError, Continent, Country};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::catalog::CatalogIndex;

/// Server-side filters a catalog source applies before handing out cities.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogQuery {
    pub min_population: u64,
    pub country: Option<String>,
}

impl CatalogQuery {
    pub fn matches(&self, city: &City) -> bool {
        city.population >= self.min_population
            && self.country.as_ref().map_or(true, |code| &city.country_code == code)
    }
}

pub trait CatalogSource {
    fn cities(&self, query: &CatalogQuery) -> Result<Vec<City>, CityClueError>;
    fn countries(&self) -> Result<Vec<Country>, CityClueError>;
    fn continents(&self) -> Result<Vec<Continent>, CityClueError>;

    /// Fetch everything and build an index.
    fn load_index(&self, query: &CatalogQuery) -> Result<CatalogIndex, CityClueError> {
        let cities = self.cities(query)?;
        let countries = self.countries()?;
        let continents = self.continents()?;
        info!(
            cities = cities.len(),
            countries = countries.len(),
            continents = continents.len(),
            "Catalog loaded"
        );
        Ok(CatalogIndex::new(cities, countries, continents))
    }
}

// ---------------------------------------------------------------------------
// JsonDirCatalog
// ---------------------------------------------------------------------------

/// Catalog stored as `cities.json`, `countries.json` and `continents.json`
/// in one directory. `continents.json` is optional.
#[derive(Debug, Clone)]
pub struct JsonDirCatalog {
    dir: PathBuf,
}

impl JsonDirCatalog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn read<T: DeserializeOwned>(&self, file: &str) -> Result<T, CityClueError> {
        let path = self.dir.join(file);
        let raw = fs::read_to_string(&path)
            .map_err(|e| CityClueError::Catalog(format!("{}: {e}", path.display())))?;
        serde_json::from_str(&raw)
            .map_err(|e| CityClueError::Catalog(format!("{}: {e}", path.display())))
    }
}

impl CatalogSource for JsonDirCatalog {
    fn cities(&self, query: &CatalogQuery) -> Result<Vec<City>, CityClueError> {
        let all: Vec<City> = self.read("cities.json")?;
        let total = all.len();
        let cities: Vec<City> = all.into_iter().filter(|c| query.matches(c)).collect();
        debug!(total, kept = cities.len(), "Filtered catalog cities");
        Ok(cities)
    }

    fn countries(&self) -> Result<Vec<Country>, CityClueError> {
        self.read("countries.json")
    }

    fn continents(&self) -> Result<Vec<Continent>, CityClueError> {
        if !self.dir.join("continents.json").exists() {
            return Ok(Vec::new());
        }
        self.read("continents.json")
    }
}
