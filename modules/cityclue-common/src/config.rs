use std::env;
use std::path::PathBuf;

use tracing::info;

use crate::error::CityClueError;

pub const DEFAULT_DISTANCE_BRACKETS: &[u32] = &[250, 100, 50, 20, 10, 5];
pub const DEFAULT_MIN_POPULATION: u64 = 5000;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Directory holding `cities.json`, `countries.json` and `continents.json`.
    pub data_dir: PathBuf,
    pub min_population: u64,
    pub distance_brackets: Vec<u32>,
    pub use_closest_guess: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            min_population: DEFAULT_MIN_POPULATION,
            distance_brackets: DEFAULT_DISTANCE_BRACKETS.to_vec(),
            use_closest_guess: false,
        }
    }
}

impl Config {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, CityClueError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`Config::from_env`] with an injectable variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, CityClueError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let data_dir = lookup("CITYCLUE_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.data_dir);

        let min_population = match lookup("CITYCLUE_MIN_POPULATION") {
            Some(raw) => raw.trim().parse().map_err(|_| {
                CityClueError::Config(format!(
                    "CITYCLUE_MIN_POPULATION must be a number, got {raw:?}"
                ))
            })?,
            None => defaults.min_population,
        };

        let distance_brackets = match lookup("CITYCLUE_DISTANCE_BRACKETS") {
            Some(raw) => parse_brackets(&raw)?,
            None => defaults.distance_brackets,
        };

        let use_closest_guess = match lookup("CITYCLUE_USE_CLOSEST_GUESS") {
            Some(raw) => parse_flag(&raw)?,
            None => defaults.use_closest_guess,
        };

        Ok(Self {
            data_dir,
            min_population,
            distance_brackets,
            use_closest_guess,
        })
    }

    pub fn log_summary(&self) {
        info!(
            data_dir = %self.data_dir.display(),
            min_population = self.min_population,
            distance_brackets = ?self.distance_brackets,
            use_closest_guess = self.use_closest_guess,
            "Config loaded"
        );
    }
}

/// Parse a comma-separated km list such as `"250,100,50"`.
pub fn parse_brackets(raw: &str) -> Result<Vec<u32>, CityClueError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<u32>()
                .ok()
                .filter(|km| *km > 0)
                .ok_or_else(|| CityClueError::Config(format!("invalid distance bracket {s:?}")))
        })
        .collect()
}

fn parse_flag(raw: &str) -> Result<bool, CityClueError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(CityClueError::Config(format!(
            "CITYCLUE_USE_CLOSEST_GUESS must be a boolean, got {other:?}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_gives_defaults() {
        let config = Config::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.distance_brackets, vec![250, 100, 50, 20, 10, 5]);
    }

    #[test]
    fn overrides_are_parsed() {
        let config = Config::from_lookup(lookup_from(&[
            ("CITYCLUE_DATA_DIR", "/tmp/catalog"),
            ("CITYCLUE_MIN_POPULATION", "15000"),
            ("CITYCLUE_DISTANCE_BRACKETS", "100, 50 ,10"),
            ("CITYCLUE_USE_CLOSEST_GUESS", "true"),
        ]))
        .unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/tmp/catalog"));
        assert_eq!(config.min_population, 15000);
        assert_eq!(config.distance_brackets, vec![100, 50, 10]);
        assert!(config.use_closest_guess);
    }

    #[test]
    fn bad_population_is_a_config_error() {
        let err =
            Config::from_lookup(lookup_from(&[("CITYCLUE_MIN_POPULATION", "lots")])).unwrap_err();
        assert!(matches!(err, CityClueError::Config(_)));
    }

    #[test]
    fn zero_bracket_is_rejected() {
        assert!(parse_brackets("100,0").is_err());
        assert!(parse_brackets("100,abc").is_err());
    }
}
