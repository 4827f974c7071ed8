use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use cityclue_common::config::parse_brackets;
use cityclue_common::Config;
use cityclue_engine::codec::{self, missing_cities};
use cityclue_engine::{
    parse_recap, resolve, CatalogIndex, CatalogQuery, CatalogSource, ConstraintState,
    DistanceBrackets, JsonDirCatalog, Mutation, PersistedState,
};

#[derive(Parser)]
#[command(name = "cityclue", about = "Narrow down the answer city from guess clues")]
#[command(version)]
struct Cli {
    /// Catalog directory (overrides CITYCLUE_DATA_DIR)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the cities that can still be the answer
    Filter {
        /// Saved state to start from
        #[arg(long)]
        state: Option<PathBuf>,

        /// Recap transcript to apply, `-` for stdin
        #[arg(long)]
        recap: Option<PathBuf>,

        /// Write the resulting state here
        #[arg(long)]
        save: Option<PathBuf>,

        /// Print survivors as JSON
        #[arg(long)]
        json: bool,

        /// Drop cities below this population (overrides CITYCLUE_MIN_POPULATION)
        #[arg(long)]
        min_population: Option<u64>,

        /// Comma-separated km list, e.g. `250,100,50`
        #[arg(long)]
        brackets: Option<String>,

        /// Reject cities closer to another guess than to the closest guess
        /// (overrides CITYCLUE_USE_CLOSEST_GUESS)
        #[arg(long)]
        closest_guess: Option<bool>,
    },

    /// Resolve a "Name[, Region][, Country]" reference to one city
    Resolve { query: String },

    /// Print the JSON schema of a saved state
    Schema,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(EnvFilter::from_default_env().add_directive("cityclue=info".parse()?))
        .init();

    let cli = Cli::parse();
    let mut config = Config::from_env()?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }

    match cli.command {
        Commands::Filter {
            state,
            recap,
            save,
            json,
            min_population,
            brackets,
            closest_guess,
        } => {
            let overrides = Overrides {
                min_population,
                brackets: brackets.as_deref().map(parse_brackets).transpose()?,
                closest_guess,
            };
            overrides.apply_to_config(&mut config);
            config.log_summary();

            let paths = FilterPaths {
                state: state.as_deref(),
                recap: recap.as_deref(),
                save: save.as_deref(),
            };
            cmd_filter(&config, &overrides, paths, json)
        }
        Commands::Resolve { query } => cmd_resolve(&config, &query),
        Commands::Schema => {
            let schema = PersistedState::json_schema();
            println!("{}", serde_json::to_string_pretty(&schema)?);
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// Flag overrides
// ---------------------------------------------------------------------------

/// Flags passed explicitly. They win over env config and over a loaded state.
#[derive(Debug, Default)]
struct Overrides {
    min_population: Option<u64>,
    brackets: Option<Vec<u32>>,
    closest_guess: Option<bool>,
}

impl Overrides {
    fn apply_to_config(&self, config: &mut Config) {
        if let Some(min) = self.min_population {
            config.min_population = min;
        }
        if let Some(brackets) = &self.brackets {
            config.distance_brackets = brackets.clone();
        }
        if let Some(enabled) = self.closest_guess {
            config.use_closest_guess = enabled;
        }
    }

    fn apply_to_state(&self, state: &mut ConstraintState) {
        if let Some(min) = self.min_population {
            state.apply(Mutation::SetMinPopulation(min));
        }
        if let Some(brackets) = &self.brackets {
            let brackets = DistanceBrackets::new(brackets.iter().copied());
            state.apply(Mutation::SetDistanceBrackets(brackets));
        }
        if let Some(enabled) = self.closest_guess {
            state.apply(Mutation::UseClosestGuess(enabled));
        }
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

struct FilterPaths<'a> {
    state: Option<&'a Path>,
    recap: Option<&'a Path>,
    save: Option<&'a Path>,
}

fn load_index(config: &Config) -> Result<CatalogIndex> {
    // Population is filtered through the state so saved sessions keep theirs.
    JsonDirCatalog::new(&config.data_dir)
        .load_index(&CatalogQuery::default())
        .with_context(|| format!("Failed to load catalog from {}", config.data_dir.display()))
}

fn fresh_state(config: &Config) -> ConstraintState {
    let brackets = DistanceBrackets::new(config.distance_brackets.clone());
    let mut state = ConstraintState::new().with_brackets(brackets);
    state.min_population = config.min_population;
    state.use_closest_guess_anchor = config.use_closest_guess;
    state
}

fn initial_state(
    config: &Config,
    overrides: &Overrides,
    path: Option<&Path>,
    index: &CatalogIndex,
) -> Result<ConstraintState> {
    let Some(path) = path else {
        return Ok(fresh_state(config));
    };

    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read state {}", path.display()))?;
    let mut state = codec::decode_json(&raw)
        .with_context(|| format!("Invalid state in {}", path.display()))?;
    info!(path = %path.display(), rings = state.rings().len(), "Loaded saved state");

    for id in missing_cities(&state, index) {
        warn!(city_id = id.as_str(), "Saved state refers to a city missing from the catalog");
    }

    overrides.apply_to_state(&mut state);
    Ok(state)
}

fn read_recap(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut text = String::new();
        io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read recap from stdin")?;
        return Ok(text);
    }
    fs::read_to_string(path).with_context(|| format!("Failed to read recap {}", path.display()))
}

fn cmd_filter(
    config: &Config,
    overrides: &Overrides,
    paths: FilterPaths<'_>,
    json: bool,
) -> Result<()> {
    let index = load_index(config)?;
    let mut state = initial_state(config, overrides, paths.state, &index)?;

    if let Some(path) = paths.recap {
        let text = read_recap(path)?;
        let (parsed, diagnostics) = parse_recap(&text, &state, &index);
        for diagnostic in &diagnostics {
            eprintln!("{diagnostic}");
        }
        state = parsed;
    }

    let (survivors, stats) = index.evaluate_with_stats(&state);
    info!(
        candidates = stats.candidates,
        survivors = stats.survivors,
        "Filtered catalog"
    );

    if json {
        println!("{}", serde_json::to_string_pretty(&survivors)?);
    } else {
        for ring in state.rings() {
            let anchor = index
                .city(&ring.anchor_city_id)
                .map(|c| c.label())
                .unwrap_or_else(|| ring.anchor_city_id.clone());
            println!("{} {anchor}", ring.label());
        }
        for city in &survivors {
            println!("{}\t{}", city.id, city.label());
        }
        println!("{} of {} cities remain", stats.survivors, stats.candidates);
    }

    if let Some(path) = paths.save {
        let encoded = codec::encode_json(&state)?;
        fs::write(path, encoded)
            .with_context(|| format!("Failed to write state {}", path.display()))?;
        info!(path = %path.display(), "Saved state");
    }

    Ok(())
}

fn cmd_resolve(config: &Config, query: &str) -> Result<()> {
    let index = load_index(config)?;
    let city = resolve(query, index.countries(), index.cities())?;
    println!(
        "{}\t{}\t{:.4},{:.4}\tpop {}",
        city.id,
        city.label(),
        city.latitude,
        city.longitude,
        city.population
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter_overrides(args: &[&str]) -> Overrides {
        let argv = ["cityclue", "filter"].iter().chain(args);
        match Cli::try_parse_from(argv).unwrap().command {
            Commands::Filter {
                min_population,
                brackets,
                closest_guess,
                ..
            } => Overrides {
                min_population,
                brackets: brackets.as_deref().map(parse_brackets).transpose().unwrap(),
                closest_guess,
            },
            _ => panic!("expected filter"),
        }
    }

    #[test]
    fn closest_guess_flag_can_switch_the_rule_off() {
        let mut config = Config {
            use_closest_guess: true,
            ..Config::default()
        };
        filter_overrides(&["--closest-guess", "false"]).apply_to_config(&mut config);
        assert!(!config.use_closest_guess);

        let mut state = fresh_state(&Config {
            use_closest_guess: true,
            ..Config::default()
        });
        filter_overrides(&["--closest-guess", "false"]).apply_to_state(&mut state);
        assert!(!state.use_closest_guess_anchor);
    }

    #[test]
    fn absent_flags_leave_config_and_state_alone() {
        let mut config = Config {
            use_closest_guess: true,
            min_population: 42,
            ..Config::default()
        };
        let overrides = filter_overrides(&[]);
        overrides.apply_to_config(&mut config);
        assert!(config.use_closest_guess);
        assert_eq!(config.min_population, 42);

        let mut state = fresh_state(&config);
        let before = state.clone();
        overrides.apply_to_state(&mut state);
        assert_eq!(state, before);
    }

    #[test]
    fn explicit_flags_override_a_loaded_state() {
        let mut state = ConstraintState::new();
        filter_overrides(&["--min-population", "100000", "--brackets", "100,10"])
            .apply_to_state(&mut state);
        assert_eq!(state.min_population, 100_000);
        assert_eq!(state.distance_brackets.as_slice(), &[100, 10]);
    }
}
