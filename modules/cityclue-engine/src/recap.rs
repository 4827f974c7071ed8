//! Recap parser.
//!
//! Turns the text transcript the game prints at the end of a round into
//! constraint mutations. Each line is normalized, classified against an
//! ordered pattern table, then interpreted against the catalog. A bad line
//! becomes a [`Diagnostic`] and parsing moves on.

use std::collections::HashSet;
use std::fmt;
use std::sync::LazyLock;

use cityclue_common::{normalize, strip_hint_suffix};
use regex::Regex;
use thiserror::Error;
use tracing::{debug, warn};

use crate::catalog::CatalogIndex;
use crate::resolver::{resolve, ResolveError};
use crate::state::{ConstraintState, Mutation};

// =============================================================================
// Types
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClueError {
    #[error("Empty recap, please paste a recap")]
    EmptyRecap,

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("Country not found: {0}")]
    CountryNotFound(String),

    #[error("Continent not found: {0}")]
    ContinentNotFound(String),

    #[error("US state not found: {0}")]
    SubdivisionNotFound(String),

    #[error("US state clues need the country set to United States")]
    TrackedCountryRequired,

    #[error("Cannot recap individual cities without a country")]
    RegionRequiredButMissing,

    #[error("{0}km markers are disabled")]
    BracketDisabled(u32),

    #[error("Invalid distance: {0}km")]
    InvalidDistance(String),
}

/// A rejected recap line. Line numbers are 1-based; 0 refers to the whole
/// recap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub line: usize,
    pub error: ClueError,
}

impl Diagnostic {
    pub fn message(&self) -> String {
        self.error.to_string()
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.line == 0 {
            write!(f, "{}", self.error)
        } else {
            write!(f, "Error in recap on line {}: {}", self.line, self.error)
        }
    }
}

/// One recognized recap line, before catalog lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Clue {
    Country(String),
    NotIn(String),
    Subdivision(String),
    ClosestGuess(String),
    Within { km: u32, city: String },
    NotCity(String),
    Continent(String),
}

// =============================================================================
// Patterns
// =============================================================================

// Matched against normalized lines; recap lines may start with emoji.
static RE_COUNTRY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"country:\s*(.+)").unwrap());
static RE_NOT_IN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"answer is not in\s+(.+)").unwrap());
static RE_US_STATE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"us state:\s*(.+)").unwrap());
static RE_CLOSEST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"closest guess:\s*(.+)").unwrap());
static RE_WITHIN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"answer is under\s*(\d+)\s*km away from\s+(.+)").unwrap());
static RE_NOT_CITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"answer is not\s+(.+)").unwrap());
static RE_CONTINENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"continent:\s*(.+)").unwrap());

/// `build` returns `Ok(None)` when the matched line carries no usable value.
struct CluePattern {
    regex: &'static LazyLock<Regex>,
    build: fn(&regex::Captures<'_>) -> Result<Option<Clue>, ClueError>,
}

fn group(caps: &regex::Captures<'_>, i: usize) -> Option<String> {
    caps.get(i)
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
}

fn within(caps: &regex::Captures<'_>) -> Result<Option<Clue>, ClueError> {
    let raw = caps.get(1).map_or("", |m| m.as_str());
    let km = raw
        .parse::<u32>()
        .map_err(|_| ClueError::InvalidDistance(raw.to_string()))?;
    Ok(group(caps, 2).map(|city| Clue::Within { km, city }))
}

/// Precedence matters: "answer is not in" must win over "answer is not".
static CLUE_PATTERNS: &[CluePattern] = &[
    CluePattern {
        regex: &RE_COUNTRY,
        build: |c| Ok(group(c, 1).map(|v| Clue::Country(strip_hint_suffix(&v).to_string()))),
    },
    CluePattern {
        regex: &RE_NOT_IN,
        build: |c| Ok(group(c, 1).map(Clue::NotIn)),
    },
    CluePattern {
        regex: &RE_US_STATE,
        build: |c| Ok(group(c, 1).map(Clue::Subdivision)),
    },
    CluePattern {
        regex: &RE_CLOSEST,
        build: |c| Ok(group(c, 1).map(Clue::ClosestGuess)),
    },
    CluePattern {
        regex: &RE_WITHIN,
        build: within,
    },
    CluePattern {
        regex: &RE_NOT_CITY,
        build: |c| Ok(group(c, 1).map(Clue::NotCity)),
    },
    CluePattern {
        regex: &RE_CONTINENT,
        build: |c| Ok(group(c, 1).map(|v| Clue::Continent(strip_hint_suffix(&v).to_string()))),
    },
];

/// Classify one line. The first matching pattern decides; `Ok(None)` means
/// the line carries no clue.
pub fn classify(line: &str) -> Result<Option<Clue>, ClueError> {
    let line = normalize(line);
    match CLUE_PATTERNS.iter().find_map(|p| p.regex.captures(&line).map(|caps| (p, caps))) {
        Some((pattern, caps)) => (pattern.build)(&caps),
        None => Ok(None),
    }
}

// =============================================================================
// Interpretation
// =============================================================================

/// Turn a clue into at most one mutation. `Ok(None)` means the clue is
/// already accounted for.
pub fn interpret(
    clue: &Clue,
    state: &ConstraintState,
    index: &CatalogIndex,
    ringed: &HashSet<String>,
) -> Result<Option<Mutation>, ClueError> {
    let mutation = match clue {
        Clue::Country(name) => {
            let country = index
                .country_by_name(name)
                .ok_or_else(|| ClueError::CountryNotFound(name.clone()))?;
            Mutation::SetCountry(Some(country.code.clone()))
        }
        Clue::NotIn(name) => {
            if let Some(country) = index.country_by_name(name) {
                Mutation::ExcludeCountry(country.code.clone())
            } else if state.is_tracked_country() {
                let subdivision = index
                    .subdivision_by_name(name)
                    .ok_or_else(|| ClueError::SubdivisionNotFound(name.clone()))?;
                Mutation::ExcludeAdmin1(subdivision.code.clone())
            } else {
                return Err(ClueError::CountryNotFound(name.clone()));
            }
        }
        Clue::Subdivision(name) => {
            if !state.is_tracked_country() {
                return Err(ClueError::TrackedCountryRequired);
            }
            let subdivision = index
                .subdivision_by_name(name)
                .ok_or_else(|| ClueError::SubdivisionNotFound(name.clone()))?;
            Mutation::SetAdmin1(Some(subdivision.code.clone()))
        }
        Clue::ClosestGuess(reference) => {
            let city = resolve(reference, index.countries(), index.cities())?;
            Mutation::SetClosestGuess(Some(city.id.clone()))
        }
        Clue::Within { km, city } => {
            if !state.distance_brackets.contains(*km) {
                return Err(ClueError::BracketDisabled(*km));
            }
            let city = resolve(city, index.countries(), index.cities())?;
            Mutation::UpsertRing(state.distance_brackets.ring_for(&city.id, *km))
        }
        Clue::NotCity(fragment) => {
            let country = state
                .country
                .as_deref()
                .ok_or(ClueError::RegionRequiredButMissing)?;
            let query = format!("{fragment}, {country}");
            let city = resolve(&query, index.countries(), index.cities())?;
            // A guess inside a bracket also gets an "answer is not" line.
            if ringed.contains(&city.id) {
                return Ok(None);
            }
            Mutation::UpsertRing(state.distance_brackets.exclusion_ring(&city.id))
        }
        Clue::Continent(name) => {
            let continent = index
                .continent_by_name(name)
                .ok_or_else(|| ClueError::ContinentNotFound(name.clone()))?;
            Mutation::SetContinent(Some(continent.code.clone()))
        }
    };
    Ok(Some(mutation))
}

/// Parse a recap into an updated state plus one diagnostic per rejected line.
///
/// The input state is not modified. Lines are applied in order, so later
/// lines see the effect of earlier ones (a `Country:` line scopes the
/// `Answer is not` lines after it).
pub fn parse_recap(
    text: &str,
    state: &ConstraintState,
    index: &CatalogIndex,
) -> (ConstraintState, Vec<Diagnostic>) {
    let mut state = state.clone();
    let mut diagnostics = Vec::new();

    if text.trim().is_empty() {
        diagnostics.push(Diagnostic {
            line: 0,
            error: ClueError::EmptyRecap,
        });
        return (state, diagnostics);
    }

    let mut ringed = HashSet::new();
    let mut applied = 0usize;

    for (i, raw) in text.lines().enumerate() {
        let line = i + 1;
        if raw.trim().is_empty() {
            continue;
        }
        let clue = match classify(raw) {
            Ok(Some(clue)) => clue,
            Ok(None) => continue,
            Err(error) => {
                warn!(line, %error, "Recap line rejected");
                diagnostics.push(Diagnostic { line, error });
                continue;
            }
        };

        match interpret(&clue, &state, index, &ringed) {
            Ok(Some(mutation)) => {
                if let (Clue::Within { .. }, Mutation::UpsertRing(ring)) = (&clue, &mutation) {
                    ringed.insert(ring.anchor_city_id.clone());
                }
                debug!(line, ?mutation, "Recap clue applied");
                if state.apply(mutation) {
                    applied += 1;
                }
            }
            Ok(None) => debug!(line, ?clue, "Recap clue already covered"),
            Err(error) => {
                warn!(line, %error, "Recap line rejected");
                diagnostics.push(Diagnostic { line, error });
            }
        }
    }

    debug!(applied, diagnostics = diagnostics.len(), "Recap parsed");
    (state, diagnostics)
}

// =============================================================================
// Unit tests
// =============================================================================
