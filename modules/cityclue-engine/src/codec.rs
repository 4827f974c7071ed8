//! Save/load form of a [`ConstraintState`].
//!
//! Rings are stored by bracket as plain city-id lists; their `(inner, outer)`
//! radii are re-derived from the bracket list on load.

use std::collections::{BTreeMap, HashSet};

use cityclue_common::config::DEFAULT_DISTANCE_BRACKETS;
use cityclue_common::{CityClueError, Hemisphere};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::catalog::CatalogIndex;
use crate::state::{ConstraintState, DistanceBrackets};

/// Flat, JSON-friendly snapshot of a session. Missing fields take their
/// defaults so older blobs still load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PersistedState {
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub excluded_countries: Vec<String>,
    #[serde(default)]
    pub excluded_admin1: Vec<String>,
    #[serde(default)]
    pub hemisphere: Hemisphere,
    #[serde(default)]
    pub continent: Option<String>,
    #[serde(default)]
    pub admin1: Option<String>,
    #[serde(default)]
    pub closest_guess_city_id: Option<String>,
    #[serde(default = "default_brackets")]
    pub distance_brackets: Vec<u32>,
    /// Anchor ids keyed by the ring's outer radius in km.
    #[serde(default)]
    pub rings: BTreeMap<u32, Vec<String>>,
    #[serde(default)]
    pub pure_exclusions: Vec<String>,
    #[serde(default)]
    pub use_closest_guess: bool,
    #[serde(default)]
    pub min_population: u64,
}

fn default_brackets() -> Vec<u32> {
    DEFAULT_DISTANCE_BRACKETS.to_vec()
}

impl PersistedState {
    /// JSON schema of the persisted blob, for store implementers.
    pub fn json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(PersistedState)
    }
}

pub fn encode(state: &ConstraintState) -> PersistedState {
    let mut rings: BTreeMap<u32, Vec<String>> = BTreeMap::new();
    let mut pure_exclusions = Vec::new();
    for ring in state.rings() {
        if ring.is_pure_exclusion() {
            pure_exclusions.push(ring.anchor_city_id.clone());
        } else {
            rings
                .entry(ring.outer_radius_km)
                .or_default()
                .push(ring.anchor_city_id.clone());
        }
    }

    PersistedState {
        country: state.country.clone(),
        excluded_countries: state.excluded_countries.iter().cloned().collect(),
        excluded_admin1: state.excluded_admin1.iter().cloned().collect(),
        hemisphere: state.hemisphere,
        continent: state.continent.clone(),
        admin1: state.admin1.clone(),
        closest_guess_city_id: state.closest_guess_anchor.clone(),
        distance_brackets: state.distance_brackets.as_slice().to_vec(),
        rings,
        pure_exclusions,
        use_closest_guess: state.use_closest_guess_anchor,
        min_population: state.min_population,
    }
}

/// Rebuild a state. A city listed under several brackets keeps its largest
/// one; pure exclusions only apply to cities not already ringed.
pub fn decode(persisted: PersistedState) -> ConstraintState {
    let brackets = DistanceBrackets::new(persisted.distance_brackets);
    let mut state = ConstraintState::new().with_brackets(brackets.clone());
    state.country = persisted.country;
    state.excluded_countries = persisted.excluded_countries.into_iter().collect();
    state.excluded_admin1 = persisted.excluded_admin1.into_iter().collect();
    state.hemisphere = persisted.hemisphere;
    state.continent = persisted.continent;
    state.admin1 = persisted.admin1;
    state.closest_guess_anchor = persisted.closest_guess_city_id;
    state.use_closest_guess_anchor = persisted.use_closest_guess;
    state.min_population = persisted.min_population;

    let mut placed: HashSet<String> = HashSet::new();
    let mut exclusions = Vec::new();

    for (km, ids) in persisted.rings.into_iter().rev() {
        if km == 0 {
            exclusions.extend(ids);
            continue;
        }
        for id in ids {
            if placed.insert(id.clone()) {
                state.upsert_ring(brackets.ring_for(id, km));
            }
        }
    }

    for id in persisted.pure_exclusions.into_iter().chain(exclusions) {
        if placed.insert(id.clone()) {
            state.upsert_ring(brackets.exclusion_ring(id));
        }
    }

    state
}

pub fn encode_json(state: &ConstraintState) -> Result<String, CityClueError> {
    Ok(serde_json::to_string(&encode(state))?)
}

pub fn decode_json(json: &str) -> Result<ConstraintState, CityClueError> {
    let persisted: PersistedState = serde_json::from_str(json)?;
    Ok(decode(persisted))
}

/// City ids the state refers to that the catalog does not contain.
pub fn missing_cities(state: &ConstraintState, index: &CatalogIndex) -> Vec<String> {
    state
        .rings()
        .iter()
        .map(|r| &r.anchor_city_id)
        .chain(state.closest_guess_anchor.as_ref())
        .filter(|id| index.city(id).is_none())
        .cloned()
        .collect()
}
