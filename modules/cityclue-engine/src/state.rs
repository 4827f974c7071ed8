//! The accumulated clue set of one guessing session.

use std::collections::BTreeSet;

use cityclue_common::config::DEFAULT_DISTANCE_BRACKETS;
use cityclue_common::{Hemisphere, TRACKED_COUNTRY};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Distance brackets
// ---------------------------------------------------------------------------

/// Enabled ring sizes in km, always sorted descending without duplicates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistanceBrackets(Vec<u32>);

impl Default for DistanceBrackets {
    fn default() -> Self {
        Self(DEFAULT_DISTANCE_BRACKETS.to_vec())
    }
}

impl DistanceBrackets {
    /// Zero-sized brackets are dropped.
    pub fn new(brackets: impl IntoIterator<Item = u32>) -> Self {
        let mut brackets: Vec<u32> = brackets.into_iter().filter(|km| *km > 0).collect();
        brackets.sort_unstable_by(|a, b| b.cmp(a));
        brackets.dedup();
        Self(brackets)
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.0
    }

    pub fn contains(&self, km: u32) -> bool {
        self.0.contains(&km)
    }

    pub fn largest(&self) -> Option<u32> {
        self.0.first().copied()
    }

    /// The red (inner) radius paired with a green radius: the next enabled
    /// bracket below it, or none for the innermost ring.
    pub fn inner_for(&self, outer_km: u32) -> Option<u32> {
        self.0.iter().copied().find(|km| *km < outer_km)
    }

    /// Ring for "the answer is under `outer_km` away from this city".
    pub fn ring_for(&self, anchor_city_id: impl Into<String>, outer_km: u32) -> GuessRing {
        GuessRing {
            anchor_city_id: anchor_city_id.into(),
            inner_radius_km: self.inner_for(outer_km),
            outer_radius_km: outer_km,
        }
    }

    /// Ring for a wrong guess that landed outside every bracket.
    pub fn exclusion_ring(&self, anchor_city_id: impl Into<String>) -> GuessRing {
        GuessRing {
            anchor_city_id: anchor_city_id.into(),
            inner_radius_km: self.largest(),
            outer_radius_km: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// Guess rings
// ---------------------------------------------------------------------------

/// A clue anchored at a guessed city: the answer lies within `outer_radius_km`
/// of it but not within `inner_radius_km`. An outer radius of zero marks a
/// pure exclusion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuessRing {
    pub anchor_city_id: String,
    pub inner_radius_km: Option<u32>,
    pub outer_radius_km: u32,
}

impl GuessRing {
    pub fn new(
        anchor_city_id: impl Into<String>,
        inner_radius_km: Option<u32>,
        outer_radius_km: u32,
    ) -> Self {
        Self {
            anchor_city_id: anchor_city_id.into(),
            inner_radius_km,
            outer_radius_km,
        }
    }

    pub fn is_pure_exclusion(&self) -> bool {
        self.outer_radius_km == 0
    }

    /// Marker the game uses for this ring's bracket.
    pub fn label(&self) -> &'static str {
        match self.outer_radius_km {
            0 => "❌",
            250 => "⭕",
            100 => "🤏",
            50 => "🤞",
            20 => "💥",
            10 => "🔍",
            5 => "📍",
            _ => "◯",
        }
    }
}

// ---------------------------------------------------------------------------
// Constraint state
// ---------------------------------------------------------------------------

/// Everything the player has learned so far.
///
/// Rings are private so the one-ring-per-anchor rule and their canonical
/// order (outer radius descending, pure exclusions last, insertion order
/// within a bracket) hold for every state.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConstraintState {
    pub country: Option<String>,
    pub excluded_countries: BTreeSet<String>,
    /// Only read while `country` is the tracked country.
    pub excluded_admin1: BTreeSet<String>,
    pub hemisphere: Hemisphere,
    pub continent: Option<String>,
    /// Only read while `country` is the tracked country.
    pub admin1: Option<String>,
    pub closest_guess_anchor: Option<String>,
    pub use_closest_guess_anchor: bool,
    rings: Vec<GuessRing>,
    pub distance_brackets: DistanceBrackets,
    pub min_population: u64,
}

impl ConstraintState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_brackets(mut self, brackets: DistanceBrackets) -> Self {
        self.distance_brackets = brackets;
        self
    }

    pub fn rings(&self) -> &[GuessRing] {
        &self.rings
    }

    pub fn ring_for(&self, anchor_city_id: &str) -> Option<&GuessRing> {
        self.rings.iter().find(|r| r.anchor_city_id == anchor_city_id)
    }

    pub fn is_anchor(&self, city_id: &str) -> bool {
        self.ring_for(city_id).is_some()
    }

    /// True when the positive country restriction is the tracked country.
    pub fn is_tracked_country(&self) -> bool {
        self.country.as_deref() == Some(TRACKED_COUNTRY)
    }

    /// Subdivision restriction, if it is in effect.
    pub fn effective_admin1(&self) -> Option<&str> {
        if self.is_tracked_country() {
            self.admin1.as_deref()
        } else {
            None
        }
    }

    /// Subdivision exclusions, empty unless in effect.
    pub fn effective_excluded_admin1(&self) -> Option<&BTreeSet<String>> {
        if self.is_tracked_country() && !self.excluded_admin1.is_empty() {
            Some(&self.excluded_admin1)
        } else {
            None
        }
    }

    /// Insert or replace the ring for its anchor. Returns false when an
    /// identical ring was already present.
    pub fn upsert_ring(&mut self, ring: GuessRing) -> bool {
        if self.ring_for(&ring.anchor_city_id) == Some(&ring) {
            return false;
        }
        self.rings.retain(|r| r.anchor_city_id != ring.anchor_city_id);
        let pos = self
            .rings
            .iter()
            .position(|r| r.outer_radius_km < ring.outer_radius_km)
            .unwrap_or(self.rings.len());
        self.rings.insert(pos, ring);
        true
    }

    pub fn remove_ring(&mut self, anchor_city_id: &str) -> bool {
        let before = self.rings.len();
        self.rings.retain(|r| r.anchor_city_id != anchor_city_id);
        self.rings.len() != before
    }

    /// Apply one mutation. Returns whether the state changed.
    pub fn apply(&mut self, mutation: Mutation) -> bool {
        match mutation {
            Mutation::SetCountry(code) => replace(&mut self.country, code),
            Mutation::ExcludeCountry(code) => self.excluded_countries.insert(code),
            Mutation::IncludeCountry(code) => self.excluded_countries.remove(&code),
            Mutation::ExcludeAdmin1(code) => self.excluded_admin1.insert(code),
            Mutation::IncludeAdmin1(code) => self.excluded_admin1.remove(&code),
            Mutation::SetAdmin1(code) => replace(&mut self.admin1, code),
            Mutation::SetContinent(code) => replace(&mut self.continent, code),
            Mutation::SetHemisphere(hemisphere) => replace(&mut self.hemisphere, hemisphere),
            Mutation::SetClosestGuess(city_id) => replace(&mut self.closest_guess_anchor, city_id),
            Mutation::UseClosestGuess(enabled) => {
                replace(&mut self.use_closest_guess_anchor, enabled)
            }
            Mutation::UpsertRing(ring) => self.upsert_ring(ring),
            Mutation::RemoveRing(city_id) => self.remove_ring(&city_id),
            Mutation::ClearRings => {
                let changed = !self.rings.is_empty();
                self.rings.clear();
                changed
            }
            Mutation::SetDistanceBrackets(brackets) => {
                replace(&mut self.distance_brackets, brackets)
            }
            Mutation::SetMinPopulation(min) => replace(&mut self.min_population, min),
        }
    }
}

fn replace<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        false
    } else {
        *slot = value;
        true
    }
}

/// One edit to a [`ConstraintState`], produced by UI actions or the recap
/// parser.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    SetCountry(Option<String>),
    ExcludeCountry(String),
    IncludeCountry(String),
    ExcludeAdmin1(String),
    IncludeAdmin1(String),
    SetAdmin1(Option<String>),
    SetContinent(Option<String>),
    SetHemisphere(Hemisphere),
    SetClosestGuess(Option<String>),
    UseClosestGuess(bool),
    UpsertRing(GuessRing),
    RemoveRing(String),
    ClearRings,
    SetDistanceBrackets(DistanceBrackets),
    SetMinPopulation(u64),
}
