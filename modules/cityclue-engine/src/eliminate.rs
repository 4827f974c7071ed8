//! Candidate elimination.
//!
//! Pure functions that decide whether a catalog city can still be the answer
//! given everything in a [`ConstraintState`]. The engine filters and never
//! reorders: survivors come back in catalog order.

use std::collections::{BTreeMap, HashMap};

use cityclue_common::{
    distance_km, within_radius, City, Country, NOISE_NAME_MARKER, TRACKED_COUNTRY,
};
use tracing::{debug, warn};

use crate::catalog::CatalogIndex;
use crate::state::{ConstraintState, GuessRing};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Why a city was eliminated. Ordered by the check that fires first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RejectReason {
    BelowMinPopulation,
    OutsideCountry,
    OutsideAdmin1,
    ExcludedAdmin1,
    UnknownContinent,
    OutsideContinent,
    WrongHemisphere,
    ExcludedCountry,
    NameNoise,
    AlreadyGuessed,
    UnresolvedAnchor,
    CloserToGuessedCity,
    OutsideRing,
    InsideExclusion,
}

/// Result of evaluating a single city against the constraint state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Keep,
    Reject(RejectReason),
}

impl Verdict {
    pub fn is_keep(self) -> bool {
        matches!(self, Verdict::Keep)
    }
}

/// Counters produced by one elimination pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct EliminationStats {
    pub candidates: usize,
    pub survivors: usize,
    pub rejected: BTreeMap<RejectReason, usize>,
}

/// Everything resolved once per pass so each city check is a plain lookup.
pub struct EliminationContext<'a> {
    state: &'a ConstraintState,
    countries: HashMap<&'a str, &'a Country>,
    /// Rings whose anchor is in the catalog.
    anchored: Vec<(&'a GuessRing, &'a City)>,
    /// Some ring anchor is missing from the catalog.
    unresolved_ring: bool,
    /// `Some(None)` when the closest-guess rule is on but its anchor is unknown.
    closest_guess: Option<Option<&'a City>>,
}

impl<'a> EliminationContext<'a> {
    pub fn new(cities: &'a [City], state: &'a ConstraintState, countries: &'a [Country]) -> Self {
        let find = |id: &str| cities.iter().find(|c| c.id == id);

        let mut anchored = Vec::with_capacity(state.rings().len());
        let mut unresolved_ring = false;
        for ring in state.rings() {
            match find(&ring.anchor_city_id) {
                Some(anchor) => anchored.push((ring, anchor)),
                None => {
                    warn!(
                        anchor = ring.anchor_city_id.as_str(),
                        "Ring anchor not in catalog, ring rejects every candidate"
                    );
                    unresolved_ring = true;
                }
            }
        }

        let closest_guess = match (&state.closest_guess_anchor, state.use_closest_guess_anchor) {
            (Some(id), true) => {
                let anchor = find(id);
                if anchor.is_none() {
                    warn!(anchor = id.as_str(), "Closest-guess anchor not in catalog");
                }
                Some(anchor)
            }
            _ => None,
        };

        Self {
            state,
            countries: countries.iter().map(|c| (c.code.as_str(), c)).collect(),
            anchored,
            unresolved_ring,
            closest_guess,
        }
    }

    fn has_rings(&self) -> bool {
        self.unresolved_ring || !self.anchored.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Pure decision functions
// ---------------------------------------------------------------------------

/// Evaluate one city. Checks run cheapest first:
///
/// 1. Population floor and positive country restriction
/// 2. Tracked-country subdivision restriction and exclusions
/// 3. Continent (unknown country or continent rejects)
/// 4. Hemisphere
/// 5. Excluded countries
/// 6. Name noise ("estate" entries)
/// 7. Rings: already guessed, closest guess, green circles, red circles
pub fn check_city(city: &City, ctx: &EliminationContext<'_>) -> Verdict {
    let state = ctx.state;

    if city.population < state.min_population {
        return Verdict::Reject(RejectReason::BelowMinPopulation);
    }
    if let Some(country) = &state.country {
        if &city.country_code != country {
            return Verdict::Reject(RejectReason::OutsideCountry);
        }
    }

    if let Some(admin1) = state.effective_admin1() {
        if city.country_code != TRACKED_COUNTRY || city.admin1_code.as_deref() != Some(admin1) {
            return Verdict::Reject(RejectReason::OutsideAdmin1);
        }
    }
    if let Some(excluded) = state.effective_excluded_admin1() {
        let hit = city.country_code == TRACKED_COUNTRY
            && city.admin1_code.as_ref().is_some_and(|code| excluded.contains(code));
        if hit {
            return Verdict::Reject(RejectReason::ExcludedAdmin1);
        }
    }

    if let Some(continent) = &state.continent {
        let known = ctx
            .countries
            .get(city.country_code.as_str())
            .and_then(|c| c.continent.as_ref());
        match known {
            None => return Verdict::Reject(RejectReason::UnknownContinent),
            Some(c) if c != continent => return Verdict::Reject(RejectReason::OutsideContinent),
            Some(_) => {}
        }
    }

    if !state.hemisphere.contains(city.latitude) {
        return Verdict::Reject(RejectReason::WrongHemisphere);
    }

    if state.excluded_countries.contains(&city.country_code) {
        return Verdict::Reject(RejectReason::ExcludedCountry);
    }

    if is_name_noise(city) {
        return Verdict::Reject(RejectReason::NameNoise);
    }

    if !ctx.has_rings() {
        return Verdict::Keep;
    }
    check_rings(city, ctx)
}

fn check_rings(city: &City, ctx: &EliminationContext<'_>) -> Verdict {
    if ctx.state.is_anchor(&city.id) {
        return Verdict::Reject(RejectReason::AlreadyGuessed);
    }

    // An unknown anchor cannot confirm anything.
    if ctx.unresolved_ring {
        return Verdict::Reject(RejectReason::UnresolvedAnchor);
    }

    match ctx.closest_guess {
        Some(None) => return Verdict::Reject(RejectReason::UnresolvedAnchor),
        Some(Some(closest)) => {
            let to_closest = distance_to(city, closest);
            if ctx.anchored.iter().any(|(_, anchor)| distance_to(city, anchor) < to_closest) {
                return Verdict::Reject(RejectReason::CloserToGuessedCity);
            }
        }
        None => {}
    }

    for (ring, anchor) in &ctx.anchored {
        if ring.outer_radius_km > 0 && !within(city, anchor, ring.outer_radius_km) {
            return Verdict::Reject(RejectReason::OutsideRing);
        }
    }

    for (ring, anchor) in &ctx.anchored {
        if let Some(inner) = ring.inner_radius_km {
            if within(city, anchor, inner) {
                return Verdict::Reject(RejectReason::InsideExclusion);
            }
        }
    }

    Verdict::Keep
}

/// Catalog entries like "Sunnyvale Estate" are housing blocks, not cities.
pub fn is_name_noise(city: &City) -> bool {
    let marker = NOISE_NAME_MARKER.as_bytes();
    city.names().any(|name| {
        name.as_bytes()
            .windows(marker.len())
            .any(|w| w.eq_ignore_ascii_case(marker))
    })
}

fn distance_to(city: &City, anchor: &City) -> f64 {
    distance_km(city.latitude, city.longitude, anchor.latitude, anchor.longitude)
}

fn within(city: &City, anchor: &City, radius_km: u32) -> bool {
    within_radius(
        city.latitude,
        city.longitude,
        anchor.latitude,
        anchor.longitude,
        radius_km as f64,
    )
}

// ---------------------------------------------------------------------------
// Batch orchestrators
// ---------------------------------------------------------------------------

/// Filter the catalog down to the cities that can still be the answer.
pub fn evaluate<'a>(
    cities: &'a [City],
    state: &ConstraintState,
    countries: &[Country],
) -> Vec<&'a City> {
    evaluate_with_stats(cities, state, countries).0
}

/// [`evaluate`] plus per-reason rejection counts.
pub fn evaluate_with_stats<'a>(
    cities: &'a [City],
    state: &ConstraintState,
    countries: &[Country],
) -> (Vec<&'a City>, EliminationStats) {
    let ctx = EliminationContext::new(cities, state, countries);
    let mut stats = EliminationStats {
        candidates: cities.len(),
        ..Default::default()
    };
    let mut survivors = Vec::new();

    for city in cities {
        match check_city(city, &ctx) {
            Verdict::Keep => survivors.push(city),
            Verdict::Reject(reason) => *stats.rejected.entry(reason).or_default() += 1,
        }
    }
    stats.survivors = survivors.len();

    debug!(
        candidates = stats.candidates,
        survivors = stats.survivors,
        rings = state.rings().len(),
        rejected = ?stats.rejected,
        "Elimination pass complete"
    );

    (survivors, stats)
}

impl CatalogIndex {
    pub fn evaluate(&self, state: &ConstraintState) -> Vec<&City> {
        evaluate(self.cities(), state, self.countries())
    }

    pub fn evaluate_with_stats(&self, state: &ConstraintState) -> (Vec<&City>, EliminationStats) {
        evaluate_with_stats(self.cities(), state, self.countries())
    }
}

// ===========================================================================
// Unit tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Mutation;
    use cityclue_common::Hemisphere;

    // ~111.19km per degree of longitude on the equator.
    const KM_PER_DEGREE: f64 = 111.194_926_644_558_73;

    fn at_km(id: &str, km: f64) -> City {
        City::new(id, id, 0.0, km / KM_PER_DEGREE, "KE").with_population(10_000)
    }

    fn countries() -> Vec<Country> {
        vec![
            Country::new("KE", "Kenya", "AF"),
            Country::new("FR", "France", "EU"),
            Country::new("US", "United States", "NA"),
            Country {
                code: "XX".into(),
                name: "Nowhere".into(),
                continent: None,
            },
        ]
    }

    fn verdicts(cities: &[City], state: &ConstraintState) -> Vec<Verdict> {
        let countries = countries();
        let ctx = EliminationContext::new(cities, state, &countries);
        cities.iter().map(|c| check_city(c, &ctx)).collect()
    }

    // ===================================================================
    // Categorical filters
    // ===================================================================

    #[test]
    fn empty_state_keeps_everything() {
        let cities = vec![at_km("a", 0.0), at_km("b", 500.0)];
        let survivors = evaluate(&cities, &ConstraintState::new(), &countries());
        assert_eq!(survivors.len(), 2);
    }

    #[test]
    fn hemisphere_filter() {
        let cities = vec![
            City::new("n", "North", 10.0, 0.0, "KE"),
            City::new("s", "South", -10.0, 0.0, "KE"),
        ];
        let mut state = ConstraintState::new();
        state.hemisphere = Hemisphere::Southern;
        assert_eq!(
            verdicts(&cities, &state),
            vec![Verdict::Reject(RejectReason::WrongHemisphere), Verdict::Keep]
        );
    }

    #[test]
    fn continent_filter_rejects_unknown_countries() {
        let cities = vec![
            City::new("k", "Nairobi", -1.29, 36.82, "KE"),
            City::new("f", "Paris", 48.85, 2.35, "FR"),
            City::new("z", "Atlantis", 0.0, -30.0, "ZZ"),
            City::new("x", "Limbo", 0.0, -20.0, "XX"),
        ];
        let mut state = ConstraintState::new();
        state.continent = Some("AF".into());
        assert_eq!(
            verdicts(&cities, &state),
            vec![
                Verdict::Keep,
                Verdict::Reject(RejectReason::OutsideContinent),
                Verdict::Reject(RejectReason::UnknownContinent),
                Verdict::Reject(RejectReason::UnknownContinent),
            ]
        );
    }

    #[test]
    fn population_floor() {
        let cities = vec![at_km("small", 0.0).with_population(100), at_km("big", 0.0)];
        let mut state = ConstraintState::new();
        state.apply(Mutation::SetMinPopulation(5000));
        let survivors = evaluate(&cities, &state, &countries());
        assert_eq!(survivors.len(), 1);
        assert_eq!(survivors[0].id, "big");
    }

    #[test]
    fn positive_country_restriction() {
        let cities = vec![
            City::new("p", "Paris", 48.85, 2.35, "FR"),
            City::new("n", "Nairobi", -1.29, 36.82, "KE"),
        ];
        let mut state = ConstraintState::new();
        state.country = Some("FR".into());
        assert_eq!(
            verdicts(&cities, &state),
            vec![Verdict::Keep, Verdict::Reject(RejectReason::OutsideCountry)]
        );
    }

    #[test]
    fn subdivision_restriction_under_tracked_country() {
        let cities = vec![
            City::new("a", "Austin", 30.27, -97.74, "US").with_admin1("TX", "Texas"),
            City::new("b", "Boston", 42.36, -71.06, "US").with_admin1("MA", "Massachusetts"),
            City::new("c", "Nowhere", 40.0, -100.0, "US"),
        ];
        let mut state = ConstraintState::new();
        state.country = Some("US".into());
        state.admin1 = Some("TX".into());
        assert_eq!(
            verdicts(&cities, &state),
            vec![
                Verdict::Keep,
                Verdict::Reject(RejectReason::OutsideAdmin1),
                Verdict::Reject(RejectReason::OutsideAdmin1),
            ]
        );
    }

    #[test]
    fn subdivision_exclusion_ignored_outside_tracked_country() {
        let cities = vec![City::new("a", "Austin", 30.27, -97.74, "US").with_admin1("TX", "Texas")];
        let mut state = ConstraintState::new();
        state.excluded_admin1.insert("TX".into());
        assert_eq!(verdicts(&cities, &state), vec![Verdict::Keep]);

        state.country = Some("US".into());
        assert_eq!(
            verdicts(&cities, &state),
            vec![Verdict::Reject(RejectReason::ExcludedAdmin1)]
        );
    }

    #[test]
    fn estate_entries_are_noise() {
        let cities = vec![
            City::new("e", "Green Valley ESTATE", 1.0, 1.0, "KE"),
            City::new("alt", "Kibera", 1.0, 1.0, "KE").with_alternate_names(["Kibera Estate"]),
            City::new("ok", "Eastleigh", 1.0, 1.0, "KE"),
        ];
        assert_eq!(
            verdicts(&cities, &ConstraintState::new()),
            vec![
                Verdict::Reject(RejectReason::NameNoise),
                Verdict::Reject(RejectReason::NameNoise),
                Verdict::Keep,
            ]
        );
    }

    // ===================================================================
    // Rings
    // ===================================================================

    #[test]
    fn annulus_keeps_only_the_band() {
        let cities = vec![
            at_km("anchor", 0.0),
            at_km("near", 30.0),
            at_km("band", 80.0),
            at_km("far", 150.0),
        ];
        let mut state = ConstraintState::new();
        state.upsert_ring(GuessRing::new("anchor", Some(50), 100));
        assert_eq!(
            verdicts(&cities, &state),
            vec![
                Verdict::Reject(RejectReason::AlreadyGuessed),
                Verdict::Reject(RejectReason::InsideExclusion),
                Verdict::Keep,
                Verdict::Reject(RejectReason::OutsideRing),
            ]
        );
    }

    #[test]
    fn ring_boundaries_are_inclusive() {
        let cities = vec![at_km("anchor", 0.0), at_km("edge", 99.999)];
        let mut state = ConstraintState::new();
        state.upsert_ring(GuessRing::new("anchor", None, 100));
        assert!(verdicts(&cities, &state)[1].is_keep());
    }

    #[test]
    fn pure_exclusion_rejects_the_red_circle_only() {
        let cities = vec![at_km("anchor", 0.0), at_km("inside", 200.0), at_km("outside", 300.0)];
        let mut state = ConstraintState::new();
        state.upsert_ring(GuessRing::new("anchor", Some(250), 0));
        assert_eq!(
            verdicts(&cities, &state),
            vec![
                Verdict::Reject(RejectReason::AlreadyGuessed),
                Verdict::Reject(RejectReason::InsideExclusion),
                Verdict::Keep,
            ]
        );
    }

    #[test]
    fn unknown_anchor_rejects_conservatively() {
        let cities = vec![at_km("a", 0.0)];
        let mut state = ConstraintState::new();
        state.upsert_ring(GuessRing::new("ghost", Some(250), 0));
        assert_eq!(
            verdicts(&cities, &state),
            vec![Verdict::Reject(RejectReason::UnresolvedAnchor)]
        );
    }

    #[test]
    fn closest_guess_rejects_cities_nearer_a_worse_guess() {
        // closest guess at 0km, a worse guess at 400km
        let cities = vec![
            at_km("closest", 0.0),
            at_km("worse", 400.0),
            at_km("west", 100.0),
            at_km("east", 300.0),
        ];
        let mut state = ConstraintState::new();
        state.upsert_ring(GuessRing::new("worse", Some(250), 0));
        state.closest_guess_anchor = Some("closest".into());

        // rule off: only the red circle applies
        let before = verdicts(&cities, &state);
        assert!(before[2].is_keep());
        assert_eq!(before[3], Verdict::Reject(RejectReason::InsideExclusion));

        state.use_closest_guess_anchor = true;
        let after = verdicts(&cities, &state);
        assert!(after[0].is_keep());
        assert!(after[2].is_keep());
        assert_eq!(after[3], Verdict::Reject(RejectReason::CloserToGuessedCity));
    }

    #[test]
    fn closest_guess_tie_keeps_the_city() {
        // "mid" is exactly as far from the closest guess as from "other"
        let cities = vec![at_km("closest", 0.0), at_km("mid", 100.0), at_km("other", 200.0)];
        let mut state = ConstraintState::new();
        state.upsert_ring(GuessRing::new("other", None, 250));
        state.closest_guess_anchor = Some("closest".into());
        state.use_closest_guess_anchor = true;

        let survivors = evaluate(&cities, &state, &countries());
        let ids: Vec<_> = survivors.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["closest", "mid"]);
    }

    #[test]
    fn unknown_closest_guess_rejects_conservatively() {
        let cities = vec![at_km("anchor", 0.0), at_km("a", 80.0), at_km("b", 90.0)];
        let mut state = ConstraintState::new();
        state.upsert_ring(GuessRing::new("anchor", Some(50), 100));
        state.closest_guess_anchor = Some("ghost".into());
        state.use_closest_guess_anchor = true;

        assert_eq!(
            verdicts(&cities, &state),
            vec![
                Verdict::Reject(RejectReason::AlreadyGuessed),
                Verdict::Reject(RejectReason::UnresolvedAnchor),
                Verdict::Reject(RejectReason::UnresolvedAnchor),
            ]
        );

        state.use_closest_guess_anchor = false;
        assert!(verdicts(&cities, &state)[1].is_keep());
    }

    #[test]
    fn noise_marker_ignores_ascii_case_only() {
        assert!(is_name_noise(&City::new("a", "Runda eState", 0.0, 0.0, "KE")));
        assert!(!is_name_noise(&City::new("b", "Estação", 0.0, 0.0, "BR")));
    }

    #[test]
    fn stats_count_every_candidate() {
        let cities = vec![at_km("anchor", 0.0), at_km("near", 30.0), at_km("band", 80.0)];
        let mut state = ConstraintState::new();
        state.upsert_ring(GuessRing::new("anchor", Some(50), 100));
        let (survivors, stats) = evaluate_with_stats(&cities, &state, &countries());
        assert_eq!(survivors.len(), 1);
        assert_eq!(stats.candidates, 3);
        assert_eq!(stats.survivors, 1);
        assert_eq!(stats.rejected.values().sum::<usize>(), 2);
        assert_eq!(stats.rejected.get(&RejectReason::InsideExclusion), Some(&1));
    }
}
