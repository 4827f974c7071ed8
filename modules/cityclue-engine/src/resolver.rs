//! Resolve free-text city references such as `"Springfield, IL, US"`.

use cityclue_common::{normalize, City, Country};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("Please enter a city name")]
    EmptyQuery,

    #[error("Country not found: {0}")]
    CountryNotFound(String),

    #[error("City not found: {0}")]
    CityNotFound(String),
}

/// A parsed reference: `name`, `name, country` or `name, region, country`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CityQuery {
    pub name: String,
    pub region: Option<String>,
    pub country: Option<String>,
}

impl CityQuery {
    pub fn parse(query: &str) -> Result<Self, ResolveError> {
        if query.trim().is_empty() {
            return Err(ResolveError::EmptyQuery);
        }

        let parts: Vec<&str> = query.split(',').map(str::trim).collect();
        let owned = |s: &str| Some(s.to_string()).filter(|s| !s.is_empty());
        let query = match parts.as_slice() {
            [name] => Self {
                name: name.to_string(),
                region: None,
                country: None,
            },
            [name, country] => Self {
                name: name.to_string(),
                region: None,
                country: owned(country),
            },
            [name, region, country, ..] => Self {
                name: name.to_string(),
                region: owned(region),
                country: owned(country),
            },
            [] => return Err(ResolveError::EmptyQuery),
        };
        Ok(query)
    }
}

/// Two-letter tokens are country codes; anything longer is a country name.
fn country_code_for(token: &str, countries: &[Country]) -> Result<String, ResolveError> {
    if token.chars().count() == 2 {
        return Ok(token.to_uppercase());
    }
    let wanted = normalize(token);
    countries
        .iter()
        .find(|c| normalize(&c.name) == wanted)
        .map(|c| c.code.clone())
        .ok_or_else(|| ResolveError::CountryNotFound(token.to_string()))
}

/// Find the city a reference points at.
///
/// Filters run as a pipeline: primary name, then country, then region
/// (substring of the subdivision name). The most populous match wins; ties
/// keep catalog order.
pub fn resolve<'a>(
    query: &str,
    countries: &[Country],
    cities: &'a [City],
) -> Result<&'a City, ResolveError> {
    let query = CityQuery::parse(query)?;
    let country_code = query
        .country
        .as_deref()
        .map(|token| country_code_for(token, countries))
        .transpose()?;

    let name = normalize(&query.name);
    let region = query.region.as_deref().map(normalize);

    let mut best: Option<&'a City> = None;
    let matches = cities
        .iter()
        .filter(|c| normalize(c.primary_name()) == name)
        .filter(|c| country_code.as_ref().map_or(true, |code| &c.country_code == code))
        .filter(|c| match &region {
            Some(region) => c
                .admin1_name
                .as_deref()
                .is_some_and(|admin1| normalize(admin1).contains(region.as_str())),
            None => true,
        });
    for city in matches {
        if best.map_or(true, |b| city.population > b.population) {
            best = Some(city);
        }
    }

    best.ok_or(ResolveError::CityNotFound(query.name))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Vec<City> {
        vec![
            City::new("1", "Paris", 48.85, 2.35, "FR").with_population(2_100_000),
            City::new("2", "Paris, Texas, US", 33.66, -95.55, "US")
                .with_population(25_000)
                .with_admin1("TX", "Texas"),
            City::new("3", "Córdoba", -31.42, -64.18, "AR").with_population(1_400_000),
            City::new("4", "Córdoba", 37.88, -4.77, "ES").with_population(320_000),
            City::new("5", "Twin", 0.0, 0.0, "KE").with_population(100),
            City::new("6", "Twin", 1.0, 1.0, "KE").with_population(100),
        ]
    }

    fn countries() -> Vec<Country> {
        vec![
            Country::new("FR", "France", "EU"),
            Country::new("US", "United States", "NA"),
            Country::new("ES", "España", "EU"),
        ]
    }

    #[test]
    fn blank_query_is_rejected() {
        assert_eq!(resolve("   ", &countries(), &catalog()), Err(ResolveError::EmptyQuery));
    }

    #[test]
    fn bare_name_picks_largest_population() {
        let cities = catalog();
        let city = resolve("paris", &countries(), &cities).unwrap();
        assert_eq!(city.id, "1");
        let city = resolve("cordoba", &countries(), &cities).unwrap();
        assert_eq!(city.id, "3");
    }

    #[test]
    fn country_code_narrows_the_match() {
        let cities = catalog();
        assert_eq!(resolve("Paris, us", &countries(), &cities).unwrap().id, "2");
    }

    #[test]
    fn country_name_matches_without_accents() {
        let cities = catalog();
        assert_eq!(resolve("Cordoba, Espana", &countries(), &cities).unwrap().id, "4");
    }

    #[test]
    fn unknown_country_name_is_reported() {
        assert_eq!(
            resolve("Paris, Narnia", &countries(), &catalog()),
            Err(ResolveError::CountryNotFound("Narnia".into()))
        );
    }

    #[test]
    fn region_must_match_subdivision() {
        let cities = catalog();
        assert_eq!(resolve("Paris, tex, US", &countries(), &cities).unwrap().id, "2");
        assert_eq!(
            resolve("Paris, Ohio, US", &countries(), &cities),
            Err(ResolveError::CityNotFound("Paris".into()))
        );
    }

    #[test]
    fn ties_keep_catalog_order() {
        assert_eq!(resolve("Twin", &countries(), &catalog()).unwrap().id, "5");
    }

    #[test]
    fn alternate_names_are_not_matched() {
        let cities =
            vec![City::new("1", "Mumbai", 19.07, 72.87, "IN").with_alternate_names(["Bombay"])];
        assert!(matches!(
            resolve("Bombay", &countries(), &cities),
            Err(ResolveError::CityNotFound(_))
        ));
    }

    #[test]
    fn query_parts() {
        let q = CityQuery::parse("Springfield, IL, US").unwrap();
        assert_eq!(q.name, "Springfield");
        assert_eq!(q.region.as_deref(), Some("IL"));
        assert_eq!(q.country.as_deref(), Some("US"));
    }
}
