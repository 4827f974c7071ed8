//! Immutable catalog snapshot used for one evaluation pass.

use std::collections::HashMap;

use cityclue_common::{normalize, City, Continent, Country, Subdivision, TRACKED_COUNTRY, US_STATES};

/// Cities plus the country, continent and subdivision metadata needed to
/// interpret clues about them. Lookups by id and code are indexed.
#[derive(Debug, Clone, Default)]
pub struct CatalogIndex {
    cities: Vec<City>,
    countries: Vec<Country>,
    continents: Vec<Continent>,
    subdivisions: Vec<Subdivision>,
    city_by_id: HashMap<String, usize>,
    country_by_code: HashMap<String, usize>,
}

impl CatalogIndex {
    pub fn new(cities: Vec<City>, countries: Vec<Country>, continents: Vec<Continent>) -> Self {
        let mut city_by_id = HashMap::with_capacity(cities.len());
        for (i, city) in cities.iter().enumerate() {
            // First occurrence wins on duplicate ids.
            city_by_id.entry(city.id.clone()).or_insert(i);
        }
        let country_by_code = countries
            .iter()
            .enumerate()
            .map(|(i, c)| (c.code.clone(), i))
            .collect();
        let subdivisions = collect_subdivisions(&cities);

        Self {
            cities,
            countries,
            continents,
            subdivisions,
            city_by_id,
            country_by_code,
        }
    }

    pub fn cities(&self) -> &[City] {
        &self.cities
    }

    pub fn countries(&self) -> &[Country] {
        &self.countries
    }

    pub fn continents(&self) -> &[Continent] {
        &self.continents
    }

    /// Subdivisions of the tracked country: the built-in table plus any
    /// extra ones the catalog mentions.
    pub fn subdivisions(&self) -> &[Subdivision] {
        &self.subdivisions
    }

    pub fn city(&self, id: &str) -> Option<&City> {
        self.city_by_id.get(id).map(|&i| &self.cities[i])
    }

    pub fn country(&self, code: &str) -> Option<&Country> {
        self.country_by_code.get(code).map(|&i| &self.countries[i])
    }

    pub fn country_by_name(&self, name: &str) -> Option<&Country> {
        let wanted = normalize(name);
        self.countries.iter().find(|c| normalize(&c.name) == wanted)
    }

    pub fn continent_by_name(&self, name: &str) -> Option<&Continent> {
        let wanted = normalize(name);
        self.continents.iter().find(|c| normalize(&c.name) == wanted)
    }

    pub fn subdivision_by_name(&self, name: &str) -> Option<&Subdivision> {
        let wanted = normalize(name);
        self.subdivisions.iter().find(|s| normalize(&s.name) == wanted)
    }

    pub fn len(&self) -> usize {
        self.cities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cities.is_empty()
    }
}

fn collect_subdivisions(cities: &[City]) -> Vec<Subdivision> {
    let mut subdivisions: Vec<Subdivision> = US_STATES
        .iter()
        .map(|(code, name)| Subdivision {
            code: code.to_string(),
            name: name.to_string(),
        })
        .collect();

    for city in cities.iter().filter(|c| c.country_code == TRACKED_COUNTRY) {
        if let (Some(code), Some(name)) = (&city.admin1_code, &city.admin1_name) {
            if !subdivisions.iter().any(|s| &s.code == code) {
                subdivisions.push(Subdivision {
                    code: code.clone(),
                    name: name.clone(),
                });
            }
        }
    }
    subdivisions
}
