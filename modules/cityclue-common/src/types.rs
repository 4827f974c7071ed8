use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// The one country whose first-level subdivisions are tracked.
pub const TRACKED_COUNTRY: &str = "US";

/// Noise marker for bogus catalog entries ("... Estate" housing blocks).
pub const NOISE_NAME_MARKER: &str = "estate";

// --- City ---

/// A candidate city. Immutable once built; the ambiguity flags are derived
/// from the display name at construction time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "CityRecord", into = "CityRecord")]
pub struct City {
    pub id: String,
    pub display_name_parts: Vec<String>,
    pub alternate_names: Vec<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub population: u64,
    pub country_code: String,
    pub admin1_code: Option<String>,
    pub admin1_name: Option<String>,
    country_required: bool,
    admin1_required: bool,
    admin2_required: bool,
}

impl City {
    /// Build a city from its `", "`-joined display name.
    pub fn new(
        id: impl Into<String>,
        display_name: &str,
        latitude: f64,
        longitude: f64,
        country_code: impl Into<String>,
    ) -> Self {
        let country_code = country_code.into();
        let display_name_parts = split_list(display_name);
        let parts = display_name_parts.len();

        let country_required = parts > 1;
        let admin1_required =
            parts > 2 || (parts == 2 && display_name_parts[1] != country_code);
        let admin2_required = parts > 3;

        Self {
            id: id.into(),
            display_name_parts,
            alternate_names: Vec::new(),
            latitude,
            longitude,
            population: 0,
            country_code,
            admin1_code: None,
            admin1_name: None,
            country_required,
            admin1_required,
            admin2_required,
        }
    }

    pub fn with_population(mut self, population: u64) -> Self {
        self.population = population;
        self
    }

    pub fn with_admin1(mut self, code: impl Into<String>, name: impl Into<String>) -> Self {
        self.admin1_code = Some(code.into());
        self.admin1_name = Some(name.into());
        self
    }

    pub fn with_alternate_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.alternate_names = names.into_iter().map(Into::into).collect();
        self
    }

    /// First display segment, the name the game accepts as a guess.
    pub fn primary_name(&self) -> &str {
        self.display_name_parts
            .first()
            .map(String::as_str)
            .unwrap_or_default()
    }

    pub fn display_name(&self) -> String {
        self.display_name_parts.join(", ")
    }

    /// `"Name, Admin1, CC"`, or `"Name, CC"` without a subdivision.
    pub fn label(&self) -> String {
        match &self.admin1_name {
            Some(admin1) => format!("{}, {}, {}", self.primary_name(), admin1, self.country_code),
            None => format!("{}, {}", self.primary_name(), self.country_code),
        }
    }

    /// The game needs the country to disambiguate this name.
    pub fn country_required(&self) -> bool {
        self.country_required
    }

    /// The game needs the first-level region as well.
    pub fn admin1_required(&self) -> bool {
        self.admin1_required
    }

    pub fn admin2_required(&self) -> bool {
        self.admin2_required
    }

    /// Region qualifier the game expects, when one is required.
    pub fn required_region(&self) -> Option<&str> {
        if self.admin1_required {
            self.display_name_parts.get(1).map(String::as_str)
        } else {
            None
        }
    }

    /// All names a lookup may match against: primary first, then alternates.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.display_name_parts
            .first()
            .into_iter()
            .chain(self.alternate_names.iter())
            .map(String::as_str)
    }
}

fn split_list(joined: &str) -> Vec<String> {
    joined
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Catalog-source wire form of a city.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CityRecord {
    id: RecordId,
    name: String,
    #[serde(default)]
    alternate_names: Option<NameList>,
    latitude: f64,
    longitude: f64,
    #[serde(default)]
    population: u64,
    country_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    admin1_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    admin1_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum RecordId {
    Text(String),
    Number(u64),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum NameList {
    Joined(String),
    List(Vec<String>),
}

impl From<CityRecord> for City {
    fn from(record: CityRecord) -> Self {
        let id = match record.id {
            RecordId::Text(id) => id,
            RecordId::Number(n) => n.to_string(),
        };
        let alternate_names = match record.alternate_names {
            Some(NameList::Joined(joined)) => split_list(&joined),
            Some(NameList::List(list)) => list
                .into_iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            None => Vec::new(),
        };

        let mut city = City::new(
            id,
            &record.name,
            record.latitude,
            record.longitude,
            record.country_code,
        )
            .with_population(record.population)
            .with_alternate_names(alternate_names);
        city.admin1_code = record.admin1_code.filter(|s| !s.is_empty());
        city.admin1_name = record.admin1_name.filter(|s| !s.is_empty());
        city
    }
}

impl From<City> for CityRecord {
    fn from(city: City) -> Self {
        Self {
            name: city.display_name(),
            id: RecordId::Text(city.id),
            alternate_names: Some(NameList::Joined(city.alternate_names.join(","))),
            latitude: city.latitude,
            longitude: city.longitude,
            population: city.population,
            country_code: city.country_code,
            admin1_code: city.admin1_code,
            admin1_name: city.admin1_name,
        }
    }
}

// --- Countries & Continents ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Country {
    pub code: String,
    pub name: String,
    /// Continent code; absent means the continent is unknown.
    #[serde(default)]
    pub continent: Option<String>,
}

impl Country {
    pub fn new(
        code: impl Into<String>,
        name: impl Into<String>,
        continent: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            continent: Some(continent.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Continent {
    #[serde(alias = "continent")]
    pub code: String,
    pub name: String,
}

impl Continent {
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
        }
    }
}

/// First-level subdivision of the tracked country.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct Subdivision {
    pub code: String,
    pub name: String,
}

/// Built-in subdivisions of [`TRACKED_COUNTRY`].
pub const US_STATES: &[(&str, &str)] = &[
    ("AL", "Alabama"),
    ("AK", "Alaska"),
    ("AZ", "Arizona"),
    ("AR", "Arkansas"),
    ("CA", "California"),
    ("CO", "Colorado"),
    ("CT", "Connecticut"),
    ("DE", "Delaware"),
    ("DC", "District of Columbia"),
    ("FL", "Florida"),
    ("GA", "Georgia"),
    ("HI", "Hawaii"),
    ("ID", "Idaho"),
    ("IL", "Illinois"),
    ("IN", "Indiana"),
    ("IA", "Iowa"),
    ("KS", "Kansas"),
    ("KY", "Kentucky"),
    ("LA", "Louisiana"),
    ("ME", "Maine"),
    ("MD", "Maryland"),
    ("MA", "Massachusetts"),
    ("MI", "Michigan"),
    ("MN", "Minnesota"),
    ("MS", "Mississippi"),
    ("MO", "Missouri"),
    ("MT", "Montana"),
    ("NE", "Nebraska"),
    ("NV", "Nevada"),
    ("NH", "New Hampshire"),
    ("NJ", "New Jersey"),
    ("NM", "New Mexico"),
    ("NY", "New York"),
    ("NC", "North Carolina"),
    ("ND", "North Dakota"),
    ("OH", "Ohio"),
    ("OK", "Oklahoma"),
    ("OR", "Oregon"),
    ("PA", "Pennsylvania"),
    ("RI", "Rhode Island"),
    ("SC", "South Carolina"),
    ("SD", "South Dakota"),
    ("TN", "Tennessee"),
    ("TX", "Texas"),
    ("UT", "Utah"),
    ("VT", "Vermont"),
    ("VA", "Virginia"),
    ("WA", "Washington"),
    ("WV", "West Virginia"),
    ("WI", "Wisconsin"),
    ("WY", "Wyoming"),
];

// --- Enums ---

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum Hemisphere {
    #[default]
    Both,
    #[serde(rename = "Northern Hemisphere", alias = "Northern")]
    Northern,
    #[serde(rename = "Southern Hemisphere", alias = "Southern")]
    Southern,
}

impl Hemisphere {
    /// Points on the equator belong to both hemispheres.
    pub fn contains(self, latitude: f64) -> bool {
        match self {
            Hemisphere::Both => true,
            Hemisphere::Northern => latitude >= 0.0,
            Hemisphere::Southern => latitude <= 0.0,
        }
    }
}
