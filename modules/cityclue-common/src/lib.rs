pub mod types;
pub mod geo;
pub mod text;
pub mod config;
pub mod error;

pub use types::*;
pub use geo::{distance_km, within_radius, EARTH_RADIUS_KM};
pub use text::{normalize, strip_hint_suffix};
pub use config::Config;
pub use error::CityClueError;
