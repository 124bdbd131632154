//! Reference city pool used for diverse sampling.
//!
//! Six regions, roughly 144 cities. Latitudes are approximate (one decimal)
//! and only used for hemisphere / high-latitude classification; the engine
//! resolves the real coordinates itself.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// World region a city is tagged with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Region {
    Americas,
    Europe,
    Africa,
    MiddleEast,
    Asia,
    Oceania,
}

impl Region {
    /// All regions in sampling order.
    pub const ALL: [Region; 6] = [
        Region::Americas,
        Region::Europe,
        Region::Africa,
        Region::MiddleEast,
        Region::Asia,
        Region::Oceania,
    ];
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Americas => write!(f, "Americas"),
            Self::Europe => write!(f, "Europe"),
            Self::Africa => write!(f, "Africa"),
            Self::MiddleEast => write!(f, "MiddleEast"),
            Self::Asia => write!(f, "Asia"),
            Self::Oceania => write!(f, "Oceania"),
        }
    }
}

/// One reference city.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CityRecord {
    pub name: String,
    pub region: Region,
    /// Signed degrees, south negative.
    pub latitude: f64,
}

impl CityRecord {
    pub fn new(name: impl Into<String>, region: Region, latitude: f64) -> Self {
        Self { name: name.into(), region, latitude }
    }

    pub fn is_southern(&self) -> bool {
        self.latitude < 0.0
    }

    /// |latitude| above the given threshold.
    pub fn is_high_latitude(&self, threshold: f64) -> bool {
        self.latitude.abs() > threshold
    }
}

/// Immutable pool of reference cities.
#[derive(Debug, Clone)]
pub struct CityPool {
    cities: Vec<CityRecord>,
}

impl CityPool {
    /// Build a pool from explicit records. Later duplicates of a name are dropped.
    pub fn from_records(records: Vec<CityRecord>) -> Self {
        let mut seen = std::collections::HashSet::new();
        let cities = records
            .into_iter()
            .filter(|c| seen.insert(c.name.clone()))
            .collect();
        Self { cities }
    }

    /// The built-in reference pool.
    pub fn builtin() -> Self {
        Self::from_records(
            BUILTIN_POOL
                .iter()
                .map(|c| CityRecord::new(c.name, c.region, c.lat))
                .collect(),
        )
    }

    pub fn cities(&self) -> &[CityRecord] {
        &self.cities
    }

    pub fn len(&self) -> usize {
        self.cities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cities.is_empty()
    }

    /// Cities grouped by region, preserving pool order within each region.
    pub fn by_region(&self) -> BTreeMap<Region, Vec<&CityRecord>> {
        let mut map: BTreeMap<Region, Vec<&CityRecord>> =
            Region::ALL.iter().map(|r| (*r, Vec::new())).collect();
        for city in &self.cities {
            map.entry(city.region).or_default().push(city);
        }
        map
    }
}

// ─── Built-in dataset ───────────────────────────────────────────

struct PoolCity {
    name: &'static str,
    region: Region,
    lat: f64,
}

const fn city(name: &'static str, region: Region, lat: f64) -> PoolCity {
    PoolCity { name, region, lat }
}

use Region::{Africa, Americas, Asia, Europe, MiddleEast, Oceania};

const BUILTIN_POOL: &[PoolCity] = &[
    // Americas
    city("Anchorage", Americas, 61.2),
    city("Fairbanks", Americas, 64.8),
    city("Vancouver", Americas, 49.3),
    city("Seattle", Americas, 47.6),
    city("San Francisco", Americas, 37.8),
    city("Los Angeles", Americas, 34.1),
    city("Denver", Americas, 39.7),
    city("Chicago", Americas, 41.9),
    city("New York", Americas, 40.7),
    city("Miami", Americas, 25.8),
    city("Honolulu", Americas, 21.3),
    city("Mexico City", Americas, 19.4),
    city("Havana", Americas, 23.1),
    city("Bogota", Americas, 4.7),
    city("Lima", Americas, -12.0),
    city("Santiago", Americas, -33.4),
    city("Buenos Aires", Americas, -34.6),
    city("Sao Paulo", Americas, -23.5),
    city("Rio de Janeiro", Americas, -22.9),
    city("Ushuaia", Americas, -54.8),
    city("Quito", Americas, -0.2),
    city("Montevideo", Americas, -34.9),
    city("Panama City", Americas, 9.0),
    city("Caracas", Americas, 10.5),
    city("Toronto", Americas, 43.7),
    city("Montreal", Americas, 45.5),
    city("Edmonton", Americas, 53.5),
    city("Whitehorse", Americas, 60.7),
    city("Guatemala City", Americas, 14.6),
    city("Manaus", Americas, -3.1),
    // Europe
    city("Reykjavik", Europe, 64.1),
    city("Tromso", Europe, 69.6),
    city("Murmansk", Europe, 68.9),
    city("Helsinki", Europe, 60.2),
    city("Stockholm", Europe, 59.3),
    city("Oslo", Europe, 59.9),
    city("St Petersburg", Europe, 59.9),
    city("Copenhagen", Europe, 55.7),
    city("Edinburgh", Europe, 55.9),
    city("Moscow", Europe, 55.8),
    city("London", Europe, 51.5),
    city("Paris", Europe, 48.9),
    city("Berlin", Europe, 52.5),
    city("Amsterdam", Europe, 52.4),
    city("Dublin", Europe, 53.3),
    city("Brussels", Europe, 50.8),
    city("Madrid", Europe, 40.4),
    city("Barcelona", Europe, 41.4),
    city("Rome", Europe, 41.9),
    city("Athens", Europe, 37.9),
    city("Lisbon", Europe, 38.7),
    city("Vienna", Europe, 48.2),
    city("Prague", Europe, 50.1),
    city("Warsaw", Europe, 52.2),
    city("Zurich", Europe, 47.4),
    city("Budapest", Europe, 47.5),
    city("Bucharest", Europe, 44.4),
    city("Riga", Europe, 56.9),
    city("Tallinn", Europe, 59.4),
    city("Vilnius", Europe, 54.7),
    // Africa
    city("Cairo", Africa, 30.0),
    city("Casablanca", Africa, 33.6),
    city("Tunis", Africa, 36.8),
    city("Algiers", Africa, 36.8),
    city("Lagos", Africa, 6.5),
    city("Accra", Africa, 5.6),
    city("Nairobi", Africa, -1.3),
    city("Addis Ababa", Africa, 9.0),
    city("Dar es Salaam", Africa, -6.8),
    city("Johannesburg", Africa, -26.2),
    city("Cape Town", Africa, -33.9),
    city("Dakar", Africa, 14.7),
    city("Khartoum", Africa, 15.6),
    city("Maputo", Africa, -25.9),
    city("Kampala", Africa, 0.3),
    city("Kinshasa", Africa, -4.3),
    city("Abuja", Africa, 9.1),
    city("Luanda", Africa, -8.8),
    city("Antananarivo", Africa, -18.9),
    city("Windhoek", Africa, -22.6),
    // Middle East
    city("Riyadh", MiddleEast, 24.7),
    city("Dubai", MiddleEast, 25.3),
    city("Mecca", MiddleEast, 21.4),
    city("Medina", MiddleEast, 24.5),
    city("Istanbul", MiddleEast, 41.0),
    city("Ankara", MiddleEast, 39.9),
    city("Tehran", MiddleEast, 35.7),
    city("Baghdad", MiddleEast, 33.3),
    city("Beirut", MiddleEast, 33.9),
    city("Jerusalem", MiddleEast, 31.8),
    city("Amman", MiddleEast, 31.9),
    city("Kuwait City", MiddleEast, 29.4),
    city("Doha", MiddleEast, 25.3),
    city("Muscat", MiddleEast, 23.6),
    city("Sanaa", MiddleEast, 15.4),
    city("Baku", MiddleEast, 40.4),
    city("Tbilisi", MiddleEast, 41.7),
    city("Aden", MiddleEast, 12.8),
    // Asia
    city("Karachi", Asia, 24.9),
    city("Delhi", Asia, 28.6),
    city("Mumbai", Asia, 19.1),
    city("Kolkata", Asia, 22.6),
    city("Chennai", Asia, 13.1),
    city("Dhaka", Asia, 23.8),
    city("Bangkok", Asia, 13.8),
    city("Kuala Lumpur", Asia, 3.1),
    city("Singapore", Asia, 1.4),
    city("Jakarta", Asia, -6.2),
    city("Manila", Asia, 14.6),
    city("Ho Chi Minh City", Asia, 10.8),
    city("Tokyo", Asia, 35.7),
    city("Seoul", Asia, 37.6),
    city("Beijing", Asia, 39.9),
    city("Shanghai", Asia, 31.2),
    city("Hong Kong", Asia, 22.3),
    city("Taipei", Asia, 25.0),
    city("Ulaanbaatar", Asia, 47.9),
    city("Almaty", Asia, 43.2),
    city("Tashkent", Asia, 41.3),
    city("Novosibirsk", Asia, 55.0),
    city("Yakutsk", Asia, 62.0),
    city("Vladivostok", Asia, 43.1),
    city("Colombo", Asia, 6.9),
    city("Kathmandu", Asia, 27.7),
    city("Islamabad", Asia, 33.7),
    city("Yangon", Asia, 16.9),
    city("Bishkek", Asia, 42.9),
    city("Krasnoyarsk", Asia, 56.0),
    // Oceania
    city("Sydney", Oceania, -33.9),
    city("Melbourne", Oceania, -37.8),
    city("Brisbane", Oceania, -27.5),
    city("Perth", Oceania, -31.9),
    city("Auckland", Oceania, -36.8),
    city("Wellington", Oceania, -41.3),
    city("Christchurch", Oceania, -43.5),
    city("Suva", Oceania, -18.1),
    city("Port Moresby", Oceania, -9.4),
    city("Hobart", Oceania, -42.9),
    city("Darwin", Oceania, -12.5),
    city("Adelaide", Oceania, -34.9),
    city("Canberra", Oceania, -35.3),
    city("Noumea", Oceania, -22.3),
    city("Papeete", Oceania, -17.5),
    city("Nadi", Oceania, -17.8),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_pool_size() {
        let pool = CityPool::builtin();
        assert_eq!(pool.len(), 144);
    }

    #[test]
    fn test_builtin_names_unique() {
        let pool = CityPool::builtin();
        let names: std::collections::HashSet<_> = pool.cities().iter().map(|c| &c.name).collect();
        assert_eq!(names.len(), pool.len());
    }

    #[test]
    fn test_by_region_covers_all_regions() {
        let pool = CityPool::builtin();
        let groups = pool.by_region();
        assert_eq!(groups.len(), 6);
        assert_eq!(groups[&Region::Americas].len(), 30);
        assert_eq!(groups[&Region::Oceania].len(), 16);
        assert_eq!(groups[&Region::MiddleEast][0].name, "Riyadh");
    }

    #[test]
    fn test_from_records_drops_duplicates() {
        let pool = CityPool::from_records(vec![
            CityRecord::new("Oslo", Region::Europe, 59.9),
            CityRecord::new("Oslo", Region::Europe, 10.0),
        ]);
        assert_eq!(pool.len(), 1);
        assert!((pool.cities()[0].latitude - 59.9).abs() < 1e-9);
    }

    #[test]
    fn test_extreme_classification() {
        let ushuaia = CityRecord::new("Ushuaia", Region::Americas, -54.8);
        assert!(ushuaia.is_southern());
        assert!(!ushuaia.is_high_latitude(55.0));
        let tromso = CityRecord::new("Tromso", Region::Europe, 69.6);
        assert!(tromso.is_high_latitude(55.0));
        assert!(!tromso.is_southern());
    }
}
