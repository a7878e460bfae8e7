//! Static catalog of world capitals driving batch iteration
//!
//! The catalog is read-only and loaded once; country is the natural key
//! (one capital per country).

use serde::Deserialize;

/// One catalog entry
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Capital {
    pub country: String,
    pub city: String,
    pub continent: String,
}

/// The full list of known capitals
#[derive(Debug, Clone)]
pub struct CapitalCatalog {
    entries: Vec<Capital>,
}

const CAPITALS_JSON: &str = include_str!("data/capitals.json");

impl CapitalCatalog {
    /// Load the embedded catalog.
    ///
    /// The embedded document is part of the build, so a parse failure is a
    /// build defect rather than a runtime condition.
    pub fn load() -> Self {
        let entries: Vec<Capital> =
            serde_json::from_str(CAPITALS_JSON).expect("embedded capitals catalog is valid JSON");
        Self { entries }
    }

    pub fn entries(&self) -> &[Capital] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up an entry by capital city name, case-insensitive
    pub fn by_city(&self, city: &str) -> Option<&Capital> {
        self.entries
            .iter()
            .find(|c| c.city.eq_ignore_ascii_case(city))
    }

    /// Look up an entry by country name, case-insensitive
    pub fn by_country(&self, country: &str) -> Option<&Capital> {
        self.entries
            .iter()
            .find(|c| c.country.eq_ignore_ascii_case(country))
    }

    /// Resolve either a city or a country name to a catalog entry
    pub fn resolve(&self, name: &str) -> Option<&Capital> {
        self.by_city(name).or_else(|| self.by_country(name))
    }

    /// The full batch as `(city, country)` pairs for the orchestrator
    pub fn batch_pairs(&self) -> Vec<(String, String)> {
        self.entries
            .iter()
            .map(|c| (c.city.clone(), c.country.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_loads() {
        let catalog = CapitalCatalog::load();
        assert!(catalog.len() > 40);
    }

    #[test]
    fn test_countries_are_unique() {
        let catalog = CapitalCatalog::load();
        let mut countries: Vec<&str> = catalog
            .entries()
            .iter()
            .map(|c| c.country.as_str())
            .collect();
        countries.sort_unstable();
        let before = countries.len();
        countries.dedup();
        assert_eq!(before, countries.len());
    }

    #[test]
    fn test_by_city_case_insensitive() {
        let catalog = CapitalCatalog::load();
        let entry = catalog.by_city("berlin").unwrap();
        assert_eq!(entry.country, "Germany");
    }

    #[test]
    fn test_by_country() {
        let catalog = CapitalCatalog::load();
        let entry = catalog.by_country("Japan").unwrap();
        assert_eq!(entry.city, "Tokyo");
    }

    #[test]
    fn test_resolve_prefers_city_then_country() {
        let catalog = CapitalCatalog::load();
        assert_eq!(catalog.resolve("Paris").unwrap().country, "France");
        assert_eq!(catalog.resolve("France").unwrap().city, "Paris");
        assert!(catalog.resolve("Atlantis").is_none());
    }
}
