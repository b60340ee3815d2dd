use itertools::Itertools;

use crate::config::EtlConfig;

/// Value of `sub_district` for locations that are districts themselves.
pub const NOT_APPLICABLE: &str = "N/A";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationKind {
    District,
    SubDistrict,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub name: String,
    pub kind: LocationKind,
}

impl Location {
    pub fn classify(name: &str, config: &EtlConfig) -> Location {
        let kind = if config.sub_districts.iter().any(|s| s == name) {
            LocationKind::SubDistrict
        } else {
            LocationKind::District
        };
        Location {
            name: name.to_string(),
            kind,
        }
    }

    /// The `q` parameter sent to the weather API.  An alias wins over the
    /// composed name.
    pub fn vendor_query(&self, config: &EtlConfig) -> String {
        if let Some(alias) = config.aliases.get(&self.name) {
            return alias.clone();
        }
        match self.kind {
            LocationKind::SubDistrict => format!(
                "{},{},{},{}",
                self.name, config.parent_district, config.region, config.country_code
            ),
            LocationKind::District => {
                format!("{},{},{}", self.name, config.region, config.country_code)
            }
        }
    }

    /// Return the (district, sub_district) pair for this location.
    pub fn identity(&self, config: &EtlConfig) -> (String, String) {
        match self.kind {
            LocationKind::SubDistrict => (config.parent_district.clone(), self.name.clone()),
            LocationKind::District => (self.name.clone(), NOT_APPLICABLE.to_string()),
        }
    }
}

/// All configured locations, districts first, without duplicates.
pub fn configured_locations(config: &EtlConfig) -> Vec<String> {
    config
        .districts
        .iter()
        .chain(config.sub_districts.iter())
        .unique()
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vendor_queries() {
        let config = EtlConfig::new("key");
        let query = |name: &str| Location::classify(name, &config).vendor_query(&config);
        assert_eq!(query("Pune"), "Pune,Maharashtra,IN");
        assert_eq!(query("Igatpuri"), "Igatpuri,Nashik,Maharashtra,IN");
        assert_eq!(query("Trimbakeshwar"), "Trimbak,Maharashtra,IN");
        assert_eq!(query("Chandwad"), "Chandvad,Maharashtra,IN");
        assert_eq!(query("Raigad"), "Alibag,Maharashtra,IN");
    }

    #[test]
    fn identity_of_locations() {
        let config = EtlConfig::new("key");
        let sinnar = Location::classify("Sinnar", &config);
        assert_eq!(sinnar.kind, LocationKind::SubDistrict);
        assert_eq!(
            sinnar.identity(&config),
            ("Nashik".to_string(), "Sinnar".to_string())
        );
        let nashik = Location::classify("Nashik", &config);
        assert_eq!(
            nashik.identity(&config),
            ("Nashik".to_string(), "N/A".to_string())
        );
    }

    #[test]
    fn unique_locations() {
        let config = EtlConfig::new("key");
        let locations = configured_locations(&config);
        // "Thane" is listed twice in the district list
        assert_eq!(locations.len(), 31 + 14);
        assert_eq!(locations.iter().filter(|&x| x == "Thane").count(), 1);
        assert_eq!(locations[0], "Ahmednagar");
        assert_eq!(locations.last().map(|s| s.as_str()), Some("Sinnar"));
    }
}
