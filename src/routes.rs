//! Preferred-route lookups (spec.md §6): a locally parsed NY-ARTCC table
//! (`nyprd`) and an HTTPS-queried FAA alternate database (`faaprd`). The
//! system only queries these; it never computes a route itself (spec.md
//! §1 non-goals).

use serde::Deserialize;
use std::collections::HashMap;

use crate::error::Error;

#[derive(Deserialize, Debug, Clone)]
pub struct PreferredRouteRecord {
    pub depart: String,
    pub arrive: String,
    pub route: String,
}

/// A small local CSV table, loaded the same way `Airports` is (spec.md
/// §6: "a local parsed table").
pub struct PreferredRoutes {
    by_pair: HashMap<(String, String), Vec<PreferredRouteRecord>>,
}

impl PreferredRoutes {
    pub fn new(filename: &str) -> Result<Self, Error> {
        let mut reader = csv::Reader::from_path(filename)?;
        let mut by_pair: HashMap<(String, String), Vec<PreferredRouteRecord>> = HashMap::new();
        for record in reader.deserialize() {
            let record: PreferredRouteRecord = record?;
            by_pair
                .entry((record.depart.clone(), record.arrive.clone()))
                .or_default()
                .push(record);
        }
        Ok(Self { by_pair })
    }

    pub fn from_records(records: Vec<PreferredRouteRecord>) -> Self {
        let mut by_pair: HashMap<(String, String), Vec<PreferredRouteRecord>> = HashMap::new();
        for record in records {
            by_pair
                .entry((record.depart.clone(), record.arrive.clone()))
                .or_default()
                .push(record);
        }
        Self { by_pair }
    }

    pub fn lookup(&self, depart: &str, arrive: &str) -> &[PreferredRouteRecord] {
        self.by_pair
            .get(&(depart.to_string(), arrive.to_string()))
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }
}

/// Queries the FAA alternate preferred-route database over HTTPS, per
/// spec.md §6 ("`depart=` and `arrive=` query params returning a JSON
/// array of route records").
pub fn fetch_faa_preferred_routes(
    endpoint: &str,
    depart: &str,
    arrive: &str,
) -> Result<Vec<PreferredRouteRecord>, Error> {
    let url = format!("{}?depart={}&arrive={}", endpoint, depart, arrive);
    let records: Vec<PreferredRouteRecord> = attohttpc::get(url)
        .send()?
        .error_for_status()?
        .json()?;
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PreferredRoutes {
        PreferredRoutes::from_records(vec![
            PreferredRouteRecord {
                depart: "KJFK".into(),
                arrive: "KBOS".into(),
                route: "GREKI JFUND".into(),
            },
            PreferredRouteRecord {
                depart: "KJFK".into(),
                arrive: "KBOS".into(),
                route: "HAARP ROBUC".into(),
            },
        ])
    }

    #[test]
    fn lookup_returns_all_routes_for_a_pair() {
        let routes = sample();
        assert_eq!(routes.lookup("KJFK", "KBOS").len(), 2);
    }

    #[test]
    fn lookup_is_empty_for_unknown_pair() {
        let routes = sample();
        assert!(routes.lookup("KJFK", "KLAX").is_empty());
    }
}
