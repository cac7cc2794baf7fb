//! A small local airport database: ICAO/IATA lookup and a bounding box for
//! the HTTP ingest backend (spec.md §4.G, "a fixed 50 nm radius"). Loaded
//! from a CSV file, following the teacher's `Airports::new`.

use serde::Deserialize;
use std::collections::HashMap;

use crate::error::Error;
use crate::geometry::{self, Bounds, LatLon};

#[derive(Deserialize, Debug, Clone)]
pub struct AirportRecord {
    pub ident: String,
    #[serde(default)]
    pub iata_code: String,
    pub latitude_deg: f64,
    pub longitude_deg: f64,
}

pub struct Airports {
    by_icao: HashMap<String, AirportRecord>,
    iata_to_icao: HashMap<String, String>,
}

impl Airports {
    pub fn new(filename: &str) -> Result<Self, Error> {
        let mut reader = csv::Reader::from_path(filename)?;
        let mut by_icao = HashMap::new();
        let mut iata_to_icao = HashMap::new();

        for record in reader.deserialize() {
            let record: AirportRecord = record?;
            if !record.iata_code.is_empty() {
                iata_to_icao.insert(record.iata_code.clone(), record.ident.clone());
            }
            by_icao.insert(record.ident.clone(), record);
        }

        Ok(Self {
            by_icao,
            iata_to_icao,
        })
    }

    pub fn from_records(records: Vec<AirportRecord>) -> Self {
        let mut by_icao = HashMap::new();
        let mut iata_to_icao = HashMap::new();
        for record in records {
            if !record.iata_code.is_empty() {
                iata_to_icao.insert(record.iata_code.clone(), record.ident.clone());
            }
            by_icao.insert(record.ident.clone(), record);
        }
        Self {
            by_icao,
            iata_to_icao,
        }
    }

    pub fn get_lat_lon(&self, icao: &str) -> Option<LatLon> {
        let data = self.by_icao.get(icao)?;
        Some(LatLon {
            lat: data.latitude_deg,
            lon: data.longitude_deg,
        })
    }

    /// Bounding box around `icao` at the given radius in nautical miles.
    /// Used by the HTTP ingest backend's bbox query (spec.md §4.G).
    pub fn get_bounds_from_radius(&self, icao: &str, radius_nm: f64) -> Option<Bounds> {
        let center = self.get_lat_lon(icao)?;
        let lat_offset = geometry::convert_miles_to_lat(radius_nm);
        let lon_offset = geometry::convert_miles_to_lon(radius_nm, center.lat);

        Some(Bounds {
            lat1: (center.lat + lat_offset) as f32,
            lon1: (center.lon - lon_offset) as f32,
            lat2: (center.lat - lat_offset) as f32,
            lon2: (center.lon + lon_offset) as f32,
        })
    }

    pub fn get_icao_from_iata(&self, iata: &str) -> Option<&String> {
        self.iata_to_icao.get(iata)
    }

    pub fn get(&self, icao: &str) -> Option<&AirportRecord> {
        self.by_icao.get(icao)
    }
}
