use serde::Serialize;
use serde_json::{Map, Value};

use crate::geocode::GeocodeResult;
use crate::payload::ClimatologyPayload;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// Everything one successful geocoding call yields, stored as a unit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Geocoding {
    pub address: String,
    pub coordinates: Coordinates,
    pub geodetails: Map<String, Value>,
}

impl From<GeocodeResult> for Geocoding {
    fn from(res: GeocodeResult) -> Self {
        Self {
            address: res.address,
            coordinates: Coordinates {
                latitude: res.latitude,
                longitude: res.longitude,
            },
            geodetails: res.raw,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct City {
    name: String,
    geocoding: Option<Geocoding>,
    climatology: Option<ClimatologyPayload>,
}

impl City {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            geocoding: None,
            climatology: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn geocoding(&self) -> Option<&Geocoding> {
        self.geocoding.as_ref()
    }

    pub fn address(&self) -> Option<&str> {
        self.geocoding.as_ref().map(|g| g.address.as_str())
    }

    pub fn coordinates(&self) -> Option<Coordinates> {
        self.geocoding.as_ref().map(|g| g.coordinates)
    }

    pub fn geodetails(&self) -> Option<&Map<String, Value>> {
        self.geocoding.as_ref().map(|g| &g.geodetails)
    }

    pub fn climatology(&self) -> Option<&ClimatologyPayload> {
        self.climatology.as_ref()
    }

    pub(crate) fn set_geocoding(&mut self, result: GeocodeResult) {
        self.geocoding = Some(result.into());
    }

    pub(crate) fn set_climatology(&mut self, payload: ClimatologyPayload) {
        self.climatology = Some(payload);
    }
}
