use std::fmt;

use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::city::{City, Coordinates};
use crate::client::ClimateApi;
use crate::error::{Error, Result};
use crate::geocode::{Geocoder, GeocoderOptions, Nominatim};
use crate::payload::ClimatologyPayload;
use crate::request::{ClimatologyQuery, ClimatologyRequest};

/// Above this many API calls in one batch the user is warned about throttling.
pub const RATE_LIMIT_ADVISORY: usize = 30;

/// An ordered list of cities that are geocoded and fetched as a batch.
///
/// Batches run strictly in order, one external call at a time, and stop at
/// the first error. Cities handled before the failure keep their new state;
/// the failing city and the ones after it keep what they had.
///
/// ```no_run
/// use power_cities::{CityCollection, ClimatologyQuery, GeocoderOptions, PowerClient};
///
/// let mut cities = CityCollection::new(["Montreal", "Paris", "Tokyo"]);
/// cities.get_geocoding_details(GeocoderOptions::default().min_delay_seconds(4.0))?;
///
/// let api = PowerClient::default_client()?;
/// cities.fetch_climatology(&api, &ClimatologyQuery::new(["T2M", "T10M_MIN"]).years(2015, 2018))?;
/// println!("{:?}", cities.climatology("Montreal"));
/// # Ok::<(), power_cities::Error>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CityCollection {
    cities: Vec<City>,
}

impl CityCollection {
    pub fn new<S: Into<String>>(names: impl IntoIterator<Item = S>) -> Self {
        Self {
            cities: names.into_iter().map(City::new).collect(),
        }
    }

    /// Replaces the whole list; geocoding and climatology state is dropped.
    pub fn set_names<S: Into<String>>(&mut self, names: impl IntoIterator<Item = S>) {
        *self = Self::new(names);
    }

    pub fn push(&mut self, name: impl Into<String>) {
        self.cities.push(City::new(name));
    }

    pub fn len(&self) -> usize {
        self.cities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cities.is_empty()
    }

    pub fn cities(&self) -> &[City] {
        &self.cities
    }

    pub fn iter(&self) -> std::slice::Iter<'_, City> {
        self.cities.iter()
    }

    /// First city called `name`.
    pub fn get(&self, name: &str) -> Option<&City> {
        self.cities.iter().find(|c| c.name() == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.cities.iter().map(City::name).collect()
    }

    /// Addresses of the geocoded cities, in list order.
    pub fn addresses(&self) -> Vec<&str> {
        self.cities.iter().filter_map(City::address).collect()
    }

    pub fn coordinates(&self) -> Vec<(&str, Coordinates)> {
        self.cities
            .iter()
            .filter_map(|c| c.coordinates().map(|xy| (c.name(), xy)))
            .collect()
    }

    pub fn geodetails(&self) -> Vec<(&str, &Map<String, Value>)> {
        self.cities
            .iter()
            .filter_map(|c| c.geodetails().map(|g| (c.name(), g)))
            .collect()
    }

    pub fn climatologies(&self) -> Vec<(&str, &ClimatologyPayload)> {
        self.cities
            .iter()
            .filter_map(|c| c.climatology().map(|p| (c.name(), p)))
            .collect()
    }

    pub fn climatology(&self, name: &str) -> Option<&ClimatologyPayload> {
        self.get(name).and_then(City::climatology)
    }

    /// Geocodes every city through a fresh, paced Nominatim client.
    pub fn get_geocoding_details(&mut self, opts: GeocoderOptions) -> Result<()> {
        let mut geocoder = Nominatim::new(opts)?;
        self.geocode_all(&mut geocoder)
    }

    /// Resolves every city in order, stopping at the first failure.
    pub fn geocode_all<G: Geocoder>(&mut self, mut geocoder: G) -> Result<()> {
        for city in &mut self.cities {
            info!("Fetching geocoding information for city of {}...", city.name());
            let result = geocoder.geocode(city.name())?;
            city.set_geocoding(result);
        }
        info!("Done!");
        Ok(())
    }

    /// Fetches `query` for every city, replacing each city's climatology.
    ///
    /// Everything is validated before the first request: the query itself
    /// and that every city has coordinates. Parameters are sent in chunks of
    /// at most `query.cap()` codes; a city's chunk results are merged and only
    /// committed once all of its chunks succeeded.
    pub fn fetch_climatology<A: ClimateApi>(&mut self, api: A, query: &ClimatologyQuery) -> Result<()> {
        query.validate()?;
        let located = self
            .cities
            .iter()
            .map(|c| c.coordinates().ok_or_else(|| Error::MissingCoordinates(c.name().to_string())))
            .collect::<Result<Vec<Coordinates>>>()?;

        let chunks: Vec<&[String]> = query.chunks().collect();
        let total = chunks.len() * self.cities.len();
        if total > RATE_LIMIT_ADVISORY {
            warn!(
                requests = total,
                "large batch; the climate api may throttle, consider fewer cities or parameters"
            );
        }
        let (start, end) = query.year_range();

        for (city, xy) in self.cities.iter_mut().zip(located) {
            info!(
                "Fetching climatology for city of {} ({} request(s))...",
                city.name(),
                chunks.len()
            );

            let mut merged: Option<ClimatologyPayload> = None;
            for chunk in &chunks {
                let request = ClimatologyRequest {
                    latitude: xy.latitude,
                    longitude: xy.longitude,
                    parameters: chunk,
                    community: query.get_community(),
                    format: query.get_format(),
                    start,
                    end,
                };
                let payload = api.fetch(&request)?;
                merged = Some(match merged.take() {
                    Some(mut acc) => {
                        acc.absorb(payload);
                        acc
                    }
                    None => payload,
                });
            }

            if let Some(payload) = merged {
                city.set_climatology(payload);
            }
        }

        info!("Done!");
        Ok(())
    }
}

impl fmt::Display for CityCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.names().join(", "))
    }
}

impl<'a> IntoIterator for &'a CityCollection {
    type Item = &'a City;
    type IntoIter = std::slice::Iter<'a, City>;

    fn into_iter(self) -> Self::IntoIter {
        self.cities.iter()
    }
}
