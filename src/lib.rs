#![forbid(unsafe_code)]

//! Climatology for named cities from NASA POWER.
//!
//! Three external services are composed behind [`CityCollection`]:
//! - a geocoder ([`Nominatim`]) turns city names into coordinates,
//! - a browser driven through WebDriver scrapes the list of valid parameter
//!   codes into a [`ParameterCatalog`],
//! - the POWER climatology point API ([`PowerClient`]) returns monthly and
//!   annual values per location.
//!
//! The API caps how many parameters one request may carry, so a
//! [`ClimatologyQuery`] is split into chunks and the chunk responses are
//! merged per city. Everything runs sequentially, one call at a time.
//!
//! **Quick start**
//! ```no_run
//! use power_cities::{
//!     BrowserOptions, CityCollection, ClimatologyQuery, GeocoderOptions, PowerClient, fetch_catalog,
//! };
//!
//! let mut cities = CityCollection::new(["Montreal", "Paris", "Tokyo"]);
//! cities.get_geocoding_details(GeocoderOptions::default().min_delay_seconds(4.0))?;
//! println!("{:?}", cities.addresses());
//!
//! // Needs a running chromedriver on localhost:9515.
//! let catalog = fetch_catalog(&BrowserOptions::default())?;
//! let codes: Vec<&str> = catalog.codes().take(3).collect();
//!
//! let api = PowerClient::default_client()?;
//! cities.fetch_climatology(&api, &ClimatologyQuery::new(codes))?;
//! println!("{:?}", cities.climatology("Montreal"));
//! # Ok::<(), power_cities::Error>(())
//! ```
//!
//! Progress is reported through `tracing` events; install a subscriber to see it.
//! The POWER API throttles heavy use. Large batches only log a warning, nothing
//! is retried.

mod catalog;
mod cities;
mod city;
mod client;
mod date;
mod error;
mod geocode;
mod payload;
mod request;
mod sources;
mod url_builder;
mod webdriver;

pub use catalog::{BrowserOptions, ParameterCatalog, ParameterInfo, fetch_catalog};
pub use cities::{CityCollection, RATE_LIMIT_ADVISORY};
pub use city::{City, Coordinates, Geocoding};
pub use client::{ClimateApi, PowerClient, PowerOptions};
pub use date::{EARLIEST_YEAR, validate_years};
pub use error::{Error, Result};
pub use geocode::{GeocodeResult, Geocoder, GeocoderOptions, Nominatim, Throttle};
pub use payload::{ClimatologyPayload, deep_merge};
pub use request::{
    ClimatologyQuery, ClimatologyRequest, Community, DEFAULT_MAX_PARAMS_PER_QUERY, OutputFormat,
    partition_parameters,
};
pub use sources::{is_http_url, source_to_base_url};
pub use url_builder::climatology_url;
