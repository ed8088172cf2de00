use std::collections::BTreeMap;
use std::thread;
use std::time::{Duration, Instant};

use reqwest::StatusCode;
use reqwest::blocking::Client as HttpClient;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;
use url::Url;

use crate::error::{Error, Result};
use crate::sources::resolve_base_url;

/// Best match for a place name.
#[derive(Debug, Clone, PartialEq)]
pub struct GeocodeResult {
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    /// The provider's record, untouched.
    pub raw: Map<String, Value>,
}

pub trait Geocoder {
    fn geocode(&mut self, query: &str) -> Result<GeocodeResult>;
}

impl<G: Geocoder + ?Sized> Geocoder for &mut G {
    fn geocode(&mut self, query: &str) -> Result<GeocodeResult> {
        (**self).geocode(query)
    }
}

#[derive(Debug, Clone)]
pub struct GeocoderOptions {
    pub source: String,
    /// Nominatim's usage policy requires an identifying agent.
    pub user_agent: String,
    pub timeout: Duration,
    /// Minimum pause between two successive lookups.
    pub min_delay: Duration,
    /// Extra provider query options, e.g. `countrycodes` or `accept-language`.
    pub extra: BTreeMap<String, String>,
}

impl Default for GeocoderOptions {
    fn default() -> Self {
        Self {
            source: "nominatim".to_string(),
            user_agent: concat!("power-cities-rs/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout: Duration::from_secs(10),
            min_delay: Duration::from_secs(3),
            extra: BTreeMap::new(),
        }
    }
}

impl GeocoderOptions {
    pub fn min_delay_seconds(mut self, seconds: f64) -> Self {
        self.min_delay = Duration::try_from_secs_f64(seconds.max(0.0)).unwrap_or(Duration::MAX);
        self
    }

    pub fn option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

/// Keeps successive calls at least `min_delay` apart.
#[derive(Debug, Clone)]
pub struct Throttle {
    min_delay: Duration,
    last: Option<Instant>,
}

impl Throttle {
    pub fn new(min_delay: Duration) -> Self {
        Self {
            min_delay,
            last: None,
        }
    }

    /// Sleeps out the rest of the delay, then records the new call.
    pub fn wait(&mut self) {
        if let Some(last) = self.last {
            let elapsed = last.elapsed();
            if elapsed < self.min_delay {
                let pause = self.min_delay - elapsed;
                debug!(?pause, "pacing geocoding request");
                thread::sleep(pause);
            }
        }
        self.last = Some(Instant::now());
    }
}

/// Blocking OpenStreetMap Nominatim lookup, paced by a [`Throttle`].
#[derive(Debug)]
pub struct Nominatim {
    search_url: Url,
    extra: BTreeMap<String, String>,
    http: HttpClient,
    throttle: Throttle,
}

impl Nominatim {
    pub fn new(opts: GeocoderOptions) -> Result<Self> {
        let base_url = resolve_base_url(&opts.source)
            .ok_or_else(|| Error::InvalidRequest(format!("unknown source: {}", opts.source)))?;
        let search_url = Url::parse(&format!("{base_url}/search"))?;

        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&opts.user_agent)
                .map_err(|_| Error::InvalidRequest(format!("invalid user agent: {}", opts.user_agent)))?,
        );
        let http = HttpClient::builder()
            .default_headers(headers)
            .timeout(opts.timeout)
            .build()?;

        Ok(Self {
            search_url,
            extra: opts.extra,
            http,
            throttle: Throttle::new(opts.min_delay),
        })
    }

    fn search_url_for(&self, query: &str) -> Url {
        let mut url = self.search_url.clone();
        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair("q", query)
                .append_pair("format", "jsonv2")
                .append_pair("limit", "1");
            for (k, v) in &self.extra {
                pairs.append_pair(k, v);
            }
        }
        url
    }
}

impl Geocoder for Nominatim {
    fn geocode(&mut self, query: &str) -> Result<GeocodeResult> {
        let query = query.trim();
        if query.is_empty() {
            return Err(Error::InvalidRequest("empty place name".into()));
        }

        let url = self.search_url_for(query);
        self.throttle.wait();
        debug!(%url, "geocoding");

        let resp = self.http.get(url).send()?;
        let status = resp.status();
        let body = resp.text()?;

        classify_search(query, status, &body)
    }
}

/// Maps a raw `/search` answer onto the best match or an error.
pub(crate) fn classify_search(query: &str, status: StatusCode, body: &str) -> Result<GeocodeResult> {
    if !status.is_success() {
        return Err(Error::ServiceStatus {
            status: status.as_u16(),
            body: body.to_string(),
        });
    }

    let places: Vec<Map<String, Value>> = serde_json::from_str(body)?;
    let raw = places
        .into_iter()
        .next()
        .ok_or_else(|| Error::NotFound(query.to_string()))?;

    place_to_result(raw)
}

#[derive(Deserialize)]
struct Place {
    display_name: String,
    lat: String,
    lon: String,
}

fn place_to_result(raw: Map<String, Value>) -> Result<GeocodeResult> {
    let place: Place = serde_json::from_value(Value::Object(raw.clone()))?;
    let latitude = parse_degrees(&place.lat, "lat")?;
    let longitude = parse_degrees(&place.lon, "lon")?;

    Ok(GeocodeResult {
        address: place.display_name,
        latitude,
        longitude,
        raw,
    })
}

fn parse_degrees(s: &str, field: &str) -> Result<f64> {
    s.trim()
        .parse()
        .map_err(|_| Error::InvalidResponse(format!("geocoder returned non-numeric {field}: {s:?}")))
}
