use std::fmt;
use std::str::FromStr;

use crate::date::validate_years;
use crate::error::{Error, Result};

/// Per-request parameter cap of the climatology point endpoint.
pub const DEFAULT_MAX_PARAMS_PER_QUERY: usize = 20;

/// User community the API tailors units and defaults to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Community {
    /// Agroclimatology.
    Ag,
    /// Renewable energy.
    Re,
    /// Sustainable buildings.
    Sb,
}

impl Community {
    pub fn as_str(&self) -> &'static str {
        match self {
            Community::Ag => "AG",
            Community::Re => "RE",
            Community::Sb => "SB",
        }
    }

    pub const fn all() -> &'static [Community] {
        &[Community::Ag, Community::Re, Community::Sb]
    }
}

impl fmt::Display for Community {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Community {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "AG" => Ok(Community::Ag),
            "RE" => Ok(Community::Re),
            "SB" => Ok(Community::Sb),
            _ => Err(Error::InvalidRequest(format!(
                "unknown community `{s}`; expected one of AG, RE, SB"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputFormat {
    Json,
    Csv,
    Ascii,
    NetCdf,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Json => "JSON",
            OutputFormat::Csv => "CSV",
            OutputFormat::Ascii => "ASCII",
            OutputFormat::NetCdf => "NETCDF",
        }
    }

    pub fn is_json(&self) -> bool {
        matches!(self, OutputFormat::Json)
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "JSON" => Ok(OutputFormat::Json),
            "CSV" => Ok(OutputFormat::Csv),
            "ASCII" => Ok(OutputFormat::Ascii),
            "NETCDF" => Ok(OutputFormat::NetCdf),
            _ => Err(Error::InvalidRequest(format!("unknown output format `{s}`"))),
        }
    }
}

/// What to fetch for every city of a collection.
///
/// Builder style:
/// ```
/// use power_cities::{ClimatologyQuery, Community};
///
/// let query = ClimatologyQuery::new(["T2M", "PRECTOTCORR"])
///     .community(Community::Ag)
///     .years(2015, 2018)
///     .max_params_per_query(10);
/// assert_eq!(query.chunks().count(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClimatologyQuery {
    parameters: Vec<String>,
    community: Community,
    format: OutputFormat,
    start: Option<i32>,
    end: Option<i32>,
    max_params_per_query: usize,
}

impl ClimatologyQuery {
    pub fn new<S: Into<String>>(parameters: impl IntoIterator<Item = S>) -> Self {
        Self {
            parameters: parameters.into_iter().map(Into::into).collect(),
            community: Community::Re,
            format: OutputFormat::Json,
            start: None,
            end: None,
            max_params_per_query: DEFAULT_MAX_PARAMS_PER_QUERY,
        }
    }

    pub fn community(mut self, community: Community) -> Self {
        self.community = community;
        self
    }

    pub fn format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    pub fn start(mut self, year: i32) -> Self {
        self.start = Some(year);
        self
    }

    pub fn end(mut self, year: i32) -> Self {
        self.end = Some(year);
        self
    }

    pub fn years(self, start: i32, end: i32) -> Self {
        self.start(start).end(end)
    }

    pub fn max_params_per_query(mut self, cap: usize) -> Self {
        self.max_params_per_query = cap;
        self
    }

    pub fn parameters(&self) -> &[String] {
        &self.parameters
    }

    pub fn get_community(&self) -> Community {
        self.community
    }

    pub fn get_format(&self) -> OutputFormat {
        self.format
    }

    pub fn year_range(&self) -> (Option<i32>, Option<i32>) {
        (self.start, self.end)
    }

    pub fn cap(&self) -> usize {
        self.max_params_per_query
    }

    /// Checks everything that can be checked without touching the network.
    pub fn validate(&self) -> Result<()> {
        if self.parameters.is_empty() {
            return Err(Error::InvalidRequest("parameter list is empty".into()));
        }
        if let Some(p) = self.parameters.iter().find(|p| p.trim().is_empty()) {
            return Err(Error::InvalidRequest(format!("blank parameter code: {p:?}")));
        }
        if self.max_params_per_query == 0 {
            return Err(Error::InvalidRequest(
                "max_params_per_query must be at least 1".into(),
            ));
        }
        validate_years(self.start, self.end)
    }

    /// Parameter chunks in request order.
    pub fn chunks(&self) -> std::slice::Chunks<'_, String> {
        partition_parameters(&self.parameters, self.max_params_per_query.max(1))
    }
}

/// Splits `parameters` into consecutive chunks of at most `cap` entries.
///
/// Chunk boundaries depend only on `parameters.len()` and `cap`. Panics if
/// `cap` is zero; [`ClimatologyQuery::validate`] rejects that first.
pub fn partition_parameters(parameters: &[String], cap: usize) -> std::slice::Chunks<'_, String> {
    parameters.chunks(cap)
}

/// One API call: a single chunk of parameters for one location.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClimatologyRequest<'a> {
    pub latitude: f64,
    pub longitude: f64,
    pub parameters: &'a [String],
    pub community: Community,
    pub format: OutputFormat,
    pub start: Option<i32>,
    pub end: Option<i32>,
}
