use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Transport failure, timeout, or unreadable body from the geocoder or
    /// the climate api.
    #[error("service error: {0}")]
    Service(#[from] reqwest::Error),

    /// Non-success status from the geocoder.
    #[error("service returned status {status}: {body}")]
    ServiceStatus { status: u16, body: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("no geocoding match for `{0}`")]
    NotFound(String),

    #[error("city `{0}` has no coordinates; geocode it before fetching climatology")]
    MissingCoordinates(String),

    #[error("climate api returned status {status}: {body}")]
    Api { status: u16, body: String },

    #[error("climate api throttled the request (status {status}): {body}")]
    RateLimited { status: u16, body: String },

    #[error("webdriver error: {0}")]
    Driver(String),

    #[error("scrape error: {0}")]
    Scrape(String),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),
}
