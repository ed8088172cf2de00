use std::time::Duration;

use reqwest::StatusCode;
use reqwest::blocking::Client as HttpClient;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use tracing::debug;

use crate::error::{Error, Result};
use crate::payload::ClimatologyPayload;
use crate::request::{ClimatologyRequest, OutputFormat};
use crate::sources::resolve_base_url;
use crate::url_builder::climatology_url;

/// Anything that can answer a single chunked climatology request.
pub trait ClimateApi {
    fn fetch(&self, request: &ClimatologyRequest<'_>) -> Result<ClimatologyPayload>;
}

impl<T: ClimateApi + ?Sized> ClimateApi for &T {
    fn fetch(&self, request: &ClimatologyRequest<'_>) -> Result<ClimatologyPayload> {
        (**self).fetch(request)
    }
}

#[derive(Debug, Clone)]
pub struct PowerOptions {
    /// Service name known to [`crate::sources`] or a literal endpoint URL.
    pub source: String,
    pub user_agent: String,
    pub timeout: Duration,
}

impl Default for PowerOptions {
    fn default() -> Self {
        Self {
            source: "power".to_string(),
            user_agent: concat!("power-cities-rs/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout: Duration::from_secs(60),
        }
    }
}

/// Blocking client for the POWER climatology point endpoint.
#[derive(Debug, Clone)]
pub struct PowerClient {
    base_url: String,
    http: HttpClient,
}

impl PowerClient {
    pub fn new(opts: PowerOptions) -> Result<Self> {
        let base_url = resolve_base_url(&opts.source)
            .ok_or_else(|| Error::InvalidRequest(format!("unknown source: {}", opts.source)))?;

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

        Ok(Self { base_url, http })
    }

    pub fn default_client() -> Result<Self> {
        Self::new(PowerOptions::default())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl ClimateApi for PowerClient {
    fn fetch(&self, request: &ClimatologyRequest<'_>) -> Result<ClimatologyPayload> {
        let url = climatology_url(&self.base_url, request)?;
        debug!(%url, "requesting climatology chunk");

        let resp = self.http.get(url).send()?;
        let status = resp.status();
        let body = resp.text()?;

        classify_response(status, body, request.format)
    }
}

/// Maps a raw HTTP answer onto a payload or one of the API error kinds.
pub(crate) fn classify_response(
    status: StatusCode,
    body: String,
    format: OutputFormat,
) -> Result<ClimatologyPayload> {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(Error::RateLimited {
            status: status.as_u16(),
            body,
        });
    }
    if !status.is_success() {
        return Err(Error::Api {
            status: status.as_u16(),
            body,
        });
    }

    if format.is_json() {
        Ok(ClimatologyPayload::Json(serde_json::from_str(&body)?))
    } else {
        Ok(ClimatologyPayload::Text(vec![body]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn throttling_is_its_own_error() {
        let err = classify_response(StatusCode::TOO_MANY_REQUESTS, "slow down".into(), OutputFormat::Json)
            .unwrap_err();
        assert!(matches!(err, Error::RateLimited { status: 429, ref body } if body == "slow down"));
    }

    #[test]
    fn other_failures_carry_status_and_body() {
        let body = r#"{"messages":["Your request has 21 parameters, the limit is 20"]}"#;
        let err = classify_response(StatusCode::UNPROCESSABLE_ENTITY, body.into(), OutputFormat::Json)
            .unwrap_err();
        match err {
            Error::Api { status, body: b } => {
                assert_eq!(status, 422);
                assert_eq!(b, body);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn success_parses_by_format() {
        let json = classify_response(
            StatusCode::OK,
            r#"{"properties":{"parameter":{"T2M":{"ANN":-999.0}}}}"#.into(),
            OutputFormat::Json,
        )
        .unwrap();
        assert_eq!(json.parameter_codes(), vec!["T2M"]);

        let csv = classify_response(StatusCode::OK, "PARAMETER,JAN\nT2M,1.0\n".into(), OutputFormat::Csv)
            .unwrap();
        assert_eq!(csv, ClimatologyPayload::Text(vec!["PARAMETER,JAN\nT2M,1.0\n".into()]));

        let bad = classify_response(StatusCode::OK, "<html>".into(), OutputFormat::Json);
        assert!(matches!(bad, Err(Error::Json(_))));
    }

    #[test]
    fn unknown_source_is_rejected() {
        let err = PowerClient::new(PowerOptions {
            source: "nope".into(),
            ..PowerOptions::default()
        })
        .unwrap_err();
        assert!(err.to_string().contains("unknown source"));
    }

    #[test]
    fn literal_source_is_kept() {
        let client = PowerClient::new(PowerOptions {
            source: "http://127.0.0.1:8080/point/".into(),
            ..PowerOptions::default()
        })
        .unwrap();
        assert_eq!(client.base_url(), "http://127.0.0.1:8080/point");
    }

    #[test]
    fn unreachable_api_is_a_service_error() {
        let client = PowerClient::new(PowerOptions {
            source: "http://127.0.0.1:9/point".into(),
            timeout: Duration::from_millis(500),
            ..PowerOptions::default()
        })
        .unwrap();
        let parameters = vec!["T2M".to_string()];
        let err = client
            .fetch(&ClimatologyRequest {
                latitude: 48.86,
                longitude: 2.32,
                parameters: &parameters,
                community: crate::request::Community::Re,
                format: OutputFormat::Json,
                start: None,
                end: None,
            })
            .unwrap_err();
        assert!(matches!(err, Error::Service(_)));
        assert!(err.to_string().starts_with("service error"));
    }
}
