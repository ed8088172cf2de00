/// Built-in endpoints for the services this crate talks to.
///
/// Anything that is already an `http(s)` URL is used as-is.
pub fn source_to_base_url(source: &str) -> Option<&'static str> {
    match source {
        "power" => Some("https://power.larc.nasa.gov/api/temporal/climatology/point"),
        "nominatim" => Some("https://nominatim.openstreetmap.org"),
        "power-parameters" => Some("https://power.larc.nasa.gov/parameters/"),
        "webdriver" => Some("http://localhost:9515"),
        _ => None,
    }
}

pub fn is_http_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

pub(crate) fn resolve_base_url(source: &str) -> Option<String> {
    if is_http_url(source) {
        Some(source.trim_end_matches('/').to_string())
    } else {
        source_to_base_url(source).map(|u| u.trim_end_matches('/').to_string())
    }
}
