use url::Url;

use crate::error::Result;
use crate::request::ClimatologyRequest;

pub fn climatology_url(base_url: &str, request: &ClimatologyRequest<'_>) -> Result<Url> {
    let mut url = Url::parse(base_url)?;
    {
        let mut query = url.query_pairs_mut();
        query
            .append_pair("parameters", &request.parameters.join(","))
            .append_pair("community", request.community.as_str())
            .append_pair("longitude", &request.longitude.to_string())
            .append_pair("latitude", &request.latitude.to_string())
            .append_pair("format", request.format.as_str());
        if let Some(start) = request.start {
            query.append_pair("start", &start.to_string());
        }
        if let Some(end) = request.end {
            query.append_pair("end", &end.to_string());
        }
    }
    Ok(url)
}
