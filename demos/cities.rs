use std::env;
use std::process;

use power_cities::{
    BrowserOptions, CityCollection, ClimatologyQuery, Community, GeocoderOptions, PowerClient,
    fetch_catalog,
};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("power_cities=info")),
        )
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    let names = if args.is_empty() {
        vec!["Montreal".to_string(), "Paris".to_string(), "Tokyo".to_string()]
    } else {
        args
    };

    let mut cities = CityCollection::new(names);
    println!("{cities}");

    if let Err(e) = cities.get_geocoding_details(GeocoderOptions::default().min_delay_seconds(4.0)) {
        eprintln!("geocoding failed: {e}");
        process::exit(1);
    }
    for (name, xy) in cities.coordinates() {
        println!("{name}: {:.4}, {:.4}", xy.latitude, xy.longitude);
    }

    // The catalog needs a WebDriver server (e.g. `chromedriver --port=9515`).
    // Fall back to a few well-known codes when none is running.
    let parameters: Vec<String> = match fetch_catalog(&BrowserOptions::default()) {
        Ok(catalog) => {
            println!("{} parameters available", catalog.len());
            let mut codes = catalog.codes_for(Community::Re);
            if codes.is_empty() {
                codes = catalog.codes().collect();
            }
            codes.into_iter().take(3).map(String::from).collect()
        }
        Err(e) => {
            eprintln!("catalog unavailable ({e}); using defaults");
            vec!["T2M".into(), "T10M_MIN".into(), "PRECTOTCORR".into()]
        }
    };

    let api = match PowerClient::default_client() {
        Ok(api) => api,
        Err(e) => {
            eprintln!("cannot create client: {e}");
            process::exit(1);
        }
    };

    let query = ClimatologyQuery::new(parameters.clone());
    if let Err(e) = cities.fetch_climatology(&api, &query) {
        eprintln!("climatology fetch failed: {e}");
        process::exit(1);
    }
    if let Some(payload) = cities.climatology(cities.names()[0]) {
        println!("{}", render(payload));
    }

    // Same parameters over a fixed year range; replaces the payloads above.
    let query = ClimatologyQuery::new(parameters).years(2015, 2018);
    if let Err(e) = cities.fetch_climatology(&api, &query) {
        eprintln!("climatology fetch failed: {e}");
        eprintln!("Tip: the API throttles bursts; wait a minute before retrying.");
        process::exit(1);
    }
    for (name, payload) in cities.climatologies() {
        println!("{name}: {:?}", payload.parameter_codes());
    }
}

fn render(payload: &power_cities::ClimatologyPayload) -> String {
    match payload.as_json() {
        Some(v) => v.to_string(),
        None => format!("{payload:?}"),
    }
}
