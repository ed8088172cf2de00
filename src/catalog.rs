use std::collections::BTreeMap;
use std::thread;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::request::Community;
use crate::sources::resolve_base_url;
use crate::webdriver::{ScriptRunner, Session};

/// Reads the entries of the `<select>` matched by `arguments[0]`.
///
/// Returns `null` while the control does not exist yet.
const READ_OPTIONS_SCRIPT: &str = r#"
const select = document.querySelector(arguments[0]);
if (!select) { return null; }
return Array.from(select.options).map(o => ({
  value: o.value,
  text: (o.textContent || "").trim(),
  communities: (o.dataset && o.dataset.communities) || ""
}));
"#;

/// One parameter the climate API accepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParameterInfo {
    pub code: String,
    pub long_name: String,
    pub units: Option<String>,
    /// Community tags as listed by the page (`AG`, `RE`, `SB`, ...).
    pub communities: Vec<String>,
}

impl ParameterInfo {
    pub fn in_community(&self, community: Community) -> bool {
        self.communities.iter().any(|c| c.eq_ignore_ascii_case(community.as_str()))
    }
}

/// Every known shorthand code with its metadata, keyed by code.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParameterCatalog {
    entries: BTreeMap<String, ParameterInfo>,
}

impl ParameterCatalog {
    pub fn get(&self, code: &str) -> Option<&ParameterInfo> {
        self.entries.get(code)
    }

    pub fn contains(&self, code: &str) -> bool {
        self.entries.contains_key(code)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ParameterInfo> {
        self.entries.values()
    }

    /// Codes tagged for `community`.
    pub fn codes_for(&self, community: Community) -> Vec<&str> {
        self.iter()
            .filter(|p| p.in_community(community))
            .map(|p| p.code.as_str())
            .collect()
    }
}

impl FromIterator<ParameterInfo> for ParameterCatalog {
    fn from_iter<I: IntoIterator<Item = ParameterInfo>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().map(|p| (p.code.clone(), p)).collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BrowserOptions {
    /// Driver endpoint, a name known to [`crate::sources`] or a URL.
    pub webdriver: String,
    pub browser: String,
    pub headless: bool,
    pub page: String,
    /// CSS selector of the parameter `<select>`.
    pub selector: String,
    pub page_load_timeout: Duration,
    /// How long to wait for page scripts to fill the control.
    pub render_timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            webdriver: "webdriver".to_string(),
            browser: "chrome".to_string(),
            headless: true,
            page: "power-parameters".to_string(),
            selector: "select#parameters".to_string(),
            page_load_timeout: Duration::from_secs(60),
            render_timeout: Duration::from_secs(30),
            poll_interval: Duration::from_millis(500),
        }
    }
}

impl BrowserOptions {
    fn capabilities(&self) -> Value {
        let mut caps = json!({ "browserName": self.browser });
        if self.headless {
            match self.browser.as_str() {
                "chrome" | "chromium" => {
                    caps["goog:chromeOptions"] = json!({ "args": ["--headless=new", "--disable-gpu"] });
                }
                "firefox" => {
                    caps["moz:firefoxOptions"] = json!({ "args": ["-headless"] });
                }
                "MicrosoftEdge" | "msedge" => {
                    caps["ms:edgeOptions"] = json!({ "args": ["--headless=new"] });
                }
                _ => {}
            }
        }
        caps
    }

    /// HTTP timeout for driver commands, with headroom over the page load.
    fn driver_timeout(&self) -> Duration {
        self.page_load_timeout.saturating_add(Duration::from_secs(30))
    }
}

/// Scrapes the parameter catalog with a fresh browser session.
///
/// The session is closed before this returns, whatever the outcome.
pub fn fetch_catalog(opts: &BrowserOptions) -> Result<ParameterCatalog> {
    let driver = resolve_base_url(&opts.webdriver)
        .ok_or_else(|| Error::InvalidRequest(format!("unknown webdriver: {}", opts.webdriver)))?;
    let page = resolve_base_url(&opts.page)
        .ok_or_else(|| Error::InvalidRequest(format!("unknown page: {}", opts.page)))?;

    info!(%page, "Fetching climatology parameter catalog...");
    let session = Session::start(&driver, opts.capabilities(), opts.driver_timeout())?;
    session.set_page_load_timeout(opts.page_load_timeout)?;
    session
        .navigate(&page)
        .map_err(|e| Error::Scrape(format!("cannot load {page}: {e}")))?;

    let entries = wait_for_options(&session, opts)?;
    let catalog = parse_options(entries)?;
    info!(parameters = catalog.len(), "Done!");
    Ok(catalog)
}

fn wait_for_options<R: ScriptRunner + ?Sized>(runner: &R, opts: &BrowserOptions) -> Result<Vec<RawOption>> {
    let start = Instant::now();
    let mut control_seen = false;

    loop {
        let value = runner
            .execute(READ_OPTIONS_SCRIPT, vec![Value::String(opts.selector.clone())])
            .map_err(|e| Error::Scrape(format!("reading `{}` failed: {e}", opts.selector)))?;

        if !value.is_null() {
            control_seen = true;
            let entries: Vec<RawOption> = serde_json::from_value(value)
                .map_err(|e| Error::Scrape(format!("unexpected option data: {e}")))?;
            if entries.iter().any(|o| !o.value.trim().is_empty()) {
                return Ok(entries);
            }
        }

        if start.elapsed() >= opts.render_timeout {
            let what = if control_seen { "was never populated" } else { "was not found" };
            return Err(Error::Scrape(format!(
                "`{}` {what} within {:?}",
                opts.selector, opts.render_timeout
            )));
        }
        debug!(selector = %opts.selector, "parameter list not rendered yet");
        thread::sleep(opts.poll_interval);
    }
}

#[derive(Debug, Clone, Deserialize)]
struct RawOption {
    value: String,
    #[serde(default)]
    text: String,
    #[serde(default)]
    communities: String,
}

fn parse_options(entries: Vec<RawOption>) -> Result<ParameterCatalog> {
    let catalog: ParameterCatalog = entries.into_iter().filter_map(parse_option).collect();
    if catalog.is_empty() {
        return Err(Error::Scrape("no parameter entries found".into()));
    }
    Ok(catalog)
}

fn parse_option(raw: RawOption) -> Option<ParameterInfo> {
    let code = raw.value.trim();
    if code.is_empty() {
        return None;
    }

    let mut text = raw.text.trim();
    if let Some(rest) = text.strip_prefix(code) {
        let rest = rest.trim_start();
        if let Some(rest) = rest.strip_prefix(':').or_else(|| rest.strip_prefix('-')) {
            text = rest.trim_start();
        }
    }

    let (long_name, units) = split_units(text);
    let communities = raw
        .communities
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_ascii_uppercase())
        .collect();

    Some(ParameterInfo {
        code: code.to_string(),
        long_name: if long_name.is_empty() { code.to_string() } else { long_name.to_string() },
        units,
        communities,
    })
}

/// `"Temperature at 2 Meters (C)"` -> (`"Temperature at 2 Meters"`, `Some("C")`).
fn split_units(text: &str) -> (&str, Option<String>) {
    let Some(body) = text.strip_suffix(')') else {
        return (text, None);
    };

    // Find the "(" that matches the trailing ")".
    let mut depth = 0usize;
    for (i, c) in body.char_indices().rev() {
        match c {
            ')' => depth += 1,
            '(' if depth == 0 => {
                let units = body[i + 1..].trim();
                let name = body[..i].trim_end();
                return (name, (!units.is_empty()).then(|| units.to_string()));
            }
            '(' => depth -= 1,
            _ => {}
        }
    }
    (text, None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::VecDeque;

    /// Replays canned script results; the last one repeats.
    struct ScriptedPage {
        replies: RefCell<VecDeque<Value>>,
        calls: RefCell<usize>,
    }

    impl ScriptedPage {
        fn new(replies: Vec<Value>) -> Self {
            Self {
                replies: RefCell::new(replies.into()),
                calls: RefCell::new(0),
            }
        }
    }

    impl ScriptRunner for ScriptedPage {
        fn execute(&self, _script: &str, args: Vec<Value>) -> Result<Value> {
            assert_eq!(args, vec![json!("select#parameters")]);
            *self.calls.borrow_mut() += 1;
            let mut replies = self.replies.borrow_mut();
            if replies.len() > 1 {
                Ok(replies.pop_front().unwrap_or(Value::Null))
            } else {
                Ok(replies.front().cloned().unwrap_or(Value::Null))
            }
        }
    }

    fn quick() -> BrowserOptions {
        BrowserOptions {
            render_timeout: Duration::from_millis(20),
            poll_interval: Duration::from_millis(1),
            ..BrowserOptions::default()
        }
    }

    fn raw(value: &str, text: &str, communities: &str) -> RawOption {
        RawOption {
            value: value.into(),
            text: text.into(),
            communities: communities.into(),
        }
    }

    #[test]
    fn option_text_is_split() {
        let p = parse_option(raw("T10M_MIN", "Temperature at 10 Meters Minimum (C)", "AG,RE, SB")).unwrap();
        assert_eq!(p.code, "T10M_MIN");
        assert_eq!(p.long_name, "Temperature at 10 Meters Minimum");
        assert_eq!(p.units.as_deref(), Some("C"));
        assert_eq!(p.communities, vec!["AG", "RE", "SB"]);
    }

    #[test]
    fn code_prefix_is_dropped() {
        let p = parse_option(raw("PRECTOTCORR", "PRECTOTCORR: Precipitation Corrected (mm/day)", "")).unwrap();
        assert_eq!(p.long_name, "Precipitation Corrected");
        assert_eq!(p.units.as_deref(), Some("mm/day"));
        assert!(p.communities.is_empty());

        let p = parse_option(raw("WS2M", "WS2M - Wind Speed at 2 Meters (m/s)", "re")).unwrap();
        assert_eq!(p.long_name, "Wind Speed at 2 Meters");
        assert_eq!(p.communities, vec!["RE"]);
    }

    #[test]
    fn nested_and_missing_units() {
        assert_eq!(
            split_units("All Sky Insolation (kW-hr/m^2/day (avg))"),
            ("All Sky Insolation", Some("kW-hr/m^2/day (avg)".to_string()))
        );
        assert_eq!(split_units("Cloud Amount"), ("Cloud Amount", None));
        assert_eq!(split_units("Dimensionless ()"), ("Dimensionless", None));
    }

    #[test]
    fn placeholders_are_skipped() {
        let catalog = parse_options(vec![
            raw("", "Select a parameter", ""),
            raw("T2M", "Temperature at 2 Meters (C)", "AG RE SB"),
            raw("ALLSKY_SFC_SW_DWN", "All Sky Surface Shortwave Downward Irradiance (kW-hr/m^2/day)", "RE"),
        ])
        .unwrap();

        assert_eq!(catalog.len(), 2);
        assert!(catalog.contains("T2M"));
        assert_eq!(catalog.codes().collect::<Vec<_>>(), vec!["ALLSKY_SFC_SW_DWN", "T2M"]);
        assert_eq!(catalog.codes_for(Community::Ag), vec!["T2M"]);
        assert_eq!(catalog.codes_for(Community::Re).len(), 2);
    }

    #[test]
    fn empty_list_is_a_scrape_error() {
        let err = parse_options(vec![raw(" ", "--", "")]).unwrap_err();
        assert!(matches!(err, Error::Scrape(_)));
    }

    #[test]
    fn headless_capabilities() {
        let caps = BrowserOptions::default().capabilities();
        assert_eq!(caps["browserName"], "chrome");
        assert_eq!(caps["goog:chromeOptions"]["args"][0], "--headless=new");

        let caps = BrowserOptions {
            browser: "firefox".into(),
            ..BrowserOptions::default()
        }
        .capabilities();
        assert_eq!(caps["moz:firefoxOptions"]["args"][0], "-headless");

        let caps = BrowserOptions {
            headless: false,
            ..BrowserOptions::default()
        }
        .capabilities();
        assert!(caps.get("goog:chromeOptions").is_none());
    }

    #[test]
    fn absent_control_times_out_as_not_found() {
        let page = ScriptedPage::new(vec![Value::Null]);
        let err = wait_for_options(&page, &quick()).unwrap_err();
        assert!(matches!(err, Error::Scrape(ref m) if m.contains("was not found")));
        assert!(*page.calls.borrow() > 1);
    }

    #[test]
    fn placeholder_only_control_times_out_as_unpopulated() {
        let page = ScriptedPage::new(vec![Value::Null, json!([{ "value": "", "text": "Select" }])]);
        let err = wait_for_options(&page, &quick()).unwrap_err();
        assert!(matches!(err, Error::Scrape(ref m) if m.contains("was never populated")));
    }

    #[test]
    fn polling_stops_once_entries_appear() {
        let page = ScriptedPage::new(vec![
            Value::Null,
            json!([{ "value": "", "text": "Select" }]),
            json!([
                { "value": "", "text": "Select" },
                { "value": "T2M", "text": "Temperature at 2 Meters (C)", "communities": "AG,RE" }
            ]),
        ]);
        let opts = BrowserOptions {
            render_timeout: Duration::from_secs(5),
            ..quick()
        };

        let entries = wait_for_options(&page, &opts).unwrap();
        assert_eq!(*page.calls.borrow(), 3);
        let catalog = parse_options(entries).unwrap();
        assert_eq!(catalog.codes().collect::<Vec<_>>(), vec!["T2M"]);
    }

    #[test]
    fn malformed_script_result_is_a_scrape_error() {
        let page = ScriptedPage::new(vec![json!({ "unexpected": true })]);
        let err = wait_for_options(&page, &quick()).unwrap_err();
        assert!(matches!(err, Error::Scrape(ref m) if m.contains("unexpected option data")));
    }

    #[test]
    fn driver_timeout_saturates() {
        assert_eq!(BrowserOptions::default().driver_timeout(), Duration::from_secs(90));
        let opts = BrowserOptions {
            page_load_timeout: Duration::MAX,
            ..BrowserOptions::default()
        };
        assert_eq!(opts.driver_timeout(), Duration::MAX);
    }

    #[test]
    fn missing_driver_fails_as_driver_error() {
        let err = fetch_catalog(&BrowserOptions {
            webdriver: "http://127.0.0.1:9".into(),
            ..BrowserOptions::default()
        })
        .unwrap_err();
        assert!(matches!(err, Error::Driver(_)));
    }
}
