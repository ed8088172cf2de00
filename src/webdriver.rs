//! Just enough of the W3C WebDriver protocol to load a page and run a script.
//!
//! A [`Session`] owns one remote browser session and deletes it when dropped,
//! so the browser is released on every exit path.

use std::time::Duration;

use reqwest::Method;
use reqwest::blocking::Client as HttpClient;
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::error::{Error, Result};

#[derive(Debug)]
pub struct Session {
    http: HttpClient,
    base_url: String,
    id: String,
}

impl Session {
    /// Opens a new session against a running driver (chromedriver, geckodriver, ...).
    pub fn start(base_url: &str, capabilities: Value, http_timeout: Duration) -> Result<Self> {
        let http = HttpClient::builder()
            .timeout(http_timeout)
            .build()
            .map_err(|e| Error::Driver(format!("cannot build driver client: {e}")))?;
        let base_url = base_url.trim_end_matches('/').to_string();

        let body = json!({ "capabilities": { "alwaysMatch": capabilities } });
        let value = send(&http, Method::POST, &format!("{base_url}/session"), Some(&body))?;
        let id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::Driver("driver response has no sessionId".into()))?
            .to_string();
        debug!(session = %id, "webdriver session started");

        Ok(Self { http, base_url, id })
    }

    pub fn set_page_load_timeout(&self, timeout: Duration) -> Result<()> {
        let body = json!({ "pageLoad": timeout_millis(timeout) });
        self.command(Method::POST, "timeouts", Some(&body)).map(drop)
    }

    pub fn navigate(&self, url: &str) -> Result<()> {
        self.command(Method::POST, "url", Some(&json!({ "url": url })))
            .map(drop)
    }

    fn command(&self, method: Method, path: &str, body: Option<&Value>) -> Result<Value> {
        let url = format!("{}/session/{}/{path}", self.base_url, self.id);
        send(&self.http, method, &url, body)
    }
}

/// Something that can run a script in a loaded page.
pub trait ScriptRunner {
    /// Runs `script` synchronously and returns its result.
    fn execute(&self, script: &str, args: Vec<Value>) -> Result<Value>;
}

impl ScriptRunner for Session {
    fn execute(&self, script: &str, args: Vec<Value>) -> Result<Value> {
        let body = json!({ "script": script, "args": args });
        self.command(Method::POST, "execute/sync", Some(&body))
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        let url = format!("{}/session/{}", self.base_url, self.id);
        match send(&self.http, Method::DELETE, &url, None) {
            Ok(_) => debug!(session = %self.id, "webdriver session closed"),
            Err(e) => warn!(session = %self.id, error = %e, "failed to close webdriver session"),
        }
    }
}

fn timeout_millis(timeout: Duration) -> u64 {
    u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX)
}

fn send(http: &HttpClient, method: Method, url: &str, body: Option<&Value>) -> Result<Value> {
    let mut req = http.request(method, url);
    if let Some(body) = body {
        req = req.json(body);
    }
    let resp = req
        .send()
        .map_err(|e| Error::Driver(format!("driver unreachable at {url}: {e}")))?;
    let status = resp.status();
    let text = resp
        .text()
        .map_err(|e| Error::Driver(format!("cannot read driver response: {e}")))?;

    unwrap_value(status.is_success(), &text).map_err(Error::Driver)
}

/// Every WebDriver reply wraps its payload (or its error) in `{"value": ...}`.
fn unwrap_value(success: bool, body: &str) -> std::result::Result<Value, String> {
    let mut parsed: Value =
        serde_json::from_str(body).map_err(|e| format!("malformed driver reply ({e}): {body}"))?;
    let value = parsed.get_mut("value").map(Value::take).unwrap_or(Value::Null);

    if success {
        return Ok(value);
    }

    let error = value.get("error").and_then(Value::as_str).unwrap_or("unknown error");
    let message = value.get("message").and_then(Value::as_str).unwrap_or("");
    Err(format!("{error}: {message}"))
}
