//! Configuration document fetching.
//!
//! A document location is either a filesystem path or a URL. Absolute paths
//! and anything that does not parse as an absolute URL are opened locally;
//! everything else is fetched with an HTTP GET through an injectable
//! [`HttpGetter`], so tests can substitute a fake remote.

use std::io::{Cursor, Read};
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use compositor_shared::{AppConfig, CompositeError, Result};
use reqwest::Client;
use tracing::{debug, instrument, warn};
use url::Url;

/// Default timeout in seconds for fetching a remote document.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Maximum number of redirects to follow by default.
const DEFAULT_MAX_REDIRECTS: usize = 5;

/// User-Agent string for fetch requests.
const USER_AGENT: &str = concat!("Compositor/", env!("CARGO_PKG_VERSION"));

/// A readable configuration document.
pub type ConfigReader = Box<dyn Read + Send>;

// ---------------------------------------------------------------------------
// HttpGetter
// ---------------------------------------------------------------------------

/// A completed HTTP GET.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Raw response body.
    pub body: Vec<u8>,
}

/// Minimal GET capability used to retrieve remote documents.
#[async_trait]
pub trait HttpGetter: Send + Sync {
    /// Issue a GET for `url`. Transport failures are errors; HTTP status is not.
    async fn get(&self, url: &Url) -> Result<HttpResponse>;
}

/// Settings for the default HTTP getter.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Timeout for HTTP requests in seconds.
    pub timeout_secs: u64,
    /// Redirect limit.
    pub max_redirects: usize,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_redirects: DEFAULT_MAX_REDIRECTS,
        }
    }
}

impl From<&AppConfig> for FetchOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            timeout_secs: config.fetch.timeout_secs,
            max_redirects: config.fetch.max_redirects,
        }
    }
}

/// [`HttpGetter`] backed by a `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestGetter {
    client: Client,
}

impl ReqwestGetter {
    /// Build a getter with the given options.
    pub fn new(opts: &FetchOptions) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(opts.max_redirects))
            .timeout(Duration::from_secs(opts.timeout_secs))
            .build()
            .map_err(|e| CompositeError::Fetch {
                url: String::new(),
                message: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpGetter for ReqwestGetter {
    async fn get(&self, url: &Url) -> Result<HttpResponse> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| CompositeError::Fetch {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(|e| CompositeError::Fetch {
            url: url.to_string(),
            message: format!("failed to read body: {e}"),
        })?;

        Ok(HttpResponse {
            status,
            body: body.to_vec(),
        })
    }
}

// ---------------------------------------------------------------------------
// Fetching
// ---------------------------------------------------------------------------

/// Where a document location points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    Local(String),
    Remote(Url),
}

impl Location {
    /// Classify a path string. Relative paths fail URL parsing and stay local.
    pub fn classify(path: &str) -> Self {
        match Url::parse(path) {
            Ok(url) if !Path::new(path).is_absolute() => Self::Remote(url),
            _ => Self::Local(path.to_string()),
        }
    }
}

/// Open the configuration document at `path`, a local file or a URL.
///
/// The body of a remote response is returned whatever its HTTP status; a
/// non-success status is only logged.
#[instrument(skip(getter))]
pub async fn fetch_config(path: &str, getter: &dyn HttpGetter) -> Result<ConfigReader> {
    match Location::classify(path) {
        Location::Local(path) => {
            debug!(%path, "opening local config file");
            let file = std::fs::File::open(&path).map_err(|e| CompositeError::io(&path, e))?;
            Ok(Box::new(file))
        }
        Location::Remote(url) => {
            debug!(%url, "fetching remote config file");
            let response = getter.get(&url).await?;
            if !(200..300).contains(&response.status) {
                warn!(%url, status = response.status, "remote config returned non-success status");
            }
            Ok(Box::new(Cursor::new(response.body)))
        }
    }
}
