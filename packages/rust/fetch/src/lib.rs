//! HTTP transport for the listing page and CSV payloads.
//!
//! The pipeline only sees the [`Fetcher`] trait, so tests and alternate
//! transports can stand in for [`HttpFetcher`].

use std::future::Future;
use std::time::Duration;

use reqwest::Client;
use reqwest::header::{REFERER, USER_AGENT};
use tracing::{debug, instrument};

use twcal_shared::{CalendarError, CatalogConfig, Result};

/// Maximum number of redirects to follow.
const MAX_REDIRECTS: usize = 5;

/// Maximum response size we accept (20 MB), declared or streamed.
const MAX_RESPONSE_SIZE: u64 = 20 * 1024 * 1024;

/// The listing page rejects obvious bots, so it is requested with a browser UA.
const LISTING_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Source of raw documents for the pipeline.
pub trait Fetcher {
    /// Fetch the dataset listing page as text.
    fn fetch_text(&self, url: &str) -> impl Future<Output = Result<String>> + Send;

    /// Fetch a CSV payload as raw bytes; `referer` is sent along with it.
    fn fetch_bytes(
        &self,
        url: &str,
        referer: &str,
    ) -> impl Future<Output = Result<Vec<u8>>> + Send;
}

// ---------------------------------------------------------------------------
// HttpFetcher
// ---------------------------------------------------------------------------

/// Options for [`HttpFetcher`].
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// User-Agent for CSV downloads.
    pub user_agent: String,
    /// Timeout for each request in seconds.
    pub timeout_secs: u64,
}

impl From<&CatalogConfig> for FetchOptions {
    fn from(config: &CatalogConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            timeout_secs: config.timeout_secs,
        }
    }
}

/// [`Fetcher`] backed by a shared reqwest client.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    user_agent: String,
    max_response_size: u64,
}

impl HttpFetcher {
    /// Build a fetcher with the given options.
    pub fn new(opts: &FetchOptions) -> Result<Self> {
        let client = Client::builder()
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .timeout(Duration::from_secs(opts.timeout_secs))
            .build()
            .map_err(|e| CalendarError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            user_agent: opts.user_agent.clone(),
            max_response_size: MAX_RESPONSE_SIZE,
        })
    }

    async fn get(&self, request: reqwest::RequestBuilder, url: &str) -> Result<reqwest::Response> {
        let response = request
            .send()
            .await
            .map_err(|e| CalendarError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CalendarError::Network(format!("{url}: HTTP {status}")));
        }

        let max = self.max_response_size;
        if let Some(len) = response.content_length() {
            if len > max {
                return Err(too_large(url, len, max));
            }
        }

        Ok(response)
    }

    /// Read the body chunk by chunk, aborting once it exceeds the cap.
    ///
    /// `Content-Length` is absent on chunked responses, so the declared size
    /// check in [`Self::get`] is not enough on its own.
    async fn read_body(&self, mut response: reqwest::Response, url: &str) -> Result<Vec<u8>> {
        let mut body = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| CalendarError::Network(format!("{url}: failed to read body: {e}")))?
        {
            append_capped(&mut body, &chunk, self.max_response_size, url)?;
        }
        Ok(body)
    }
}

fn append_capped(body: &mut Vec<u8>, chunk: &[u8], max: u64, url: &str) -> Result<()> {
    let len = (body.len() + chunk.len()) as u64;
    if len > max {
        return Err(too_large(url, len, max));
    }
    body.extend_from_slice(chunk);
    Ok(())
}

fn too_large(url: &str, len: u64, max: u64) -> CalendarError {
    CalendarError::Network(format!("{url}: response too large ({len} bytes, max {max})"))
}

impl Fetcher for HttpFetcher {
    #[instrument(skip(self))]
    async fn fetch_text(&self, url: &str) -> Result<String> {
        let request = self.client.get(url).header(USER_AGENT, LISTING_USER_AGENT);
        let response = self.get(request, url).await?;
        let bytes = self.read_body(response, url).await?;
        let body = String::from_utf8_lossy(&bytes).into_owned();

        debug!(len = body.len(), "fetched listing page");
        Ok(body)
    }

    #[instrument(skip(self))]
    async fn fetch_bytes(&self, url: &str, referer: &str) -> Result<Vec<u8>> {
        let request = self
            .client
            .get(url)
            .header(USER_AGENT, self.user_agent.as_str())
            .header(REFERER, referer);
        let response = self.get(request, url).await?;
        let body = self.read_body(response, url).await?;

        debug!(len = body.len(), "fetched source payload");
        Ok(body)
    }
}
