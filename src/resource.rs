//! Resource fetching and data-URL helpers.
//!
//! This is the only place the pipeline performs byte I/O. There is no retry or
//! backoff: a failed fetch is returned to the caller, which reports it and
//! moves on.

use crate::Result;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use futures::future::BoxFuture;
use url::Url;

#[cfg(feature = "http")]
use crate::{Error, SnapshotConfig};
#[cfg(feature = "http")]
use futures::future::FutureExt;
#[cfg(feature = "http")]
use std::time::{Duration, SystemTime, UNIX_EPOCH};

const WOFF: &str = "application/font-woff";
const JPEG: &str = "image/jpeg";

/// Byte transport for absolute references.
pub trait Fetch: Send + Sync {
    fn fetch<'a>(&'a self, url: &'a Url) -> BoxFuture<'a, Result<Vec<u8>>>;
}

/// Fetch a resource and return its base64 encoding.
pub async fn fetch_and_encode(fetcher: &dyn Fetch, url: &Url) -> Result<String> {
    let bytes = fetcher.fetch(url).await?;
    Ok(STANDARD.encode(bytes))
}

/// `data:<mime>;base64,<content>`
pub fn data_url(content: &str, mime: &str) -> String {
    format!("data:{};base64,{}", mime, content)
}

pub fn is_data_url(reference: &str) -> bool {
    reference.trim_start().starts_with("data:")
}

/// Content type of a reference, judged by its trailing file extension.
///
/// Unknown extensions classify as the empty string.
pub fn mime_type(reference: &str) -> &'static str {
    match extension(reference).to_ascii_lowercase().as_str() {
        "woff" | "woff2" => WOFF,
        "ttf" => "application/font-truetype",
        "eot" => "application/vnd.ms-fontobject",
        "png" => "image/png",
        "jpg" | "jpeg" => JPEG,
        "gif" => "image/gif",
        "tiff" => "image/tiff",
        "svg" => "image/svg+xml",
        _ => "",
    }
}

fn extension(reference: &str) -> &str {
    let path = reference
        .split(|c| c == '?' || c == '#')
        .next()
        .unwrap_or(reference);
    match path.rfind('.') {
        Some(dot) if !path[dot + 1..].contains('/') => &path[dot + 1..],
        _ => "",
    }
}

/// Fetches over HTTP(S) with a shared `reqwest` client.
#[cfg(feature = "http")]
pub struct HttpFetcher {
    client: reqwest::Client,
    cache_bust: bool,
}

#[cfg(feature = "http")]
impl HttpFetcher {
    pub fn new(config: &SnapshotConfig) -> Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        for (name, value) in &config.headers {
            let name = reqwest::header::HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| Error::ConfigError(format!("invalid header name {}: {}", name, e)))?;
            let value = reqwest::header::HeaderValue::from_str(value)
                .map_err(|e| Error::ConfigError(format!("invalid header value for {}: {}", name, e)))?;
            headers.insert(name, value);
        }

        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| Error::ConfigError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            cache_bust: config.cache_bust,
        })
    }

    fn request_url(&self, url: &Url) -> Url {
        let mut target = url.clone();
        if self.cache_bust {
            let stamp = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis())
                .unwrap_or_default();
            target.query_pairs_mut().append_pair("_", &stamp.to_string());
        }
        target
    }
}

#[cfg(feature = "http")]
impl Fetch for HttpFetcher {
    fn fetch<'a>(&'a self, url: &'a Url) -> BoxFuture<'a, Result<Vec<u8>>> {
        async move {
            let target = self.request_url(url);
            log::debug!("GET {}", target);
            let resp = self
                .client
                .get(target)
                .send()
                .await
                .map_err(|e| Error::NetworkError(format!("GET {} failed: {}", url, e)))?;

            let status = resp.status();
            if !status.is_success() {
                return Err(Error::FetchError(format!("{} returned status {}", url, status)));
            }

            let body = resp
                .bytes()
                .await
                .map_err(|e| Error::DecodeError(format!("Failed to read body of {}: {}", url, e)))?;
            Ok(body.to_vec())
        }
        .boxed()
    }
}
