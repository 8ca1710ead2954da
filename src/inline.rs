//! Rewrites `url(...)` references inside style text into inlined data URLs.
//!
//! Each distinct reference is fetched once; every occurrence of it wrapped in
//! `url(...)` is then replaced. References that are already data URLs are
//! left alone, which makes a second pass over rewritten text a no-op.

use crate::resource::{data_url, fetch_and_encode, is_data_url, mime_type, Fetch};
use crate::{Error, Result};
use log::{debug, warn};
use regex::{Captures, Regex};
use std::sync::OnceLock;
use url::Url;

fn url_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"url\(['"]?([^'"]+?)['"]?\)"#).expect("valid regex"))
}

/// Text after a rewrite pass plus the failures it tolerated
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InlineOutcome {
    pub text: String,
    pub failures: Vec<Error>,
}

/// Whether `text` contains any `url(...)` reference at all.
pub fn should_process(text: &str) -> bool {
    url_regex().is_match(text)
}

/// Distinct non-data references in `text`, in order of first appearance.
pub fn read_urls(text: &str) -> Vec<String> {
    let mut urls: Vec<String> = Vec::new();
    for caps in url_regex().captures_iter(text) {
        let reference = &caps[1];
        if !is_data_url(reference) && !urls.iter().any(|u| u == reference) {
            urls.push(reference.to_string());
        }
    }
    urls
}

/// Resolve a possibly relative reference against `base`.
pub fn resolve_url(reference: &str, base: Option<&Url>) -> Result<Url> {
    let resolved = match base {
        Some(base) => base.join(reference)?,
        None => Url::parse(reference)?,
    };
    Ok(resolved)
}

/// Rewrite relative non-data references in `text` as absolute URLs.
///
/// Rules copied out of a linked sheet lose the sheet's location, so their
/// references are pinned to it first.
pub fn absolutize(text: &str, base: &Url) -> String {
    url_regex()
        .replace_all(text, |caps: &Captures| {
            let (Some(whole), Some(reference)) = (caps.get(0), caps.get(1)) else {
                return String::new();
            };
            if is_data_url(reference.as_str()) {
                return whole.as_str().to_string();
            }
            match base.join(reference.as_str()) {
                Ok(url) => format!(
                    "{}{}{}",
                    &text[whole.start()..reference.start()],
                    url,
                    &text[reference.end()..whole.end()]
                ),
                Err(e) => {
                    debug!("Keeping reference {} as written: {}", reference.as_str(), e);
                    whole.as_str().to_string()
                }
            }
        })
        .into_owned()
}

/// Fetch one reference and substitute it everywhere in `text`.
pub async fn inline(text: &str, reference: &str, base: Option<&Url>, fetcher: &dyn Fetch) -> Result<String> {
    let url = resolve_url(reference, base)?;
    let content = fetch_and_encode(fetcher, &url).await?;
    let data = data_url(&content, mime_type(reference));
    debug!("Inlined {} ({} bytes encoded)", url, content.len());
    substitute(text, reference, &data)
}

/// Rewrite every non-data reference in `text`.
///
/// A reference that cannot be resolved or fetched stays as written and its
/// error is returned in the outcome.
pub async fn inline_all(text: &str, base: Option<&Url>, fetcher: &dyn Fetch) -> InlineOutcome {
    let mut outcome = InlineOutcome {
        text: text.to_string(),
        failures: Vec::new(),
    };
    if !should_process(text) {
        return outcome;
    }

    for reference in read_urls(text) {
        match inline(&outcome.text, &reference, base, fetcher).await {
            Ok(rewritten) => outcome.text = rewritten,
            Err(e) => {
                warn!("Leaving {} unembedded: {}", reference, e);
                outcome.failures.push(e);
            }
        }
    }
    outcome
}

fn substitute(text: &str, reference: &str, data: &str) -> Result<String> {
    let pattern = format!(r#"(url\(['"]?)({})(['"]?\))"#, regex::escape(reference));
    let re = Regex::new(&pattern).map_err(|e| Error::Other(format!("bad reference pattern: {}", e)))?;
    Ok(re
        .replace_all(text, |caps: &Captures| format!("{}{}{}", &caps[1], data, &caps[3]))
        .into_owned())
}
