//! Inlines the image references of a single cloned element.

use crate::dom::{ElementKind, Host};
use crate::inline::{inline_all, resolve_url};
use crate::node::CloneElement;
use crate::resource::{data_url, fetch_and_encode, is_data_url, mime_type, Fetch};
use crate::{Error, Result};
use log::{debug, warn};

/// Style properties whose `url(...)` references are inlined per element
const BACKGROUND_PROPERTIES: &[&str] = &["background", "background-image"];

pub struct ImageEmbedder<'a> {
    pub host: &'a dyn Host,
    pub fetcher: &'a dyn Fetch,
    pub placeholder: Option<&'a str>,
}

impl<'a> ImageEmbedder<'a> {
    /// Inline background references and, for raster images, the `src`.
    ///
    /// Failures are returned rather than raised; the offending reference is
    /// left as it was (or replaced by the placeholder, for images).
    pub async fn inline_element(&self, kind: &ElementKind, clone: &mut CloneElement) -> Vec<Error> {
        let mut failures = Vec::new();

        for property in BACKGROUND_PROPERTIES {
            let value = clone.style.get_property_value(property).to_string();
            if value.is_empty() {
                continue;
            }
            let outcome = inline_all(&value, self.host.base_url(), self.fetcher).await;
            failures.extend(outcome.failures);
            if outcome.text != value {
                let priority = clone.style.get_property_priority(property).to_string();
                clone.style.set_property(property, &outcome.text, &priority);
            }
        }

        if *kind == ElementKind::Image {
            if let Err(e) = self.inline_source(clone).await {
                failures.push(e);
            }
        }
        failures
    }

    async fn inline_source(&self, clone: &mut CloneElement) -> Result<()> {
        let original = match clone.attr("src") {
            Some(src) if !src.trim().is_empty() && !is_data_url(src) => src.to_string(),
            _ => return Ok(()),
        };

        let encoded = match self.fetch_source(&original).await {
            Ok(encoded) => encoded,
            Err(e) => {
                warn!("Image {} not embedded: {}", original, e);
                if let Some(placeholder) = self.placeholder {
                    clone.set_attr("src", placeholder);
                }
                return Err(e);
            }
        };

        let inlined = data_url(&encoded, mime_type(&original));
        clone.set_attr("src", &inlined);
        if let Err(e) = self.host.acknowledge_image(&inlined).await {
            warn!("Inlined image {} failed to load: {}", original, e);
            clone.set_attr("src", &original);
            return Err(match e {
                Error::ImageLoadError(_) => e,
                other => Error::ImageLoadError(format!("{}: {}", original, other)),
            });
        }
        debug!("Embedded image {}", original);
        Ok(())
    }

    async fn fetch_source(&self, src: &str) -> Result<String> {
        let url = resolve_url(src, self.host.base_url())?;
        fetch_and_encode(self.fetcher, &url).await
    }
}
