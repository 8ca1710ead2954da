//! RFox Snapshot
//!
//! Turns a subtree of a styled document into a self-contained SVG data URL:
//! computed style is baked into every element, generated content is
//! materialized, and images, backgrounds and web fonts are embedded as
//! base64 data so the result renders without any further network access.
//!
//! # Features
//!
//! - **Host-agnostic**: the pipeline reads the document through the [`Host`]
//!   trait; [`HtmlDocument`] is a bundled host for static HTML
//! - **Partial fidelity over failure**: a resource that cannot be fetched is
//!   reported in [`Snapshot::failures`] and left as an external reference
//! - **Swappable transport**: fetches go through [`Fetch`]; the `http` feature
//!   (default) provides a `reqwest`-backed implementation
//!
//! # Example
//!
//! ```no_run
//! use rfsnap::{HtmlDocument, SnapshotConfig, Snapshotter, Viewport};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = SnapshotConfig {
//!     background_color: Some("white".to_string()),
//!     viewport: Viewport { width: 1280, height: 720 },
//!     ..Default::default()
//! };
//!
//! let snapshotter = Snapshotter::new(config)?;
//! let url = url::Url::parse("https://example.com")?;
//! let doc = HtmlDocument::load(&url, snapshotter.fetcher(), Viewport::default()).await?;
//! let body = doc.body().ok_or("no body")?;
//! let snapshot = snapshotter.to_svg(&doc, body).await?;
//! println!("{}x{}: {}", snapshot.width, snapshot.height, snapshot.data_url);
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

pub mod error;
pub use error::{Error, Result};

pub mod cloner;
pub mod composer;
pub mod dom;
pub mod fonts;
pub mod images;
pub mod inline;
pub mod node;
pub mod pseudo;
pub mod resource;

#[cfg(test)]
pub(crate) mod testing;

pub use composer::{Snapshot, Snapshotter};
pub use dom::{ComputedStyle, Host, HtmlDocument, NodeId, SourceNode, StyleDeclaration, StyleSheet};
pub use node::{CloneElement, CloneNode};
pub use resource::Fetch;
#[cfg(feature = "http")]
pub use resource::HttpFetcher;

/// Decides whether a non-root node (and its subtree) is part of the snapshot
pub type NodeFilter = Arc<dyn Fn(&SourceNode) -> bool + Send + Sync>;

/// Configuration for producing snapshots
///
/// The defaults embed everything reachable, leave failed images pointing at
/// their original source and identify as RFOX when fetching.
///
/// # Examples
///
/// ```
/// let cfg = rfsnap::SnapshotConfig::default();
/// assert!(cfg.user_agent.contains("RFOX"));
/// assert!(cfg.background_color.is_none());
/// ```
#[derive(Clone)]
pub struct SnapshotConfig {
    /// Fill applied to the cloned root before serialization
    pub background_color: Option<String>,
    /// Width override in CSS pixels; also set on the cloned root
    pub width: Option<u32>,
    /// Height override in CSS pixels; also set on the cloned root
    pub height: Option<u32>,
    /// Extra style properties set on the cloned root
    pub style: Vec<(String, String)>,
    /// Which non-root nodes to include
    pub filter: Option<NodeFilter>,
    /// Data URL used for images whose source could not be fetched
    pub image_placeholder: Option<String>,
    /// Append a timestamp query parameter to every fetched reference
    pub cache_bust: bool,
    /// User agent string to send with requests
    pub user_agent: String,
    /// Per-request timeout in milliseconds
    pub timeout_ms: u64,
    /// Custom HTTP headers
    pub headers: HashMap<String, String>,
    /// Size assumed for nodes a host cannot measure
    pub viewport: Viewport,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            background_color: None,
            width: None,
            height: None,
            style: Vec::new(),
            filter: None,
            image_placeholder: None,
            cache_bust: false,
            user_agent: "Mozilla/5.0 (X11; Linux x86_64) Gecko/20100101 Firefox/115.0 RFOX/0.3".to_string(),
            timeout_ms: 30000,
            headers: HashMap::new(),
            viewport: Viewport::default(),
        }
    }
}

impl fmt::Debug for SnapshotConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnapshotConfig")
            .field("background_color", &self.background_color)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("style", &self.style)
            .field("filter", &self.filter.as_ref().map(|_| "<fn>"))
            .field("image_placeholder", &self.image_placeholder)
            .field("cache_bust", &self.cache_bust)
            .field("user_agent", &self.user_agent)
            .field("timeout_ms", &self.timeout_ms)
            .field("headers", &self.headers)
            .field("viewport", &self.viewport)
            .finish()
    }
}

/// Viewport dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SnapshotConfig::default();
        assert_eq!(config.viewport, Viewport { width: 1280, height: 720 });
        assert_eq!(config.timeout_ms, 30000);
        assert!(!config.cache_bust);
        assert!(config.filter.is_none());
        assert!(config.image_placeholder.is_none());
    }

    #[test]
    fn test_debug_hides_filter() {
        let config = SnapshotConfig {
            filter: Some(Arc::new(|_: &SourceNode| true)),
            ..Default::default()
        };
        let debug = format!("{:?}", config);
        assert!(debug.contains("filter: Some(\"<fn>\")"));
    }
}
