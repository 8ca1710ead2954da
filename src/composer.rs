//! Snapshot composition: clone, embed fonts, serialize and wrap as SVG.

use crate::cloner::Cloner;
use crate::dom::{Host, SourceNode, XHTML_NAMESPACE};
use crate::fonts::embed_fonts;
use crate::node::{CloneElement, CloneNode};
use crate::resource::Fetch;
use crate::{Error, Result, SnapshotConfig};
use log::{debug, info, warn};
use std::sync::Arc;

/// A self-contained SVG rendering of one subtree.
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// `data:image/svg+xml;charset=utf-8,...`
    pub data_url: String,
    pub width: u32,
    pub height: u32,
    /// Resources that could not be embedded; the snapshot references them as they were
    pub failures: Vec<Error>,
}

/// Produces snapshots with a fixed configuration and transport.
///
/// # Examples
///
/// ```no_run
/// use rfsnap::{HtmlDocument, SnapshotConfig, Snapshotter};
///
/// # async fn run() -> rfsnap::Result<()> {
/// let doc = HtmlDocument::parse("<html><body><p>hello</p></body></html>", None);
/// let snapshotter = Snapshotter::new(SnapshotConfig::default())?;
/// let snapshot = snapshotter.to_svg(&doc, doc.body().expect("body")).await?;
/// println!("{}x{} {}", snapshot.width, snapshot.height, snapshot.data_url);
/// # Ok(())
/// # }
/// ```
pub struct Snapshotter {
    config: SnapshotConfig,
    fetcher: Arc<dyn Fetch>,
}

impl Snapshotter {
    /// Snapshotter fetching over HTTP(S) as configured.
    #[cfg(feature = "http")]
    pub fn new(config: SnapshotConfig) -> Result<Self> {
        let fetcher = crate::resource::HttpFetcher::new(&config)?;
        Ok(Self {
            config,
            fetcher: Arc::new(fetcher),
        })
    }

    /// Snapshotter using a caller-provided transport.
    pub fn with_fetcher(config: SnapshotConfig, fetcher: Arc<dyn Fetch>) -> Self {
        Self { config, fetcher }
    }

    pub fn config(&self) -> &SnapshotConfig {
        &self.config
    }

    pub fn fetcher(&self) -> &dyn Fetch {
        self.fetcher.as_ref()
    }

    /// Render `root` as an SVG data URL.
    ///
    /// Fails only when `root` is not an element. Resources that cannot be
    /// fetched are left as external references and listed in
    /// [`Snapshot::failures`].
    pub async fn to_svg(&self, host: &dyn Host, root: &SourceNode) -> Result<Snapshot> {
        if root.as_element().is_none() {
            return Err(Error::RenderError(format!("node {:?} is not an element", root.id)));
        }

        let mut cloner = Cloner::new(host, self.fetcher.as_ref(), &self.config);
        let clone = cloner.clone_node(root, true).await;
        let mut failures = cloner.into_failures();
        let mut clone = match clone {
            Some(CloneNode::Element(e)) => e,
            _ => return Err(Error::RenderError(format!("node {:?} did not clone to an element", root.id))),
        };

        failures.extend(embed_fonts(&mut clone, host, self.fetcher.as_ref()).await);
        self.apply_options(&mut clone);

        let (width, height) = match (self.config.width, self.config.height) {
            (Some(w), Some(h)) => (w, h),
            (w, h) => {
                let (sw, sh) = host.scroll_size(root.id);
                (w.unwrap_or(sw), h.unwrap_or(sh))
            }
        };

        clone.set_attr("xmlns", XHTML_NAMESPACE);
        let xhtml = escape_xhtml(&clone.to_xhtml());
        let data_url = make_svg_data_url(&xhtml, width, height);

        if failures.is_empty() {
            info!("Snapshot {}x{} ({} bytes)", width, height, data_url.len());
        } else {
            warn!(
                "Snapshot {}x{} ({} bytes) with {} unembedded resource(s)",
                width,
                height,
                data_url.len(),
                failures.len()
            );
        }

        Ok(Snapshot {
            data_url,
            width,
            height,
            failures,
        })
    }

    fn apply_options(&self, clone: &mut CloneElement) {
        if let Some(color) = &self.config.background_color {
            clone.style.set_property("background-color", color, "");
        }
        if let Some(width) = self.config.width {
            clone.style.set_property("width", &format!("{}px", width), "");
        }
        if let Some(height) = self.config.height {
            clone.style.set_property("height", &format!("{}px", height), "");
        }
        for (name, value) in &self.config.style {
            clone.style.set_property(name, value, "");
        }
        debug!("Applied {} extra style propert(ies)", self.config.style.len());
    }
}

/// Percent-escape the characters that would end or break the data URL.
pub fn escape_xhtml(xhtml: &str) -> String {
    xhtml.replace('#', "%23").replace('\n', "%0A")
}

pub fn make_svg_data_url(escaped_xhtml: &str, width: u32, height: u32) -> String {
    format!(
        "data:image/svg+xml;charset=utf-8,<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{}\" height=\"{}\">\
         <foreignObject x=\"0\" y=\"0\" width=\"100%\" height=\"100%\">{}</foreignObject></svg>",
        width, height, escaped_xhtml
    )
}
