//! Recursive structural cloning with style capture.
//!
//! Children are cloned one at a time, in document order, each awaited fully
//! before the next starts. Per-node fetches may suspend for any duration
//! without affecting the order of the cloned tree.

use crate::dom::{ComputedStyle, Element, ElementKind, Host, NodeData, SourceNode, StyleDeclaration, SVG_NAMESPACE};
use crate::images::ImageEmbedder;
use crate::node::{CloneElement, CloneNode};
use crate::pseudo::{self, UidGenerator};
use crate::resource::Fetch;
use crate::{Error, SnapshotConfig};
use futures::future::{BoxFuture, FutureExt};
use log::warn;

pub struct Cloner<'a> {
    host: &'a dyn Host,
    fetcher: &'a dyn Fetch,
    config: &'a SnapshotConfig,
    uids: UidGenerator,
    failures: Vec<Error>,
}

impl<'a> Cloner<'a> {
    pub fn new(host: &'a dyn Host, fetcher: &'a dyn Fetch, config: &'a SnapshotConfig) -> Self {
        Self {
            host,
            fetcher,
            config,
            uids: UidGenerator::default(),
            failures: Vec::new(),
        }
    }

    /// Non-fatal failures collected so far
    pub fn into_failures(self) -> Vec<Error> {
        self.failures
    }

    /// Clone `node` and its visited descendants.
    ///
    /// Returns `None` when the configured filter rejects a non-root node.
    pub fn clone_node<'s>(&'s mut self, node: &'s SourceNode, root: bool) -> BoxFuture<'s, Option<CloneNode>> {
        async move {
            if !root {
                if let Some(filter) = &self.config.filter {
                    if !filter(node) {
                        return None;
                    }
                }
            }

            let element = match &node.data {
                NodeData::Text(text) => return Some(CloneNode::Text(text.clone())),
                NodeData::Comment(text) => return Some(CloneNode::Comment(text.clone())),
                NodeData::Element(element) => element,
            };

            let mut clone = match element.kind {
                ElementKind::RasterSurface { .. } => self.surface_image(node, element),
                _ => {
                    let mut clone = CloneElement::shallow(element);
                    for child in &node.children {
                        if let Some(child_clone) = self.clone_node(child, false).await {
                            clone.children.push(child_clone);
                        }
                    }
                    clone
                }
            };

            self.process_clone(node, element, &mut clone).await;
            Some(CloneNode::Element(clone))
        }
        .boxed()
    }

    // Drawn pixels are not part of the structure, so a raster surface is
    // replaced by an image of its current content.
    fn surface_image(&mut self, node: &SourceNode, element: &Element) -> CloneElement {
        match self.host.surface_data_url(node) {
            Ok(data_url) => {
                let mut img = CloneElement::new("img");
                img.set_attr("src", &data_url);
                img
            }
            Err(e) => {
                warn!("Could not capture <{}> pixels: {}", element.name, e);
                self.failures.push(e);
                CloneElement::shallow(element)
            }
        }
    }

    async fn process_clone(&mut self, node: &SourceNode, element: &Element, clone: &mut CloneElement) {
        if let Some(style) = self.host.computed_style(node.id, None) {
            copy_style(&style, &mut clone.style);
        }
        pseudo::materialize(self.host, node, clone, &mut self.uids);
        copy_user_input(&element.kind, clone);
        fix_vector(&element.kind, clone);

        let embedder = ImageEmbedder {
            host: self.host,
            fetcher: self.fetcher,
            placeholder: self.config.image_placeholder.as_deref(),
        };
        let failures = embedder.inline_element(&element.kind, clone).await;
        self.failures.extend(failures);
    }
}

/// Copy computed style onto a clone, preferring the host's bulk text.
pub fn copy_style(source: &ComputedStyle, target: &mut StyleDeclaration) {
    match source.css_text() {
        Some(text) => target.set_css_text(text),
        None => {
            for d in source.declarations.iter() {
                target.set_property(&d.name, &d.value, d.priority());
            }
        }
    }
}

fn copy_user_input(kind: &ElementKind, clone: &mut CloneElement) {
    match kind {
        ElementKind::TextArea { value } => clone.set_text_content(value),
        ElementKind::Input { value } => clone.set_attr("value", value),
        _ => {}
    }
}

fn fix_vector(kind: &ElementKind, clone: &mut CloneElement) {
    if !kind.is_vector() {
        return;
    }
    clone.set_attr("xmlns", SVG_NAMESPACE);
    if *kind != ElementKind::VectorRect {
        return;
    }
    for attribute in ["width", "height"] {
        let value = clone.attr(attribute).unwrap_or_default().to_string();
        if !value.is_empty() {
            clone.style.set_property(attribute, &value, "");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{HtmlDocument, NodeId, PseudoElement, StyleSheet};
    use crate::testing::MemoryFetcher;
    use crate::Result;
    use std::sync::Arc;
    use std::time::Duration;
    use url::Url;

    async fn clone_root(doc: &HtmlDocument, fetcher: &MemoryFetcher, config: &SnapshotConfig, selector: &str) -> (CloneElement, Vec<Error>) {
        let node = doc.select(selector).unwrap().expect("node");
        let mut cloner = Cloner::new(doc, fetcher, config);
        let clone = cloner.clone_node(node, true).await.expect("root is never filtered");
        let failures = cloner.into_failures();
        match clone {
            CloneNode::Element(e) => (e, failures),
            other => panic!("expected element, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn copies_computed_style() {
        let doc = HtmlDocument::parse(
            r#"<html><head><style>.a { color: red; font-size: 12px }</style></head>
               <body><div class="a">x</div></body></html>"#,
            None,
        );
        let (div, _) = clone_root(&doc, &MemoryFetcher::new(), &SnapshotConfig::default(), ".a").await;
        assert_eq!(div.style.get_property_value("color"), "red");
        assert_eq!(div.style.get_property_value("font-size"), "12px");
        assert_eq!(div.children, vec![CloneNode::Text("x".into())]);
    }

    #[tokio::test]
    async fn preserves_child_order_regardless_of_fetch_latency() {
        let doc = HtmlDocument::parse(
            r#"<html><body><div id="root"><img id="a" src="a.png"><img id="b" src="b.png"><img id="c" src="c.png"></div></body></html>"#,
            Url::parse("https://example.com/").ok(),
        );
        let fetcher = MemoryFetcher::new()
            .with_delay("https://example.com/a.png", b"A", Duration::from_millis(30))
            .with_delay("https://example.com/b.png", b"B", Duration::from_millis(1))
            .with_delay("https://example.com/c.png", b"C", Duration::from_millis(10));
        let (root, failures) = clone_root(&doc, &fetcher, &SnapshotConfig::default(), "#root").await;

        assert!(failures.is_empty());
        let ids: Vec<_> = root.element_children().filter_map(|c| c.attr("id")).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(
            fetcher.requests(),
            vec!["https://example.com/a.png", "https://example.com/b.png", "https://example.com/c.png"]
        );
    }

    #[tokio::test]
    async fn captures_control_values() {
        let doc = HtmlDocument::parse(
            r#"<html><body><form><textarea>line one
line two</textarea><input type="text" value="typed"></form></body></html>"#,
            None,
        );
        let (form, _) = clone_root(&doc, &MemoryFetcher::new(), &SnapshotConfig::default(), "form").await;
        let controls: Vec<_> = form.element_children().collect();
        assert_eq!(controls[0].children, vec![CloneNode::Text("line one\nline two".into())]);
        assert_eq!(controls[1].attr("value"), Some("typed"));
    }

    #[tokio::test]
    async fn fixes_vector_namespace_and_rect_size() {
        let doc = HtmlDocument::parse(
            r#"<html><body><svg viewBox="0 0 10 10"><rect width="4" height="5"/><circle r="1"/></svg></body></html>"#,
            None,
        );
        let (svg, _) = clone_root(&doc, &MemoryFetcher::new(), &SnapshotConfig::default(), "svg").await;
        assert_eq!(svg.attr("xmlns"), Some(SVG_NAMESPACE));
        let shapes: Vec<_> = svg.element_children().collect();
        assert_eq!(shapes[0].style.get_property_value("width"), "4");
        assert_eq!(shapes[0].style.get_property_value("height"), "5");
        assert_eq!(shapes[1].attr("xmlns"), Some(SVG_NAMESPACE));
        assert_eq!(shapes[1].style.get_property_value("width"), "");
    }

    #[tokio::test]
    async fn replaces_raster_surfaces_with_images() {
        let doc = HtmlDocument::parse(
            r#"<html><body><div><canvas width="2" height="2">fallback</canvas></div></body></html>"#,
            None,
        );
        let (div, _) = clone_root(&doc, &MemoryFetcher::new(), &SnapshotConfig::default(), "div").await;
        let img = div.element_children().next().expect("img");
        assert_eq!(img.name, "img");
        assert!(img.attr("src").unwrap_or_default().starts_with("data:image/png;base64,"));
        assert!(img.children.is_empty());
    }

    #[tokio::test]
    async fn filter_skips_rejected_subtrees_but_never_the_root() {
        let doc = HtmlDocument::parse(
            r#"<html><body><div class="skip"><p>gone</p></div><p class="skip">kept root</p><span>kept</span></body></html>"#,
            None,
        );
        let config = SnapshotConfig {
            filter: Some(Arc::new(|node: &SourceNode| {
                node.as_element()
                    .and_then(|e| e.attr("class"))
                    .map(|c| c != "skip")
                    .unwrap_or(true)
            })),
            ..Default::default()
        };
        let (body, _) = clone_root(&doc, &MemoryFetcher::new(), &config, "body").await;
        let names: Vec<_> = body.element_children().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["span"]);

        let (p, _) = clone_root(&doc, &MemoryFetcher::new(), &config, "p.skip").await;
        assert_eq!(p.children, vec![CloneNode::Text("kept root".into())]);
    }

    struct BulkHost {
        root: SourceNode,
    }

    impl Host for BulkHost {
        fn computed_style(&self, node: NodeId, pseudo: Option<PseudoElement>) -> Option<ComputedStyle> {
            if node != self.root.id || pseudo.is_some() {
                return None;
            }
            Some(ComputedStyle::with_css_text(StyleDeclaration::parse("color: red; margin: 0 !important")))
        }
        fn style_sheets(&self) -> &[StyleSheet] {
            &[]
        }
        fn base_url(&self) -> Option<&Url> {
            None
        }
        fn scroll_size(&self, _: NodeId) -> (u32, u32) {
            (10, 10)
        }
        fn surface_data_url(&self, _: &SourceNode) -> Result<String> {
            Err(Error::Other("no surfaces".into()))
        }
    }

    #[tokio::test]
    async fn bulk_style_text_replaces_inline_style() {
        let host = BulkHost {
            root: SourceNode::element(
                NodeId(0),
                Element::new("div", ElementKind::Generic).with_attr("style", "padding: 3px"),
                vec![],
            ),
        };
        let fetcher = MemoryFetcher::new();
        let config = SnapshotConfig::default();
        let mut cloner = Cloner::new(&host, &fetcher, &config);
        let clone = cloner.clone_node(&host.root, true).await;
        let div = clone.as_ref().and_then(CloneNode::as_element).expect("div");
        assert_eq!(div.style.css_text(), "color: red; margin: 0 !important;");
    }
}
