//! `HtmlDocument`: a [`Host`] backed by static HTML.
//!
//! There is no layout engine behind this host. Computed style comes from a
//! simple cascade (inheritance, matching rules by specificity then sheet
//! order, inline `style`, `!important` last) and sizes come from explicit overrides, the
//! computed `width`/`height`, or the viewport.

use super::style::{ComputedStyle, StyleDeclaration};
use super::stylesheet::{CssRule, StyleSheet};
use super::{Element, ElementKind, Host, NodeData, NodeId, PseudoElement, SourceNode};
use crate::inline::{absolutize, should_process};
use crate::resource::{data_url, Fetch};
use crate::{Error, Result, Viewport};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, RgbaImage};
use log::{debug, warn};
use scraper::{ElementRef, Html, Node, Selector};
use std::collections::HashMap;
use std::sync::Mutex;
use url::Url;

/// Properties a child takes from its parent when no rule sets them
const INHERITED_PROPERTIES: &[&str] = &[
    "color",
    "cursor",
    "direction",
    "font",
    "font-family",
    "font-size",
    "font-style",
    "font-variant",
    "font-weight",
    "letter-spacing",
    "line-height",
    "list-style",
    "list-style-type",
    "quotes",
    "text-align",
    "text-indent",
    "text-transform",
    "visibility",
    "white-space",
    "word-spacing",
];

const DEFAULT_CANVAS_WIDTH: u32 = 300;
const DEFAULT_CANVAS_HEIGHT: u32 = 150;

struct CompiledRule {
    selector: Selector,
    pseudo: Option<PseudoElement>,
    specificity: u32,
    style: StyleDeclaration,
}

pub struct HtmlDocument {
    source: String,
    root: SourceNode,
    base_url: Option<Url>,
    sheets: Vec<StyleSheet>,
    styles: HashMap<NodeId, ComputedStyle>,
    pseudo_styles: HashMap<(NodeId, PseudoElement), ComputedStyle>,
    element_order: Vec<NodeId>,
    /// First match per selector text, filled by `select`
    selections: Mutex<HashMap<String, Option<NodeId>>>,
    sizes: HashMap<NodeId, (u32, u32)>,
    surfaces: HashMap<NodeId, RgbaImage>,
    viewport: Viewport,
}

impl HtmlDocument {
    /// Parse a document. Only inline `<style>` sheets are available; use
    /// [`HtmlDocument::load`] to also pull linked sheets.
    pub fn parse(html: &str, base_url: Option<Url>) -> Self {
        Self::build(html, base_url, HashMap::new())
    }

    /// Fetch a page and its linked style sheets.
    ///
    /// Sheets from another origin are registered as unreadable, like a
    /// browser refusing `cssRules` access. A sheet that fails to download is
    /// skipped.
    pub async fn load(url: &Url, fetcher: &dyn Fetch, viewport: Viewport) -> Result<Self> {
        let bytes = fetcher
            .fetch(url)
            .await
            .map_err(|e| Error::LoadError(format!("{}: {}", url, e)))?;
        let text = String::from_utf8_lossy(&bytes).into_owned();

        let (base, hrefs) = linked_sheet_hrefs(&text, url);
        let mut linked = HashMap::new();
        for href in hrefs {
            let resolved = match base.join(&href) {
                Ok(u) => u,
                Err(e) => {
                    warn!("Skipping style sheet {}: {}", href, e);
                    continue;
                }
            };
            if resolved.origin() != url.origin() {
                debug!("Style sheet {} is cross-origin; rules will be unreadable", resolved);
                linked.insert(href, StyleSheet::opaque(resolved));
                continue;
            }
            match fetcher.fetch(&resolved).await {
                Ok(css) => {
                    let css = String::from_utf8_lossy(&css);
                    linked.insert(href, StyleSheet::parse(Some(resolved), &css));
                }
                Err(e) => warn!("Failed to load style sheet {}: {}", resolved, e),
            }
        }

        let mut doc = Self::build(&text, Some(url.clone()), linked);
        doc.viewport = viewport;
        Ok(doc)
    }

    pub fn with_viewport(mut self, viewport: Viewport) -> Self {
        self.viewport = viewport;
        self
    }

    /// The `<html>` element
    pub fn root(&self) -> &SourceNode {
        &self.root
    }

    pub fn body(&self) -> Option<&SourceNode> {
        self.select("body").ok().flatten()
    }

    /// First element matching a CSS selector.
    ///
    /// The parsed tree cannot be kept (it is not `Send`), so a selector is
    /// matched against a fresh parse once and the answer is remembered.
    pub fn select(&self, selector: &str) -> Result<Option<&SourceNode>> {
        let mut selections = self
            .selections
            .lock()
            .map_err(|_| Error::Other("selection index poisoned".into()))?;
        let id = match selections.get(selector) {
            Some(id) => *id,
            None => {
                let sel = Selector::parse(selector)
                    .map_err(|_| Error::ConfigError(format!("invalid selector: {}", selector)))?;
                let html = Html::parse_document(&self.source);
                let id = html
                    .root_element()
                    .descendants()
                    .filter_map(ElementRef::wrap)
                    .position(|e| sel.matches(&e))
                    .and_then(|idx| self.element_order.get(idx).copied());
                selections.insert(selector.to_string(), id);
                id
            }
        };
        Ok(id.and_then(|id| self.root.find(id)))
    }

    /// Override the measured size of a node.
    pub fn set_scroll_size(&mut self, node: NodeId, width: u32, height: u32) {
        self.sizes.insert(node, (width, height));
    }

    /// Register the drawn pixels of a raster surface.
    pub fn set_surface_pixels(&mut self, node: NodeId, pixels: RgbaImage) {
        self.surfaces.insert(node, pixels);
    }

    fn build(source: &str, base_url: Option<Url>, mut linked: HashMap<String, StyleSheet>) -> Self {
        let html = Html::parse_document(source);
        let base_url = document_base(&html, base_url);

        let mut sheets = Vec::new();
        for el in html.root_element().descendants().filter_map(ElementRef::wrap) {
            match el.value().name().to_ascii_lowercase().as_str() {
                "style" => {
                    let css = el.text().collect::<String>();
                    if !css.trim().is_empty() {
                        sheets.push(StyleSheet::parse(None, &css));
                    }
                }
                "link" if is_stylesheet_link(&el) => {
                    if let Some(sheet) = el.value().attr("href").and_then(|h| linked.remove(h)) {
                        sheets.push(sheet);
                    }
                }
                _ => {}
            }
        }
        let rules = compile_rules(&sheets);

        let mut doc = Self {
            source: source.to_string(),
            root: SourceNode::text(NodeId(0), ""),
            base_url,
            sheets,
            styles: HashMap::new(),
            pseudo_styles: HashMap::new(),
            element_order: Vec::new(),
            selections: Mutex::new(HashMap::new()),
            sizes: HashMap::new(),
            surfaces: HashMap::new(),
            viewport: Viewport::default(),
        };
        let mut counter = 0;
        doc.root = doc.build_element(html.root_element(), None, false, &rules, &mut counter);
        doc
    }

    fn build_element(
        &mut self,
        el: ElementRef,
        parent_style: Option<&StyleDeclaration>,
        in_svg: bool,
        rules: &[CompiledRule],
        counter: &mut usize,
    ) -> SourceNode {
        let id = next_id(counter);
        self.element_order.push(id);

        let name = el.value().name().to_string();
        let lname = name.to_ascii_lowercase();
        let attrs: Vec<(String, String)> = el
            .value()
            .attrs()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        let vector = in_svg || lname == "svg";
        let kind = if vector {
            if lname == "rect" {
                ElementKind::VectorRect
            } else {
                ElementKind::Vector
            }
        } else {
            match lname.as_str() {
                "textarea" => ElementKind::TextArea {
                    value: el.text().collect(),
                },
                "input" => ElementKind::Input {
                    value: el.value().attr("value").unwrap_or_default().to_string(),
                },
                "img" => ElementKind::Image,
                "canvas" => ElementKind::RasterSurface {
                    width: parse_px(el.value().attr("width").unwrap_or_default())
                        .unwrap_or(DEFAULT_CANVAS_WIDTH),
                    height: parse_px(el.value().attr("height").unwrap_or_default())
                        .unwrap_or(DEFAULT_CANVAS_HEIGHT),
                },
                _ => ElementKind::Generic,
            }
        };

        let style = cascade(&el, parent_style, None, rules);
        for pseudo in PseudoElement::ALL {
            if rules.iter().any(|r| r.pseudo == Some(pseudo) && r.selector.matches(&el)) {
                let pseudo_style = cascade(&el, Some(&style), Some(pseudo), rules);
                self.pseudo_styles
                    .insert((id, pseudo), ComputedStyle::new(pseudo_style));
            }
        }

        // Content of <foreignObject> is back in the HTML namespace
        let children_in_svg = vector && lname != "foreignobject";
        let mut children = Vec::new();
        for child in el.children() {
            match child.value() {
                Node::Text(text) => children.push(SourceNode::text(next_id(counter), &**text)),
                Node::Comment(comment) => children.push(SourceNode {
                    id: next_id(counter),
                    data: NodeData::Comment((**comment).to_string()),
                    children: Vec::new(),
                }),
                Node::Element(_) => {
                    if let Some(child_el) = ElementRef::wrap(child) {
                        children.push(self.build_element(
                            child_el,
                            Some(&style),
                            children_in_svg,
                            rules,
                            counter,
                        ));
                    }
                }
                _ => {}
            }
        }

        self.styles.insert(id, ComputedStyle::new(style));
        SourceNode::element(id, Element { name, attrs, kind }, children)
    }
}

impl Host for HtmlDocument {
    fn computed_style(&self, node: NodeId, pseudo: Option<PseudoElement>) -> Option<ComputedStyle> {
        match pseudo {
            None => self.styles.get(&node).cloned(),
            Some(p) => self.pseudo_styles.get(&(node, p)).cloned(),
        }
    }

    fn style_sheets(&self) -> &[StyleSheet] {
        &self.sheets
    }

    fn base_url(&self) -> Option<&Url> {
        self.base_url.as_ref()
    }

    fn scroll_size(&self, node: NodeId) -> (u32, u32) {
        if let Some(size) = self.sizes.get(&node) {
            return *size;
        }
        let style = self.styles.get(&node);
        let dimension = |name: &str| style.and_then(|s| parse_px(s.get_property_value(name)));
        (
            dimension("width").unwrap_or(self.viewport.width),
            dimension("height").unwrap_or(self.viewport.height),
        )
    }

    fn surface_data_url(&self, node: &SourceNode) -> Result<String> {
        let (width, height) = match node.as_element().map(|e| &e.kind) {
            Some(ElementKind::RasterSurface { width, height }) => (*width, *height),
            _ => return Err(Error::RenderError(format!("node {:?} is not a raster surface", node.id))),
        };
        let blank;
        let pixels = match self.surfaces.get(&node.id) {
            Some(p) => p,
            None => {
                blank = RgbaImage::new(width.max(1), height.max(1));
                &blank
            }
        };

        let mut png = Vec::new();
        PngEncoder::new(&mut png)
            .write_image(pixels.as_raw(), pixels.width(), pixels.height(), ExtendedColorType::Rgba8)
            .map_err(|e| Error::RenderError(format!("failed to encode surface: {}", e)))?;
        Ok(data_url(&STANDARD.encode(png), "image/png"))
    }
}

fn next_id(counter: &mut usize) -> NodeId {
    let id = NodeId(*counter);
    *counter += 1;
    id
}

fn is_stylesheet_link(el: &ElementRef) -> bool {
    el.value()
        .attr("rel")
        .map(|rel| rel.split_whitespace().any(|r| r.eq_ignore_ascii_case("stylesheet")))
        .unwrap_or(false)
}

// Honor <base href>, resolved against the document URL when there is one.
fn document_base(html: &Html, base_url: Option<Url>) -> Option<Url> {
    let href = html
        .root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .find(|e| e.value().name().eq_ignore_ascii_case("base"))
        .and_then(|e| e.value().attr("href").map(|h| h.to_string()));
    match href {
        Some(href) => match &base_url {
            Some(base) => base.join(&href).ok().or(base_url),
            None => Url::parse(&href).ok(),
        },
        None => base_url,
    }
}

// Kept synchronous so the parsed tree never lives across an await.
fn linked_sheet_hrefs(source: &str, url: &Url) -> (Url, Vec<String>) {
    let html = Html::parse_document(source);
    let base = document_base(&html, Some(url.clone())).unwrap_or_else(|| url.clone());
    let hrefs = html
        .root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(|e| e.value().name().eq_ignore_ascii_case("link") && is_stylesheet_link(e))
        .filter_map(|e| e.value().attr("href").map(|h| h.to_string()))
        .collect();
    (base, hrefs)
}

// Rules in source order. References in linked sheets are made absolute
// against the sheet, since the copied values no longer carry it.
fn compile_rules(sheets: &[StyleSheet]) -> Vec<CompiledRule> {
    let mut compiled = Vec::new();
    for sheet in sheets {
        let Ok(rules) = sheet.css_rules() else { continue };
        for rule in rules {
            let CssRule::Style(rule) = rule else { continue };
            let style = match sheet.href() {
                Some(href) => pin_references(&rule.style, href),
                None => rule.style.clone(),
            };
            for part in &rule.selectors {
                let (base, pseudo) = split_pseudo(part.trim());
                let base = if base.is_empty() { "*" } else { base };
                match Selector::parse(base) {
                    Ok(selector) => {
                        let specificity =
                            selector.selectors.iter().map(|s| s.specificity()).max().unwrap_or(0);
                        compiled.push(CompiledRule {
                            selector,
                            pseudo,
                            specificity,
                            style: style.clone(),
                        })
                    }
                    Err(_) => debug!("Ignoring unsupported selector {:?}", part),
                }
            }
        }
    }
    compiled
}

fn pin_references(style: &StyleDeclaration, href: &Url) -> StyleDeclaration {
    let mut pinned = style.clone();
    for d in style.iter().filter(|d| should_process(&d.value)) {
        pinned.set_property(&d.name, &absolutize(&d.value, href), d.priority());
    }
    pinned
}

fn split_pseudo(selector: &str) -> (&str, Option<PseudoElement>) {
    let lower = selector.to_ascii_lowercase();
    for (suffix, pseudo) in [
        ("::before", PseudoElement::Before),
        (":before", PseudoElement::Before),
        ("::after", PseudoElement::After),
        (":after", PseudoElement::After),
    ] {
        if lower.ends_with(suffix) {
            return (selector[..selector.len() - suffix.len()].trim_end(), Some(pseudo));
        }
    }
    (selector, None)
}

fn cascade(
    el: &ElementRef,
    parent: Option<&StyleDeclaration>,
    pseudo: Option<PseudoElement>,
    rules: &[CompiledRule],
) -> StyleDeclaration {
    let mut style = StyleDeclaration::new();
    if let Some(parent) = parent {
        for name in INHERITED_PROPERTIES {
            let value = parent.get_property_value(name);
            if !value.is_empty() {
                style.set_property(name, value, "");
            }
        }
    }

    let mut important = StyleDeclaration::new();
    let mut apply = |block: &StyleDeclaration| {
        for d in block.iter() {
            if d.important {
                important.set_property(&d.name, &d.value, "important");
            } else {
                style.set_property(&d.name, &d.value, "");
            }
        }
    };

    // Stable sort: equal specificity keeps source order
    let mut matched: Vec<&CompiledRule> = rules
        .iter()
        .filter(|r| r.pseudo == pseudo && r.selector.matches(el))
        .collect();
    matched.sort_by_key(|r| r.specificity);
    for rule in matched {
        apply(&rule.style);
    }
    if pseudo.is_none() {
        if let Some(inline) = el.value().attr("style") {
            apply(&StyleDeclaration::parse(inline));
        }
    }

    style.extend_from(&important);
    style
}

fn parse_px(value: &str) -> Option<u32> {
    let value = value.trim();
    let number = value.strip_suffix("px").unwrap_or(value).trim();
    number
        .parse::<f32>()
        .ok()
        .filter(|n| n.is_finite() && *n >= 0.0)
        .map(|n| n.round() as u32)
}
