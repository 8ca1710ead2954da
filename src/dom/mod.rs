//! Source document model and the host capability the pipeline reads from.
//!
//! The snapshot pipeline never talks to a live document directly. Instead a
//! [`Host`] hands out computed style, style sheets and measurements for the
//! nodes of a [`SourceNode`] tree, which keeps the pipeline testable against
//! synthetic documents. [`HtmlDocument`] is the bundled host for static HTML.

pub mod html;
pub mod style;
pub mod stylesheet;

pub use html::HtmlDocument;
pub use style::{ComputedStyle, Declaration, StyleDeclaration};
pub use stylesheet::{CssRule, FontFaceRule, StyleRule, StyleSheet};

use crate::Result;
use futures::future::{self, BoxFuture, FutureExt};
use url::Url;

pub const XHTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";
pub const SVG_NAMESPACE: &str = "http://www.w3.org/2000/svg";

/// Identity of a node within its host document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

/// Generated-content positions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PseudoElement {
    Before,
    After,
}

impl PseudoElement {
    pub const ALL: [PseudoElement; 2] = [PseudoElement::Before, PseudoElement::After];

    /// Selector suffix used for materialized rules
    pub fn selector_suffix(self) -> &'static str {
        match self {
            PseudoElement::Before => ":before",
            PseudoElement::After => ":after",
        }
    }
}

/// What kind of element a node is, decided once when the tree is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementKind {
    Generic,
    /// Multi-line text control with its current value
    TextArea { value: String },
    /// Single-line control with its current value
    Input { value: String },
    /// Raster image; its reference lives in the `src` attribute
    Image,
    /// Any element in the vector-graphic namespace
    Vector,
    /// Rectangle primitive in the vector-graphic namespace
    VectorRect,
    /// Element holding drawn pixel content
    RasterSurface { width: u32, height: u32 },
}

impl ElementKind {
    pub fn is_vector(&self) -> bool {
        matches!(self, ElementKind::Vector | ElementKind::VectorRect)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub kind: ElementKind,
}

impl Element {
    pub fn new(name: &str, kind: ElementKind) -> Self {
        Self {
            name: name.to_string(),
            attrs: Vec::new(),
            kind,
        }
    }

    pub fn with_attr(mut self, name: &str, value: &str) -> Self {
        self.attrs.push((name.to_string(), value.to_string()));
        self
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeData {
    Element(Element),
    Text(String),
    Comment(String),
}

/// A read-only node of the document being snapshotted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceNode {
    pub id: NodeId,
    pub data: NodeData,
    pub children: Vec<SourceNode>,
}

impl SourceNode {
    pub fn element(id: NodeId, element: Element, children: Vec<SourceNode>) -> Self {
        Self {
            id,
            data: NodeData::Element(element),
            children,
        }
    }

    pub fn text(id: NodeId, text: &str) -> Self {
        Self {
            id,
            data: NodeData::Text(text.to_string()),
            children: Vec::new(),
        }
    }

    pub fn as_element(&self) -> Option<&Element> {
        match &self.data {
            NodeData::Element(e) => Some(e),
            _ => None,
        }
    }

    /// Depth-first search for a node by id.
    pub fn find(&self, id: NodeId) -> Option<&SourceNode> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(id))
    }

    /// Concatenated text of all descendant text nodes
    pub fn text_content(&self) -> String {
        match &self.data {
            NodeData::Text(t) => t.clone(),
            NodeData::Comment(_) => String::new(),
            NodeData::Element(_) => self.children.iter().map(|c| c.text_content()).collect(),
        }
    }
}

/// Read-only access to the live document state the snapshot reproduces.
pub trait Host: Send + Sync {
    /// Computed style of a node, or of one of its generated-content pseudo-elements.
    ///
    /// `None` means the host has no style for that node (text nodes, or a
    /// pseudo-element nothing generates).
    fn computed_style(&self, node: NodeId, pseudo: Option<PseudoElement>) -> Option<ComputedStyle>;

    /// Every style sheet reachable from the document, in document order
    fn style_sheets(&self) -> &[StyleSheet];

    /// Location relative references are resolved against
    fn base_url(&self) -> Option<&Url>;

    /// Full scrollable extent of a node in CSS pixels
    fn scroll_size(&self, node: NodeId) -> (u32, u32);

    /// Current pixel content of a raster surface as a data URL
    fn surface_data_url(&self, node: &SourceNode) -> Result<String>;

    /// Resolves once an image given `data_url` has loaded, or with `ImageLoadError`.
    fn acknowledge_image<'a>(&'a self, _data_url: &'a str) -> BoxFuture<'a, Result<()>> {
        future::ready(Ok(())).boxed()
    }
}
