//! The cloned tree a snapshot is built from, and its XHTML serializer.

use crate::dom::{Element, StyleDeclaration};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloneNode {
    Element(CloneElement),
    Text(String),
    Comment(String),
}

impl CloneNode {
    pub fn as_element(&self) -> Option<&CloneElement> {
        match self {
            CloneNode::Element(e) => Some(e),
            _ => None,
        }
    }

    pub fn to_xhtml(&self) -> String {
        let mut out = String::new();
        self.write_xhtml(&mut out);
        out
    }

    fn write_xhtml(&self, out: &mut String) {
        match self {
            CloneNode::Element(e) => e.write_xhtml(out),
            CloneNode::Text(t) => escape_into(out, t, false),
            CloneNode::Comment(c) => {
                out.push_str("<!--");
                out.push_str(&c.replace("--", "- -"));
                out.push_str("-->");
            }
        }
    }
}

/// An owned element of the cloned tree.
///
/// The `style` attribute is kept as a parsed declaration block rather than as
/// text so properties can be set individually while the tree is built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CloneElement {
    pub name: String,
    attrs: Vec<(String, String)>,
    pub style: StyleDeclaration,
    pub children: Vec<CloneNode>,
}

impl CloneElement {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// Attributes of `source`, no children.
    pub fn shallow(source: &Element) -> Self {
        let mut clone = Self::new(&source.name);
        for (name, value) in &source.attrs {
            if name.eq_ignore_ascii_case("style") {
                clone.style = StyleDeclaration::parse(value);
            } else {
                clone.attrs.push((name.clone(), value.clone()));
            }
        }
        clone
    }

    /// `<style>` element holding `css`
    pub fn style_element(css: &str) -> Self {
        let mut el = Self::new("style");
        el.children.push(CloneNode::Text(css.to_string()));
        el
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn attrs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attrs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn set_attr(&mut self, name: &str, value: &str) {
        match self.attrs.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(name)) {
            Some(existing) => existing.1 = value.to_string(),
            None => self.attrs.push((name.to_string(), value.to_string())),
        }
    }

    pub fn remove_attr(&mut self, name: &str) -> Option<String> {
        let idx = self.attrs.iter().position(|(k, _)| k.eq_ignore_ascii_case(name))?;
        Some(self.attrs.remove(idx).1)
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .map(|c| c.split_whitespace().any(|x| x == class))
            .unwrap_or(false)
    }

    pub fn add_class(&mut self, class: &str) {
        if self.has_class(class) {
            return;
        }
        let classes = match self.attr("class").map(str::trim) {
            Some(existing) if !existing.is_empty() => format!("{} {}", existing, class),
            _ => class.to_string(),
        };
        self.set_attr("class", &classes);
    }

    /// Replace all children with a single text node.
    pub fn set_text_content(&mut self, text: &str) {
        self.children.clear();
        if !text.is_empty() {
            self.children.push(CloneNode::Text(text.to_string()));
        }
    }

    pub fn element_children(&self) -> impl Iterator<Item = &CloneElement> {
        self.children.iter().filter_map(CloneNode::as_element)
    }

    pub fn to_xhtml(&self) -> String {
        let mut out = String::new();
        self.write_xhtml(&mut out);
        out
    }

    fn write_xhtml(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.name);
        // Namespace declarations first, as XML serializers emit them
        let (ns, rest): (Vec<_>, Vec<_>) = self.attrs.iter().partition(|(k, _)| k == "xmlns");
        for (name, value) in ns.into_iter().chain(rest) {
            write_attr(out, name, value);
        }
        if !self.style.is_empty() {
            write_attr(out, "style", &self.style.css_text());
        }

        if self.children.is_empty() {
            out.push_str("/>");
            return;
        }
        out.push('>');
        for child in &self.children {
            child.write_xhtml(out);
        }
        out.push_str("</");
        out.push_str(&self.name);
        out.push('>');
    }
}

fn write_attr(out: &mut String, name: &str, value: &str) {
    out.push(' ');
    out.push_str(name);
    out.push_str("=\"");
    escape_into(out, value, true);
    out.push('"');
}

fn escape_into(out: &mut String, text: &str, attribute: bool) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            '\u{a0}' => out.push_str("&#160;"),
            _ => out.push(c),
        }
    }
}
