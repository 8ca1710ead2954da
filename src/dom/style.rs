//! Property/value/priority mappings for inline and computed style.

use lightningcss::declaration::DeclarationBlock;
use lightningcss::stylesheet::{ParserOptions, PrinterOptions, StyleAttribute};
use log::debug;

/// A single `name: value [!important]` entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub name: String,
    pub value: String,
    pub important: bool,
}

impl Declaration {
    pub fn new(name: &str, value: &str, important: bool) -> Self {
        Self {
            name: normalize_name(name),
            value: value.trim().to_string(),
            important,
        }
    }

    /// `"important"` or the empty string, as CSSOM reports priorities
    pub fn priority(&self) -> &'static str {
        if self.important {
            "important"
        } else {
            ""
        }
    }
}

/// An ordered declaration block.
///
/// Mirrors the subset of `CSSStyleDeclaration` the pipeline needs: lookups
/// return the empty string for absent properties, `set_property` replaces an
/// existing entry in place so property order stays stable, and `css_text`
/// round-trips through `parse`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StyleDeclaration {
    entries: Vec<Declaration>,
}

impl StyleDeclaration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a declaration list such as the body of a rule or a `style` attribute.
    pub fn parse(text: &str) -> Self {
        let mut decl = Self::new();
        decl.set_css_text(text);
        decl
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Declaration> {
        self.entries.iter()
    }

    pub fn get(&self, name: &str) -> Option<&Declaration> {
        let name = normalize_name(name);
        self.entries.iter().find(|d| d.name == name)
    }

    pub fn get_property_value(&self, name: &str) -> &str {
        self.get(name).map(|d| d.value.as_str()).unwrap_or("")
    }

    pub fn get_property_priority(&self, name: &str) -> &str {
        self.get(name).map(|d| d.priority()).unwrap_or("")
    }

    /// Set a property. An empty value removes it; `priority` is `"important"` or empty.
    pub fn set_property(&mut self, name: &str, value: &str, priority: &str) {
        let value = value.trim();
        if value.is_empty() {
            self.remove_property(name);
            return;
        }
        let important = priority.eq_ignore_ascii_case("important");
        let name = normalize_name(name);
        match self.entries.iter_mut().find(|d| d.name == name) {
            Some(existing) => {
                existing.value = value.to_string();
                existing.important = important;
            }
            None => self.entries.push(Declaration {
                name,
                value: value.to_string(),
                important,
            }),
        }
    }

    pub fn remove_property(&mut self, name: &str) -> Option<Declaration> {
        let name = normalize_name(name);
        let idx = self.entries.iter().position(|d| d.name == name)?;
        Some(self.entries.remove(idx))
    }

    /// Merge another block on top of this one, entry by entry.
    pub fn extend_from(&mut self, other: &StyleDeclaration) {
        for d in other.iter() {
            self.set_property(&d.name, &d.value, d.priority());
        }
    }

    pub fn css_text(&self) -> String {
        self.entries
            .iter()
            .map(|d| {
                if d.important {
                    format!("{}: {} !important;", d.name, d.value)
                } else {
                    format!("{}: {};", d.name, d.value)
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Replace every entry with the declarations in `text`.
    ///
    /// Declarations lightningcss cannot make sense of are dropped, the way a
    /// browser drops them from `style`.
    pub fn set_css_text(&mut self, text: &str) {
        self.entries.clear();
        match StyleAttribute::parse(text, parser_options()) {
            Ok(attr) => self.push_block(&attr.declarations),
            Err(e) => debug!("Ignoring unparsable declarations {:?}: {}", text, e),
        }
    }

    /// Build a block from parsed declarations, normal ones first.
    pub(crate) fn from_block(block: &DeclarationBlock) -> Self {
        let mut decl = Self::new();
        decl.push_block(block);
        decl
    }

    fn push_block(&mut self, block: &DeclarationBlock) {
        let normal = block.declarations.iter().map(|p| (p, ""));
        let important = block.important_declarations.iter().map(|p| (p, "important"));
        for (property, priority) in normal.chain(important) {
            let Ok(text) = property.to_css_string(false, PrinterOptions::default()) else {
                continue;
            };
            if let Some((name, value)) = text.split_once(':') {
                self.set_property(name, value, priority);
            }
        }
    }
}

/// Lenient options: a bad declaration or rule is skipped, not fatal.
pub(crate) fn parser_options<'o, 'i>() -> ParserOptions<'o, 'i> {
    ParserOptions {
        error_recovery: true,
        ..ParserOptions::default()
    }
}

// Custom properties are case-sensitive, everything else is not.
fn normalize_name(name: &str) -> String {
    let name = name.trim();
    if name.starts_with("--") {
        name.to_string()
    } else {
        name.to_ascii_lowercase()
    }
}

/// Computed style for an element or one of its pseudo-elements, as reported by a host.
///
/// Some hosts expose the whole block as one text (`cssText`), others only
/// per-property; `css_text` returns `None` in the latter case so callers fall
/// back to iterating `declarations`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComputedStyle {
    pub declarations: StyleDeclaration,
    full_text: Option<String>,
}

impl ComputedStyle {
    pub fn new(declarations: StyleDeclaration) -> Self {
        Self {
            declarations,
            full_text: None,
        }
    }

    /// Computed style whose host also provides a bulk text form.
    pub fn with_css_text(declarations: StyleDeclaration) -> Self {
        let full_text = Some(declarations.css_text());
        Self {
            declarations,
            full_text,
        }
    }

    pub fn css_text(&self) -> Option<&str> {
        self.full_text.as_deref().filter(|t| !t.trim().is_empty())
    }

    pub fn get_property_value(&self, name: &str) -> &str {
        self.declarations.get_property_value(name)
    }

    pub fn get_property_priority(&self, name: &str) -> &str {
        self.declarations.get_property_priority(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_priorities_and_order() {
        let decl = StyleDeclaration::parse("Color: red; font-size: 12px ! important;;");
        assert_eq!(decl.len(), 2);
        assert_eq!(decl.get_property_value("color"), "red");
        assert_eq!(decl.get_property_priority("font-size"), "important");
        assert_eq!(decl.css_text(), "color: red; font-size: 12px !important;");
    }

    #[test]
    fn keeps_data_urls_intact() {
        let decl = StyleDeclaration::parse(
            "background-image: url(data:image/png;base64,AAAA); content: \"a;b\"",
        );
        assert_eq!(decl.get_property_value("background-image"), "url(data:image/png;base64,AAAA)");
        assert_eq!(decl.get_property_value("content"), "\"a;b\"");
    }

    #[test]
    fn drops_declarations_it_cannot_parse() {
        let decl = StyleDeclaration::parse("color: red; width: ; height: 4px");
        assert_eq!(decl.len(), 2);
        assert_eq!(decl.get_property_value("width"), "");
        assert_eq!(decl.get_property_value("height"), "4px");
    }

    #[test]
    fn set_property_replaces_in_place_and_empty_removes() {
        let mut decl = StyleDeclaration::parse("a: 1; b: 2");
        decl.set_property("a", "3", "");
        assert_eq!(decl.css_text(), "a: 3; b: 2;");
        decl.set_property("a", "", "");
        assert_eq!(decl.css_text(), "b: 2;");
        assert_eq!(decl.get_property_value("missing"), "");
    }

    #[test]
    fn computed_style_hides_empty_full_text() {
        let style = ComputedStyle::with_css_text(StyleDeclaration::new());
        assert!(style.css_text().is_none());
        let style = ComputedStyle::with_css_text(StyleDeclaration::parse("color: red"));
        assert_eq!(style.css_text(), Some("color: red;"));
    }
}
