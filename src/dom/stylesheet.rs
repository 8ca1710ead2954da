//! Style-rule sources, parsed with lightningcss.
//!
//! Only style rules and `@font-face` are kept structured. Every other
//! at-rule survives as its serialized text.

use super::style::{parser_options, StyleDeclaration};
use crate::{Error, Result};
use lightningcss::rules::CssRule as ParsedRule;
use lightningcss::stylesheet::{PrinterOptions, StyleSheet as ParsedSheet};
use lightningcss::traits::ToCss;
use log::warn;
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleRule {
    /// One entry per comma-separated selector
    pub selectors: Vec<String>,
    pub style: StyleDeclaration,
}

/// A face-defining rule (`@font-face`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontFaceRule {
    pub style: StyleDeclaration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CssRule {
    Style(StyleRule),
    FontFace(FontFaceRule),
    /// Any other at-rule, as lightningcss prints it
    Other(String),
}

impl CssRule {
    pub fn css_text(&self) -> String {
        match self {
            CssRule::Style(rule) => format!("{} {{ {} }}", rule.selectors.join(", "), rule.style.css_text()),
            CssRule::FontFace(rule) => format!("@font-face {{ {} }}", rule.style.css_text()),
            CssRule::Other(text) => text.clone(),
        }
    }
}

/// A style sheet reachable from a document.
///
/// Sheets served from another origin are `opaque`: they still exist (and still
/// apply in a real browser), but their rules cannot be read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleSheet {
    href: Option<Url>,
    rules: Option<Vec<CssRule>>,
}

impl StyleSheet {
    pub fn parse(href: Option<Url>, css: &str) -> Self {
        Self {
            href,
            rules: Some(parse_rules(css)),
        }
    }

    pub fn opaque(href: Url) -> Self {
        Self { href: Some(href), rules: None }
    }

    pub fn href(&self) -> Option<&Url> {
        self.href.as_ref()
    }

    pub fn css_rules(&self) -> Result<&[CssRule]> {
        match &self.rules {
            Some(rules) => Ok(rules),
            None => Err(Error::StyleSheetError(
                self.href
                    .as_ref()
                    .map(|u| u.to_string())
                    .unwrap_or_else(|| "<inline>".to_string()),
            )),
        }
    }
}

/// Split a style sheet into rules.
pub fn parse_rules(css: &str) -> Vec<CssRule> {
    let sheet = match ParsedSheet::parse(css, parser_options()) {
        Ok(sheet) => sheet,
        Err(e) => {
            warn!("Unparsable style sheet: {}", e);
            return Vec::new();
        }
    };

    let mut rules = Vec::new();
    for rule in &sheet.rules.0 {
        match rule {
            ParsedRule::Style(style) => {
                let selectors = style
                    .selectors
                    .to_css_string(PrinterOptions::default())
                    .unwrap_or_default();
                rules.push(CssRule::Style(StyleRule {
                    selectors: selectors
                        .split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect(),
                    style: StyleDeclaration::from_block(&style.declarations),
                }));
            }
            ParsedRule::FontFace(face) => {
                let mut style = StyleDeclaration::new();
                for property in &face.properties {
                    let Ok(text) = property.to_css_string(PrinterOptions::default()) else {
                        continue;
                    };
                    if let Some((name, value)) = text.split_once(':') {
                        style.set_property(name, value, "");
                    }
                }
                rules.push(CssRule::FontFace(FontFaceRule { style }));
            }
            other => match other.to_css_string(PrinterOptions::default()) {
                Ok(text) if !text.trim().is_empty() => rules.push(CssRule::Other(text)),
                _ => {}
            },
        }
    }
    rules
}
