//! Embeds web fonts referenced by `@font-face` rules.

use crate::dom::{CssRule, Host};
use crate::inline::{inline_all, should_process};
use crate::node::{CloneElement, CloneNode};
use crate::resource::Fetch;
use crate::Error;
use log::{debug, warn};

/// Rewritten `@font-face` rules of every readable sheet, newline separated.
///
/// Unreadable sheets and unfetchable sources are reported in the returned
/// failures; the rule text is kept either way.
pub async fn resolve_all(host: &dyn Host, fetcher: &dyn Fetch) -> (String, Vec<Error>) {
    let mut css = Vec::new();
    let mut failures = Vec::new();

    for sheet in host.style_sheets() {
        let rules = match sheet.css_rules() {
            Ok(rules) => rules,
            Err(e) => {
                warn!("Error while reading CSS rules: {}", e);
                failures.push(e);
                continue;
            }
        };

        let base = sheet.href().or_else(|| host.base_url());
        for rule in rules {
            let CssRule::FontFace(face) = rule else { continue };
            if !should_process(face.style.get_property_value("src")) {
                continue;
            }
            let outcome = inline_all(&rule.css_text(), base, fetcher).await;
            failures.extend(outcome.failures);
            css.push(outcome.text);
        }
    }

    debug!("Resolved {} font-face rule(s)", css.len());
    (css.join("\n"), failures)
}

/// Insert the resolved font rules as the first child of `root`.
pub async fn embed_fonts(root: &mut CloneElement, host: &dyn Host, fetcher: &dyn Fetch) -> Vec<Error> {
    let (css, failures) = resolve_all(host, fetcher).await;
    if !css.is_empty() {
        root.children
            .insert(0, CloneNode::Element(CloneElement::style_element(&css)));
    }
    failures
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{ComputedStyle, NodeId, PseudoElement, SourceNode, StyleSheet};
    use crate::testing::MemoryFetcher;
    use crate::Result;
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use url::Url;

    struct SheetsOnly {
        sheets: Vec<StyleSheet>,
        base: Url,
    }

    impl Host for SheetsOnly {
        fn computed_style(&self, _: NodeId, _: Option<PseudoElement>) -> Option<ComputedStyle> {
            None
        }
        fn style_sheets(&self) -> &[StyleSheet] {
            &self.sheets
        }
        fn base_url(&self) -> Option<&Url> {
            Some(&self.base)
        }
        fn scroll_size(&self, _: NodeId) -> (u32, u32) {
            (0, 0)
        }
        fn surface_data_url(&self, _: &SourceNode) -> Result<String> {
            Err(Error::Other("no surfaces".into()))
        }
    }

    fn host() -> SheetsOnly {
        let sheet_url = Url::parse("https://cdn.example/fonts/face.css").unwrap();
        SheetsOnly {
            sheets: vec![
                StyleSheet::opaque(Url::parse("https://other.example/x.css").unwrap()),
                StyleSheet::parse(
                    Some(sheet_url),
                    r#"@font-face { font-family: "A"; src: url(a.woff2) format("woff2"); }
                       @font-face { font-family: "Local"; src: local("Arial"); }
                       body { font-family: "A" }"#,
                ),
                StyleSheet::parse(None, "@font-face { font-family: B; src: url('/b.ttf'); }"),
            ],
            base: Url::parse("https://example.com/page.html").unwrap(),
        }
    }

    #[tokio::test]
    async fn rewrites_face_sources_relative_to_their_sheet() {
        let fetcher = MemoryFetcher::new()
            .with("https://cdn.example/fonts/a.woff2", b"WOFF")
            .with("https://example.com/b.ttf", b"TTF");
        let (css, failures) = resolve_all(&host(), &fetcher).await;

        let faces: Vec<&str> = css.lines().collect();
        assert_eq!(faces.len(), 2, "{}", css);
        assert!(faces[0].contains(&format!(
            "url(data:application/font-woff;base64,{})",
            STANDARD.encode(b"WOFF")
        )));
        assert!(faces[1].contains(&format!(
            "url(data:application/font-truetype;base64,{})",
            STANDARD.encode(b"TTF")
        )));
        assert!(!css.contains("Local"));
        assert_eq!(failures.len(), 1);
        assert!(matches!(failures[0], Error::StyleSheetError(_)));
    }

    #[tokio::test]
    async fn embeds_style_as_first_child() {
        let fetcher = MemoryFetcher::new().with("https://cdn.example/fonts/a.woff2", b"WOFF");
        let mut root = CloneElement::new("div");
        root.children.push(CloneNode::Text("body".into()));

        let failures = embed_fonts(&mut root, &host(), &fetcher).await;
        // stylesheet refusal plus the missing b.ttf
        assert_eq!(failures.len(), 2);
        let style = root.children[0].as_element().expect("style element");
        assert_eq!(style.name, "style");
        assert!(style.to_xhtml().contains("url(/b.ttf)"));
        assert_eq!(root.children.len(), 2);
    }
}
