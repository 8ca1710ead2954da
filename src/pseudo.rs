//! Materializes `::before` / `::after` generated content.
//!
//! Generated content exists only in style rules, so a structural copy loses
//! it. For each pseudo-element with real content the clone gets a unique
//! marker class and a `<style>` child reproducing the pseudo-element's
//! computed style under that class.

use crate::dom::{ComputedStyle, Host, PseudoElement, SourceNode};
use crate::node::{CloneElement, CloneNode};

/// Hands out class names that are unique within one snapshot.
#[derive(Debug, Default)]
pub struct UidGenerator {
    next: usize,
}

impl UidGenerator {
    pub fn next_class(&mut self) -> String {
        let class = format!("rfsnap-{}", self.next);
        self.next += 1;
        class
    }
}

pub fn materialize(host: &dyn Host, source: &SourceNode, clone: &mut CloneElement, uids: &mut UidGenerator) {
    for pseudo in PseudoElement::ALL {
        let Some(style) = host.computed_style(source.id, Some(pseudo)) else {
            continue;
        };
        let content = style.get_property_value("content");
        if content.is_empty() || content == "none" {
            continue;
        }

        let class = uids.next_class();
        clone.add_class(&class);
        let css = format_pseudo_style(&class, pseudo, &style);
        clone.children.push(CloneNode::Element(CloneElement::style_element(&css)));
    }
}

fn format_pseudo_style(class: &str, pseudo: PseudoElement, style: &ComputedStyle) -> String {
    let selector = format!(".{}{}", class, pseudo.selector_suffix());
    let body = match style.css_text() {
        Some(text) => format!("{} content: {};", text, style.get_property_value("content")),
        None => {
            let props = style
                .declarations
                .iter()
                .map(|d| {
                    if d.important {
                        format!("{}: {} !important", d.name, d.value)
                    } else {
                        format!("{}: {}", d.name, d.value)
                    }
                })
                .collect::<Vec<_>>();
            format!("{};", props.join("; "))
        }
    };
    format!("{}{{{}}}", selector, body)
}
