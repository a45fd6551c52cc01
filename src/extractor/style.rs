//! Inline `style` attribute editing, the subset of `element.style` the
//! pipeline needs.

use kuchiki::NodeRef;

use crate::extractor::document::{get_attr, remove_attr, set_attr};

/// Split a declaration block into `(property, value)` pairs. Semicolons
/// inside parentheses or quotes (data URLs, font names) do not split.
pub fn parse_declarations(css: &str) -> Vec<(String, String)> {
    let mut declarations = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;

    for (index, ch) in css.char_indices() {
        match (quote, ch) {
            (Some(open), c) if c == open => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(ch),
            (None, '(') => depth += 1,
            (None, ')') => depth = depth.saturating_sub(1),
            (None, ';') if depth == 0 => {
                push_declaration(&css[start..index], &mut declarations);
                start = index + 1;
            }
            _ => {}
        }
    }
    push_declaration(&css[start..], &mut declarations);
    declarations
}

fn push_declaration(raw: &str, declarations: &mut Vec<(String, String)>) {
    let Some((property, value)) = raw.split_once(':') else {
        return;
    };
    let property = property.trim().to_ascii_lowercase();
    let value = value.trim();
    if property.is_empty() || value.is_empty() {
        return;
    }
    declarations.retain(|(existing, _)| existing != &property);
    declarations.push((property, value.to_string()));
}

pub fn serialize_declarations(declarations: &[(String, String)]) -> String {
    declarations
        .iter()
        .map(|(property, value)| format!("{}: {};", property, value))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Overwrite the whole inline style, like assigning `style.cssText`.
pub fn replace_style(node: &NodeRef, css: &str) {
    let declarations = parse_declarations(css);
    if declarations.is_empty() {
        remove_attr(node, "style");
    } else {
        set_attr(node, "style", serialize_declarations(&declarations));
    }
}

/// Set one property, keeping the rest of the inline style.
pub fn set_property(node: &NodeRef, property: &str, value: &str) {
    let mut declarations = get_attr(node, "style")
        .map(|css| parse_declarations(&css))
        .unwrap_or_default();
    let property = property.to_ascii_lowercase();

    match declarations.iter_mut().find(|(existing, _)| *existing == property) {
        Some((_, existing_value)) => *existing_value = value.to_string(),
        None => declarations.push((property, value.to_string())),
    }
    set_attr(node, "style", serialize_declarations(&declarations));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::document::PageDocument;

    #[test]
    fn test_parse_declarations() {
        let parsed = parse_declarations(
            "Color: red;  background: url(\"data:image/png;base64,AA==\"); ; margin:0",
        );
        assert_eq!(
            parsed,
            vec![
                ("color".to_string(), "red".to_string()),
                (
                    "background".to_string(),
                    "url(\"data:image/png;base64,AA==\")".to_string()
                ),
                ("margin".to_string(), "0".to_string()),
            ]
        );
    }

    #[test]
    fn test_later_declaration_wins() {
        let parsed = parse_declarations("color: red; color: blue");
        assert_eq!(parsed, vec![("color".to_string(), "blue".to_string())]);
    }

    #[test]
    fn test_set_property_merges() {
        let doc = PageDocument::parse(r#"<p style="color: red; cursor: wait">x</p>"#);
        let p = doc.elements_by_tag("p").remove(0);

        set_property(&p, "cursor", "pointer");
        set_property(&p, "pointer-events", "auto");

        assert_eq!(
            get_attr(&p, "style").as_deref(),
            Some("color: red; cursor: pointer; pointer-events: auto;")
        );
    }

    #[test]
    fn test_replace_style() {
        let doc = PageDocument::parse(r#"<p style="color: red">x</p>"#);
        let p = doc.elements_by_tag("p").remove(0);

        replace_style(&p, "\n  position: static !important;\n  overflow: visible !important;\n");
        assert_eq!(
            get_attr(&p, "style").as_deref(),
            Some("position: static !important; overflow: visible !important;")
        );

        replace_style(&p, "   ");
        assert_eq!(get_attr(&p, "style"), None);
    }
}
