//! Markdown partitioning into document elements.

use pulldown_cmark::{Event, Parser, Tag, TagEnd};

use crate::elements::{Element, ElementKind};

/// Split Markdown into elements: headings become titles, paragraphs become
/// narrative text, list items become list items. Text outside those blocks
/// (code blocks, table cells, inline HTML) becomes plain text.
pub fn markdown_elements(source: &str) -> Vec<Element> {
    let mut elements = Vec::new();
    let mut open: Option<(ElementKind, String)> = None;

    for event in Parser::new(source) {
        match event {
            Event::Start(Tag::Heading { .. }) => {
                flush(&mut elements, &mut open);
                open = Some((ElementKind::Title, String::new()));
            }
            Event::Start(Tag::Item) => {
                flush(&mut elements, &mut open);
                open = Some((ElementKind::ListItem, String::new()));
            }
            Event::Start(Tag::CodeBlock(_)) => {
                flush(&mut elements, &mut open);
                open = Some((ElementKind::Text, String::new()));
            }
            Event::Start(Tag::Paragraph) => match &mut open {
                // Loose list items wrap their text in paragraphs.
                Some((_, buffer)) => push_separated(buffer, ""),
                None => open = Some((ElementKind::NarrativeText, String::new())),
            },
            Event::End(TagEnd::Paragraph) => {
                if matches!(open, Some((ElementKind::NarrativeText, _))) {
                    flush(&mut elements, &mut open);
                }
            }
            Event::End(TagEnd::Heading(_) | TagEnd::Item | TagEnd::CodeBlock) => {
                flush(&mut elements, &mut open);
            }
            Event::Text(text) | Event::Code(text) | Event::Html(text) | Event::InlineHtml(text) => {
                match &mut open {
                    Some((_, buffer)) => buffer.push_str(&text),
                    None => push_element(&mut elements, ElementKind::Text, &text),
                }
            }
            Event::SoftBreak | Event::HardBreak => {
                if let Some((_, buffer)) = &mut open {
                    buffer.push(' ');
                }
            }
            _ => {}
        }
    }

    flush(&mut elements, &mut open);
    elements
}

fn flush(elements: &mut Vec<Element>, open: &mut Option<(ElementKind, String)>) {
    if let Some((kind, text)) = open.take() {
        push_element(elements, kind, &text);
    }
}

fn push_element(elements: &mut Vec<Element>, kind: ElementKind, text: &str) {
    let text = text.trim();
    if !text.is_empty() {
        elements.push(Element::new(kind, text));
    }
}

fn push_separated(buffer: &mut String, text: &str) {
    if !buffer.is_empty() && !buffer.ends_with(' ') {
        buffer.push(' ');
    }
    buffer.push_str(text);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::extract_products;

    #[test]
    fn test_headings_paragraphs_and_items() {
        let elements = markdown_elements(
            "# Menu\n\nFresh every day.\n\n- Oat milk\n- Soy milk\n",
        );

        assert_eq!(
            elements,
            vec![
                Element::title("Menu"),
                Element::narrative("Fresh every day."),
                Element::list_item("Oat milk"),
                Element::list_item("Soy milk"),
            ]
        );
    }

    #[test]
    fn test_soft_breaks_become_spaces() {
        let elements = markdown_elements("Espresso with\nsteamed milk\n");
        assert_eq!(elements, vec![Element::narrative("Espresso with steamed milk")]);
    }

    #[test]
    fn test_inline_markup_is_flattened() {
        let elements = markdown_elements("## The *Croque* `Madame`\n");
        assert_eq!(elements, vec![Element::title("The Croque Madame")]);
    }

    #[test]
    fn test_loose_list_items_keep_their_text() {
        let elements = markdown_elements("- First\n\n  more\n\n- Second\n");
        assert_eq!(
            elements,
            vec![Element::list_item("First more"), Element::list_item("Second")]
        );
    }

    #[test]
    fn test_code_block_is_plain_text() {
        let elements = markdown_elements("```\n450\n```\n");
        assert_eq!(elements, vec![Element::text("450")]);
    }

    #[test]
    fn test_menu_document_to_products() {
        let elements = markdown_elements(
            "# Latte\n\nEspresso with steamed milk.\n\n11\n\n# Scone\n\nButtery pastry.\n\n4\n",
        );
        let products = extract_products(&elements).unwrap();

        assert_eq!(products.len(), 2);
        assert_eq!(products[0].name, "Latte");
        assert_eq!(products[0].description, "Espresso with steamed milk.");
        assert_eq!(products[0].price, 11.0);
        assert_eq!(products[1].name, "Scone");
        assert_eq!(products[1].price, 4.0);
    }
}
