//! Product extraction from partitioned document elements.
//!
//! Documents such as menus and brochures are first split into typed
//! elements (titles, paragraphs, list items). A title names a product, the
//! text after it describes the product, and bare integers are prices that
//! are handed out to products in order.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use catalog_core::{Product, Result};

/// Kind of a document element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ElementKind {
    Title,
    Text,
    ListItem,
    NarrativeText,
    /// Anything else the partitioner produced, by name.
    Other(String),
}

impl ElementKind {
    fn is_text_like(&self) -> bool {
        matches!(
            self,
            ElementKind::Text | ElementKind::ListItem | ElementKind::NarrativeText
        )
    }
}

/// A typed block of document text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Element {
    pub kind: ElementKind,
    pub text: String,
}

impl Element {
    pub fn new(kind: ElementKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }

    pub fn title(text: impl Into<String>) -> Self {
        Self::new(ElementKind::Title, text)
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::new(ElementKind::Text, text)
    }

    pub fn narrative(text: impl Into<String>) -> Self {
        Self::new(ElementKind::NarrativeText, text)
    }

    pub fn list_item(text: impl Into<String>) -> Self {
        Self::new(ElementKind::ListItem, text)
    }
}

/// A product being assembled.
#[derive(Debug, Default)]
struct PendingPart {
    name: Option<String>,
    description: Option<String>,
}

impl PendingPart {
    fn append_description(&mut self, text: &str) {
        match &mut self.description {
            Some(description) => {
                description.push(' ');
                description.push_str(text);
            }
            None => self.description = Some(text.to_string()),
        }
    }

    fn take_complete(&mut self) -> Option<(String, String)> {
        if self.name.is_some() && self.description.is_some() {
            let part = std::mem::take(self);
            return part.name.zip(part.description);
        }
        None
    }
}

/// Turn a sequence of elements into products.
///
/// Text before the first title is ignored, as is a `Text` element that
/// repeats the title right before it. Products get prices in the order the
/// prices appear; any product left over is priced at 0. Skus are left empty,
/// see [`assign_skus`].
pub fn extract_products(elements: &[Element]) -> Result<Vec<Product>> {
    let mut prices: Vec<f64> = Vec::new();
    let mut parts: Vec<(String, String)> = Vec::new();
    let mut part = PendingPart::default();
    let mut last: Option<&Element> = None;
    let mut title_seen = false;

    for element in elements {
        let repeats_title = matches!(
            last,
            Some(prev) if prev.kind == ElementKind::Title && prev.text == element.text
        );
        if element.kind == ElementKind::Text && repeats_title {
            continue;
        }

        match &element.kind {
            ElementKind::Title => {
                part.name = Some(element.text.clone());
                title_seen = true;
            }
            kind if kind.is_text_like() => {
                if !title_seen {
                    continue;
                }
                match element.text.trim().parse::<i64>() {
                    Ok(price) => prices.push(price as f64),
                    Err(_) => part.append_description(&element.text),
                }
            }
            ElementKind::Other(name) => {
                warn!("Unknown element type: {}, containing {:?}", name, element.text);
            }
            _ => {}
        }

        last = Some(element);
        if let Some(complete) = part.take_complete() {
            parts.push(complete);
        }
    }

    debug!(
        "Extracted {} products and {} prices from {} elements",
        parts.len(),
        prices.len(),
        elements.len()
    );

    let products = parts
        .into_iter()
        .enumerate()
        .map(|(i, (name, description))| {
            let price = prices.get(i).copied().unwrap_or(0.0);
            let product = Product::new(name, description, "", price, &[]);
            product.validate().map(|_| product)
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(products)
}

/// Give every product without a sku one derived from `prefix` and its
/// position, so extracted products can be stored under distinct ids.
pub fn assign_skus(products: &mut [Product], prefix: &str) {
    for (i, product) in products.iter_mut().enumerate() {
        if product.sku.is_empty() {
            product.sku = format!("{}-{:04}", prefix, i + 1);
        }
    }
}
