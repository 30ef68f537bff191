//! Atributos del elemento raíz SVG, título, descripción y bloque `<metadata>`.

use std::fs;
use std::path::Path;
use xmltree::{Element, XMLNode};

use super::xml::{SVG_NS, element_text_content, find_element, parse_xml};
use crate::error::{ExtractError, ExtractResult};
use crate::metadata::report::{Metadata, Value};

const ROOT_ATTRIBUTES: [(&str, &str); 5] = [
    ("width", "Width"),
    ("height", "Height"),
    ("viewBox", "ViewBox"),
    ("version", "Version"),
    ("baseProfile", "BaseProfile"),
];

pub fn extract(path: &Path) -> ExtractResult<Option<Metadata>> {
    let bytes = fs::read(path)?;
    let contents = String::from_utf8_lossy(&bytes);
    let root = parse_xml(&contents, "svg")?;
    if root.name != "svg" {
        return Err(ExtractError::InvalidFormat(format!(
            "root element is <{}>, expected <svg>",
            root.name
        )));
    }

    let mut metadata = Metadata::new();
    for (attribute, key) in ROOT_ATTRIBUTES {
        metadata.insert(
            key.to_string(),
            Value::from(root.attributes.get(attribute).cloned()),
        );
    }
    metadata.insert("Title".to_string(), descendant_text(&root, "title"));
    metadata.insert("Description".to_string(), descendant_text(&root, "desc"));

    if let Some(block) = find_element(&root, "metadata", Some(SVG_NS)) {
        for node in &block.children {
            if let XMLNode::Element(child) = node {
                let text = element_text_content(child);
                metadata.insert(
                    qualified_name(child),
                    if text.is_empty() {
                        Value::Null
                    } else {
                        Value::from(text)
                    },
                );
            }
        }
    }

    Ok(Some(metadata))
}

fn descendant_text(root: &Element, local: &str) -> Value {
    find_element(root, local, Some(SVG_NS))
        .map(element_text_content)
        .into()
}

/// Nombre `{espacio}local`, o solo `local` sin espacio de nombres.
fn qualified_name(element: &Element) -> String {
    match element.namespace.as_deref() {
        Some(namespace) => format!("{{{namespace}}}{}", element.name),
        None => element.name.clone(),
    }
}
