//! Lectura de partes XML dentro de paquetes ZIP y búsqueda de nodos por
//! nombre local y espacio de nombres.

use chrono::{DateTime, NaiveDateTime};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use xmltree::{Element, XMLNode};
use zip::ZipArchive;
use zip::result::ZipError;

use crate::error::{ExtractError, ExtractResult};
use crate::metadata::report::Value;

pub const DC_NS: &str = "http://purl.org/dc/elements/1.1/";
pub const CP_NS: &str = "http://schemas.openxmlformats.org/package/2006/metadata/core-properties";
pub const DCTERMS_NS: &str = "http://purl.org/dc/terms/";
pub const META_NS: &str = "urn:oasis:names:tc:opendocument:xmlns:meta:1.0";
pub const SVG_NS: &str = "http://www.w3.org/2000/svg";

const PART_LIMIT: u64 = 4 * 1024 * 1024;

pub fn open_package(path: &Path, family: &str) -> ExtractResult<ZipArchive<File>> {
    let file = File::open(path)?;
    ZipArchive::new(file).map_err(|error| match error {
        ZipError::Io(error) => ExtractError::Io(error),
        other => ExtractError::InvalidFormat(format!("not a valid {family} package: {other}")),
    })
}

/// Contenido de una parte del paquete; `None` si la parte no existe.
pub fn read_part(archive: &mut ZipArchive<File>, name: &str) -> ExtractResult<Option<String>> {
    let mut part = match archive.by_name(name) {
        Ok(part) => part,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(error) => return Err(ExtractError::adapter(format!("{name}: {error}"))),
    };
    if part.size() > PART_LIMIT {
        return Err(ExtractError::adapter(format!(
            "{name} exceeds {PART_LIMIT} bytes"
        )));
    }
    let mut buffer = Vec::with_capacity(part.size() as usize);
    part.read_to_end(&mut buffer)?;
    Ok(Some(String::from_utf8_lossy(&buffer).into_owned()))
}

pub fn parse_xml(contents: &str, part: &str) -> ExtractResult<Element> {
    Element::parse(contents.as_bytes())
        .map_err(|error| ExtractError::adapter(format!("{part} is not well-formed XML: {error}")))
}

/// Texto del primer hijo directo que coincide.
pub fn find_child_text(root: &Element, local_name: &str, namespace: Option<&str>) -> Option<String> {
    root.children.iter().find_map(|node| match node {
        XMLNode::Element(child)
            if child.name == local_name && namespace_matches(child, namespace) =>
        {
            Some(element_text_content(child))
        }
        _ => None,
    })
}

/// Primer texto no vacío entre todos los descendientes que coinciden.
pub fn first_text_value(root: &Element, local: &str, namespace: Option<&str>) -> Option<String> {
    collect_text_values(root, local, namespace).into_iter().next()
}

pub fn collect_text_values(root: &Element, local: &str, namespace: Option<&str>) -> Vec<String> {
    let mut values = Vec::new();
    walk_elements(root, &mut |element| {
        if element.name == local && namespace_matches(element, namespace) {
            let text = element_text_content(element);
            if !text.is_empty() {
                values.push(text);
            }
        }
    });
    values
}

pub fn find_element<'a>(
    element: &'a Element,
    local: &str,
    namespace: Option<&str>,
) -> Option<&'a Element> {
    if element.name == local && namespace_matches(element, namespace) {
        return Some(element);
    }
    element.children.iter().find_map(|node| match node {
        XMLNode::Element(child) => find_element(child, local, namespace),
        _ => None,
    })
}

pub fn namespace_matches(element: &Element, namespace: Option<&str>) -> bool {
    match (namespace, element.namespace.as_deref()) {
        (Some(expected), Some(actual)) => expected == actual,
        (Some(_), None) => false,
        (None, _) => true,
    }
}

pub fn element_text_content(element: &Element) -> String {
    let mut content = String::new();
    for node in &element.children {
        match node {
            XMLNode::Text(text) | XMLNode::CData(text) => content.push_str(text),
            _ => {}
        }
    }
    content.trim().to_string()
}

fn walk_elements<F: FnMut(&Element)>(element: &Element, visitor: &mut F) {
    visitor(element);
    for node in &element.children {
        if let XMLNode::Element(child) = node {
            walk_elements(child, visitor);
        }
    }
}

/// Fecha W3C/ISO-8601: con zona queda como fecha con desfase, sin zona como
/// fecha local. Un texto que no es fecha se conserva tal cual.
pub fn parse_w3c_datetime(text: &str) -> Value {
    let trimmed = text.trim();
    if let Ok(stamp) = DateTime::parse_from_rfc3339(trimmed) {
        return Value::from(stamp);
    }
    for pattern in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(stamp) = NaiveDateTime::parse_from_str(trimmed, pattern) {
            return Value::from(stamp);
        }
    }
    Value::from(trimmed.to_string())
}

/// Entero cuando el texto es numérico; texto en otro caso.
pub fn integer_or_text(text: &str) -> Value {
    match text.trim().parse::<i64>() {
        Ok(number) => Value::from(number),
        Err(_) => Value::from(text.to_string()),
    }
}
