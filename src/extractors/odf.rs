//! Propiedades de documentos OpenDocument (ODT/ODS/ODP) leídas de `meta.xml`.

use std::path::Path;
use tracing::debug;

use super::office::empty_document_metadata;
use super::xml::{
    DC_NS, META_NS, collect_text_values, first_text_value, integer_or_text, open_package,
    parse_w3c_datetime, parse_xml, read_part,
};
use crate::error::{ExtractError, ExtractResult};
use crate::metadata::report::{Metadata, Value};

const META_PART: &str = "meta.xml";
const MIMETYPE_PART: &str = "mimetype";
const ODF_MIME_PREFIX: &str = "application/vnd.oasis.opendocument.";

pub fn extract(path: &Path) -> ExtractResult<Option<Metadata>> {
    let mut archive = open_package(path, "OpenDocument")?;

    if let Some(mimetype) = read_part(&mut archive, MIMETYPE_PART)? {
        let mimetype = mimetype.trim();
        if !mimetype.starts_with(ODF_MIME_PREFIX) {
            return Err(ExtractError::InvalidFormat(format!(
                "unexpected OpenDocument mimetype `{mimetype}`"
            )));
        }
    }

    let mut metadata = empty_document_metadata();
    let Some(contents) = read_part(&mut archive, META_PART)? else {
        debug!(path = %path.display(), "documento ODF sin meta.xml");
        return Ok(Some(metadata));
    };
    let root = parse_xml(&contents, META_PART)?;

    let text_fields = [
        ("Title", "title", DC_NS),
        ("Author", "initial-creator", META_NS),
        ("Subject", "subject", DC_NS),
        ("Comments", "description", DC_NS),
        ("Last Modified By", "creator", DC_NS),
    ];
    for (key, local, namespace) in text_fields {
        if let Some(value) = first_text_value(&root, local, Some(namespace)) {
            metadata.insert(key.to_string(), Value::from(value));
        }
    }

    let keywords = collect_text_values(&root, "keyword", Some(META_NS));
    if !keywords.is_empty() {
        metadata.insert("Keywords".to_string(), Value::from(keywords.join(", ")));
    }
    if let Some(cycles) = first_text_value(&root, "editing-cycles", Some(META_NS)) {
        metadata.insert("Revision".to_string(), integer_or_text(&cycles));
    }
    if let Some(created) = first_text_value(&root, "creation-date", Some(META_NS)) {
        metadata.insert("Created".to_string(), parse_w3c_datetime(&created));
    }
    if let Some(modified) = first_text_value(&root, "date", Some(DC_NS)) {
        metadata.insert("Last Modified".to_string(), parse_w3c_datetime(&modified));
    }

    Ok(Some(metadata))
}
