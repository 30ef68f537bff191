//! Metadata de PDFs: diccionario Info como bloque estándar y la tabla de
//! objetos como bloque estructural.

use chrono::{FixedOffset, NaiveDate};
use lopdf::{Dictionary, Document, Object, StringFormat};
use std::fs;
use std::path::Path;

use crate::error::{ExtractError, ExtractResult};
use crate::metadata::normalize::merge_sections;
use crate::metadata::report::{Metadata, Value};

pub const STANDARD_BLOCK: &str = "Standard Metadata";
pub const XREF_BLOCK: &str = "XREF Metadata";

const UTF16_BOM: &[u8] = &[0xFE, 0xFF];

pub fn extract(path: &Path) -> ExtractResult<Option<Metadata>> {
    let data = fs::read(path)?;
    let doc = Document::load_mem(&data)
        .map_err(|error| ExtractError::InvalidFormat(format!("not a valid PDF: {error}")))?;

    Ok(Some(merge_sections([
        (STANDARD_BLOCK, standard_metadata(&doc)),
        (XREF_BLOCK, xref_metadata(&doc)),
    ])))
}

fn standard_metadata(doc: &Document) -> Metadata {
    let mut metadata = Metadata::new();
    metadata.insert(
        "Format".to_string(),
        Value::from(format!("PDF {}", doc.version)),
    );
    metadata.insert(
        "Encryption".to_string(),
        match doc.trailer.get(b"Encrypt") {
            Ok(_) => Value::from("Standard"),
            Err(_) => Value::Null,
        },
    );

    let Some(info) = info_dictionary(doc) else {
        return metadata;
    };
    let text_fields: [(&[u8], &str); 7] = [
        (b"Title", "Title"),
        (b"Author", "Author"),
        (b"Subject", "Subject"),
        (b"Keywords", "Keywords"),
        (b"Creator", "Creator"),
        (b"Producer", "Producer"),
        (b"Trapped", "Trapped"),
    ];
    for (key, label) in text_fields {
        if let Some(value) = info.get(key).ok().and_then(|obj| object_to_string(doc, obj)) {
            metadata.insert(label.to_string(), Value::from(value));
        }
    }

    for (key, label) in [
        (b"CreationDate".as_slice(), "Created"),
        (b"ModDate".as_slice(), "Last Modified"),
    ] {
        if let Some(raw) = info.get(key).ok().and_then(|obj| object_to_string(doc, obj)) {
            let value = parse_pdf_date(&raw).unwrap_or_else(|| Value::from(raw));
            metadata.insert(label.to_string(), value);
        }
    }

    metadata
}

fn info_dictionary(doc: &Document) -> Option<&Dictionary> {
    match doc.trailer.get(b"Info").ok()? {
        Object::Reference(reference) => doc.get_dictionary(*reference).ok(),
        Object::Dictionary(dict) => Some(dict),
        _ => None,
    }
}

fn object_to_string(doc: &Document, obj: &Object) -> Option<String> {
    match obj {
        Object::String(bytes, _) => Some(decode_text_string(bytes).trim().to_string()),
        Object::Name(name) => Some(String::from_utf8_lossy(name).trim().to_string()),
        Object::Boolean(flag) => Some(flag.to_string()),
        Object::Reference(reference) => doc
            .get_object(*reference)
            .ok()
            .and_then(|inner| object_to_string(doc, inner)),
        _ => None,
    }
}

/// Cadenas de texto PDF: UTF-16BE con BOM o bytes de un solo octeto.
fn decode_text_string(bytes: &[u8]) -> String {
    match bytes.strip_prefix(UTF16_BOM) {
        Some(rest) => {
            let units = rest
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]));
            char::decode_utf16(units)
                .map(|unit| unit.unwrap_or(char::REPLACEMENT_CHARACTER))
                .collect()
        }
        None => String::from_utf8_lossy(bytes).into_owned(),
    }
}

/// `D:YYYYMMDDHHmmSSOHH'mm'`; todo salvo el año es opcional. Sin zona la
/// fecha queda como local.
pub fn parse_pdf_date(raw: &str) -> Option<Value> {
    let text = raw.trim();
    let text = text.strip_prefix("D:").unwrap_or(text);
    let digits_end = text
        .find(|ch: char| !ch.is_ascii_digit())
        .unwrap_or(text.len());
    let (digits, zone) = text.split_at(digits_end);
    if digits.len() < 4 {
        return None;
    }

    let field = |start: usize, len: usize, default: u32| -> Option<u32> {
        match digits.get(start..start + len) {
            Some(part) => part.parse().ok(),
            None => Some(default),
        }
    };
    let year = i32::try_from(field(0, 4, 0)?).ok()?;
    let stamp = NaiveDate::from_ymd_opt(year, field(4, 2, 1)?, field(6, 2, 1)?)?.and_hms_opt(
        field(8, 2, 0)?,
        field(10, 2, 0)?,
        field(12, 2, 0)?,
    )?;

    let zone = zone.trim_end_matches('\'');
    let sign = match zone.chars().next() {
        None => return Some(Value::from(stamp)),
        Some('Z' | '+') => 1,
        Some('-') => -1,
        Some(_) => return None,
    };
    let mut offset_parts = zone[1..].split('\'').filter(|part| !part.is_empty());
    let hours = offset_parts.next().map_or(Ok(0), str::parse::<u8>).ok()?;
    let minutes = offset_parts.next().map_or(Ok(0), str::parse::<u8>).ok()?;
    if hours > 23 || minutes > 59 {
        return None;
    }
    let seconds = i32::from(hours)
        .checked_mul(3600)?
        .checked_add(i32::from(minutes) * 60)?;
    let offset = FixedOffset::east_opt(sign * seconds)?;
    Some(Value::from(stamp.and_local_timezone(offset).single()?))
}

/// `XREF <n>` hacia el texto fuente de cada objeto indirecto.
fn xref_metadata(doc: &Document) -> Metadata {
    doc.objects
        .iter()
        .map(|((id, _generation), object)| {
            (format!("XREF {id}"), Value::from(render_object(object)))
        })
        .collect()
}

pub fn render_object(object: &Object) -> String {
    match object {
        Object::Null => "null".to_string(),
        Object::Boolean(flag) => flag.to_string(),
        Object::Integer(number) => number.to_string(),
        Object::Real(number) => number.to_string(),
        Object::Name(name) => format!("/{}", String::from_utf8_lossy(name)),
        Object::String(bytes, StringFormat::Literal) => {
            format!("({})", String::from_utf8_lossy(bytes))
        }
        Object::String(bytes, StringFormat::Hexadecimal) => {
            format!("<{}>", hex::encode_upper(bytes))
        }
        Object::Array(items) => {
            let inner: Vec<String> = items.iter().map(render_object).collect();
            format!("[{}]", inner.join(" "))
        }
        Object::Dictionary(dict) => render_dictionary(dict),
        Object::Stream(stream) => format!("{} stream", render_dictionary(&stream.dict)),
        Object::Reference((id, generation)) => format!("{id} {generation} R"),
    }
}

fn render_dictionary(dict: &Dictionary) -> String {
    let entries: Vec<String> = dict
        .iter()
        .map(|(key, value)| format!("/{} {}", String::from_utf8_lossy(key), render_object(value)))
        .collect();
    if entries.is_empty() {
        "<<>>".to_string()
    } else {
        format!("<< {} >>", entries.join(" "))
    }
}
