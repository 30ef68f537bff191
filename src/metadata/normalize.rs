//! Canonicaliza fechas y combina bloques de metadata bajo claves de sección.

use crate::formatting::{format_iso_naive, format_iso_zoned};
use crate::metadata::report::{Metadata, Value};

/// Recorre mapas y listas; toda hoja fecha/hora pasa a texto ISO-8601.
pub fn normalize(value: Value) -> Value {
    match value {
        Value::DateTime(stamp) => Value::Text(format_iso_naive(&stamp)),
        Value::ZonedDateTime(stamp) => Value::Text(format_iso_zoned(&stamp)),
        Value::List(items) => Value::List(items.into_iter().map(normalize).collect()),
        Value::Map(entries) => Value::Map(normalize_map(entries)),
        other => other,
    }
}

pub fn normalize_map(entries: Metadata) -> Metadata {
    entries
        .into_iter()
        .map(|(key, value)| (key, normalize(value)))
        .collect()
}

/// Anida cada bloque bajo su etiqueta; una etiqueta repetida recibe sufijo
/// numérico para no pisar el bloque anterior.
pub fn merge_sections<I, S>(sections: I) -> Metadata
where
    I: IntoIterator<Item = (S, Metadata)>,
    S: Into<String>,
{
    let mut merged = Metadata::new();
    for (label, block) in sections {
        let label = label.into();
        let mut key = label.clone();
        let mut suffix = 2;
        while merged.contains_key(&key) {
            key = format!("{label} ({suffix})");
            suffix += 1;
        }
        merged.insert(key, Value::Map(block));
    }
    merged
}
