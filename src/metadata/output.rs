//! Lectura del sobre de entrada y escritura del sobre de salida en JSON.

use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::info;

use crate::metadata::report::{FileRecord, MetadataEnvelope};

/// Lee el mapa `ruta -> tipo MIME` generado por el clasificador.
pub fn read_mime_envelope(path: &Path) -> Result<Vec<FileRecord>> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("no se pudo leer el sobre de entrada `{}`", path.display()))?;
    let map: BTreeMap<String, String> = serde_json::from_str(&contents)
        .with_context(|| format!("el sobre de entrada `{}` no es JSON válido", path.display()))?;

    Ok(map
        .into_iter()
        .map(|(file_path, mime)| FileRecord::new(file_path, mime))
        .collect())
}

pub fn write_mime_envelope(map: &BTreeMap<String, String>, path: &Path) -> Result<()> {
    write_json(map, path)?;
    info!(path = %path.display(), files = map.len(), "tipos MIME guardados");
    Ok(())
}

pub fn write_envelope(envelope: &MetadataEnvelope, path: &Path) -> Result<()> {
    write_json(envelope, path)?;
    info!(path = %path.display(), files = envelope.len(), "metadata guardada");
    Ok(())
}

fn write_json<T: Serialize>(value: &T, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("no se pudo crear el directorio `{}`", parent.display()))?;
    }
    // serde_json conserva los caracteres no ASCII tal cual.
    let json = serde_json::to_string_pretty(value).context("no se pudo serializar JSON")?;
    fs::write(path, json)
        .with_context(|| format!("no se pudo guardar el JSON en `{}`", path.display()))
}
