//! Etapas de una ejecución completa: clasificar, extraer y guardar.
//!
//! Solo la lectura del sobre de entrada y la escritura del de salida son
//! errores fatales; cada archivo fallido queda como diagnóstico.

use anyhow::Result;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::config::Config;
use crate::dispatch::Router;
use crate::metadata::mime::classify_tree;
use crate::metadata::output::{read_mime_envelope, write_envelope, write_mime_envelope};
use crate::metadata::report::MetadataEnvelope;

pub fn classify(root: &Path, output: &Path) -> Result<BTreeMap<String, String>> {
    let map = classify_tree(root);
    write_mime_envelope(&map, output)?;
    Ok(map)
}

pub fn extract(router: &Router, mime_envelope: &Path, output: &Path) -> Result<MetadataEnvelope> {
    let records = read_mime_envelope(mime_envelope)?;
    info!(files = records.len(), workers = router.workers(), "iniciando extracción");
    let envelope = router.run(&records)?;
    write_envelope(&envelope, output)?;
    Ok(envelope)
}

/// Ejecuta ambas etapas con los directorios configurados y devuelve la ruta
/// del sobre de resultados.
pub fn run(config: &Config, router: &Router, root: Option<&Path>) -> Result<PathBuf> {
    let root = root.unwrap_or(&config.input_dir);
    let mime_path = config.mime_envelope_path();
    let output = config.timestamped_result_path();

    classify(root, &mime_path)?;
    extract(router, &mime_path, &output)?;
    Ok(output)
}
