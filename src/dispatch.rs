//! Enrutado `(tipo MIME, extension) -> extractor` y ejecución por lotes.
//!
//! Ningún fallo de un extractor sale de este módulo: cada error se registra con
//! la ruta y su causa, y se convierte en un diagnóstico para ese archivo.

use anyhow::{Context, Result};
use rayon::prelude::*;
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use tracing::{Dispatch, debug, info, warn};

use crate::error::{ExtractError, ExtractResult};
use crate::extractors::office::OfficeFlavor;
use crate::extractors::{jpeg, odf, office, pdf, png, raster, svg, text};
use crate::metadata::normalize::normalize_map;
use crate::metadata::report::{ExtractionResult, FileRecord, Metadata, MetadataEnvelope};

const TEXT_PLAIN: &str = "text/plain";

/// Familias de extractor conocidas; el enrutado las recorre de forma exhaustiva.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ExtractorKind {
    Docx,
    Xlsx,
    Pptx,
    Odf,
    Pdf,
    Png,
    Jpeg,
    Tiff,
    Webp,
    Heic,
    Svg,
    Text,
}

impl ExtractorKind {
    pub fn from_mime(mime: &str) -> Option<Self> {
        let kind = match mime {
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => Self::Docx,
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet" => Self::Xlsx,
            "application/vnd.openxmlformats-officedocument.presentationml.presentation" => {
                Self::Pptx
            }
            "application/vnd.oasis.opendocument.text"
            | "application/vnd.oasis.opendocument.spreadsheet"
            | "application/vnd.oasis.opendocument.presentation" => Self::Odf,
            "application/pdf" => Self::Pdf,
            "image/png" => Self::Png,
            "image/jpeg" => Self::Jpeg,
            "image/tiff" => Self::Tiff,
            "image/webp" => Self::Webp,
            "image/heic" | "image/heif" => Self::Heic,
            "image/svg+xml" => Self::Svg,
            _ => return None,
        };
        Some(kind)
    }

    /// `extension` incluye el punto y se compara en minúsculas.
    pub fn from_extension(extension: &str) -> Option<Self> {
        let kind = match extension.to_lowercase().as_str() {
            ".docx" => Self::Docx,
            ".xlsx" => Self::Xlsx,
            ".pptx" => Self::Pptx,
            ".odt" | ".ods" | ".odp" => Self::Odf,
            ".pdf" => Self::Pdf,
            ".png" => Self::Png,
            ".jpg" | ".jpeg" => Self::Jpeg,
            ".tiff" | ".tif" => Self::Tiff,
            ".webp" => Self::Webp,
            ".heic" | ".heif" => Self::Heic,
            ".svg" => Self::Svg,
            ".txt" => Self::Text,
            _ => return None,
        };
        Some(kind)
    }

    pub fn extract(self, path: &Path) -> ExtractResult<Option<Metadata>> {
        match self {
            Self::Docx => office::extract(path, OfficeFlavor::Word),
            Self::Xlsx => office::extract(path, OfficeFlavor::Excel),
            Self::Pptx => office::extract(path, OfficeFlavor::PowerPoint),
            Self::Odf => odf::extract(path),
            Self::Pdf => pdf::extract(path),
            Self::Png => png::extract(path),
            Self::Jpeg => jpeg::extract(path),
            Self::Tiff | Self::Webp => raster::extract(path),
            Self::Heic => raster::extract_heif(path),
            Self::Svg => svg::extract(path),
            Self::Text => text::extract(path),
        }
    }
}

impl fmt::Display for ExtractorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Extensión de `path` con punto y en minúsculas; vacía si no tiene.
pub fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
        .unwrap_or_default()
}

/// Tabla exacta de MIME primero; solo `text/plain` consulta la extensión.
pub fn resolve(mime: &str, extension: &str) -> ExtractResult<ExtractorKind> {
    if let Some(kind) = ExtractorKind::from_mime(mime) {
        return Ok(kind);
    }
    if mime != TEXT_PLAIN {
        return Err(ExtractError::UnsupportedType(format!(
            "MIME type {mime} not supported"
        )));
    }
    ExtractorKind::from_extension(extension).ok_or_else(|| {
        ExtractError::UnsupportedType(format!(
            "Extension {extension} not supported for MIME type {mime}"
        ))
    })
}

/// Mensaje de diagnóstico para el sobre de salida.
pub fn diagnostic_message(error: &ExtractError) -> String {
    match error {
        ExtractError::UnsupportedType(message) => message.clone(),
        other => format!("Error extracting metadata: {other}"),
    }
}

/// Enrutador con su propio manejador de logging; no depende de un suscriptor
/// global y puede usarse desde cualquier hilo.
#[derive(Clone)]
pub struct Router {
    dispatch: Dispatch,
    workers: usize,
}

impl Router {
    /// `workers == 0` usa un hilo por CPU; `1` procesa en secuencia.
    pub fn new(dispatch: Dispatch, workers: usize) -> Self {
        Self { dispatch, workers }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn extract(&self, record: &FileRecord) -> ExtractionResult {
        self.extract_with(record, &ExtractorKind::extract)
    }

    fn extract_with<F>(&self, record: &FileRecord, extractor: &F) -> ExtractionResult
    where
        F: Fn(ExtractorKind, &Path) -> ExtractResult<Option<Metadata>>,
    {
        tracing::dispatcher::with_default(&self.dispatch, || {
            self.extract_record(record, extractor)
        })
    }

    fn extract_record<F>(&self, record: &FileRecord, extractor: &F) -> ExtractionResult
    where
        F: Fn(ExtractorKind, &Path) -> ExtractResult<Option<Metadata>>,
    {
        let path = Path::new(&record.path);
        info!(path = %record.path, mime = %record.mime_type, "procesando archivo");

        let outcome = resolve(&record.mime_type, &extension_of(path)).and_then(|kind| {
            debug!(path = %record.path, %kind, "extractor seleccionado");
            contain_panic(kind, || extractor(kind, path))
        });

        match outcome {
            Ok(Some(metadata)) => ExtractionResult::Success(normalize_map(metadata)),
            Ok(None) => {
                debug!(path = %record.path, "sin metadata");
                ExtractionResult::Absent
            }
            Err(error) => {
                warn!(
                    path = %record.path,
                    kind = %error.kind(),
                    cause = %error,
                    "extracción fallida"
                );
                ExtractionResult::Diagnostic(diagnostic_message(&error))
            }
        }
    }

    /// Procesa todos los registros; el orden de combinación no importa porque
    /// el sobre se indexa por ruta.
    pub fn run(&self, records: &[FileRecord]) -> Result<MetadataEnvelope> {
        self.run_with(records, &ExtractorKind::extract)
    }

    fn run_with<F>(&self, records: &[FileRecord], extractor: &F) -> Result<MetadataEnvelope>
    where
        F: Fn(ExtractorKind, &Path) -> ExtractResult<Option<Metadata>> + Sync,
    {
        if self.workers == 1 {
            return Ok(records
                .iter()
                .map(|record| (record.path.clone(), self.extract_with(record, extractor)))
                .collect());
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .build()
            .context("no se pudo crear el pool de trabajadores")?;
        Ok(pool.install(|| {
            records
                .par_iter()
                .map(|record| (record.path.clone(), self.extract_with(record, extractor)))
                .collect()
        }))
    }
}

/// Un panic dentro de un decodificador o de un parser externo queda como
/// `AdapterFailure` de ese archivo.
fn contain_panic<F>(kind: ExtractorKind, extract: F) -> ExtractResult<Option<Metadata>>
where
    F: FnOnce() -> ExtractResult<Option<Metadata>>,
{
    panic::catch_unwind(AssertUnwindSafe(extract)).unwrap_or_else(|payload| {
        Err(ExtractError::adapter(format!(
            "{kind} extractor panicked: {}",
            panic_message(payload.as_ref())
        )))
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}
