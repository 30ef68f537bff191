//! Extracción de metadata estructurada de imágenes y documentos hacia un sobre
//! JSON `ruta -> metadata | diagnostico`.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod extractors;
pub mod formatting;
pub mod logging;
pub mod metadata;
pub mod pipeline;

pub use dispatch::{ExtractorKind, Router, resolve};
pub use error::{ErrorKind, ExtractError, ExtractResult};
pub use metadata::{ExtractionResult, FileRecord, Metadata, MetadataEnvelope, Value};
