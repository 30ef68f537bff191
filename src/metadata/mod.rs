//! Modelo de datos, normalización y persistencia de los sobres JSON.

pub mod mime;
pub mod normalize;
pub mod output;
pub mod report;

pub use normalize::{merge_sections, normalize, normalize_map};
pub use report::{ExtractionResult, FileRecord, Metadata, MetadataEnvelope, Value};
