//! Extractores por familia de formato. Cada uno devuelve
//! `ExtractResult<Option<Metadata>>`: `Ok(None)` significa que no hubo metadata.

pub mod exif_tags;
pub mod jpeg;
pub mod odf;
pub mod office;
pub mod pdf;
pub mod png;
pub mod raster;
pub mod reader;
pub mod svg;
pub mod text;
pub mod xml;
