//! Recorrido de chunks PNG: firma, cabecera IHDR y densidad física pHYs.

use std::fs;
use std::path::Path;
use tracing::warn;

use super::exif_tags::{read_tags, to_metadata};
use super::reader::ByteReader;
use crate::error::{ExtractError, ExtractResult};
use crate::metadata::report::{Metadata, Value};

pub const PNG_SIGNATURE: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

const CHUNK_HEADER_LEN: usize = 8;
const UNIT_METERS: u8 = 1;

/// Chunk tal como aparece en el flujo; `length` describe solo `data`.
#[derive(Clone, Debug, PartialEq)]
pub struct PngChunk<'a> {
    pub length: u32,
    pub chunk_type: [u8; 4],
    pub data: &'a [u8],
    /// Se lee pero nunca se valida.
    pub crc: Option<u32>,
}

impl PngChunk<'_> {
    pub fn type_name(&self) -> String {
        String::from_utf8_lossy(&self.chunk_type).into_owned()
    }
}

/// Devuelve la firma en hexadecimal mayúscula o `InvalidFormat`.
pub fn verify_signature(data: &[u8]) -> ExtractResult<String> {
    match data.get(..PNG_SIGNATURE.len()) {
        Some(header) if header == PNG_SIGNATURE => Ok(hex::encode_upper(header)),
        _ => Err(ExtractError::InvalidFormat(
            "not a valid PNG file: signature mismatch".to_string(),
        )),
    }
}

/// Itera los chunks a partir de la firma. Menos de ocho bytes restantes
/// terminan el recorrido sin error.
pub struct ChunkIter<'a> {
    reader: ByteReader<'a>,
}

impl<'a> ChunkIter<'a> {
    /// `data` debe comenzar justo después de la firma.
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            reader: ByteReader::new(data),
        }
    }
}

impl<'a> Iterator for ChunkIter<'a> {
    type Item = PngChunk<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.reader.remaining() < CHUNK_HEADER_LEN {
            return None;
        }
        let length = self.reader.read_u32_be()?;
        let chunk_type = self.reader.read_tag()?;
        let data = self
            .reader
            .take_up_to(usize::try_from(length).unwrap_or(usize::MAX));
        let crc = self.reader.read_u32_be();
        Some(PngChunk {
            length,
            chunk_type,
            data,
            crc,
        })
    }
}

/// Vuelca en `metadata` la firma y los campos de IHDR y pHYs. Ante
/// `TruncatedData` los campos ya leídos permanecen en `metadata`.
pub fn decode(data: &[u8], metadata: &mut Metadata) -> ExtractResult<()> {
    let signature = verify_signature(data)?;
    metadata.insert("PNG Signature".to_string(), Value::from(signature));
    walk_chunks(&data[PNG_SIGNATURE.len()..], metadata)
}

pub fn walk_chunks(data: &[u8], metadata: &mut Metadata) -> ExtractResult<()> {
    for chunk in ChunkIter::new(data) {
        match &chunk.chunk_type {
            b"IHDR" => read_ihdr(chunk.data, metadata)?,
            b"pHYs" => read_phys(chunk.data, metadata)?,
            _ => {}
        }
    }
    Ok(())
}

fn read_ihdr(data: &[u8], metadata: &mut Metadata) -> ExtractResult<()> {
    let mut reader = ByteReader::new(data);
    let truncated = || ExtractError::truncated("IHDR chunk shorter than 13 bytes");

    let width = reader.read_u32_be().ok_or_else(truncated)?;
    metadata.insert("Width".to_string(), Value::from(width));
    let height = reader.read_u32_be().ok_or_else(truncated)?;
    metadata.insert("Height".to_string(), Value::from(height));

    for key in [
        "Bit Depth",
        "Color Type",
        "Compression",
        "Filter",
        "Interlace",
    ] {
        let value = reader.read_u8().ok_or_else(truncated)?;
        metadata.insert(key.to_string(), Value::from(value));
    }
    Ok(())
}

fn read_phys(data: &[u8], metadata: &mut Metadata) -> ExtractResult<()> {
    let mut reader = ByteReader::new(data);
    let truncated = || ExtractError::truncated("pHYs chunk shorter than 9 bytes");

    let per_unit_x = reader.read_u32_be().ok_or_else(truncated)?;
    let per_unit_y = reader.read_u32_be().ok_or_else(truncated)?;
    let unit = reader.read_u8().ok_or_else(truncated)?;

    metadata.insert("Pixels per Unit X".to_string(), Value::from(per_unit_x));
    metadata.insert("Pixels per Unit Y".to_string(), Value::from(per_unit_y));
    metadata.insert(
        "Unit".to_string(),
        Value::from(if unit == UNIT_METERS {
            "Meters"
        } else {
            "Unknown"
        }),
    );
    Ok(())
}

pub fn extract(path: &Path) -> ExtractResult<Option<Metadata>> {
    let data = fs::read(path)?;
    let mut metadata = Metadata::new();

    let tags = read_tags(&data);
    metadata.insert(
        "EXIF Metadata".to_string(),
        if tags.is_empty() {
            Value::from("No EXIF metadata found")
        } else {
            Value::Map(to_metadata(tags))
        },
    );

    match decode(&data, &mut metadata) {
        Ok(()) => Ok(Some(metadata)),
        Err(error @ ExtractError::TruncatedData(_)) => {
            warn!(path = %path.display(), %error, "PNG truncado; se conservan los campos leídos");
            metadata.insert("Decode Error".to_string(), Value::from(error.to_string()));
            Ok(Some(metadata))
        }
        Err(error) => Err(error),
    }
}

#[cfg(test)]
mod tests;
