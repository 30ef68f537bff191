//! Imágenes TIFF, WebP y HEIF: cabecera del contenedor sin decodificar píxeles,
//! más las etiquetas EXIF.

use image::{ColorType, ImageDecoder, ImageFormat, ImageReader};
use std::fs;
use std::path::Path;
use tracing::warn;

use super::exif_tags::{TagMap, read_tags, read_tags_from_path, to_metadata};
use super::reader::ByteReader;
use crate::error::{ExtractError, ExtractResult};
use crate::metadata::report::{Metadata, Value};

/// Cajas ISO-BMFF que contienen las propiedades de imagen.
const CONTAINER_BOXES: [&[u8; 4]; 3] = [b"meta", b"iprp", b"ipco"];
const FULL_BOX_HEADER: usize = 4;

#[derive(Clone, Debug, PartialEq)]
struct BaseInfo {
    format: String,
    mode: Option<String>,
    width: u32,
    height: u32,
}

impl BaseInfo {
    fn into_metadata(self) -> Metadata {
        let mut metadata = Metadata::new();
        metadata.insert("Format".to_string(), Value::from(self.format));
        if let Some(mode) = self.mode {
            metadata.insert("Mode".to_string(), Value::from(mode));
        }
        metadata.insert("Image Width".to_string(), Value::from(self.width));
        metadata.insert("Image Height".to_string(), Value::from(self.height));
        metadata.insert(
            "Image Size".to_string(),
            Value::from(format!("{}x{}", self.width, self.height)),
        );
        metadata
    }
}

fn with_exif(mut metadata: Metadata, tags: TagMap) -> Metadata {
    metadata.insert(
        "EXIF Metadata".to_string(),
        if tags.is_empty() {
            Value::from("None")
        } else {
            Value::Map(to_metadata(tags))
        },
    );
    metadata
}

/// TIFF y WebP comparten camino: solo se lee la cabecera del decodificador.
/// Una cabecera ilegible es `InvalidFormat`.
pub fn extract(path: &Path) -> ExtractResult<Option<Metadata>> {
    let info = read_header(path)?;
    Ok(Some(with_exif(
        info.into_metadata(),
        read_tags_from_path(path),
    )))
}

fn read_header(path: &Path) -> ExtractResult<BaseInfo> {
    let reader = ImageReader::open(path)?.with_guessed_format()?;
    let format = reader
        .format()
        .ok_or_else(|| ExtractError::InvalidFormat("unrecognised image container".to_string()))?;
    let decoder = reader
        .into_decoder()
        .map_err(|error| ExtractError::InvalidFormat(error.to_string()))?;
    let (width, height) = decoder.dimensions();

    Ok(BaseInfo {
        format: format_label(format),
        mode: Some(mode_label(decoder.color_type()).to_string()),
        width,
        height,
    })
}

fn format_label(format: ImageFormat) -> String {
    match format {
        ImageFormat::Tiff => "TIFF".to_string(),
        ImageFormat::WebP => "WEBP".to_string(),
        other => other
            .extensions_str()
            .first()
            .map(|ext| ext.to_uppercase())
            .unwrap_or_else(|| format!("{other:?}").to_uppercase()),
    }
}

fn mode_label(color: ColorType) -> &'static str {
    match color {
        ColorType::L8 => "L",
        ColorType::La8 => "LA",
        ColorType::Rgb8 => "RGB",
        ColorType::Rgba8 => "RGBA",
        ColorType::L16 => "I;16",
        ColorType::La16 => "LA;16",
        ColorType::Rgb16 => "RGB;16",
        ColorType::Rgba16 => "RGBA;16",
        ColorType::Rgb32F => "RGB;32F",
        ColorType::Rgba32F => "RGBA;32F",
        _ => "Unknown",
    }
}

/// HEIF: dimensiones de la primera caja `ispe` y canales de `pixi`.
pub fn extract_heif(path: &Path) -> ExtractResult<Option<Metadata>> {
    let data = fs::read(path)?;
    let Some(info) = scan_heif(&data)? else {
        warn!(path = %path.display(), "contenedor HEIF sin caja ispe");
        return Ok(None);
    };
    Ok(Some(with_exif(info.into_metadata(), read_tags(&data))))
}

#[derive(Debug, Default)]
struct HeifProperties {
    extent: Option<(u32, u32)>,
    channels: Option<u8>,
}

fn scan_heif(data: &[u8]) -> ExtractResult<Option<BaseInfo>> {
    let mut boxes = BoxIter::new(data);
    match boxes.next() {
        Some((kind, _)) if &kind == b"ftyp" => {}
        _ => {
            return Err(ExtractError::InvalidFormat(
                "HEIF container does not start with ftyp".to_string(),
            ));
        }
    }

    let mut properties = HeifProperties::default();
    collect_properties(boxes, &mut properties);

    Ok(properties.extent.map(|(width, height)| BaseInfo {
        format: "HEIF".to_string(),
        mode: properties.channels.and_then(|channels| match channels {
            1 => Some("L".to_string()),
            3 => Some("RGB".to_string()),
            4 => Some("RGBA".to_string()),
            _ => None,
        }),
        width,
        height,
    }))
}

fn collect_properties(boxes: BoxIter<'_>, properties: &mut HeifProperties) {
    for (kind, body) in boxes {
        if CONTAINER_BOXES.contains(&&kind) {
            let children = if &kind == b"meta" {
                body.get(FULL_BOX_HEADER..).unwrap_or_default()
            } else {
                body
            };
            collect_properties(BoxIter::new(children), properties);
        } else if &kind == b"ispe" && properties.extent.is_none() {
            let mut reader = ByteReader::new(body);
            reader.skip(FULL_BOX_HEADER);
            if let (Some(width), Some(height)) = (reader.read_u32_be(), reader.read_u32_be()) {
                properties.extent = Some((width, height));
            }
        } else if &kind == b"pixi" && properties.channels.is_none() {
            let mut reader = ByteReader::new(body);
            reader.skip(FULL_BOX_HEADER);
            properties.channels = reader.read_u8();
        }
    }
}

/// Cajas hermanas `(tipo, cuerpo)`; se detiene ante una cabecera incompleta.
struct BoxIter<'a> {
    reader: ByteReader<'a>,
}

impl<'a> BoxIter<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self {
            reader: ByteReader::new(data),
        }
    }
}

impl<'a> Iterator for BoxIter<'a> {
    type Item = ([u8; 4], &'a [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        let size = self.reader.read_u32_be()?;
        let kind = self.reader.read_tag()?;
        let body_len = match size {
            0 => self.reader.remaining(),
            1 => {
                let high = self.reader.read_u32_be()?;
                let low = self.reader.read_u32_be()?;
                let large = (u64::from(high) << 32) | u64::from(low);
                usize::try_from(large.saturating_sub(16)).unwrap_or(usize::MAX)
            }
            size => usize::try_from(size).unwrap_or(usize::MAX).checked_sub(8)?,
        };
        Some((kind, self.reader.take_up_to(body_len)))
    }
}
