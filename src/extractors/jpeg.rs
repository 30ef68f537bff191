//! Lectura de segmentos JPEG: dimensiones, JFIF, perfil ICC, proceso de
//! codificación, submuestreo de croma y comentarios.

use std::fs;
use std::path::Path;

use super::exif_tags::{JPEG_EXCLUDED_TAGS, read_tags, to_metadata, without_tags};
use super::reader::ByteReader;
use crate::error::ExtractResult;
use crate::formatting::{format_hex_octets, format_size_kb, round_one_decimal};
use crate::metadata::report::{Metadata, Value};

pub const MARKER_PREFIX: u8 = 0xFF;
pub const SOI: u8 = 0xD8;
pub const EOI: u8 = 0xD9;
pub const SOS: u8 = 0xDA;
pub const APP0: u8 = 0xE0;
pub const APP2: u8 = 0xE2;
pub const COMMENT_MARKER: u8 = 0xFE;

const RAW_HEADER_LEN: usize = 512;
const JFIF_IDENTIFIER: &[u8] = b"JFIF\0";
const ICC_IDENTIFIER: &[u8] = b"ICC_PROFILE\0";
const UNKNOWN: &str = "Unknown";

/// Segmento con longitud declarada; `length` incluye sus propios dos bytes.
#[derive(Clone, Debug, PartialEq)]
pub struct JpegSegment<'a> {
    pub marker: u8,
    pub length: u16,
    pub payload: &'a [u8],
}

/// Marcadores sin campo de longitud.
fn is_standalone(marker: u8) -> bool {
    matches!(marker, SOI | EOI | 0x01 | 0xD0..=0xD7)
}

fn is_start_of_frame(marker: u8) -> bool {
    matches!(marker, 0xC0..=0xCF) && !matches!(marker, 0xC4 | 0xC8 | 0xCC)
}

fn is_progressive(marker: u8) -> bool {
    matches!(marker, 0xC2 | 0xC6 | 0xCA | 0xCE)
}

/// Recorre los segmentos de cabecera hasta el primer SOS inclusive.
pub struct SegmentIter<'a> {
    reader: ByteReader<'a>,
    done: bool,
}

impl<'a> SegmentIter<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            reader: ByteReader::new(data),
            done: false,
        }
    }
}

impl<'a> Iterator for SegmentIter<'a> {
    type Item = JpegSegment<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            let Some(byte) = self.reader.read_u8() else {
                self.done = true;
                break;
            };
            if byte != MARKER_PREFIX {
                continue;
            }

            let mut marker = self.reader.read_u8()?;
            while marker == MARKER_PREFIX {
                marker = self.reader.read_u8()?;
            }
            if marker == 0x00 || is_standalone(marker) {
                if marker == EOI {
                    self.done = true;
                }
                continue;
            }

            let Some(length) = self.reader.read_u16_be() else {
                self.done = true;
                break;
            };
            let payload = self
                .reader
                .take_up_to(usize::from(length).saturating_sub(2));
            if marker == SOS {
                self.done = true;
            }
            return Some(JpegSegment {
                marker,
                length,
                payload,
            });
        }
        None
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameComponent {
    pub id: u8,
    pub horizontal: u8,
    pub vertical: u8,
}

/// Propiedades estructurales reunidas de los segmentos de cabecera.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct JpegInfo {
    pub width: Option<u16>,
    pub height: Option<u16>,
    pub precision: Option<u8>,
    pub components: Vec<FrameComponent>,
    pub progressive: bool,
    pub jfif_version: Option<(u8, u8)>,
    pub dpi: Option<(f64, f64)>,
    pub has_icc_profile: bool,
}

impl JpegInfo {
    pub fn scan(data: &[u8]) -> Self {
        let mut info = JpegInfo::default();
        for segment in SegmentIter::new(data) {
            match segment.marker {
                marker if is_start_of_frame(marker) && info.width.is_none() => {
                    info.read_frame_header(segment.payload);
                    info.progressive = is_progressive(marker);
                }
                APP0 if segment.payload.starts_with(JFIF_IDENTIFIER) => {
                    info.read_jfif(&segment.payload[JFIF_IDENTIFIER.len()..]);
                }
                APP2 if segment.payload.starts_with(ICC_IDENTIFIER) => {
                    info.has_icc_profile = true;
                }
                _ => {}
            }
        }
        info
    }

    fn read_frame_header(&mut self, payload: &[u8]) {
        let mut reader = ByteReader::new(payload);
        self.precision = reader.read_u8();
        self.height = reader.read_u16_be();
        self.width = reader.read_u16_be();
        let count = reader.read_u8().unwrap_or(0);
        for _ in 0..count {
            let (Some(id), Some(sampling), Some(_table)) =
                (reader.read_u8(), reader.read_u8(), reader.read_u8())
            else {
                break;
            };
            self.components.push(FrameComponent {
                id,
                horizontal: sampling >> 4,
                vertical: sampling & 0x0F,
            });
        }
    }

    fn read_jfif(&mut self, payload: &[u8]) {
        let mut reader = ByteReader::new(payload);
        let (Some(major), Some(minor)) = (reader.read_u8(), reader.read_u8()) else {
            return;
        };
        self.jfif_version = Some((major, minor));

        let (Some(units), Some(x), Some(y)) =
            (reader.read_u8(), reader.read_u16_be(), reader.read_u16_be())
        else {
            return;
        };
        self.dpi = match units {
            1 => Some((f64::from(x), f64::from(y))),
            2 => Some((f64::from(x) * 2.54, f64::from(y) * 2.54)),
            _ => None,
        };
    }

    /// Par de muestreo de la primera componente en imágenes de tres componentes.
    pub fn subsampling(&self) -> Option<(u8, u8)> {
        match self.components.as_slice() {
            [first, _, _] => Some((first.horizontal, first.vertical)),
            _ => None,
        }
    }

    pub fn mode(&self) -> &'static str {
        match self.components.len() {
            1 => "L",
            3 => "RGB",
            4 => "CMYK",
            _ => UNKNOWN,
        }
    }
}

pub fn subsampling_label(pair: Option<(u8, u8)>) -> &'static str {
    match pair {
        Some((2, 2)) => "YCbCr4:2:0 (2 2)",
        Some((2, 1)) => "YCbCr4:2:2 (2 1)",
        Some(_) => "YCbCr4:4:4 (1 1)",
        None => UNKNOWN,
    }
}

pub fn encoding_process_label(progressive: bool) -> &'static str {
    if progressive {
        "Progressive JPEG, Huffman coding"
    } else {
        "Baseline DCT, Huffman coding"
    }
}

pub fn raw_header(data: &[u8]) -> String {
    format_hex_octets(&data[..data.len().min(RAW_HEADER_LEN)])
}

/// Busca linealmente el primer segmento de comentario desde el inicio del
/// archivo. Llegar al final sin encontrarlo no es un error.
pub fn find_comment(data: &[u8]) -> Option<String> {
    let mut reader = ByteReader::new(data);
    while let Some(byte) = reader.read_u8() {
        if byte != MARKER_PREFIX {
            continue;
        }
        let marker = reader.peek_u8()?;
        if marker == MARKER_PREFIX {
            // Relleno: el segundo 0xFF puede iniciar el siguiente marcador.
            continue;
        }
        reader.skip(1);
        if marker == 0x00 || is_standalone(marker) {
            continue;
        }

        let length = reader.read_u16_be()?;
        let body_len = usize::from(length).saturating_sub(2);
        if marker == COMMENT_MARKER {
            let body = reader.take_up_to(body_len);
            return Some(String::from_utf8_lossy(body).into_owned());
        }
        reader.skip(body_len);
    }
    None
}

/// Metadata derivada exclusivamente del búfer, sin nombre ni tamaño de archivo.
pub fn decode(data: &[u8]) -> Metadata {
    let info = JpegInfo::scan(data);
    let mut metadata = Metadata::new();

    if let (Some(width), Some(height)) = (info.width, info.height) {
        let (width, height) = (u32::from(width), u32::from(height));
        metadata.insert("Format".to_string(), Value::from("JPEG"));
        metadata.insert("Mode".to_string(), Value::from(info.mode()));
        metadata.insert("Image Width".to_string(), Value::from(width));
        metadata.insert("Image Height".to_string(), Value::from(height));
        metadata.insert(
            "Image Size".to_string(),
            Value::from(format!("{width}x{height}")),
        );
        metadata.insert(
            "Megapixels".to_string(),
            Value::from(round_one_decimal(
                f64::from(width) * f64::from(height) / 1_000_000.0,
            )),
        );
        metadata.insert(
            "Bits Per Sample".to_string(),
            Value::from(info.precision.unwrap_or(8)),
        );
        metadata.insert(
            "Color Components".to_string(),
            Value::from(info.components.len()),
        );
    }

    metadata.insert(
        "JFIF Version".to_string(),
        match info.jfif_version {
            Some((major, minor)) => Value::from(format!("{major}.{minor}")),
            None => Value::from(UNKNOWN),
        },
    );

    match info.dpi {
        Some((x, y)) => {
            metadata.insert("X Resolution".to_string(), Value::from(x));
            metadata.insert("Y Resolution".to_string(), Value::from(y));
            metadata.insert("Resolution Unit".to_string(), Value::from("inches"));
        }
        None => {
            for key in ["X Resolution", "Y Resolution", "Resolution Unit"] {
                metadata.insert(key.to_string(), Value::from(UNKNOWN));
            }
        }
    }

    metadata.insert(
        "ICC Profile".to_string(),
        Value::from(if info.has_icc_profile {
            "Present"
        } else {
            "Absent"
        }),
    );
    metadata.insert(
        "Encoding Process".to_string(),
        Value::from(encoding_process_label(info.progressive)),
    );
    metadata.insert(
        "YCbCr Subsampling".to_string(),
        Value::from(subsampling_label(info.subsampling())),
    );
    metadata.insert("Raw Header".to_string(), Value::from(raw_header(data)));
    metadata.insert(
        "Comment".to_string(),
        Value::from(
            find_comment(data)
                .filter(|comment| !comment.is_empty())
                .unwrap_or_else(|| "None".to_string()),
        ),
    );

    metadata
}

pub fn extract(path: &Path) -> ExtractResult<Option<Metadata>> {
    let data = fs::read(path)?;

    let mut metadata = decode(&data);
    if let Some(name) = path.file_name() {
        metadata.insert(
            "File Name".to_string(),
            Value::from(name.to_string_lossy().into_owned()),
        );
    }
    metadata.insert(
        "File Size".to_string(),
        Value::from(format_size_kb(data.len() as u64)),
    );

    let tags = without_tags(read_tags(&data), &JPEG_EXCLUDED_TAGS);
    metadata.insert("EXIF Metadata".to_string(), Value::Map(to_metadata(tags)));

    Ok(Some(metadata))
}
