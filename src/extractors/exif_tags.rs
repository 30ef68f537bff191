//! Extracción de etiquetas EXIF como mapa plano `nombre -> texto`.

use exif::{Context, Exif, In, Reader, Tag};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Cursor, Seek};
use std::path::Path;
use tracing::debug;

use crate::metadata::report::{Metadata, Value};

pub type TagMap = BTreeMap<String, String>;

/// Marca de presencia de la miniatura embebida; nunca se copian sus bytes.
pub const THUMBNAIL_MARKER: &str = "JPEGThumbnail";

/// Etiquetas ruidosas que JPEG descarta antes de combinar el resultado.
pub const JPEG_EXCLUDED_TAGS: [&str; 2] = ["MakerNote", THUMBNAIL_MARKER];

pub fn read_tags(data: &[u8]) -> TagMap {
    read_tags_from(&mut Cursor::new(data))
}

/// Un fallo total de la tabla de etiquetas produce un mapa vacío.
pub fn read_tags_from_path(path: &Path) -> TagMap {
    match File::open(path) {
        Ok(file) => read_tags_from(&mut BufReader::new(file)),
        Err(error) => {
            debug!(path = %path.display(), %error, "no se pudo abrir el archivo para leer EXIF");
            TagMap::new()
        }
    }
}

pub fn read_tags_from<R: BufRead + Seek>(reader: &mut R) -> TagMap {
    match Reader::new().read_from_container(reader) {
        Ok(exif) => collect_tags(&exif),
        Err(exif::Error::NotFound(_)) => TagMap::new(),
        Err(error) => {
            debug!(%error, "tabla EXIF ilegible");
            TagMap::new()
        }
    }
}

pub fn without_tags(tags: TagMap, excluded: &[&str]) -> TagMap {
    tags.into_iter()
        .filter(|(name, _)| !excluded.iter().any(|pattern| name.contains(pattern)))
        .collect()
}

pub fn to_metadata(tags: TagMap) -> Metadata {
    tags.into_iter()
        .map(|(name, value)| (name, Value::Text(value)))
        .collect()
}

fn collect_tags(exif: &Exif) -> TagMap {
    let mut tags = TagMap::new();
    for field in exif.fields() {
        let name = format!("{} {}", group_label(field.ifd_num, field.tag), field.tag);
        tags.insert(name, render_field(field));
    }

    if exif
        .get_field(Tag::JPEGInterchangeFormat, In::THUMBNAIL)
        .is_some()
    {
        tags.insert(THUMBNAIL_MARKER.to_string(), "Present".to_string());
    }

    tags
}

fn group_label(ifd: In, tag: Tag) -> &'static str {
    if ifd == In::THUMBNAIL {
        return "Thumbnail";
    }
    match tag.context() {
        Context::Tiff => "Image",
        Context::Exif => "EXIF",
        Context::Gps => "GPS",
        Context::Interop => "Interoperability",
        #[allow(unreachable_patterns)]
        _ => "Unknown",
    }
}

fn render_field(field: &exif::Field) -> String {
    match &field.value {
        exif::Value::Ascii(parts) => parts
            .iter()
            .map(|part| {
                String::from_utf8_lossy(part)
                    .trim_end_matches('\0')
                    .trim()
                    .to_string()
            })
            .collect::<Vec<_>>()
            .join(", "),
        _ => field.display_value().to_string(),
    }
}
