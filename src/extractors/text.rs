//! Estadísticas de texto plano: tamaño, marcas de tiempo, conteos y encoding.

use std::fs;
use std::io;
use std::path::Path;
use std::time::SystemTime;

use crate::error::ExtractResult;
use crate::formatting::system_time_to_local;
use crate::metadata::report::{Metadata, Value};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TextEncoding {
    Ascii,
    Utf8,
    Utf8Bom,
    Utf16Le,
    Utf16Be,
    Utf32Le,
    Utf32Be,
    Latin1,
}

impl TextEncoding {
    pub fn label(self) -> &'static str {
        match self {
            TextEncoding::Ascii => "ascii",
            TextEncoding::Utf8 => "utf-8",
            TextEncoding::Utf8Bom => "UTF-8-SIG",
            TextEncoding::Utf16Le => "UTF-16LE",
            TextEncoding::Utf16Be => "UTF-16BE",
            TextEncoding::Utf32Le => "UTF-32LE",
            TextEncoding::Utf32Be => "UTF-32BE",
            TextEncoding::Latin1 => "ISO-8859-1",
        }
    }
}

/// Las marcas de UTF-32 se comprueban antes que las de UTF-16 porque las
/// comparten como prefijo.
fn detect_bom(bytes: &[u8]) -> Option<(TextEncoding, usize)> {
    if bytes.starts_with(b"\xEF\xBB\xBF") {
        return Some((TextEncoding::Utf8Bom, 3));
    }
    if bytes.starts_with(b"\x00\x00\xFE\xFF") {
        return Some((TextEncoding::Utf32Be, 4));
    }
    if bytes.starts_with(b"\xFF\xFE\x00\x00") {
        return Some((TextEncoding::Utf32Le, 4));
    }
    if bytes.starts_with(b"\xFF\xFE") {
        return Some((TextEncoding::Utf16Le, 2));
    }
    if bytes.starts_with(b"\xFE\xFF") {
        return Some((TextEncoding::Utf16Be, 2));
    }
    None
}

pub fn detect_encoding(bytes: &[u8]) -> TextEncoding {
    if let Some((encoding, _)) = detect_bom(bytes) {
        return encoding;
    }
    if bytes.is_ascii() {
        TextEncoding::Ascii
    } else if std::str::from_utf8(bytes).is_ok() {
        TextEncoding::Utf8
    } else {
        TextEncoding::Latin1
    }
}

/// Texto decodificado sin la marca de orden de bytes.
pub fn decode(bytes: &[u8], encoding: TextEncoding) -> String {
    let body = &bytes[detect_bom(bytes).map_or(0, |(_, len)| len)..];
    match encoding {
        TextEncoding::Ascii | TextEncoding::Utf8 | TextEncoding::Utf8Bom => {
            String::from_utf8_lossy(body).into_owned()
        }
        TextEncoding::Utf16Le | TextEncoding::Utf16Be => {
            let units = body.chunks_exact(2).map(|pair| {
                let pair = [pair[0], pair[1]];
                if encoding == TextEncoding::Utf16Le {
                    u16::from_le_bytes(pair)
                } else {
                    u16::from_be_bytes(pair)
                }
            });
            char::decode_utf16(units)
                .map(|unit| unit.unwrap_or(char::REPLACEMENT_CHARACTER))
                .collect()
        }
        TextEncoding::Utf32Le | TextEncoding::Utf32Be => body
            .chunks_exact(4)
            .map(|quad| {
                let quad = [quad[0], quad[1], quad[2], quad[3]];
                let code = if encoding == TextEncoding::Utf32Le {
                    u32::from_le_bytes(quad)
                } else {
                    u32::from_be_bytes(quad)
                };
                char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER)
            })
            .collect(),
        TextEncoding::Latin1 => body.iter().copied().map(char::from).collect(),
    }
}

fn timestamp(time: io::Result<SystemTime>) -> Value {
    time.map(system_time_to_local).ok().into()
}

pub fn extract(path: &Path) -> ExtractResult<Option<Metadata>> {
    let info = fs::metadata(path)?;
    let bytes = fs::read(path)?;
    let encoding = detect_encoding(&bytes);
    let content = decode(&bytes, encoding);

    let mut metadata = Metadata::new();
    metadata.insert("File Size".to_string(), Value::from(info.len()));
    metadata.insert("Created".to_string(), timestamp(info.created()));
    metadata.insert("Modified".to_string(), timestamp(info.modified()));
    metadata.insert("Accessed".to_string(), timestamp(info.accessed()));
    metadata.insert("Line Count".to_string(), Value::from(content.lines().count()));
    metadata.insert(
        "Word Count".to_string(),
        Value::from(content.split_whitespace().count()),
    );
    metadata.insert(
        "Character Count".to_string(),
        Value::from(content.chars().count()),
    );
    metadata.insert("Encoding".to_string(), Value::from(encoding.label()));

    Ok(Some(metadata))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExtractError;
    use tempfile::tempdir;

    #[test]
    fn counts_lines_words_and_characters() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("notas.txt");
        fs::write(&path, "año nuevo\nvida nueva\r\n\nfin")?;

        let metadata = extract(&path)?.expect("metadata TXT");
        assert_eq!(metadata["Line Count"], Value::from(4usize));
        assert_eq!(metadata["Word Count"], Value::from(5usize));
        assert_eq!(metadata["Character Count"], Value::from(26usize));
        assert_eq!(metadata["File Size"], Value::from(27u64));
        assert_eq!(metadata["Encoding"], Value::from("utf-8"));
        assert!(metadata["Modified"].is_datetime());
        Ok(())
    }

    #[test]
    fn bom_selects_encoding_and_is_not_counted() {
        let utf16 = b"\xFF\xFEh\0i\0";
        assert_eq!(detect_encoding(utf16), TextEncoding::Utf16Le);
        assert_eq!(decode(utf16, TextEncoding::Utf16Le), "hi");

        let utf32 = b"\xFF\xFE\0\0h\0\0\0";
        assert_eq!(detect_encoding(utf32), TextEncoding::Utf32Le);
        assert_eq!(decode(utf32, TextEncoding::Utf32Le), "h");

        let sig = b"\xEF\xBB\xBFok";
        assert_eq!(detect_encoding(sig).label(), "UTF-8-SIG");
        assert_eq!(decode(sig, TextEncoding::Utf8Bom), "ok");
    }

    #[test]
    fn invalid_utf8_falls_back_to_latin1() {
        let bytes = b"caf\xE9";
        assert_eq!(detect_encoding(bytes), TextEncoding::Latin1);
        assert_eq!(decode(bytes, TextEncoding::Latin1), "café");
        assert_eq!(detect_encoding(b"plain"), TextEncoding::Ascii);
    }

    #[test]
    fn missing_file_is_io_error() {
        let result = extract(Path::new("/no/such/file.txt"));
        assert!(matches!(result, Err(ExtractError::Io(_))));
    }
}
