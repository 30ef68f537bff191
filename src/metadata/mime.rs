//! Detección de tipos MIME mediante inferencia heurística.

use infer::Infer;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, warn};
use walkdir::WalkDir;

const TEXT_SAMPLE_LIMIT: u64 = 8 * 1024;

/// Intenta detectar el tipo MIME del archivo a partir de su contenido.
///
/// Devuelve `None` cuando la ruta no existe o no puede leerse.
pub fn classify(path: &Path) -> Option<String> {
    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(error) => {
            warn!(path = %path.display(), %error, "no se pudo abrir el archivo para clasificarlo");
            return None;
        }
    };

    let mut sample = Vec::new();
    if let Err(error) = file.by_ref().take(TEXT_SAMPLE_LIMIT).read_to_end(&mut sample) {
        warn!(path = %path.display(), %error, "no se pudo leer el archivo para clasificarlo");
        return None;
    }

    let infer = Infer::new();
    let detected = infer.get(&sample).map(|kind| kind.mime_type().to_string());

    Some(detected.unwrap_or_else(|| fallback_mime(&sample).to_string()))
}

fn fallback_mime(sample: &[u8]) -> &'static str {
    if looks_like_text(sample) {
        "text/plain"
    } else {
        "application/octet-stream"
    }
}

fn looks_like_text(sample: &[u8]) -> bool {
    if sample.starts_with(b"\xEF\xBB\xBF")
        || sample.starts_with(b"\xFF\xFE")
        || sample.starts_with(b"\xFE\xFF")
    {
        return true;
    }
    if sample.contains(&0) {
        return false;
    }
    match std::str::from_utf8(sample) {
        Ok(_) => true,
        // La muestra puede cortar un carácter multibyte al final.
        Err(error) => error.error_len().is_none(),
    }
}

/// Clasifica cada archivo regular bajo `root` (o `root` mismo si es archivo).
pub fn classify_tree(root: &Path) -> BTreeMap<String, String> {
    let mut results = BTreeMap::new();

    for entry in WalkDir::new(root).follow_links(false) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(error) => {
                warn!(root = %root.display(), %error, "entrada ilegible durante el recorrido");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
        if let Some(mime) = classify(&absolute) {
            debug!(path = %absolute.display(), %mime, "archivo clasificado");
            results.insert(absolute.display().to_string(), mime);
        }
    }

    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const PNG_HEADER: &[u8] = &[
        0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 13, b'I', b'H', b'D', b'R',
    ];

    #[test]
    fn classifies_by_content_not_extension() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let disguised = dir.path().join("picture.txt");
        std::fs::write(&disguised, PNG_HEADER)?;

        assert_eq!(classify(&disguised).as_deref(), Some("image/png"));
        Ok(())
    }

    #[test]
    fn unknown_utf8_content_is_plain_text() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let notes = dir.path().join("notes.md");
        std::fs::write(&notes, "canción de prueba\n")?;
        let blob = dir.path().join("blob.bin");
        std::fs::write(&blob, [0u8, 159, 146, 150, 0, 1])?;

        assert_eq!(classify(&notes).as_deref(), Some("text/plain"));
        assert_eq!(
            classify(&blob).as_deref(),
            Some("application/octet-stream")
        );
        Ok(())
    }

    #[test]
    fn missing_path_yields_no_entry() {
        assert_eq!(classify(Path::new("/definitely/not/here.png")), None);
    }

    #[test]
    fn tree_walk_uses_absolute_paths() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        std::fs::create_dir(dir.path().join("nested"))?;
        std::fs::write(dir.path().join("nested").join("a.txt"), "hola")?;
        std::fs::write(dir.path().join("b.png"), PNG_HEADER)?;

        let map = classify_tree(dir.path());
        assert_eq!(map.len(), 2);
        assert!(map.keys().all(|key| Path::new(key).is_absolute()));
        assert!(map.values().any(|mime| mime == "image/png"));
        assert!(map.values().any(|mime| mime == "text/plain"));
        Ok(())
    }
}
