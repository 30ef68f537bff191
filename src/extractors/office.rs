//! Propiedades básicas de documentos Office Open XML (DOCX, XLSX, PPTX).

use std::path::Path;
use tracing::debug;

use super::xml::{
    CP_NS, DC_NS, DCTERMS_NS, find_child_text, integer_or_text, open_package, parse_w3c_datetime,
    parse_xml, read_part,
};
use crate::error::{ExtractError, ExtractResult};
use crate::metadata::report::{Metadata, Value};

const CORE_PART: &str = "docProps/core.xml";

/// Claves comunes a todos los adaptadores de documentos.
pub const DOCUMENT_KEYS: [&str; 9] = [
    "Title",
    "Author",
    "Subject",
    "Keywords",
    "Comments",
    "Last Modified By",
    "Revision",
    "Created",
    "Last Modified",
];

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum OfficeFlavor {
    Word,
    Excel,
    PowerPoint,
}

impl OfficeFlavor {
    /// Parte obligatoria que distingue cada tipo de paquete.
    fn main_part(self) -> &'static str {
        match self {
            OfficeFlavor::Word => "word/document.xml",
            OfficeFlavor::Excel => "xl/workbook.xml",
            OfficeFlavor::PowerPoint => "ppt/presentation.xml",
        }
    }

    fn label(self) -> &'static str {
        match self {
            OfficeFlavor::Word => "DOCX",
            OfficeFlavor::Excel => "XLSX",
            OfficeFlavor::PowerPoint => "PPTX",
        }
    }
}

struct FieldSpec {
    key: &'static str,
    local_name: &'static str,
    namespace: &'static str,
}

const CORE_FIELDS: [FieldSpec; 9] = [
    FieldSpec {
        key: "Title",
        local_name: "title",
        namespace: DC_NS,
    },
    FieldSpec {
        key: "Author",
        local_name: "creator",
        namespace: DC_NS,
    },
    FieldSpec {
        key: "Subject",
        local_name: "subject",
        namespace: DC_NS,
    },
    FieldSpec {
        key: "Keywords",
        local_name: "keywords",
        namespace: CP_NS,
    },
    FieldSpec {
        key: "Comments",
        local_name: "description",
        namespace: DC_NS,
    },
    FieldSpec {
        key: "Last Modified By",
        local_name: "lastModifiedBy",
        namespace: CP_NS,
    },
    FieldSpec {
        key: "Revision",
        local_name: "revision",
        namespace: CP_NS,
    },
    FieldSpec {
        key: "Created",
        local_name: "created",
        namespace: DCTERMS_NS,
    },
    FieldSpec {
        key: "Last Modified",
        local_name: "modified",
        namespace: DCTERMS_NS,
    },
];

/// Mapa con las nueve claves; cada propiedad ausente queda en `null`.
pub fn empty_document_metadata() -> Metadata {
    DOCUMENT_KEYS
        .iter()
        .map(|key| (key.to_string(), Value::Null))
        .collect()
}

pub fn extract(path: &Path, flavor: OfficeFlavor) -> ExtractResult<Option<Metadata>> {
    let mut archive = open_package(path, flavor.label())?;
    if archive.index_for_name(flavor.main_part()).is_none() {
        return Err(ExtractError::InvalidFormat(format!(
            "{} package without {}",
            flavor.label(),
            flavor.main_part()
        )));
    }

    let mut metadata = empty_document_metadata();
    let Some(contents) = read_part(&mut archive, CORE_PART)? else {
        debug!(path = %path.display(), "paquete sin propiedades básicas");
        return Ok(Some(metadata));
    };
    let root = parse_xml(&contents, CORE_PART)?;

    for field in &CORE_FIELDS {
        let Some(text) = find_child_text(&root, field.local_name, Some(field.namespace)) else {
            continue;
        };
        let value = match field.key {
            "Revision" => integer_or_text(&text),
            "Created" | "Last Modified" => parse_w3c_datetime(&text),
            _ => Value::from(text),
        };
        metadata.insert(field.key.to_string(), value);
    }

    Ok(Some(metadata))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;
    use zip::ZipWriter;
    use zip::write::SimpleFileOptions;

    pub(crate) const CORE_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties"
  xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/"
  xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
  <dc:title>Presupuesto 2024</dc:title>
  <dc:creator>María Núñez</dc:creator>
  <cp:keywords>finanzas, anual</cp:keywords>
  <dc:description>Borrador</dc:description>
  <cp:lastModifiedBy>Luis</cp:lastModifiedBy>
  <cp:revision>4</cp:revision>
  <dcterms:created xsi:type="dcterms:W3CDTF">2024-01-02T03:04:05Z</dcterms:created>
  <dcterms:modified xsi:type="dcterms:W3CDTF">2024-02-03T10:00:00Z</dcterms:modified>
</cp:coreProperties>"#;

    /// Paquete ZIP con las partes indicadas `(nombre, contenido)`.
    pub(crate) fn write_package(
        path: &Path,
        parts: &[(&str, &str)],
    ) -> Result<(), Box<dyn std::error::Error>> {
        let mut writer = ZipWriter::new(File::create(path)?);
        for (name, contents) in parts {
            writer.start_file(*name, SimpleFileOptions::default())?;
            writer.write_all(contents.as_bytes())?;
        }
        writer.finish()?;
        Ok(())
    }

    #[test]
    fn reads_core_properties_into_contract_keys() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("report.docx");
        write_package(
            &path,
            &[("word/document.xml", "<w:document/>"), (CORE_PART, CORE_XML)],
        )?;

        let metadata = extract(&path, OfficeFlavor::Word)?.expect("metadata DOCX");
        assert_eq!(metadata.len(), DOCUMENT_KEYS.len());
        assert_eq!(metadata["Title"], Value::from("Presupuesto 2024"));
        assert_eq!(metadata["Author"], Value::from("María Núñez"));
        assert_eq!(metadata["Comments"], Value::from("Borrador"));
        assert_eq!(metadata["Last Modified By"], Value::from("Luis"));
        assert_eq!(metadata["Revision"], Value::from(4i64));
        assert_eq!(metadata["Subject"], Value::Null);
        assert!(metadata["Created"].is_datetime());
        assert!(metadata["Last Modified"].is_datetime());
        Ok(())
    }

    #[test]
    fn missing_core_part_yields_null_properties() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("book.xlsx");
        write_package(&path, &[("xl/workbook.xml", "<workbook/>")])?;

        let metadata = extract(&path, OfficeFlavor::Excel)?.expect("metadata XLSX");
        assert!(metadata.values().all(|value| *value == Value::Null));
        Ok(())
    }

    #[test]
    fn wrong_package_kind_is_invalid_format() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("slides.pptx");
        write_package(&path, &[("word/document.xml", "<w:document/>")])?;

        let result = extract(&path, OfficeFlavor::PowerPoint);
        assert!(matches!(result, Err(ExtractError::InvalidFormat(_))));
        Ok(())
    }

    #[test]
    fn non_zip_content_is_invalid_format() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("fake.docx");
        std::fs::write(&path, "no es un zip")?;

        let result = extract(&path, OfficeFlavor::Word);
        assert!(matches!(result, Err(ExtractError::InvalidFormat(_))));
        Ok(())
    }

    #[test]
    fn broken_core_xml_is_adapter_failure() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("broken.docx");
        write_package(
            &path,
            &[("word/document.xml", "<w:document/>"), (CORE_PART, "<cp:core")],
        )?;

        let result = extract(&path, OfficeFlavor::Word);
        assert!(matches!(result, Err(ExtractError::AdapterFailure(_))));
        Ok(())
    }
}
