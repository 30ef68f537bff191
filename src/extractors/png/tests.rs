use super::*;
use proptest::prelude::*;
use tempfile::tempdir;

fn chunk(kind: &[u8; 4], data: &[u8]) -> Vec<u8> {
    let mut bytes = (data.len() as u32).to_be_bytes().to_vec();
    bytes.extend_from_slice(kind);
    bytes.extend_from_slice(data);
    // CRC de relleno: el decodificador no lo valida.
    bytes.extend_from_slice(&[0xDE, 0xAD, 0xBE, 0xEF]);
    bytes
}

fn ihdr(width: u32, height: u32, fields: [u8; 5]) -> Vec<u8> {
    let mut data = width.to_be_bytes().to_vec();
    data.extend_from_slice(&height.to_be_bytes());
    data.extend_from_slice(&fields);
    chunk(b"IHDR", &data)
}

fn phys(x: u32, y: u32, unit: u8) -> Vec<u8> {
    let mut data = x.to_be_bytes().to_vec();
    data.extend_from_slice(&y.to_be_bytes());
    data.push(unit);
    chunk(b"pHYs", &data)
}

fn png(chunks: &[Vec<u8>]) -> Vec<u8> {
    let mut bytes = PNG_SIGNATURE.to_vec();
    for part in chunks {
        bytes.extend_from_slice(part);
    }
    bytes
}

fn int(metadata: &Metadata, key: &str) -> i64 {
    match metadata.get(key) {
        Some(Value::Integer(value)) => *value,
        other => panic!("`{key}` deberia ser entero, se obtuvo {other:?}"),
    }
}

#[test]
fn decodes_ihdr_and_phys_end_to_end() -> Result<(), Box<dyn std::error::Error>> {
    let data = png(&[
        ihdr(100, 50, [8, 2, 0, 0, 0]),
        phys(2835, 2835, 1),
        chunk(b"IDAT", &[0x78, 0x9C, 0x03, 0x00]),
        chunk(b"IEND", &[]),
    ]);

    let mut metadata = Metadata::new();
    decode(&data, &mut metadata)?;

    assert_eq!(int(&metadata, "Width"), 100);
    assert_eq!(int(&metadata, "Height"), 50);
    assert_eq!(int(&metadata, "Bit Depth"), 8);
    assert_eq!(int(&metadata, "Color Type"), 2);
    assert_eq!(int(&metadata, "Compression"), 0);
    assert_eq!(int(&metadata, "Filter"), 0);
    assert_eq!(int(&metadata, "Interlace"), 0);
    assert_eq!(int(&metadata, "Pixels per Unit X"), 2835);
    assert_eq!(int(&metadata, "Pixels per Unit Y"), 2835);
    assert_eq!(metadata["Unit"], Value::from("Meters"));
    assert_eq!(metadata["PNG Signature"], Value::from("89504E470D0A1A0A"));
    assert!(!metadata.contains_key("IDAT"));
    Ok(())
}

#[test]
fn non_meter_unit_is_unknown() -> Result<(), Box<dyn std::error::Error>> {
    let mut metadata = Metadata::new();
    decode(&png(&[phys(72, 72, 0)]), &mut metadata)?;
    assert_eq!(metadata["Unit"], Value::from("Unknown"));

    let mut metadata = Metadata::new();
    decode(&png(&[phys(72, 72, 7)]), &mut metadata)?;
    assert_eq!(metadata["Unit"], Value::from("Unknown"));
    Ok(())
}

#[test]
fn signature_mismatch_is_invalid_format_without_fields() {
    let mut data = png(&[ihdr(10, 10, [8, 6, 0, 0, 0]), phys(1, 1, 1)]);
    data[1] = b'p';

    let mut metadata = Metadata::new();
    let result = decode(&data, &mut metadata);
    assert!(matches!(result, Err(ExtractError::InvalidFormat(_))));
    assert!(metadata.is_empty());

    assert!(matches!(
        verify_signature(&PNG_SIGNATURE[..4]),
        Err(ExtractError::InvalidFormat(_))
    ));
}

#[test]
fn short_ihdr_keeps_fields_already_read() {
    let mut payload = 640u32.to_be_bytes().to_vec();
    payload.extend_from_slice(&480u32.to_be_bytes());
    payload.push(16);
    let data = png(&[chunk(b"IHDR", &payload)]);

    let mut metadata = Metadata::new();
    let result = decode(&data, &mut metadata);
    assert!(matches!(result, Err(ExtractError::TruncatedData(_))));
    assert_eq!(int(&metadata, "Width"), 640);
    assert_eq!(int(&metadata, "Height"), 480);
    assert_eq!(int(&metadata, "Bit Depth"), 16);
    assert!(!metadata.contains_key("Color Type"));
}

#[test]
fn trailing_partial_header_ends_walk_silently() -> Result<(), Box<dyn std::error::Error>> {
    let mut data = png(&[ihdr(3, 4, [8, 0, 0, 0, 1])]);
    data.extend_from_slice(&[0, 0, 0, 5, b't']);

    let mut metadata = Metadata::new();
    decode(&data, &mut metadata)?;
    assert_eq!(int(&metadata, "Interlace"), 1);
    Ok(())
}

#[test]
fn signature_only_stream_has_no_chunks() -> Result<(), Box<dyn std::error::Error>> {
    let mut metadata = Metadata::new();
    decode(&PNG_SIGNATURE, &mut metadata)?;
    assert_eq!(metadata.len(), 1);
    Ok(())
}

#[test]
fn chunk_iterator_reports_lengths_and_crc() {
    let body = [ihdr(1, 1, [8, 0, 0, 0, 0]), chunk(b"IEND", &[])].concat();
    let chunks: Vec<PngChunk<'_>> = ChunkIter::new(&body).collect();

    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[0].type_name(), "IHDR");
    assert_eq!(chunks[0].length, 13);
    assert_eq!(chunks[0].data.len(), 13);
    assert_eq!(chunks[0].crc, Some(0xDEADBEEF));
    assert_eq!(chunks[1].type_name(), "IEND");
    assert!(chunks[1].data.is_empty());
}

#[test]
fn decodes_stream_written_by_png_encoder() -> Result<(), Box<dyn std::error::Error>> {
    let mut encoded = Vec::new();
    {
        let mut encoder = ::png::Encoder::new(&mut encoded, 7, 3);
        encoder.set_color(::png::ColorType::Rgba);
        encoder.set_depth(::png::BitDepth::Eight);
        encoder.set_pixel_dims(Some(::png::PixelDimensions {
            xppu: 2835,
            yppu: 2835,
            unit: ::png::Unit::Meter,
        }));
        let mut writer = encoder.write_header()?;
        writer.write_image_data(&[0u8; 7 * 3 * 4])?;
        writer.finish()?;
    }

    let mut metadata = Metadata::new();
    decode(&encoded, &mut metadata)?;
    assert_eq!(int(&metadata, "Width"), 7);
    assert_eq!(int(&metadata, "Height"), 3);
    assert_eq!(int(&metadata, "Color Type"), 6);
    assert_eq!(int(&metadata, "Bit Depth"), 8);
    assert_eq!(int(&metadata, "Pixels per Unit X"), 2835);
    assert_eq!(int(&metadata, "Pixels per Unit Y"), 2835);
    assert_eq!(metadata["Unit"], Value::from("Meters"));
    Ok(())
}

#[test]
fn extract_keeps_partial_fields_and_notes_truncation() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let path = dir.path().join("cut.png");
    let payload = 12u32.to_be_bytes();
    std::fs::write(&path, png(&[chunk(b"IHDR", &payload)]))?;

    let metadata = extract(&path)?.expect("PNG truncado conserva metadata");
    assert_eq!(int(&metadata, "Width"), 12);
    assert_eq!(
        metadata["EXIF Metadata"],
        Value::from("No EXIF metadata found")
    );
    assert!(
        metadata["Decode Error"]
            .as_str()
            .is_some_and(|message| message.starts_with("truncated data"))
    );
    Ok(())
}

#[test]
fn extract_rejects_non_png_content() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let path = dir.path().join("fake.png");
    std::fs::write(&path, b"GIF89a not a png")?;

    assert!(matches!(extract(&path), Err(ExtractError::InvalidFormat(_))));
    Ok(())
}

proptest! {
    #[test]
    fn recovers_arbitrary_ihdr_values(
        width in any::<u32>(),
        height in any::<u32>(),
        fields in any::<[u8; 5]>(),
        filler in prop::collection::vec(any::<u8>(), 0..64),
    ) {
        let data = png(&[chunk(b"tEXt", &filler), ihdr(width, height, fields)]);
        let mut metadata = Metadata::new();
        prop_assert!(decode(&data, &mut metadata).is_ok());
        prop_assert_eq!(int(&metadata, "Width"), i64::from(width));
        prop_assert_eq!(int(&metadata, "Height"), i64::from(height));
        let keys = ["Bit Depth", "Color Type", "Compression", "Filter", "Interlace"];
        for (key, expected) in keys.iter().zip(fields) {
            prop_assert_eq!(int(&metadata, key), i64::from(expected));
        }
    }
}
