use std::io::Cursor;

use base64::Engine as _;

use super::*;

fn png_bytes(rgba: Vec<u8>, w: u32, h: u32) -> Vec<u8> {
    let img = image::RgbaImage::from_raw(w, h, rgba).unwrap();
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

#[test]
fn decode_image_png_dimensions_and_premul() {
    let buf = png_bytes(vec![100u8, 50u8, 200u8, 128u8], 1, 1);

    let prepared = decode_image(&buf).unwrap();
    assert_eq!(prepared.width, 1);
    assert_eq!(prepared.height, 1);
    assert_eq!(
        prepared.rgba8_premul.as_slice(),
        &[
            ((100u16 * 128 + 127) / 255) as u8,
            ((50u16 * 128 + 127) / 255) as u8,
            ((200u16 * 128 + 127) / 255) as u8,
            128u8
        ]
    );
}

#[test]
fn decode_image_rejects_garbage() {
    let err = decode_image(b"not an image").unwrap_err();
    assert!(matches!(err, ReelError::AssetDecode(_)));
}

#[test]
fn data_uri_roundtrips_png_payload() {
    let buf = png_bytes(vec![10, 20, 30, 255, 40, 50, 60, 255], 2, 1);
    let uri = format!(
        "data:image/png;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(&buf)
    );

    let (mime, bytes) = parse_data_uri(&uri).unwrap().unwrap();
    assert_eq!(mime, "image/png");
    let img = decode_image(&bytes).unwrap();
    assert_eq!((img.width, img.height), (2, 1));
    assert_eq!(read_source_bytes(&uri).unwrap(), buf);
}

#[test]
fn non_data_sources_are_not_parsed_as_uris() {
    assert!(parse_data_uri("shots/01.png").is_none());
    assert!(parse_data_uri("data:image/png;base64").unwrap().is_err());
}

#[test]
fn missing_file_is_a_decode_error() {
    let err = read_source_bytes("/definitely/not/here.png").unwrap_err();
    assert!(matches!(err, ReelError::AssetDecode(_)));
}

#[test]
fn solid_image_fills_every_pixel() {
    let img = solid_image(3, 2, Rgba8Premul::from_straight_rgba(17, 17, 17, 255));
    assert_eq!(img.rgba8_premul.len(), 3 * 2 * 4);
    assert!(img.rgba8_premul.chunks_exact(4).all(|px| px == [17, 17, 17, 255]));
}
