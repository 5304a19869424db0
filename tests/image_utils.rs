use image::{GenericImageView, ImageFormat};
use promptedit::image_utils::*;

mod common;
use common::{encoded_bytes, png_bytes, solid_image};

#[test]
fn mime_parse_accepts_common_spellings() {
    assert_eq!(MimeType::parse("image/png"), Some(MimeType::Png));
    assert_eq!(MimeType::parse("IMAGE/JPEG"), Some(MimeType::Jpeg));
    assert_eq!(MimeType::parse("image/jpg"), Some(MimeType::Jpeg));
    assert_eq!(MimeType::parse("image/webp; q=1"), Some(MimeType::Webp));
    assert_eq!(MimeType::parse("image/gif"), None);
    assert_eq!(MimeType::parse(""), None);
}

#[test]
fn mime_extensions_match_expectations() {
    assert_eq!(MimeType::Jpeg.extension(), "jpg");
    assert_eq!(MimeType::Png.extension(), "png");
    assert_eq!(MimeType::Webp.extension(), "webp");
    assert_eq!(MimeType::Webp.to_string(), "image/webp");
}

#[test]
fn sniff_reads_magic_bytes() {
    let image = solid_image(2, 2, [1, 2, 3, 255]);
    assert_eq!(MimeType::sniff(&png_bytes(&image)), Some(MimeType::Png));
    assert_eq!(
        MimeType::sniff(&encoded_bytes(&image.to_rgb8().into(), ImageFormat::Jpeg)),
        Some(MimeType::Jpeg)
    );
    assert_eq!(MimeType::sniff(b"GIF89a......"), None);
    assert_eq!(MimeType::sniff(b"hello"), None);
}

#[test]
fn source_image_builds_payloads() {
    let bytes = png_bytes(&solid_image(3, 2, [10, 20, 30, 255]));
    let source = SourceImage::from_bytes("photo.png", bytes.clone()).unwrap();
    assert_eq!(source.mime, MimeType::Png);
    assert_eq!((source.width(), source.height()), (3, 2));
    assert_eq!(&*source.bytes, bytes.as_slice());
    let (mime, payload) = split_data_url(&source.data_url).unwrap();
    assert_eq!(mime, "image/png");
    assert_eq!(payload, &*source.base64);
}

#[test]
fn source_image_decodes_jpeg() {
    let image = solid_image(8, 8, [200, 100, 50, 255]);
    let bytes = encoded_bytes(&image.to_rgb8().into(), ImageFormat::Jpeg);
    let source = SourceImage::from_bytes("photo.jpg", bytes).unwrap();
    assert_eq!(source.mime, MimeType::Jpeg);
    assert_eq!((source.width(), source.height()), (8, 8));
}

#[test]
fn source_image_rejects_non_images() {
    let err = SourceImage::from_bytes("notes.txt", b"just text".to_vec()).unwrap_err();
    assert!(matches!(err, IntakeError::Unsupported));
}

#[test]
fn source_ids_are_unique() {
    let bytes = png_bytes(&solid_image(1, 1, [0, 0, 0, 255]));
    let a = SourceImage::from_bytes("a.png", bytes.clone()).unwrap();
    let b = SourceImage::from_bytes("a.png", bytes).unwrap();
    assert_ne!(a.id, b.id);
}

#[test]
fn full_frame_crop_keeps_pixels() {
    let gradient = image::RgbImage::from_fn(6, 4, |x, y| {
        image::Rgb([x as u8 * 40, y as u8 * 60, (x + y) as u8 * 20])
    });
    let jpeg = encoded_bytes(&gradient.into(), ImageFormat::Jpeg);
    let source = SourceImage::from_bytes("photo.jpg", jpeg).unwrap();
    let cropped = source.crop(0, 0, 6, 4).unwrap();
    assert_eq!(cropped.mime, MimeType::Png);
    assert_eq!(cropped.name, "photo.jpg");
    assert_ne!(cropped.id, source.id);
    assert_eq!(cropped.image.to_rgba8(), source.image.to_rgba8());
}

#[test]
fn crop_takes_the_requested_region() {
    let mut image = solid_image(4, 4, [0, 0, 0, 255]).to_rgba8();
    image.put_pixel(2, 1, image::Rgba([255, 0, 0, 255]));
    let source = SourceImage::from_bytes("a.png", png_bytes(&image.into())).unwrap();
    let cropped = source.crop(2, 1, 2, 2).unwrap();
    assert_eq!(cropped.image.dimensions(), (2, 2));
    assert_eq!(cropped.image.get_pixel(0, 0).0, [255, 0, 0, 255]);
}

#[test]
fn crop_rejects_bad_regions() {
    let source =
        SourceImage::from_bytes("a.png", png_bytes(&solid_image(4, 4, [0, 0, 0, 255]))).unwrap();
    assert!(matches!(
        source.crop(0, 0, 0, 2),
        Err(IntakeError::EmptyRegion)
    ));
    assert!(matches!(
        source.crop(3, 0, 2, 2),
        Err(IntakeError::OutOfBounds { .. })
    ));
}

#[test]
fn generated_image_falls_back_to_declared_mime_only_when_needed() {
    let bytes = png_bytes(&solid_image(2, 2, [0, 0, 0, 255]));
    let image = GeneratedImage::from_bytes(bytes, Some(MimeType::Webp)).unwrap();
    assert_eq!(image.mime, MimeType::Png);
    assert!(image.data_url().starts_with("data:image/png;base64,"));

    assert!(GeneratedImage::from_bytes(b"nope".to_vec(), None).is_err());
}

#[test]
fn split_data_url_rejects_malformed_urls() {
    assert_eq!(
        split_data_url("data:image/png;base64,AAAA"),
        Some(("image/png", "AAAA"))
    );
    assert_eq!(split_data_url("data:image/png,AAAA"), None);
    assert_eq!(split_data_url("image/png;base64,AAAA"), None);
    assert_eq!(split_data_url("data:image/png;base64,"), None);
}

#[test]
fn encode_image_round_trips_formats() {
    let image = solid_image(3, 3, [5, 6, 7, 128]);
    for mime in [MimeType::Png, MimeType::Jpeg, MimeType::Webp] {
        let bytes = encode_image(&image, mime).unwrap();
        assert_eq!(MimeType::sniff(&bytes), Some(mime));
        let decoded = decode_image(&bytes, mime).unwrap();
        assert_eq!(decoded.dimensions(), (3, 3));
    }
}

#[test]
fn to_color_image_matches_input_dimensions() {
    let img = solid_image(3, 5, [10, 20, 30, 255]);
    let color = to_color_image(&img);
    assert_eq!(color.size, [3, 5]);
    assert_eq!(color.pixels.len(), (img.width() * img.height()) as usize);
    assert_eq!(color.pixels[0].r(), 10);
    assert_eq!(color.pixels[0].g(), 20);
    assert_eq!(color.pixels[0].b(), 30);
}

#[test]
fn downscale_only_touches_oversized_images() {
    let small = solid_image(16, 9, [1, 1, 1, 255]);
    assert!(downscale_for_display(&small).is_none());

    let wide = solid_image(MAX_DISPLAY_WIDTH * 2, 10, [1, 1, 1, 255]);
    let scaled = downscale_for_display(&wide).unwrap();
    assert_eq!(scaled.width(), MAX_DISPLAY_WIDTH);
    assert!(scaled.height() >= 1);

    let tall = solid_image(10, MAX_DISPLAY_HEIGHT + 100, [1, 1, 1, 255]);
    let display = to_display_image(&tall);
    assert_eq!(display.size[1], MAX_DISPLAY_HEIGHT as usize);
}

#[test]
fn thumbnails_are_bounded() {
    let wide = solid_image(1000, 500, [1, 2, 3, 255]);
    let thumb = to_thumbnail_image(&wide);
    assert_eq!(thumb.size, [THUMBNAIL_WIDTH as usize, 120]);

    let tiny = solid_image(10, 8, [1, 2, 3, 255]);
    assert_eq!(to_thumbnail_image(&tiny).size, [10, 8]);
}
