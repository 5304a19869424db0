use std::{
    fmt,
    io::Cursor,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use eframe::egui;
use fast_image_resize::images::Image;
use fast_image_resize::{PixelType, ResizeOptions, Resizer};
use image::{DynamicImage, ImageFormat};
use thiserror::Error;
use zune_jpeg::JpegDecoder;

/// Largest texture the preview path uploads; bigger images are downscaled for display only.
pub const MAX_DISPLAY_WIDTH: u32 = 3840;
pub const MAX_DISPLAY_HEIGHT: u32 = 2160;
/// Thumbnail texture limit, twice the on-screen slot for high-DPI displays.
pub const THUMBNAIL_WIDTH: u32 = 240;
pub const THUMBNAIL_HEIGHT: u32 = 180;

static NEXT_IMAGE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique id used to key textures.
pub fn next_image_id() -> u64 {
    NEXT_IMAGE_ID.fetch_add(1, Ordering::Relaxed)
}

#[derive(Debug, Error)]
pub enum IntakeError {
    #[error("unsupported image type")]
    Unsupported,
    #[error("empty crop region")]
    EmptyRegion,
    #[error("crop region {x},{y} {width}x{height} exceeds {image_width}x{image_height}")]
    OutOfBounds {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        image_width: u32,
        image_height: u32,
    },
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub enum MimeType {
    Png,
    Jpeg,
    Webp,
}

impl MimeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MimeType::Png => "image/png",
            MimeType::Jpeg => "image/jpeg",
            MimeType::Webp => "image/webp",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            MimeType::Png => "png",
            MimeType::Jpeg => "jpg",
            MimeType::Webp => "webp",
        }
    }

    pub fn image_format(&self) -> ImageFormat {
        match self {
            MimeType::Png => ImageFormat::Png,
            MimeType::Jpeg => ImageFormat::Jpeg,
            MimeType::Webp => ImageFormat::WebP,
        }
    }

    /// Parses a MIME string such as `image/jpeg`. Parameters after `;` are ignored.
    pub fn parse(mime: &str) -> Option<Self> {
        let essence = mime.split(';').next().unwrap_or_default().trim();
        match essence.to_ascii_lowercase().as_str() {
            "image/png" => Some(MimeType::Png),
            "image/jpeg" | "image/jpg" | "image/pjpeg" => Some(MimeType::Jpeg),
            "image/webp" => Some(MimeType::Webp),
            _ => None,
        }
    }

    /// Sniffs the format from the leading bytes.
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        match image::guess_format(bytes).ok()? {
            ImageFormat::Png => Some(MimeType::Png),
            ImageFormat::Jpeg => Some(MimeType::Jpeg),
            ImageFormat::WebP => Some(MimeType::Webp),
            _ => None,
        }
    }
}

impl fmt::Display for MimeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An uploaded (or cropped) image, immutable once built.
#[derive(Clone)]
pub struct SourceImage {
    pub id: u64,
    pub name: String,
    pub bytes: Arc<[u8]>,
    pub base64: Arc<str>,
    pub data_url: Arc<str>,
    pub mime: MimeType,
    pub image: Arc<DynamicImage>,
}

impl fmt::Debug for SourceImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceImage")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("mime", &self.mime)
            .field("bytes", &self.bytes.len())
            .field("dimensions", &(self.image.width(), self.image.height()))
            .finish()
    }
}

impl SourceImage {
    /// Validates, decodes and encodes an uploaded file.
    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Result<Self, IntakeError> {
        let mime = MimeType::sniff(&bytes).ok_or(IntakeError::Unsupported)?;
        let image = decode_image(&bytes, mime)?;
        Ok(Self::from_parts(name.into(), bytes, mime, image))
    }

    fn from_parts(name: String, bytes: Vec<u8>, mime: MimeType, image: DynamicImage) -> Self {
        let base64 = BASE64.encode(&bytes);
        let data_url = data_url(mime, &base64);
        Self {
            id: next_image_id(),
            name,
            bytes: bytes.into(),
            base64: base64.into(),
            data_url: data_url.into(),
            mime,
            image: Arc::new(image),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Rasterizes the region at its pixel size and re-encodes it as PNG.
    pub fn crop(&self, x: u32, y: u32, width: u32, height: u32) -> Result<Self, IntakeError> {
        if width == 0 || height == 0 {
            return Err(IntakeError::EmptyRegion);
        }
        let (image_width, image_height) = (self.width(), self.height());
        if x.saturating_add(width) > image_width || y.saturating_add(height) > image_height {
            return Err(IntakeError::OutOfBounds {
                x,
                y,
                width,
                height,
                image_width,
                image_height,
            });
        }
        let cropped = self.image.crop_imm(x, y, width, height);
        let bytes = encode_image(&cropped, MimeType::Png)?;
        Ok(Self::from_parts(
            self.name.clone(),
            bytes,
            MimeType::Png,
            cropped,
        ))
    }
}

/// An image returned by the generation service.
#[derive(Clone)]
pub struct GeneratedImage {
    pub id: u64,
    pub bytes: Arc<[u8]>,
    pub mime: MimeType,
    pub image: Arc<DynamicImage>,
}

impl fmt::Debug for GeneratedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratedImage")
            .field("id", &self.id)
            .field("mime", &self.mime)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

impl GeneratedImage {
    /// Decodes returned bytes. The declared MIME is used only when the bytes don't say otherwise.
    pub fn from_bytes(bytes: Vec<u8>, declared: Option<MimeType>) -> Result<Self, IntakeError> {
        let mime = MimeType::sniff(&bytes)
            .or(declared)
            .ok_or(IntakeError::Unsupported)?;
        let image = decode_image(&bytes, mime)?;
        Ok(Self {
            id: next_image_id(),
            bytes: bytes.into(),
            mime,
            image: Arc::new(image),
        })
    }

    pub fn data_url(&self) -> String {
        data_url(self.mime, &BASE64.encode(&self.bytes))
    }
}

pub fn data_url(mime: MimeType, base64: &str) -> String {
    format!("data:{};base64,{}", mime.as_str(), base64)
}

/// Splits a `data:<mime>;base64,<payload>` URL.
pub fn split_data_url(url: &str) -> Option<(&str, &str)> {
    let rest = url.strip_prefix("data:")?;
    let (header, payload) = rest.split_once(',')?;
    let mime = header.strip_suffix(";base64")?;
    if payload.is_empty() {
        return None;
    }
    Some((mime, payload))
}

pub fn decode_image(bytes: &[u8], mime: MimeType) -> Result<DynamicImage, IntakeError> {
    if mime == MimeType::Jpeg {
        if let Some(image) = decode_jpeg_fast(bytes) {
            return Ok(image);
        }
    }
    Ok(image::load_from_memory_with_format(
        bytes,
        mime.image_format(),
    )?)
}

fn decode_jpeg_fast(bytes: &[u8]) -> Option<DynamicImage> {
    let mut decoder = JpegDecoder::new(Cursor::new(bytes));
    match decoder.decode() {
        Ok(pixels) => {
            let info = decoder.info()?;
            // zune-jpeg hands back RGB8 unless told otherwise
            image::RgbImage::from_raw(info.width as u32, info.height as u32, pixels)
                .map(DynamicImage::ImageRgb8)
        }
        Err(err) => {
            log::debug!("zune-jpeg failed, falling back to image: {err:?}");
            None
        }
    }
}

pub fn encode_image(image: &DynamicImage, mime: MimeType) -> Result<Vec<u8>, IntakeError> {
    let mut out = Cursor::new(Vec::new());
    match mime {
        // the JPEG encoder rejects alpha
        MimeType::Jpeg => DynamicImage::ImageRgb8(image.to_rgb8())
            .write_to(&mut out, ImageFormat::Jpeg)?,
        MimeType::Webp => DynamicImage::ImageRgba8(image.to_rgba8())
            .write_to(&mut out, ImageFormat::WebP)?,
        MimeType::Png => image.write_to(&mut out, ImageFormat::Png)?,
    }
    Ok(out.into_inner())
}

/// Returns a copy no larger than the display limit, or `None` if it already fits.
pub fn downscale_for_display(image: &DynamicImage) -> Option<DynamicImage> {
    downscale_to_fit(image, MAX_DISPLAY_WIDTH, MAX_DISPLAY_HEIGHT)
}

/// Shrinks `image` to fit `max_width` x `max_height`, keeping its shape.
/// `None` means it already fits (or resizing failed and the caller should use the original).
pub fn downscale_to_fit(
    image: &DynamicImage,
    max_width: u32,
    max_height: u32,
) -> Option<DynamicImage> {
    if image.width() <= max_width && image.height() <= max_height {
        return None;
    }
    let ratio = image.width() as f64 / image.height() as f64;
    let (new_w, new_h) = if ratio > max_width as f64 / max_height as f64 {
        (max_width, (max_width as f64 / ratio).max(1.0) as u32)
    } else {
        ((max_height as f64 * ratio).max(1.0) as u32, max_height)
    };

    let rgba = image.to_rgba8();
    let src = Image::from_vec_u8(rgba.width(), rgba.height(), rgba.into_raw(), PixelType::U8x4)
        .ok()?;
    let mut dst = Image::new(new_w, new_h, PixelType::U8x4);
    let mut resizer = Resizer::new();
    if let Err(err) = resizer.resize(&src, &mut dst, &ResizeOptions::default()) {
        log::warn!("downscale to {new_w}x{new_h} failed: {err}");
        return None;
    }
    image::RgbaImage::from_raw(new_w, new_h, dst.into_vec()).map(DynamicImage::ImageRgba8)
}

pub fn to_color_image(img: &DynamicImage) -> egui::ColorImage {
    let rgba = img.to_rgba8();
    let size = [rgba.width() as usize, rgba.height() as usize];
    let pixels = rgba.into_raw();
    egui::ColorImage::from_rgba_unmultiplied(size, &pixels)
}

/// Color image for display, downscaled when the source exceeds the texture limit.
pub fn to_display_image(img: &DynamicImage) -> egui::ColorImage {
    match downscale_for_display(img) {
        Some(small) => to_color_image(&small),
        None => to_color_image(img),
    }
}

/// Small color image for the batch strip.
pub fn to_thumbnail_image(img: &DynamicImage) -> egui::ColorImage {
    match downscale_to_fit(img, THUMBNAIL_WIDTH, THUMBNAIL_HEIGHT) {
        Some(small) => to_color_image(&small),
        None => to_color_image(img),
    }
}
