#![allow(dead_code)]

use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use promptedit::gemini::{EditRequest, GenerationError, ImageEditor};
use promptedit::image_utils::{GeneratedImage, MimeType, SourceImage};
use std::{
    collections::HashSet,
    io::Cursor,
    path::PathBuf,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
};

pub fn solid_image(width: u32, height: u32, color: [u8; 4]) -> DynamicImage {
    let pixel = Rgba(color);
    let buffer = RgbaImage::from_pixel(width, height, pixel);
    DynamicImage::ImageRgba8(buffer)
}

pub fn write_image(path: impl Into<PathBuf>, image: &DynamicImage) {
    image
        .save(path.into())
        .expect("failed to write image to disk");
}

pub fn encoded_bytes(image: &DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    image.write_to(&mut out, format).expect("encode");
    out.into_inner()
}

pub fn png_bytes(image: &DynamicImage) -> Vec<u8> {
    encoded_bytes(image, ImageFormat::Png)
}

pub fn source_image(name: &str, color: [u8; 4]) -> SourceImage {
    SourceImage::from_bytes(name, png_bytes(&solid_image(4, 3, color))).expect("source image")
}

pub fn generated_image(color: [u8; 4]) -> GeneratedImage {
    GeneratedImage::from_bytes(png_bytes(&solid_image(4, 3, color)), Some(MimeType::Png))
        .expect("generated image")
}

/// Stand-in for the generation service.
///
/// Requests whose image payload was registered with [`FakeEditor::fail_on`] or
/// [`FakeEditor::panic_on`] fail or panic; everything else returns a small PNG.
#[derive(Default)]
pub struct FakeEditor {
    failing: Mutex<HashSet<String>>,
    panicking: Mutex<HashSet<String>>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl FakeEditor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_on(self, source: &SourceImage) -> Self {
        self.failing
            .lock()
            .unwrap()
            .insert(source.base64.to_string());
        self
    }

    pub fn panic_on(self, source: &SourceImage) -> Self {
        self.panicking
            .lock()
            .unwrap()
            .insert(source.base64.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

impl ImageEditor for FakeEditor {
    fn edit(&self, request: &EditRequest) -> Result<GeneratedImage, GenerationError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(request.prompt.clone());
        if self.panicking.lock().unwrap().contains(&request.image_base64) {
            panic!("scripted panic");
        }
        if self.failing.lock().unwrap().contains(&request.image_base64) {
            return Err(GenerationError::Api {
                status: 500,
                message: "scripted failure".to_string(),
            });
        }
        Ok(generated_image([(call % 255) as u8, 100, 200, 255]))
    }
}
