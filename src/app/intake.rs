use std::{
    path::{Path, PathBuf},
    sync::mpsc::{self, Receiver, Sender},
    thread,
    time::Instant,
};

use eframe::egui;

use crate::{
    fs_utils::is_supported_image,
    image_utils::{to_display_image, IntakeError, SourceImage},
};

pub enum IntakeSource {
    Path(PathBuf),
    Bytes { name: String, bytes: Vec<u8> },
}

impl IntakeSource {
    pub fn name(&self) -> String {
        match self {
            IntakeSource::Path(path) => path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string()),
            IntakeSource::Bytes { name, .. } => name.clone(),
        }
    }
}

pub struct IntakeRequest {
    pub source: IntakeSource,
    /// Id of the session image to replace instead of appending.
    pub replace: Option<u64>,
}

impl IntakeRequest {
    pub fn add(source: IntakeSource) -> Self {
        Self {
            source,
            replace: None,
        }
    }

    /// Targets an image by id, so later removals cannot shift the target.
    pub fn replace(source: IntakeSource, target: u64) -> Self {
        Self {
            source,
            replace: Some(target),
        }
    }
}

pub struct LoadedImage {
    pub source: SourceImage,
    pub preview: egui::ColorImage,
    pub replace: Option<u64>,
}

pub enum IntakeEvent {
    Loaded(LoadedImage),
    Failed { name: String, error: IntakeError },
}

/// Decodes uploads off the UI thread.
pub struct Intake {
    request_tx: Sender<IntakeRequest>,
    event_rx: Receiver<IntakeEvent>,
    pub in_flight: usize,
}

impl Intake {
    pub fn new() -> Self {
        let (request_tx, event_rx) = Self::spawn_decoder();
        Self {
            request_tx,
            event_rx,
            in_flight: 0,
        }
    }

    fn spawn_decoder() -> (Sender<IntakeRequest>, Receiver<IntakeEvent>) {
        let (event_tx, event_rx) = mpsc::channel();
        let (request_tx, request_rx) = mpsc::channel::<IntakeRequest>();

        thread::spawn(move || {
            while let Ok(request) = request_rx.recv() {
                let name = request.source.name();
                let event = match load(request) {
                    Ok(loaded) => IntakeEvent::Loaded(loaded),
                    Err(error) => {
                        log::warn!("Failed to load {name}: {error}");
                        IntakeEvent::Failed { name, error }
                    }
                };
                if event_tx.send(event).is_err() {
                    break;
                }
            }
        });
        (request_tx, event_rx)
    }

    pub fn submit(&mut self, request: IntakeRequest) {
        if self.request_tx.send(request).is_ok() {
            self.in_flight += 1;
        } else {
            log::error!("intake thread is gone");
        }
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight > 0
    }

    pub fn poll(&mut self) -> Vec<IntakeEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.event_rx.try_recv() {
            self.in_flight = self.in_flight.saturating_sub(1);
            events.push(event);
        }
        events
    }
}

impl Default for Intake {
    fn default() -> Self {
        Self::new()
    }
}

fn load(request: IntakeRequest) -> Result<LoadedImage, IntakeError> {
    let start = Instant::now();
    let name = request.source.name();
    let bytes = match request.source {
        IntakeSource::Path(path) => std::fs::read(&path).map_err(|source| IntakeError::Io {
            path: path.display().to_string(),
            source,
        })?,
        IntakeSource::Bytes { bytes, .. } => bytes,
    };
    let read_duration = start.elapsed();

    let decode_start = Instant::now();
    let source = SourceImage::from_bytes(name, bytes)?;
    let decode_duration = decode_start.elapsed();

    let preview_start = Instant::now();
    let preview = to_display_image(&source.image);
    log::debug!(
        "loaded {} ({}x{}, {}) read {:?} decode {:?} preview {:?}",
        source.name,
        source.width(),
        source.height(),
        source.mime,
        read_duration,
        decode_duration,
        preview_start.elapsed()
    );
    Ok(LoadedImage {
        source,
        preview,
        replace: request.replace,
    })
}

/// Whether a dropped or picked file should be handed to the decoder.
///
/// A declared MIME type decides on its own; without one the extension does.
pub fn accepts_file(name: &str, mime: &str, path: Option<&Path>) -> bool {
    let mime = mime.trim();
    if !mime.is_empty() {
        return mime.to_ascii_lowercase().starts_with("image/");
    }
    match path {
        Some(path) => is_supported_image(path),
        None => is_supported_image(Path::new(name)),
    }
}
