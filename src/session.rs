//! In-memory editing session.
//!
//! A session with one image keeps a linear undo/redo [`HistoryLog`]. With more
//! than one image it is in batch mode: every image gets exactly one
//! [`EditResult`] slot and there is no history.

use thiserror::Error;

use crate::{
    adjust::Adjustments,
    gemini::{EditRequest, GenerationError},
    history::HistoryLog,
    image_utils::{GeneratedImage, SourceImage},
    presets::{self, compose_prompt},
};

pub const LOAD_FAILED_MESSAGE: &str = "Failed to load image. Please try another file.";
pub const CROP_FAILED_MESSAGE: &str = "Failed to process image. Please try again.";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("Please upload an image and enter an editing prompt.")]
    MissingInput,
    #[error("Please wait for the current edit to finish.")]
    Busy,
    #[error("There is no image number {}.", .0 + 1)]
    NoSuchImage(usize),
    #[error("Regenerating a single image is only available with multiple images.")]
    NotBatch,
    #[error("The image to replace has been removed.")]
    ImageRemoved,
}

#[derive(Clone, Debug, Default)]
pub enum EditResult {
    #[default]
    Pending,
    Done(GeneratedImage),
    Failed(String),
}

impl EditResult {
    pub fn result(&self) -> Option<&GeneratedImage> {
        match self {
            EditResult::Done(image) => Some(image),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            EditResult::Failed(message) => Some(message),
            _ => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, EditResult::Pending)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Mode {
    Empty,
    Single,
    Batch,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum JobKind {
    /// The only image of a single-image session.
    Single,
    /// Every image of a batch, in order.
    Batch,
    /// One image of a batch.
    Slot(usize),
}

/// Work handed to the dispatcher. `requests` line up with the images the kind names.
#[derive(Clone, Debug)]
pub struct GenerationJob {
    pub epoch: u64,
    pub kind: JobKind,
    pub requests: Vec<EditRequest>,
}

/// Settled results of a [`GenerationJob`], in request order.
#[derive(Debug)]
pub struct JobOutcome {
    pub epoch: u64,
    pub kind: JobKind,
    pub results: Vec<Result<GeneratedImage, GenerationError>>,
}

#[derive(Copy, Clone, Debug)]
pub enum DisplayedImage<'a> {
    Original(&'a SourceImage),
    Edited(&'a GeneratedImage),
}

impl DisplayedImage<'_> {
    pub fn id(&self) -> u64 {
        match self {
            DisplayedImage::Original(source) => source.id,
            DisplayedImage::Edited(image) => image.id,
        }
    }

    pub fn dynamic_image(&self) -> &image::DynamicImage {
        match self {
            DisplayedImage::Original(source) => &source.image,
            DisplayedImage::Edited(image) => &image.image,
        }
    }

    pub fn is_edited(&self) -> bool {
        matches!(self, DisplayedImage::Edited(_))
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub done: usize,
    pub failed: usize,
    pub pending: usize,
}

pub fn batch_failure_message(failed: usize, total: usize) -> String {
    format!("{failed} of {total} images failed to edit. Successful results are still available.")
}

#[derive(Default)]
pub struct Session {
    images: Vec<SourceImage>,
    results: Vec<EditResult>,
    history: HistoryLog<GeneratedImage>,
    selected: usize,
    loading: bool,
    error: Option<String>,
    epoch: u64,
    pub adjustments: Adjustments,
    pub enhancer: Option<usize>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn images(&self) -> &[SourceImage] {
        &self.images
    }

    pub fn results(&self) -> &[EditResult] {
        &self.results
    }

    pub fn history(&self) -> &HistoryLog<GeneratedImage> {
        &self.history
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn set_error(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn mode(&self) -> Mode {
        match self.images.len() {
            0 => Mode::Empty,
            1 => Mode::Single,
            _ => Mode::Batch,
        }
    }

    pub fn is_batch(&self) -> bool {
        self.mode() == Mode::Batch
    }

    pub fn select(&mut self, index: usize) -> bool {
        if index < self.images.len() {
            self.selected = index;
            true
        } else {
            false
        }
    }

    /// Adds an image. The first image of a session resets filters and the enhancer.
    pub fn add_image(&mut self, image: SourceImage) -> Result<usize, SessionError> {
        if self.loading {
            return Err(SessionError::Busy);
        }
        if self.images.is_empty() {
            self.adjustments.reset_filters();
            self.enhancer = None;
            self.error = None;
            self.selected = 0;
        }
        log::debug!("adding {image:?}");
        self.images.push(image);
        self.results.push(EditResult::Pending);
        if self.images.len() == 2 {
            // Entering batch mode: the visible edit becomes the first slot.
            if let Some(current) = self.history.current().cloned() {
                self.results[0] = EditResult::Done(current);
            }
            self.history.clear();
        }
        self.epoch += 1;
        Ok(self.images.len() - 1)
    }

    /// Swaps one image for another and forgets its results.
    pub fn replace_image(&mut self, index: usize, image: SourceImage) -> Result<(), SessionError> {
        if self.loading {
            return Err(SessionError::Busy);
        }
        let slot = self
            .images
            .get_mut(index)
            .ok_or(SessionError::NoSuchImage(index))?;
        *slot = image;
        self.results[index] = EditResult::Pending;
        if self.mode() == Mode::Single {
            self.history.clear();
        }
        self.epoch += 1;
        Ok(())
    }

    /// Current position of the image with `id`.
    pub fn index_of(&self, id: u64) -> Option<usize> {
        self.images.iter().position(|image| image.id == id)
    }

    /// Replaces the image with `target` id wherever it sits now and returns its index.
    pub fn replace_image_by_id(
        &mut self,
        target: u64,
        image: SourceImage,
    ) -> Result<usize, SessionError> {
        if self.loading {
            return Err(SessionError::Busy);
        }
        let index = self.index_of(target).ok_or(SessionError::ImageRemoved)?;
        self.replace_image(index, image)?;
        Ok(index)
    }

    pub fn remove_image(&mut self, index: usize) -> Result<SourceImage, SessionError> {
        if self.loading {
            return Err(SessionError::Busy);
        }
        if index >= self.images.len() {
            return Err(SessionError::NoSuchImage(index));
        }
        let removed = self.images.remove(index);
        self.results.remove(index);
        match self.images.len() {
            0 => {
                self.history.clear();
                self.error = None;
            }
            1 => {
                // Leaving batch mode: the remaining result starts a fresh history.
                self.history.clear();
                if let EditResult::Done(image) = std::mem::take(&mut self.results[0]) {
                    self.history.push(image);
                }
            }
            _ => {}
        }
        self.selected = self.selected.min(self.images.len().saturating_sub(1));
        self.epoch += 1;
        Ok(removed)
    }

    /// Drops all images and results. Display adjustments survive until the next first upload.
    pub fn new_session(&mut self) -> Result<(), SessionError> {
        if self.loading {
            return Err(SessionError::Busy);
        }
        self.images.clear();
        self.results.clear();
        self.history.clear();
        self.selected = 0;
        self.error = None;
        self.epoch += 1;
        Ok(())
    }

    pub fn compose_prompt(&self, instruction: &str) -> String {
        compose_prompt(instruction, self.enhancer.and_then(presets::enhancer))
    }

    pub fn can_generate(&self, instruction: &str) -> bool {
        !self.loading && !self.images.is_empty() && !instruction.trim().is_empty()
    }

    /// Builds the job for the whole session and marks the session as loading.
    pub fn prepare_generation(&mut self, instruction: &str) -> Result<GenerationJob, SessionError> {
        if self.loading {
            return Err(SessionError::Busy);
        }
        if self.images.is_empty() || instruction.trim().is_empty() {
            self.error = Some(SessionError::MissingInput.to_string());
            return Err(SessionError::MissingInput);
        }
        let prompt = self.compose_prompt(instruction);
        let kind = if self.images.len() == 1 {
            JobKind::Single
        } else {
            JobKind::Batch
        };
        let requests = self
            .images
            .iter()
            .map(|image| EditRequest::new(image, prompt.clone()))
            .collect();
        Ok(self.start(kind, requests))
    }

    /// Builds a job that regenerates a single batch slot.
    pub fn prepare_regeneration(
        &mut self,
        index: usize,
        instruction: &str,
    ) -> Result<GenerationJob, SessionError> {
        if self.loading {
            return Err(SessionError::Busy);
        }
        if !self.is_batch() {
            return Err(SessionError::NotBatch);
        }
        let image = self
            .images
            .get(index)
            .ok_or(SessionError::NoSuchImage(index))?;
        if instruction.trim().is_empty() {
            self.error = Some(SessionError::MissingInput.to_string());
            return Err(SessionError::MissingInput);
        }
        let request = EditRequest::new(image, self.compose_prompt(instruction));
        Ok(self.start(JobKind::Slot(index), vec![request]))
    }

    fn start(&mut self, kind: JobKind, requests: Vec<EditRequest>) -> GenerationJob {
        self.loading = true;
        self.error = None;
        GenerationJob {
            epoch: self.epoch,
            kind,
            requests,
        }
    }

    /// Applies a settled job. Returns `false` for outcomes from an older image collection.
    pub fn apply_outcome(&mut self, outcome: JobOutcome) -> bool {
        if outcome.epoch != self.epoch {
            log::warn!(
                "discarding outcome for epoch {} (current {})",
                outcome.epoch,
                self.epoch
            );
            return false;
        }
        self.loading = false;
        match outcome.kind {
            JobKind::Single => {
                let Some(result) = outcome.results.into_iter().next() else {
                    log::warn!("single edit settled without a result");
                    return true;
                };
                match result {
                    Ok(image) => self.history.push(image),
                    Err(err) => self.error = Some(format!("Failed to edit image: {err}")),
                }
            }
            JobKind::Batch => {
                let total = self.images.len();
                let mut failed = 0;
                for (slot, result) in self.results.iter_mut().zip(outcome.results) {
                    *slot = match result {
                        Ok(image) => EditResult::Done(image),
                        Err(err) => {
                            failed += 1;
                            EditResult::Failed(err.to_string())
                        }
                    };
                }
                if failed > 0 {
                    self.error = Some(batch_failure_message(failed, total));
                }
            }
            JobKind::Slot(index) => {
                let (Some(slot), Some(result)) =
                    (self.results.get_mut(index), outcome.results.into_iter().next())
                else {
                    log::warn!("slot outcome for missing image {index}");
                    return true;
                };
                *slot = match result {
                    Ok(image) => EditResult::Done(image),
                    Err(err) => {
                        self.error = Some(format!("Failed to edit image {}: {err}", index + 1));
                        EditResult::Failed(err.to_string())
                    }
                };
            }
        }
        true
    }

    pub fn can_undo(&self) -> bool {
        !self.loading && self.mode() == Mode::Single && self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        !self.loading && self.mode() == Mode::Single && self.history.can_redo()
    }

    pub fn undo(&mut self) -> bool {
        self.can_undo() && self.history.undo()
    }

    pub fn redo(&mut self) -> bool {
        self.can_redo() && self.history.redo()
    }

    /// What the main view shows for the selected image.
    pub fn displayed(&self) -> Option<DisplayedImage<'_>> {
        match self.mode() {
            Mode::Empty => None,
            Mode::Single => Some(match self.history.current() {
                Some(edited) => DisplayedImage::Edited(edited),
                None => DisplayedImage::Original(&self.images[0]),
            }),
            Mode::Batch => {
                let index = self.selected.min(self.images.len() - 1);
                Some(match self.results[index].result() {
                    Some(edited) => DisplayedImage::Edited(edited),
                    None => DisplayedImage::Original(&self.images[index]),
                })
            }
        }
    }

    pub fn selected_source(&self) -> Option<&SourceImage> {
        self.images.get(self.selected)
    }

    pub fn batch_summary(&self) -> BatchSummary {
        let mut summary = BatchSummary::default();
        for result in &self.results {
            match result {
                EditResult::Pending => summary.pending += 1,
                EditResult::Done(_) => summary.done += 1,
                EditResult::Failed(_) => summary.failed += 1,
            }
        }
        summary
    }

    /// Ids of every image the session still references.
    pub fn live_image_ids(&self) -> std::collections::HashSet<u64> {
        let sources = self.images.iter().map(|image| image.id);
        let history = self.history.entries().iter().map(|image| image.id);
        let slots = self.results.iter().filter_map(|r| r.result()).map(|image| image.id);
        sources.chain(history).chain(slots).collect()
    }

    /// Marks a job that never reached the dispatcher as finished.
    pub fn abort_generation(&mut self, message: impl Into<String>) {
        self.loading = false;
        self.error = Some(message.into());
    }

    /// Results that can be downloaded, paired with the image they came from.
    pub fn exportable(&self) -> Vec<(usize, &SourceImage, &GeneratedImage)> {
        match self.mode() {
            Mode::Empty => Vec::new(),
            Mode::Single => self
                .history
                .current()
                .map(|edited| vec![(0, &self.images[0], edited)])
                .unwrap_or_default(),
            Mode::Batch => self
                .images
                .iter()
                .zip(&self.results)
                .enumerate()
                .filter_map(|(index, (source, result))| {
                    result.result().map(|edited| (index, source, edited))
                })
                .collect(),
        }
    }
}
