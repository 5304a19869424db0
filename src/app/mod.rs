pub mod canvas;
pub mod dispatcher;
pub mod exporter;
pub mod intake;
mod panels;
pub mod textures;

use std::{collections::VecDeque, path::PathBuf, sync::Arc, time::Duration};

use eframe::{egui, App, Frame};

use crate::{
    config::EditorConfig,
    fs_utils::{edited_file_name, SUPPORTED_EXTENSIONS},
    gemini::ImageEditor,
    image_utils::to_display_image,
    session::{Session, SessionError, CROP_FAILED_MESSAGE, LOAD_FAILED_MESSAGE},
    ui::KeyboardState,
};

use self::{
    canvas::Canvas,
    dispatcher::Dispatcher,
    exporter::{ExportItem, ExportRequest, Exporter},
    intake::{accepts_file, Intake, IntakeEvent, IntakeRequest, IntakeSource, LoadedImage},
    textures::TextureCache,
};

const BACKGROUND_POLL: Duration = Duration::from_millis(100);

pub struct EditorApp {
    pub config: EditorConfig,
    pub session: Session,
    pub prompt: String,
    pub intake: Intake,
    pub dispatcher: Dispatcher,
    pub exporter: Exporter,
    pub canvas: Canvas,
    pub crop_enabled: bool,
    pub aspect_input: String,
    pub download_dir: PathBuf,
    pub status: String,
    /// Uploads waiting for the crop surface, front first.
    crop_queue: VecDeque<LoadedImage>,
    crop_texture: Option<(u64, egui::TextureHandle)>,
    /// Uploads held back until the current generation settles.
    ready: VecDeque<LoadedImage>,
    textures: TextureCache,
    show_original: bool,
}

impl EditorApp {
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        config: EditorConfig,
        editor: Arc<dyn ImageEditor>,
        files: Vec<PathBuf>,
    ) -> Self {
        let _ = cc;
        let mut session = Session::new();
        session.adjustments.aspect_ratio = config.aspect_ratio;

        let mut app = Self {
            crop_enabled: config.crop_on_upload,
            aspect_input: config.aspect_ratio.to_string(),
            download_dir: config.download_dir.clone(),
            config,
            session,
            prompt: String::new(),
            intake: Intake::new(),
            dispatcher: Dispatcher::new(editor),
            exporter: Exporter::new(),
            canvas: Canvas::new(),
            status: String::from("Ready"),
            crop_queue: VecDeque::new(),
            crop_texture: None,
            ready: VecDeque::new(),
            textures: TextureCache::default(),
            show_original: false,
        };
        for path in files {
            app.intake
                .submit(IntakeRequest::add(IntakeSource::Path(path)));
        }
        app
    }

    pub fn is_cropping(&self) -> bool {
        !self.crop_queue.is_empty()
    }

    fn pick_files(&mut self) {
        let Some(paths) = rfd::FileDialog::new()
            .add_filter("Images", SUPPORTED_EXTENSIONS)
            .pick_files()
        else {
            return;
        };
        for path in paths {
            self.intake
                .submit(IntakeRequest::add(IntakeSource::Path(path)));
        }
    }

    fn pick_replacement(&mut self, index: usize) {
        let Some(target) = self.session.images().get(index).map(|image| image.id) else {
            return;
        };
        if let Some(path) = rfd::FileDialog::new()
            .add_filter("Images", SUPPORTED_EXTENSIONS)
            .pick_file()
        {
            self.intake
                .submit(IntakeRequest::replace(IntakeSource::Path(path), target));
        }
    }

    fn pick_download_dir(&mut self) {
        if let Some(dir) = rfd::FileDialog::new()
            .set_directory(&self.download_dir)
            .pick_folder()
        {
            log::info!("downloads now go to {}", dir.display());
            self.download_dir = dir;
        }
    }

    fn handle_dropped_files(&mut self, ctx: &egui::Context) {
        let dropped = ctx.input(|i| i.raw.dropped_files.clone());
        for file in dropped {
            let name = file
                .path
                .as_ref()
                .and_then(|p| p.file_name())
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| file.name.clone());
            if !accepts_file(&name, &file.mime, file.path.as_deref()) {
                log::debug!("ignoring dropped file {name} ({})", file.mime);
                continue;
            }
            let source = match (file.path, file.bytes) {
                (Some(path), _) => IntakeSource::Path(path),
                (None, Some(bytes)) => IntakeSource::Bytes {
                    name,
                    bytes: bytes.to_vec(),
                },
                (None, None) => continue,
            };
            self.intake.submit(IntakeRequest::add(source));
        }
    }

    fn poll_intake(&mut self) {
        for event in self.intake.poll() {
            match event {
                IntakeEvent::Loaded(loaded) => {
                    if self.crop_enabled {
                        self.crop_queue.push_back(loaded);
                    } else {
                        self.ready.push_back(loaded);
                    }
                }
                IntakeEvent::Failed { name, error } => {
                    self.status = format!("Could not load {name}: {error}");
                    self.session.set_error(LOAD_FAILED_MESSAGE);
                }
            }
        }
    }

    /// Moves finished uploads into the session once no edit is running.
    fn commit_ready(&mut self) {
        let mut changed = false;
        while !self.session.is_loading() {
            let Some(loaded) = self.ready.pop_front() else {
                break;
            };
            let LoadedImage {
                source,
                preview,
                replace,
            } = loaded;
            let id = source.id;
            let name = source.name.clone();
            let result = match replace {
                Some(target) => self.session.replace_image_by_id(target, source),
                None => self.session.add_image(source),
            };
            match result {
                Err(SessionError::ImageRemoved) => {
                    log::info!("dropping {name}: the image it was meant to replace is gone");
                    self.status = format!("Skipped {name}: its target was removed");
                }
                Ok(index) => {
                    self.textures.insert_base(id, preview);
                    self.session.select(index);
                    self.status = format!("Added {name} ({} images)", self.session.images().len());
                    changed = true;
                }
                Err(err) => {
                    log::warn!("could not add {name}: {err}");
                    self.session.set_error(err.to_string());
                }
            }
        }
        if changed {
            self.sweep_textures();
        }
    }

    fn sweep_textures(&mut self) {
        self.textures.retain(&self.session.live_image_ids());
    }

    fn current_crop_size(&self) -> Option<(u32, u32)> {
        self.crop_queue
            .front()
            .map(|loaded| (loaded.source.width(), loaded.source.height()))
    }

    fn confirm_crop(&mut self) {
        let Some((width, height)) = self.current_crop_size() else {
            return;
        };
        let Some((x, y, w, h)) = self.canvas.crop_bounds(width, height) else {
            return;
        };
        let Some(loaded) = self.crop_queue.front() else {
            return;
        };
        match loaded.source.crop(x, y, w, h) {
            Ok(cropped) => {
                let replace = loaded.replace;
                self.crop_queue.pop_front();
                let preview = to_display_image(&cropped.image);
                self.ready.push_back(LoadedImage {
                    source: cropped,
                    preview,
                    replace,
                });
                self.finish_crop();
            }
            Err(err) => {
                log::error!("crop of {} failed: {err}", loaded.source.name);
                self.session.set_error(CROP_FAILED_MESSAGE);
            }
        }
    }

    /// Keeps the upload as it is.
    fn skip_crop(&mut self) {
        if let Some(loaded) = self.crop_queue.pop_front() {
            self.ready.push_back(loaded);
            self.finish_crop();
        }
    }

    fn discard_crop(&mut self) {
        if let Some(loaded) = self.crop_queue.pop_front() {
            self.status = format!("Discarded {}", loaded.source.name);
            self.finish_crop();
        }
    }

    fn finish_crop(&mut self) {
        self.canvas.clear();
        self.crop_texture = None;
    }

    /// Texture of the image at the front of the crop queue, starting a fresh selection
    /// whenever the front changes.
    fn crop_texture(&mut self, ctx: &egui::Context) -> Option<egui::TextureHandle> {
        let loaded = self.crop_queue.front()?;
        let id = loaded.source.id;
        if let Some((current, handle)) = &self.crop_texture {
            if *current == id {
                return Some(handle.clone());
            }
        }
        let handle = ctx.load_texture(
            "promptedit-crop",
            loaded.preview.clone(),
            egui::TextureOptions::LINEAR,
        );
        let size = egui::vec2(loaded.source.width() as f32, loaded.source.height() as f32);
        self.canvas
            .reset_for(size, self.session.adjustments.aspect_ratio.value());
        self.crop_texture = Some((id, handle.clone()));
        Some(handle)
    }

    fn start_generation(&mut self) {
        match self.session.prepare_generation(&self.prompt) {
            Ok(job) => {
                self.status = format!("Editing {} image(s)...", job.requests.len());
                if let Err(err) = self.dispatcher.dispatch(job) {
                    log::error!("{err:#}");
                    self.session
                        .abort_generation(format!("Failed to edit image: {err:#}"));
                }
            }
            Err(err) => self.status = err.to_string(),
        }
    }

    fn regenerate(&mut self, index: usize) {
        match self.session.prepare_regeneration(index, &self.prompt) {
            Ok(job) => {
                self.status = format!("Regenerating image {}...", index + 1);
                if let Err(err) = self.dispatcher.dispatch(job) {
                    log::error!("{err:#}");
                    self.session
                        .abort_generation(format!("Failed to edit image {}: {err:#}", index + 1));
                }
            }
            Err(err) => self.session.set_error(err.to_string()),
        }
    }

    fn poll_dispatcher(&mut self) {
        let mut applied = false;
        for outcome in self.dispatcher.check_completions() {
            applied |= self.session.apply_outcome(outcome);
        }
        if applied {
            self.status = match self.session.error() {
                Some(_) => String::from("Edit finished with errors"),
                None => String::from("Edit finished"),
            };
            self.sweep_textures();
        }
    }

    fn poll_exporter(&mut self) {
        for status in self.exporter.check_completions() {
            match status.result {
                Ok(path) => self.status = format!("Saved {}", path.display()),
                Err(err) => self
                    .session
                    .set_error(format!("Failed to save {}: {err:#}", status.file_name)),
            }
        }
    }

    fn export_items(&self, only: Option<usize>) -> Vec<ExportItem> {
        self.session
            .exportable()
            .into_iter()
            .filter(|(index, _, _)| only.map_or(true, |wanted| wanted == *index))
            .map(|(_, source, edited)| ExportItem {
                file_name: edited_file_name(&source.name, edited.mime.extension()),
                bytes: edited.bytes.clone(),
            })
            .collect()
    }

    fn download(&mut self, only: Option<usize>) {
        let items = self.export_items(only);
        if items.is_empty() {
            self.status = String::from("Nothing to download yet");
            return;
        }
        let delay = if only.is_some() {
            Duration::ZERO
        } else {
            self.config.download_delay
        };
        let count = items.len();
        let request = ExportRequest {
            dir: self.download_dir.clone(),
            items,
            delay,
        };
        match self.exporter.queue_export(request) {
            Ok(()) => self.status = format!("Saving {count} file(s)..."),
            Err(err) => self.session.set_error(format!("{err:#}")),
        }
    }

    fn remove_image(&mut self, index: usize) {
        match self.session.remove_image(index) {
            Ok(removed) => {
                self.status = format!("Removed {}", removed.name);
                self.sweep_textures();
            }
            Err(err) => self.session.set_error(err.to_string()),
        }
    }

    fn new_session(&mut self) {
        match self.session.new_session() {
            Ok(()) => {
                self.ready.clear();
                self.status = String::from("Started a new session");
                self.sweep_textures();
            }
            Err(err) => self.session.set_error(err.to_string()),
        }
    }

    fn apply_aspect_input(&mut self) {
        match self.aspect_input.parse() {
            Ok(ratio) => {
                self.session.adjustments.aspect_ratio = ratio;
                self.aspect_input = ratio.to_string();
            }
            Err(err) => self.status = err,
        }
    }

    fn handle_keys(&mut self, ctx: &egui::Context, keys: &KeyboardState) {
        let typing = ctx.wants_keyboard_input();
        if keys.generate && !self.is_cropping() {
            self.start_generation();
        }
        if self.is_cropping() {
            if typing {
                return;
            }
            if keys.confirm {
                self.confirm_crop();
            } else if keys.escape {
                self.skip_crop();
            } else if let Some((width, height)) = self.current_crop_size() {
                let size = egui::vec2(width as f32, height as f32);
                self.canvas.handle_arrow_movement(keys, size);
            }
            return;
        }
        self.show_original = !typing && keys.show_original;
        if typing {
            return;
        }
        if keys.undo {
            self.session.undo();
        }
        if keys.redo {
            self.session.redo();
        }
    }
}

impl App for EditorApp {
    fn update(&mut self, ctx: &egui::Context, frame: &mut Frame) {
        let _ = frame;

        self.poll_intake();
        self.commit_ready();
        self.poll_dispatcher();
        self.poll_exporter();
        self.handle_dropped_files(ctx);

        let keys = ctx.input(KeyboardState::read);
        self.handle_keys(ctx, &keys);

        self.show_header(ctx);
        if self.is_cropping() {
            self.show_crop_view(ctx);
        } else {
            self.show_controls(ctx);
            if self.session.is_batch() {
                self.show_thumbnails(ctx);
            }
            self.show_main_view(ctx);
        }

        let busy = self.intake.is_busy()
            || self.dispatcher.pending > 0
            || !self.exporter.pending_exports.is_empty()
            || !self.ready.is_empty();
        if busy {
            ctx.request_repaint_after(BACKGROUND_POLL);
        }
    }
}
