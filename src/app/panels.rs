use eframe::egui::{self, Color32};

use crate::{
    adjust::{cover_uv, AspectRatio, Filter, MAX_PERCENT},
    presets::{ENHANCER_PRESETS, PROMPT_PRESETS},
    selection::SELECTION_COLOR,
    session::{DisplayedImage, EditResult, Mode},
    ui::{centered_rect, fit_within, ImageMetrics},
};

use super::EditorApp;

const ERROR_COLOR: Color32 = Color32::from_rgb(239, 68, 68);
const THUMBNAIL_SIZE: egui::Vec2 = egui::vec2(120.0, 90.0);

enum SlotAction {
    Select(usize),
    Regenerate(usize),
    Download(usize),
    Replace(usize),
    Remove(usize),
}

fn draw_label(
    painter: &egui::Painter,
    pos: egui::Pos2,
    align: egui::Align2,
    text: String,
    font: egui::FontId,
    color: Color32,
) {
    let galley = painter.layout_no_wrap(text, font, color);
    let rect = align.anchor_size(pos, galley.size());
    painter.rect_filled(rect.expand(4.0), 4.0, Color32::from_black_alpha(178));
    painter.galley(rect.min, galley, Color32::WHITE);
}

impl EditorApp {
    pub(super) fn show_header(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("header").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading("Prompt Edit");
                ui.separator();
                if ui.button("Add images…").clicked() {
                    self.pick_files();
                }
                let can_reset = !self.session.is_loading() && !self.session.images().is_empty();
                if ui
                    .add_enabled(can_reset, egui::Button::new("New session"))
                    .clicked()
                {
                    self.new_session();
                }
                ui.checkbox(&mut self.crop_enabled, "Crop on upload");
                if self.intake.is_busy() {
                    ui.separator();
                    ui.add(egui::Spinner::new());
                    ui.label(format!("Loading {} image(s)…", self.intake.in_flight));
                }
            });
        });
    }

    pub(super) fn show_controls(&mut self, ctx: &egui::Context) {
        egui::SidePanel::left("controls")
            .resizable(true)
            .default_width(320.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    self.prompt_section(ui);
                    ui.separator();
                    self.history_section(ui);
                    ui.separator();
                    self.adjustment_section(ui);
                    ui.separator();
                    self.download_section(ui);
                });
            });
    }

    fn prompt_section(&mut self, ui: &mut egui::Ui) {
        ui.heading("Edit");
        ui.add(
            egui::TextEdit::multiline(&mut self.prompt)
                .hint_text("Describe the edit, e.g. \"Remove the background\"")
                .desired_rows(3)
                .desired_width(f32::INFINITY),
        );

        ui.horizontal_wrapped(|ui| {
            for preset in PROMPT_PRESETS {
                let hover = format!("{}: {}", preset.category.label(), preset.text);
                if ui.small_button(preset.label).on_hover_text(hover).clicked() {
                    self.prompt = preset.text.to_string();
                }
            }
        });

        let enhancer_label = self
            .session
            .enhancer
            .and_then(|index| ENHANCER_PRESETS.get(index))
            .map_or("None", |preset| preset.label);
        egui::ComboBox::from_label("Enhancer")
            .selected_text(enhancer_label)
            .show_ui(ui, |ui| {
                ui.selectable_value(&mut self.session.enhancer, None, "None");
                for (index, preset) in ENHANCER_PRESETS.iter().enumerate() {
                    ui.selectable_value(&mut self.session.enhancer, Some(index), preset.label)
                        .on_hover_text(preset.suffix);
                }
            });

        if !self.prompt.trim().is_empty() {
            ui.label(
                egui::RichText::new(self.session.compose_prompt(&self.prompt))
                    .small()
                    .weak(),
            );
        }

        ui.horizontal(|ui| {
            let label = if self.session.is_batch() {
                format!("Generate all ({})", self.session.images().len())
            } else {
                String::from("Generate")
            };
            let enabled = self.session.can_generate(&self.prompt);
            if ui
                .add_enabled(enabled, egui::Button::new(label))
                .on_hover_text("Ctrl+Enter")
                .clicked()
            {
                self.start_generation();
            }
            if self.session.is_loading() {
                ui.add(egui::Spinner::new());
            }
        });

        if let Some(error) = self.session.error() {
            ui.colored_label(ERROR_COLOR, error);
        }
    }

    fn history_section(&mut self, ui: &mut egui::Ui) {
        match self.session.mode() {
            Mode::Empty => {}
            Mode::Single => {
                ui.horizontal(|ui| {
                    if ui
                        .add_enabled(self.session.can_undo(), egui::Button::new("Undo"))
                        .on_hover_text("Ctrl+Z")
                        .clicked()
                    {
                        self.session.undo();
                    }
                    if ui
                        .add_enabled(self.session.can_redo(), egui::Button::new("Redo"))
                        .on_hover_text("Ctrl+Shift+Z")
                        .clicked()
                    {
                        self.session.redo();
                    }
                    let history = self.session.history();
                    if history.is_empty() {
                        ui.label("No edits yet");
                    } else if history.cursor() < 0 {
                        ui.label(format!("Original (0 of {})", history.len()));
                    } else {
                        ui.label(format!("Edit {} of {}", history.cursor() + 1, history.len()));
                    }
                });
            }
            Mode::Batch => {
                let summary = self.session.batch_summary();
                ui.label(format!(
                    "{} edited, {} failed, {} waiting",
                    summary.done, summary.failed, summary.pending
                ));
                ui.label(
                    egui::RichText::new("Undo is not available with multiple images.")
                        .small()
                        .weak(),
                );
            }
        }
    }

    fn adjustment_section(&mut self, ui: &mut egui::Ui) {
        ui.heading("Display");
        let adjustments = &mut self.session.adjustments;
        ui.add(
            egui::Slider::new(&mut adjustments.brightness, 0..=MAX_PERCENT)
                .suffix("%")
                .text("Brightness"),
        );
        ui.add(
            egui::Slider::new(&mut adjustments.contrast, 0..=MAX_PERCENT)
                .suffix("%")
                .text("Contrast"),
        );
        ui.horizontal_wrapped(|ui| {
            for filter in Filter::ALL {
                ui.selectable_value(&mut adjustments.filter, filter, filter.label());
            }
        });

        let mut picked = None;
        egui::ComboBox::from_label("Aspect ratio")
            .selected_text(adjustments.aspect_ratio.to_string())
            .show_ui(ui, |ui| {
                for preset in AspectRatio::PRESETS {
                    if let Ok(ratio) = preset.parse::<AspectRatio>() {
                        if ui
                            .selectable_label(adjustments.aspect_ratio == ratio, preset)
                            .clicked()
                        {
                            picked = Some(ratio);
                        }
                    }
                }
            });
        if let Some(ratio) = picked {
            adjustments.aspect_ratio = ratio;
            self.aspect_input = ratio.to_string();
        }

        ui.horizontal(|ui| {
            let response = ui.add(
                egui::TextEdit::singleline(&mut self.aspect_input)
                    .hint_text("W:H")
                    .desired_width(80.0),
            );
            let submitted =
                response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
            if ui.button("Apply").clicked() || submitted {
                self.apply_aspect_input();
            }
        });

        if ui
            .add_enabled(
                !self.session.adjustments.is_identity(),
                egui::Button::new("Reset adjustments"),
            )
            .clicked()
        {
            self.session.adjustments.reset_filters();
        }
        ui.label(egui::RichText::new("Hold O to compare with the original.").small().weak());
    }

    fn download_section(&mut self, ui: &mut egui::Ui) {
        ui.heading("Download");
        let available = self.session.exportable().len();
        ui.horizontal(|ui| {
            if self.session.is_batch() {
                let label = format!("Download all ({available})");
                if ui
                    .add_enabled(available > 0, egui::Button::new(label))
                    .clicked()
                {
                    self.download(None);
                }
            } else if ui
                .add_enabled(available > 0, egui::Button::new("Download"))
                .clicked()
            {
                self.download(None);
            }
            if ui.button("Folder…").clicked() {
                self.pick_download_dir();
            }
        });
        ui.label(egui::RichText::new(self.download_dir.display().to_string()).small());
        let pending = self.exporter.pending_exports.len();
        if pending > 0 {
            ui.horizontal(|ui| {
                ui.add(egui::Spinner::new());
                ui.label(format!("Saving {pending} file(s)…"));
            });
        }
    }

    pub(super) fn show_thumbnails(&mut self, ctx: &egui::Context) {
        let mut actions = Vec::new();
        egui::TopBottomPanel::bottom("thumbnails")
            .resizable(false)
            .show(ctx, |ui| {
                egui::ScrollArea::horizontal().show(ui, |ui| {
                    ui.horizontal(|ui| {
                        let busy = self.session.is_loading();
                        let selected = self.session.selected();
                        for (index, (source, slot)) in self
                            .session
                            .images()
                            .iter()
                            .zip(self.session.results())
                            .enumerate()
                        {
                            ui.vertical(|ui| {
                                let (id, image) = match slot {
                                    EditResult::Done(edited) => (edited.id, &edited.image),
                                    _ => (source.id, &source.image),
                                };
                                let texture = self.textures.thumbnail(ctx, id, image);
                                let (size, _) = fit_within(texture.size_vec2(), THUMBNAIL_SIZE);
                                let response = ui.add(
                                    egui::Image::new(egui::load::SizedTexture::new(
                                        texture.id(),
                                        size,
                                    ))
                                    .sense(egui::Sense::click()),
                                );
                                if response.clicked() {
                                    actions.push(SlotAction::Select(index));
                                }
                                if index == selected {
                                    ui.painter().rect_stroke(
                                        response.rect.expand(2.0),
                                        4.0,
                                        egui::Stroke::new(2.0, SELECTION_COLOR),
                                        egui::StrokeKind::Outside,
                                    );
                                }
                                match slot {
                                    EditResult::Pending if busy => {
                                        ui.add(egui::Spinner::new().size(12.0));
                                    }
                                    EditResult::Pending => {
                                        ui.label(egui::RichText::new("Original").small());
                                    }
                                    EditResult::Done(_) => {
                                        ui.label(egui::RichText::new("Edited").small());
                                    }
                                    EditResult::Failed(message) => {
                                        ui.colored_label(ERROR_COLOR, "Failed")
                                            .on_hover_text(message);
                                    }
                                }
                                ui.horizontal(|ui| {
                                    if ui
                                        .add_enabled(!busy, egui::Button::new("Retry").small())
                                        .on_hover_text("Regenerate this image")
                                        .clicked()
                                    {
                                        actions.push(SlotAction::Regenerate(index));
                                    }
                                    if ui
                                        .add_enabled(
                                            slot.result().is_some(),
                                            egui::Button::new("Save").small(),
                                        )
                                        .on_hover_text("Download this result")
                                        .clicked()
                                    {
                                        actions.push(SlotAction::Download(index));
                                    }
                                    if ui
                                        .add_enabled(!busy, egui::Button::new("Replace").small())
                                        .on_hover_text("Pick a different image")
                                        .clicked()
                                    {
                                        actions.push(SlotAction::Replace(index));
                                    }
                                    if ui
                                        .add_enabled(!busy, egui::Button::new("Remove").small())
                                        .on_hover_text("Remove from the session")
                                        .clicked()
                                    {
                                        actions.push(SlotAction::Remove(index));
                                    }
                                });
                            });
                        }
                    });
                });
            });

        for action in actions {
            match action {
                SlotAction::Select(index) => {
                    self.session.select(index);
                }
                SlotAction::Regenerate(index) => self.regenerate(index),
                SlotAction::Download(index) => self.download(Some(index)),
                SlotAction::Replace(index) => self.pick_replacement(index),
                SlotAction::Remove(index) => {
                    self.remove_image(index);
                    // indices after a removal are stale
                    break;
                }
            }
        }
    }

    pub(super) fn show_main_view(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            let (response, painter) =
                ui.allocate_painter(ui.available_size(), egui::Sense::hover());
            painter.rect_filled(response.rect, 0.0, Color32::from_gray(24));

            let displayed = if self.show_original {
                self.session
                    .selected_source()
                    .map(DisplayedImage::Original)
            } else {
                self.session.displayed()
            };
            let Some(displayed) = displayed else {
                let hint = if self.intake.is_busy() {
                    "Loading…"
                } else {
                    "Drop images here or use \"Add images…\""
                };
                painter.text(
                    response.rect.center(),
                    egui::Align2::CENTER_CENTER,
                    hint,
                    egui::FontId::proportional(24.0),
                    Color32::from_gray(200),
                );
                return;
            };

            let texture = self.textures.main(
                ctx,
                displayed.id(),
                displayed.dynamic_image(),
                &self.session.adjustments,
            );
            let texture_size = texture.size_vec2();
            let (target, uv) = match self.session.adjustments.aspect_ratio {
                AspectRatio::Free => {
                    let (size, _) = fit_within(texture_size, response.rect.size());
                    (
                        centered_rect(response.rect, size),
                        egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                    )
                }
                ratio => {
                    let size = ratio.display_box(response.rect.size());
                    (
                        centered_rect(response.rect, size),
                        cover_uv(texture_size, size),
                    )
                }
            };
            painter.image(texture.id(), target, uv, Color32::WHITE);

            let caption = match displayed {
                DisplayedImage::Original(source) => format!("Original · {}", source.name),
                DisplayedImage::Edited(edited) => format!("Edited · {}", edited.mime),
            };
            draw_label(
                &painter,
                target.left_top() + egui::vec2(10.0, 10.0),
                egui::Align2::LEFT_TOP,
                caption,
                egui::FontId::proportional(16.0),
                if displayed.is_edited() {
                    SELECTION_COLOR
                } else {
                    Color32::WHITE
                },
            );

            if self.session.is_loading() {
                painter.rect_filled(target, 0.0, Color32::from_black_alpha(140));
                let spinner_rect =
                    egui::Rect::from_center_size(target.center(), egui::vec2(40.0, 40.0));
                egui::Spinner::new().size(40.0).paint_at(ui, spinner_rect);
                draw_label(
                    &painter,
                    target.center() + egui::vec2(0.0, 36.0),
                    egui::Align2::CENTER_TOP,
                    String::from("Gemini is thinking..."),
                    egui::FontId::proportional(18.0),
                    Color32::WHITE,
                );
            }

            draw_label(
                &painter,
                response.rect.left_bottom() + egui::vec2(12.0, -12.0),
                egui::Align2::LEFT_BOTTOM,
                self.status.clone(),
                egui::FontId::monospace(14.0),
                Color32::WHITE,
            );
            draw_label(
                &painter,
                response.rect.right_bottom() + egui::vec2(-12.0, -12.0),
                egui::Align2::RIGHT_BOTTOM,
                "Ctrl+Enter: Generate | Ctrl+Z/Ctrl+Shift+Z: Undo/Redo | O: Original".to_string(),
                egui::FontId::monospace(14.0),
                Color32::from_gray(200),
            );
        });
    }

    pub(super) fn show_crop_view(&mut self, ctx: &egui::Context) {
        let queued = self.crop_queue.len();
        let Some(texture) = self.crop_texture(ctx) else {
            return;
        };
        let Some((width, height)) = self.current_crop_size() else {
            return;
        };
        let name = self
            .crop_queue
            .front()
            .map(|loaded| loaded.source.name.clone())
            .unwrap_or_default();
        let image_size = egui::vec2(width as f32, height as f32);

        egui::TopBottomPanel::bottom("crop-actions").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label(format!("Cropping {name} ({queued} queued)"));
                ui.separator();
                if ui
                    .add_enabled(self.canvas.selection.is_some(), egui::Button::new("Crop"))
                    .on_hover_text("Enter")
                    .clicked()
                {
                    self.confirm_crop();
                }
                if ui
                    .button("Use full image")
                    .on_hover_text("Esc")
                    .clicked()
                {
                    self.skip_crop();
                }
                if ui.button("Discard").clicked() {
                    self.discard_crop();
                }
                if let Some((_, _, w, h)) = self.canvas.crop_bounds(width, height) {
                    ui.separator();
                    ui.label(format!("{w}×{h}"));
                }
                if let Some(error) = self.session.error() {
                    ui.colored_label(ERROR_COLOR, error);
                }
            });
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            let (response, painter) =
                ui.allocate_painter(ui.available_size(), egui::Sense::hover());
            painter.rect_filled(response.rect, 0.0, Color32::BLACK);

            let metrics = ImageMetrics::new(response.rect, image_size);
            painter.image(
                texture.id(),
                metrics.image_rect,
                egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                Color32::WHITE,
            );
            let image_response = ui.interact(
                metrics.image_rect,
                ui.id().with("crop-image"),
                egui::Sense::click_and_drag(),
            );
            self.canvas
                .handle_pointer(&image_response, &metrics, image_size);
            self.canvas.draw(ui, &painter, &metrics, image_size);

            draw_label(
                &painter,
                response.rect.right_bottom() + egui::vec2(-12.0, -12.0),
                egui::Align2::RIGHT_BOTTOM,
                "Drag to select | Arrows: Move | Enter: Crop | Esc: Use full image".to_string(),
                egui::FontId::monospace(14.0),
                Color32::from_gray(200),
            );
        });
    }
}
