use eframe::egui::{self, Color32};

use crate::{
    selection::{HandleDrag, Selection, SelectionHandle, SELECTION_COLOR},
    ui::{ImageMetrics, KeyboardState},
};

/// Interactive crop surface. Coordinates are image pixels.
pub struct Canvas {
    pub selection: Option<Selection>,
    pub selection_anchor: Option<egui::Pos2>,
    pub active_handle: Option<HandleDrag>,
    /// Width over height to keep while dragging, `None` for free cropping.
    pub ratio: Option<f32>,
}

impl Canvas {
    pub fn new() -> Self {
        Self {
            selection: None,
            selection_anchor: None,
            active_handle: None,
            ratio: None,
        }
    }

    pub fn clear(&mut self) {
        self.selection = None;
        self.selection_anchor = None;
        self.active_handle = None;
    }

    /// Starts a crop of an image of `image_size` with the largest selection `ratio` allows.
    pub fn reset_for(&mut self, image_size: egui::Vec2, ratio: Option<f32>) {
        self.clear();
        self.ratio = ratio;
        self.selection = Some(Selection::centered(image_size, ratio));
    }

    pub fn handle_pointer(
        &mut self,
        response: &egui::Response,
        metrics: &ImageMetrics,
        image_size: egui::Vec2,
    ) {
        if self.active_handle.is_some() {
            return;
        }
        if response.drag_started() {
            if let Some(pointer) = response.interact_pointer_pos() {
                let image_pos = metrics.screen_to_image(pointer);
                self.selection_anchor = Some(image_pos);
                self.selection = Some(Selection::from_points(image_pos, image_pos, image_size));
            }
        } else if response.dragged() {
            if let (Some(anchor), Some(pointer)) =
                (self.selection_anchor, response.interact_pointer_pos())
            {
                let image_pos = metrics.screen_to_image(pointer);
                self.selection = Some(match self.ratio {
                    Some(ratio) => {
                        Selection::from_points_with_ratio(anchor, image_pos, image_size, ratio)
                    }
                    None => Selection::from_points(anchor, image_pos, image_size),
                });
            }
        } else if response.drag_stopped() {
            self.selection_anchor = None;
        }
    }

    pub fn handle_arrow_movement(&mut self, keys: &KeyboardState, image_size: egui::Vec2) {
        let Some(selection) = self.selection.as_mut() else {
            return;
        };
        let delta = keys.arrow_delta();
        if delta == egui::Vec2::ZERO {
            return;
        }
        selection.translate(delta, image_size);
    }

    pub fn draw(
        &mut self,
        ui: &egui::Ui,
        painter: &egui::Painter,
        metrics: &ImageMetrics,
        image_size: egui::Vec2,
    ) {
        self.draw_selection(painter, metrics);
        self.draw_handles(ui, painter, metrics, image_size);
    }

    fn draw_selection(&self, painter: &egui::Painter, metrics: &ImageMetrics) {
        let Some(selection) = &self.selection else {
            return;
        };
        let rect = metrics.selection_rect(selection);
        // dim everything outside the crop
        let shade = Color32::from_black_alpha(140);
        let outer = metrics.image_rect;
        for band in [
            egui::Rect::from_min_max(outer.min, egui::pos2(outer.max.x, rect.min.y)),
            egui::Rect::from_min_max(egui::pos2(outer.min.x, rect.max.y), outer.max),
            egui::Rect::from_min_max(
                egui::pos2(outer.min.x, rect.min.y),
                egui::pos2(rect.min.x, rect.max.y),
            ),
            egui::Rect::from_min_max(
                egui::pos2(rect.max.x, rect.min.y),
                egui::pos2(outer.max.x, rect.max.y),
            ),
        ] {
            if band.is_positive() {
                painter.rect_filled(band, 0.0, shade);
            }
        }
        painter.rect_stroke(
            rect,
            0.0,
            egui::Stroke::new(2.0, SELECTION_COLOR),
            egui::StrokeKind::Middle,
        );
    }

    fn draw_handles(
        &mut self,
        ui: &egui::Ui,
        painter: &egui::Painter,
        metrics: &ImageMetrics,
        image_size: egui::Vec2,
    ) {
        let Some(current_selection) = self.selection.clone() else {
            return;
        };
        let handle_color = Color32::from_rgba_unmultiplied(
            SELECTION_COLOR.r(),
            SELECTION_COLOR.g(),
            SELECTION_COLOR.b(),
            200,
        );
        let handles: &[SelectionHandle] = if self.ratio.is_some() {
            &SelectionHandle::CORNERS
        } else {
            &SelectionHandle::ALL
        };

        for &handle in handles {
            let screen_rect = metrics.selection_rect(&current_selection);
            let handle_rect = handle.handle_rect(screen_rect);
            painter.rect_filled(handle_rect, 2.0, handle_color);
            let response = ui.interact(
                handle_rect,
                ui.id().with(handle.id_suffix()),
                egui::Sense::click_and_drag(),
            );
            if response.drag_started() {
                if let Some(pointer_pos) = response.interact_pointer_pos() {
                    self.active_handle = Some(HandleDrag {
                        handle,
                        original: current_selection.clone(),
                        start_pos: pointer_pos,
                    });
                }
            }
            if response.dragged() {
                if let (Some(active), Some(pointer_pos)) =
                    (&self.active_handle, response.interact_pointer_pos())
                {
                    if active.handle == handle {
                        let total_delta = pointer_pos - active.start_pos;
                        let delta = total_delta / metrics.scale;
                        let mut adjusted =
                            active.original.clone().adjusted(handle, delta, image_size);
                        if let Some(ratio) = self.ratio {
                            adjusted = adjusted.with_ratio(handle, ratio, image_size);
                        }
                        self.selection = Some(adjusted);
                    }
                }
            }
            if response.drag_stopped() {
                self.active_handle = None;
            }
        }
    }

    /// Pixel region to crop, clipped to the image.
    pub fn crop_bounds(&self, width: u32, height: u32) -> Option<(u32, u32, u32, u32)> {
        self.selection.as_ref()?.clipped_bounds(width, height)
    }
}

impl Default for Canvas {
    fn default() -> Self {
        Self::new()
    }
}
