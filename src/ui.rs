use eframe::egui::{self, emath::RectTransform, Pos2, Rect, Vec2};

use crate::selection::Selection;

pub const ARROW_MOVE_STEP: f32 = 2.0;

/// Maps between screen space and image pixels for an image fitted into a canvas.
pub struct ImageMetrics {
    pub image_rect: Rect,
    pub image_size: Vec2,
    pub scale: f32,
}

impl ImageMetrics {
    pub fn new(canvas: Rect, image_size: Vec2) -> Self {
        let (display, scale) = fit_within(image_size, canvas.size());
        Self {
            image_rect: centered_rect(canvas, display),
            image_size,
            scale,
        }
    }

    fn image_to_screen(&self) -> RectTransform {
        let pixels = Rect::from_min_size(Pos2::ZERO, self.image_size.max(Vec2::splat(1.0)));
        RectTransform::from_to(pixels, self.image_rect)
    }

    /// Pixel coordinate under `pos`, clamped to the image.
    pub fn screen_to_image(&self, pos: Pos2) -> Pos2 {
        self.image_to_screen()
            .inverse()
            .transform_pos(pos)
            .clamp(Pos2::ZERO, self.image_size.to_pos2())
    }

    pub fn selection_rect(&self, selection: &Selection) -> Rect {
        self.image_to_screen().transform_rect(selection.rect)
    }
}

/// Largest uniformly scaled size of `image_size` inside `available`, with the scale used.
pub fn fit_within(image_size: Vec2, available: Vec2) -> (Vec2, f32) {
    let image_size = image_size.max(Vec2::splat(1.0));
    let scale = (available / image_size).min_elem().max(0.01);
    (image_size * scale, scale)
}

/// Centers a box of `size` inside `outer`.
pub fn centered_rect(outer: Rect, size: Vec2) -> Rect {
    Rect::from_center_size(outer.center(), size)
}

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyboardState {
    pub confirm: bool,
    pub escape: bool,
    pub generate: bool,
    pub undo: bool,
    pub redo: bool,
    pub show_original: bool,
    pub move_up: bool,
    pub move_down: bool,
    pub move_left: bool,
    pub move_right: bool,
}

impl KeyboardState {
    pub fn read(input: &egui::InputState) -> Self {
        let command = input.modifiers.command;
        let shift = input.modifiers.shift;
        let z = input.key_pressed(egui::Key::Z);
        Self {
            confirm: input.key_pressed(egui::Key::Enter) && !command,
            escape: input.key_pressed(egui::Key::Escape),
            generate: input.key_pressed(egui::Key::Enter) && command,
            undo: command && z && !shift,
            redo: command && ((z && shift) || input.key_pressed(egui::Key::Y)),
            show_original: input.key_down(egui::Key::O) && !command,
            move_up: input.key_down(egui::Key::ArrowUp),
            move_down: input.key_down(egui::Key::ArrowDown),
            move_left: input.key_down(egui::Key::ArrowLeft),
            move_right: input.key_down(egui::Key::ArrowRight),
        }
    }

    pub fn arrow_delta(&self) -> Vec2 {
        let mut delta = Vec2::ZERO;
        if self.move_up {
            delta.y -= ARROW_MOVE_STEP;
        }
        if self.move_down {
            delta.y += ARROW_MOVE_STEP;
        }
        if self.move_left {
            delta.x -= ARROW_MOVE_STEP;
        }
        if self.move_right {
            delta.x += ARROW_MOVE_STEP;
        }
        delta
    }
}
