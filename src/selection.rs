use eframe::egui::{self, Color32, Pos2, Rect, Vec2};

pub const HANDLE_THICKNESS: f32 = 10.0;
pub const MIN_HANDLE_LENGTH: f32 = 20.0;
pub const MAX_HANDLE_LENGTH: f32 = 100.0;

pub const SELECTION_COLOR: Color32 = Color32::from_rgb(34, 211, 238);

/// Crop region in image pixel coordinates.
#[derive(Clone, Debug, PartialEq)]
pub struct Selection {
    pub rect: Rect,
}

impl Selection {
    pub fn from_points(a: Pos2, b: Pos2, bounds: Vec2) -> Self {
        let min = egui::pos2(
            a.x.min(b.x).clamp(0.0, bounds.x),
            a.y.min(b.y).clamp(0.0, bounds.y),
        );
        let max = egui::pos2(
            a.x.max(b.x).clamp(0.0, bounds.x),
            a.y.max(b.y).clamp(0.0, bounds.y),
        );
        let mut selection = Self {
            rect: Rect::from_min_max(min, max),
        };
        selection.clamp_within(bounds);
        selection
    }

    /// Like [`Selection::from_points`], but the rectangle grows from `anchor` with a fixed
    /// width/height ratio and never leaves the image.
    pub fn from_points_with_ratio(anchor: Pos2, pointer: Pos2, bounds: Vec2, ratio: f32) -> Self {
        let delta = pointer - anchor;
        let (dir_x, dir_y) = (delta.x.signum(), delta.y.signum());
        let mut width = delta.x.abs();
        let mut height = delta.y.abs();
        if width / height.max(f32::EPSILON) > ratio {
            width = height * ratio;
        } else {
            height = width / ratio;
        }
        let avail_w = if dir_x >= 0.0 { bounds.x - anchor.x } else { anchor.x };
        let avail_h = if dir_y >= 0.0 { bounds.y - anchor.y } else { anchor.y };
        (width, height) = fit_ratio(width, height, avail_w, avail_h, ratio);
        let corner = anchor + egui::vec2(dir_x * width, dir_y * height);
        Self::from_points(anchor, corner, bounds)
    }

    /// The whole image.
    pub fn full_frame(bounds: Vec2) -> Self {
        Self {
            rect: Rect::from_min_size(Pos2::ZERO, bounds),
        }
    }

    /// Largest centered selection with the given ratio, or the full frame when unconstrained.
    pub fn centered(bounds: Vec2, ratio: Option<f32>) -> Self {
        let Some(ratio) = ratio else {
            return Self::full_frame(bounds);
        };
        let (width, height) = if bounds.x / bounds.y.max(1.0) > ratio {
            (bounds.y * ratio, bounds.y)
        } else {
            (bounds.x, bounds.x / ratio)
        };
        let min = egui::pos2((bounds.x - width) * 0.5, (bounds.y - height) * 0.5);
        Self {
            rect: Rect::from_min_size(min, egui::vec2(width, height)),
        }
    }

    /// Moves the selection without resizing it; the move stops at the image edges.
    pub fn translate(&mut self, delta: Vec2, bounds: Vec2) {
        let dx = delta.x.clamp(-self.rect.min.x, bounds.x - self.rect.max.x);
        let dy = delta.y.clamp(-self.rect.min.y, bounds.y - self.rect.max.y);
        self.rect = self.rect.translate(egui::vec2(dx, dy));
        self.clamp_within(bounds);
    }

    pub fn to_u32_bounds(&self) -> Option<(u32, u32, u32, u32)> {
        let width = self.rect.width();
        let height = self.rect.height();
        if width < 1.0 || height < 1.0 {
            return None;
        }
        let x = self.rect.min.x.max(0.0).round() as u32;
        let y = self.rect.min.y.max(0.0).round() as u32;
        Some((x, y, width.round() as u32, height.round() as u32))
    }

    /// Pixel bounds clipped to an image of `width` x `height`.
    pub fn clipped_bounds(&self, width: u32, height: u32) -> Option<(u32, u32, u32, u32)> {
        let (x, y, w, h) = self.to_u32_bounds()?;
        if x >= width || y >= height {
            return None;
        }
        let w = w.min(width - x);
        let h = h.min(height - y);
        (w > 0 && h > 0).then_some((x, y, w, h))
    }

    pub fn adjusted(mut self, handle: SelectionHandle, delta: Vec2, bounds: Vec2) -> Self {
        if handle.moves_top() {
            self.rect.min.y = (self.rect.min.y + delta.y).clamp(0.0, self.rect.max.y - 1.0);
        }
        if handle.moves_bottom() {
            self.rect.max.y = (self.rect.max.y + delta.y).clamp(self.rect.min.y + 1.0, bounds.y);
        }
        if handle.moves_left() {
            self.rect.min.x = (self.rect.min.x + delta.x).clamp(0.0, self.rect.max.x - 1.0);
        }
        if handle.moves_right() {
            self.rect.max.x = (self.rect.max.x + delta.x).clamp(self.rect.min.x + 1.0, bounds.x);
        }
        self.clamp_within(bounds);
        self
    }

    /// Resizes after a handle drag so that width/height equals `ratio`, keeping the edge
    /// opposite the handle fixed.
    pub fn with_ratio(mut self, handle: SelectionHandle, ratio: f32, bounds: Vec2) -> Self {
        let rect = self.rect;
        let (mut width, mut height) = (rect.width(), rect.height());
        if matches!(handle, SelectionHandle::Top | SelectionHandle::Bottom) {
            width = height * ratio;
        } else {
            height = width / ratio;
        }
        let (anchor_x, dir_x) = if handle.moves_left() {
            (rect.max.x, -1.0)
        } else {
            (rect.min.x, 1.0)
        };
        let (anchor_y, dir_y) = if handle.moves_top() {
            (rect.max.y, -1.0)
        } else {
            (rect.min.y, 1.0)
        };
        let avail_w = if dir_x > 0.0 { bounds.x - anchor_x } else { anchor_x };
        let avail_h = if dir_y > 0.0 { bounds.y - anchor_y } else { anchor_y };
        (width, height) = fit_ratio(width, height, avail_w, avail_h, ratio);
        let anchor = egui::pos2(anchor_x, anchor_y);
        let corner = anchor + egui::vec2(dir_x * width, dir_y * height);
        self.rect = Rect::from_two_pos(anchor, corner);
        self.clamp_within(bounds);
        self
    }

    fn clamp_within(&mut self, bounds: Vec2) {
        let mut min = self.rect.min;
        let mut max = self.rect.max;
        min.x = min.x.clamp(0.0, bounds.x);
        max.x = max.x.clamp(0.0, bounds.x);
        min.y = min.y.clamp(0.0, bounds.y);
        max.y = max.y.clamp(0.0, bounds.y);
        if max.x <= min.x {
            max.x = (min.x + 1.0).min(bounds.x);
            min.x = (max.x - 1.0).max(0.0);
        }
        if max.y <= min.y {
            max.y = (min.y + 1.0).min(bounds.y);
            min.y = (max.y - 1.0).max(0.0);
        }
        self.rect = Rect::from_min_max(min, max);
    }
}

fn fit_ratio(
    mut width: f32,
    mut height: f32,
    avail_w: f32,
    avail_h: f32,
    ratio: f32,
) -> (f32, f32) {
    if width > avail_w {
        width = avail_w;
        height = width / ratio;
    }
    if height > avail_h {
        height = avail_h;
        width = height * ratio;
    }
    (width.max(0.0), height.max(0.0))
}

#[derive(Clone)]
pub struct HandleDrag {
    pub handle: SelectionHandle,
    pub original: Selection,
    pub start_pos: Pos2,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SelectionHandle {
    Top,
    Bottom,
    Left,
    Right,
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl SelectionHandle {
    pub const ALL: [Self; 8] = [
        Self::Top, Self::Bottom, Self::Left, Self::Right,
        Self::TopLeft, Self::TopRight, Self::BottomLeft, Self::BottomRight,
    ];

    /// Corner handles only; side handles would fight a locked ratio.
    pub const CORNERS: [Self; 4] = [
        Self::TopLeft, Self::TopRight, Self::BottomLeft, Self::BottomRight,
    ];

    fn moves_top(self) -> bool {
        matches!(self, Self::Top | Self::TopLeft | Self::TopRight)
    }

    fn moves_bottom(self) -> bool {
        matches!(self, Self::Bottom | Self::BottomLeft | Self::BottomRight)
    }

    fn moves_left(self) -> bool {
        matches!(self, Self::Left | Self::TopLeft | Self::BottomLeft)
    }

    fn moves_right(self) -> bool {
        matches!(self, Self::Right | Self::TopRight | Self::BottomRight)
    }

    pub fn id_suffix(self) -> &'static str {
        match self {
            Self::Top => "handle_top",
            Self::Bottom => "handle_bottom",
            Self::Left => "handle_left",
            Self::Right => "handle_right",
            Self::TopLeft => "handle_top_left",
            Self::TopRight => "handle_top_right",
            Self::BottomLeft => "handle_bottom_left",
            Self::BottomRight => "handle_bottom_right",
        }
    }

    pub fn handle_rect(self, selection: Rect) -> Rect {
        let corner_size = egui::vec2(HANDLE_THICKNESS, HANDLE_THICKNESS);
        let horizontal = egui::vec2(
            selection.width().clamp(MIN_HANDLE_LENGTH, MAX_HANDLE_LENGTH),
            HANDLE_THICKNESS,
        );
        let vertical = egui::vec2(
            HANDLE_THICKNESS,
            selection.height().clamp(MIN_HANDLE_LENGTH, MAX_HANDLE_LENGTH),
        );
        match self {
            Self::Top => Rect::from_center_size(
                egui::pos2(selection.center().x, selection.min.y),
                horizontal,
            ),
            Self::Bottom => Rect::from_center_size(
                egui::pos2(selection.center().x, selection.max.y),
                horizontal,
            ),
            Self::Left => Rect::from_center_size(
                egui::pos2(selection.min.x, selection.center().y),
                vertical,
            ),
            Self::Right => Rect::from_center_size(
                egui::pos2(selection.max.x, selection.center().y),
                vertical,
            ),
            Self::TopLeft => Rect::from_center_size(selection.min, corner_size),
            Self::TopRight => Rect::from_center_size(selection.right_top(), corner_size),
            Self::BottomLeft => Rect::from_center_size(selection.left_bottom(), corner_size),
            Self::BottomRight => Rect::from_center_size(selection.max, corner_size),
        }
    }
}
