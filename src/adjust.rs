//! Display-time adjustments. Nothing here touches stored image bytes.

use std::{fmt, str::FromStr};

use eframe::egui::{self, Color32, Rect, Vec2};

pub const NEUTRAL_PERCENT: u32 = 100;
pub const MAX_PERCENT: u32 = 200;

#[derive(Copy, Clone, PartialEq, Eq, Debug, Default, Hash)]
pub enum Filter {
    #[default]
    None,
    Grayscale,
    Sepia,
    Invert,
}

impl Filter {
    pub const ALL: [Self; 4] = [Self::None, Self::Grayscale, Self::Sepia, Self::Invert];

    pub fn label(self) -> &'static str {
        match self {
            Filter::None => "None",
            Filter::Grayscale => "Grayscale",
            Filter::Sepia => "Sepia",
            Filter::Invert => "Invert",
        }
    }
}

#[derive(Copy, Clone, PartialEq, Debug, Default)]
pub enum AspectRatio {
    #[default]
    Free,
    Ratio { width: f32, height: f32 },
}

impl AspectRatio {
    pub const PRESETS: [&'static str; 6] = ["free", "1:1", "4:3", "3:4", "16:9", "9:16"];

    /// Width over height, `None` when unconstrained.
    pub fn value(self) -> Option<f32> {
        match self {
            AspectRatio::Free => None,
            AspectRatio::Ratio { width, height } => Some(width / height),
        }
    }

    /// Largest box of this ratio that fits in `available`. Free ratios use the whole area.
    pub fn display_box(self, available: Vec2) -> Vec2 {
        let Some(ratio) = self.value() else {
            return available;
        };
        if available.x / available.y.max(1.0) > ratio {
            egui::vec2(available.y * ratio, available.y)
        } else {
            egui::vec2(available.x, available.x / ratio)
        }
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AspectRatio::Free => f.write_str("free"),
            AspectRatio::Ratio { width, height } => write!(f, "{width}:{height}"),
        }
    }
}

impl FromStr for AspectRatio {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("free") || s.eq_ignore_ascii_case("original") {
            return Ok(AspectRatio::Free);
        }
        let (w, h) = s
            .split_once(':')
            .ok_or_else(|| format!("aspect ratio must look like W:H, got {s:?}"))?;
        let width: f32 = w
            .trim()
            .parse()
            .map_err(|_| format!("invalid aspect width {w:?}"))?;
        let height: f32 = h
            .trim()
            .parse()
            .map_err(|_| format!("invalid aspect height {h:?}"))?;
        if !(width.is_finite() && height.is_finite()) || width <= 0.0 || height <= 0.0 {
            return Err(format!("aspect ratio sides must be positive, got {s:?}"));
        }
        let ratio = width / height;
        if !ratio.is_finite() || ratio <= 0.0 {
            return Err(format!("aspect ratio {s:?} is out of range"));
        }
        Ok(AspectRatio::Ratio { width, height })
    }
}

/// UV rectangle that fills `display` with the image, cropping the overflow evenly.
pub fn cover_uv(image_size: Vec2, display: Vec2) -> Rect {
    let image_ratio = image_size.x.max(1.0) / image_size.y.max(1.0);
    let display_ratio = display.x.max(1.0) / display.y.max(1.0);
    if image_ratio > display_ratio {
        let visible = display_ratio / image_ratio;
        let margin = (1.0 - visible) * 0.5;
        Rect::from_min_max(egui::pos2(margin, 0.0), egui::pos2(1.0 - margin, 1.0))
    } else {
        let visible = image_ratio / display_ratio;
        let margin = (1.0 - visible) * 0.5;
        Rect::from_min_max(egui::pos2(0.0, margin), egui::pos2(1.0, 1.0 - margin))
    }
}

#[derive(Copy, Clone, PartialEq, Debug)]
pub struct Adjustments {
    pub brightness: u32,
    pub contrast: u32,
    pub filter: Filter,
    pub aspect_ratio: AspectRatio,
}

impl Default for Adjustments {
    fn default() -> Self {
        Self {
            brightness: NEUTRAL_PERCENT,
            contrast: NEUTRAL_PERCENT,
            filter: Filter::None,
            aspect_ratio: AspectRatio::Free,
        }
    }
}

impl Adjustments {
    pub fn is_identity(&self) -> bool {
        self.brightness == NEUTRAL_PERCENT
            && self.contrast == NEUTRAL_PERCENT
            && self.filter == Filter::None
    }

    /// Resets the pixel adjustments, leaving the aspect ratio alone.
    pub fn reset_filters(&mut self) {
        self.brightness = NEUTRAL_PERCENT;
        self.contrast = NEUTRAL_PERCENT;
        self.filter = Filter::None;
    }

    pub fn apply_to_pixel(&self, pixel: Color32) -> Color32 {
        let [r, g, b, a] = pixel.to_srgba_unmultiplied();
        let brightness = self.brightness.min(MAX_PERCENT) as f32 / 100.0;
        let contrast = self.contrast.min(MAX_PERCENT) as f32 / 100.0;
        // each stage clamps to [0, 1] before the next one sees it
        let tone = |c: u8| {
            let c = (c as f32 / 255.0 * brightness).clamp(0.0, 1.0);
            ((c - 0.5) * contrast + 0.5).clamp(0.0, 1.0)
        };
        let (r, g, b) = (tone(r), tone(g), tone(b));
        let (r, g, b) = match self.filter {
            Filter::None => (r, g, b),
            Filter::Grayscale => {
                let luma = 0.2126 * r + 0.7152 * g + 0.0722 * b;
                (luma, luma, luma)
            }
            Filter::Sepia => (
                0.393 * r + 0.769 * g + 0.189 * b,
                0.349 * r + 0.686 * g + 0.168 * b,
                0.272 * r + 0.534 * g + 0.131 * b,
            ),
            Filter::Invert => (1.0 - r, 1.0 - g, 1.0 - b),
        };
        let to_u8 = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        Color32::from_rgba_unmultiplied(to_u8(r), to_u8(g), to_u8(b), a)
    }

    /// Returns an adjusted copy for rendering.
    pub fn apply(&self, image: &egui::ColorImage) -> egui::ColorImage {
        let mut out = image.clone();
        if self.is_identity() {
            return out;
        }
        for pixel in &mut out.pixels {
            *pixel = self.apply_to_pixel(*pixel);
        }
        out
    }
}
