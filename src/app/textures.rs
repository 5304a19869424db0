use std::collections::{HashMap, HashSet};

use eframe::egui;
use image::DynamicImage;

use crate::{
    adjust::{Adjustments, AspectRatio},
    image_utils::{to_display_image, to_thumbnail_image},
};

struct MainTexture {
    id: u64,
    adjustments: Adjustments,
    handle: egui::TextureHandle,
}

/// GPU textures keyed by image id. The main view texture carries the display adjustments;
/// thumbnails never do.
#[derive(Default)]
pub struct TextureCache {
    base: HashMap<u64, egui::ColorImage>,
    thumbs: HashMap<u64, egui::TextureHandle>,
    main: Option<MainTexture>,
}

impl TextureCache {
    pub fn insert_base(&mut self, id: u64, image: egui::ColorImage) {
        self.base.insert(id, image);
    }

    fn base(&mut self, id: u64, image: &DynamicImage) -> &egui::ColorImage {
        self.base
            .entry(id)
            .or_insert_with(|| to_display_image(image))
    }

    pub fn thumbnail(
        &mut self,
        ctx: &egui::Context,
        id: u64,
        image: &DynamicImage,
    ) -> egui::TextureHandle {
        if let Some(handle) = self.thumbs.get(&id) {
            return handle.clone();
        }
        let handle = ctx.load_texture(
            format!("promptedit-thumb-{id}"),
            to_thumbnail_image(image),
            egui::TextureOptions::LINEAR,
        );
        self.thumbs.insert(id, handle.clone());
        handle
    }

    pub fn main(
        &mut self,
        ctx: &egui::Context,
        id: u64,
        image: &DynamicImage,
        adjustments: &Adjustments,
    ) -> egui::TextureHandle {
        // The aspect ratio only changes the viewport, not the pixels.
        let key = Adjustments {
            aspect_ratio: AspectRatio::Free,
            ..*adjustments
        };
        if let Some(main) = &self.main {
            if main.id == id && main.adjustments == key {
                return main.handle.clone();
            }
        }
        let adjusted = key.apply(self.base(id, image));
        let handle = match self.main.take() {
            Some(mut main) => {
                main.handle.set(adjusted, egui::TextureOptions::LINEAR);
                main.handle
            }
            None => ctx.load_texture("promptedit-main", adjusted, egui::TextureOptions::LINEAR),
        };
        self.main = Some(MainTexture {
            id,
            adjustments: key,
            handle: handle.clone(),
        });
        handle
    }

    /// Drops everything not in `live`.
    pub fn retain(&mut self, live: &HashSet<u64>) {
        self.base.retain(|id, _| live.contains(id));
        self.thumbs.retain(|id, _| live.contains(id));
        if self.main.as_ref().is_some_and(|m| !live.contains(&m.id)) {
            self.main = None;
        }
    }
}
