//! Built-in prompt and enhancer catalogs.
//!
//! Both catalogs are compiled in and never change at runtime.

#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub enum PresetCategory {
    Background,
    Lighting,
    Style,
    Quality,
    Cleanup,
}

impl PresetCategory {
    pub fn label(self) -> &'static str {
        match self {
            PresetCategory::Background => "Background",
            PresetCategory::Lighting => "Lighting",
            PresetCategory::Style => "Style",
            PresetCategory::Quality => "Quality",
            PresetCategory::Cleanup => "Cleanup",
        }
    }
}

/// A ready-made instruction the user can drop into the prompt box.
#[derive(Debug)]
pub struct PromptPreset {
    pub label: &'static str,
    pub text: &'static str,
    pub category: PresetCategory,
}

/// A suffix appended to the user's instruction to steer output quality or style.
#[derive(Debug)]
pub struct EnhancerPreset {
    pub label: &'static str,
    pub suffix: &'static str,
    pub category: PresetCategory,
}

pub static PROMPT_PRESETS: &[PromptPreset] = &[
    PromptPreset {
        label: "Remove background",
        text: "Remove the background",
        category: PresetCategory::Background,
    },
    PromptPreset {
        label: "White background",
        text: "Make the background white",
        category: PresetCategory::Background,
    },
    PromptPreset {
        label: "Retro filter",
        text: "Add a retro filter",
        category: PresetCategory::Style,
    },
    PromptPreset {
        label: "Fix lighting",
        text: "Improve lighting and contrast",
        category: PresetCategory::Lighting,
    },
    PromptPreset {
        label: "Golden hour",
        text: "Relight the scene with warm golden hour sunlight",
        category: PresetCategory::Lighting,
    },
    PromptPreset {
        label: "Remove people",
        text: "Remove the people in the background",
        category: PresetCategory::Cleanup,
    },
    PromptPreset {
        label: "Watercolor",
        text: "Turn this photo into a watercolor painting",
        category: PresetCategory::Style,
    },
];

pub static ENHANCER_PRESETS: &[EnhancerPreset] = &[
    EnhancerPreset {
        label: "Photorealistic",
        suffix: "Keep the result photorealistic with natural textures.",
        category: PresetCategory::Quality,
    },
    EnhancerPreset {
        label: "High detail",
        suffix: "Render with high detail and sharp focus.",
        category: PresetCategory::Quality,
    },
    EnhancerPreset {
        label: "Preserve subject",
        suffix: "Do not change the main subject's identity, pose or proportions.",
        category: PresetCategory::Cleanup,
    },
    EnhancerPreset {
        label: "Studio lighting",
        suffix: "Use soft, even studio lighting.",
        category: PresetCategory::Lighting,
    },
    EnhancerPreset {
        label: "Cinematic",
        suffix: "Give it a cinematic color grade.",
        category: PresetCategory::Style,
    },
];

pub fn enhancer(index: usize) -> Option<&'static EnhancerPreset> {
    ENHANCER_PRESETS.get(index)
}

/// Builds the instruction sent to the service: the trimmed instruction, then the enhancer suffix.
pub fn compose_prompt(instruction: &str, enhancer: Option<&EnhancerPreset>) -> String {
    let instruction = instruction.trim();
    match enhancer {
        Some(preset) if !instruction.is_empty() => format!("{instruction} {}", preset.suffix),
        _ => instruction.to_string(),
    }
}
