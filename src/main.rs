use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use eframe::egui;
use log::LevelFilter;

use promptedit::adjust::AspectRatio;
use promptedit::app::EditorApp;
use promptedit::config::{EditorConfig, DEFAULT_DOWNLOAD_DELAY_MS};
use promptedit::fs_utils::collect_images;
use promptedit::gemini::{GeminiClient, DEFAULT_API_BASE, DEFAULT_MODEL};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Edit images with text prompts using a multimodal generation API"
)]
struct Args {
    /// Images or directories to open at startup
    #[arg(value_name = "PATH")]
    inputs: Vec<PathBuf>,

    /// API key for the generation service
    #[arg(long, env = "API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Model used for edits
    #[arg(short, long, default_value = DEFAULT_MODEL)]
    model: String,

    /// Base URL of the generation API
    #[arg(long, default_value = DEFAULT_API_BASE)]
    api_base: String,

    /// Give up on a single edit after this many seconds (no limit by default)
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Open the crop tool for every uploaded image
    #[arg(short, long, default_value_t = false)]
    crop: bool,

    /// Display aspect ratio as W:H, or "free"
    #[arg(short, long, default_value = "free")]
    aspect_ratio: AspectRatio,

    /// Directory downloads are written to
    #[arg(short, long, default_value = ".")]
    download_dir: PathBuf,

    /// Pause between files when downloading a whole batch, in milliseconds
    #[arg(long, default_value_t = DEFAULT_DOWNLOAD_DELAY_MS)]
    download_delay_ms: u64,

    /// Recurse into subdirectories to find images (disabled by default)
    #[arg(short = 'r', long = "recursive", default_value_t = false)]
    recursive: bool,

    /// Log debug output
    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

impl Args {
    fn into_config(self) -> (EditorConfig, Vec<PathBuf>) {
        let api_key = self
            .api_key
            .or_else(|| std::env::var("GEMINI_API_KEY").ok())
            .filter(|key| !key.trim().is_empty());
        let config = EditorConfig {
            api_key,
            model: self.model,
            api_base: self.api_base,
            timeout_secs: self.timeout_secs,
            crop_on_upload: self.crop,
            aspect_ratio: self.aspect_ratio,
            download_dir: self.download_dir,
            download_delay: Duration::from_millis(self.download_delay_ms),
            recursive: self.recursive,
        };
        (config, self.inputs)
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    promptedit::init_logging(if args.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    });

    let (config, inputs) = args.into_config();
    config.validate()?;
    let client = GeminiClient::new(&config)?;
    log::info!("sending edits to {}", client.endpoint());

    let files = collect_images(&inputs, config.recursive)
        .context("Unable to collect the images given on the command line")?;
    if !inputs.is_empty() && files.is_empty() {
        log::warn!(
            "no supported images found, supported formats are: {}",
            promptedit::fs_utils::SUPPORTED_EXTENSIONS.join(", ")
        );
    }

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 820.0])
            .with_drag_and_drop(true),
        ..Default::default()
    };

    eframe::run_native(
        "Prompt Edit",
        native_options,
        Box::new(move |cc| {
            Ok(Box::new(EditorApp::new(
                cc,
                config,
                Arc::new(client),
                files,
            )))
        }),
    )?;

    Ok(())
}
