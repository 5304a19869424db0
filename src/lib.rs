pub mod adjust;
pub mod app;
pub mod config;
pub mod fs_utils;
pub mod gemini;
pub mod history;
pub mod image_utils;
pub mod presets;
pub mod selection;
pub mod session;
pub mod ui;

use log::LevelFilter;

/// Initialize logging once for the application and for tests that want output.
///
/// `RUST_LOG` wins when set; otherwise `default_filter` applies.
pub fn init_logging(default_filter: LevelFilter) {
    let mut builder = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(default_filter.as_str()),
    );
    // Repaint-driven HTTP chatter is not useful at debug level.
    builder.filter_module("reqwest", LevelFilter::Info);
    builder.filter_module("wgpu_core", LevelFilter::Warn);
    builder.filter_module("wgpu_hal", LevelFilter::Warn);

    if builder.try_init().is_err() {
        log::debug!("logger already initialized");
    }
}
