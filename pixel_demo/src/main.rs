//! Pixel demo application
//!
//! Opens one window and draws a filled circle into its CPU framebuffer every
//! frame. `B` switches between the two circle algorithms, `Escape` quits.
//!
//! Usage: `pixel_demo [config.toml|config.ron]`

use std::cell::Cell;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;

use pixel_engine::prelude::*;
use thiserror::Error;

const CIRCLE_COLOR: u32 = 0x00FF_5733;
const FRAME_DELAY: Duration = Duration::from_millis(10);

#[derive(Error, Debug)]
enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Window error: {0}")]
    Window(#[from] WindowError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CircleAlgorithm {
    Simple,
    Bresenham,
}

impl CircleAlgorithm {
    const fn toggled(self) -> Self {
        match self {
            Self::Simple => Self::Bresenham,
            Self::Bresenham => Self::Simple,
        }
    }

    fn draw(self, frame: &mut FrameBufferView<'_>) {
        let center_x = frame.width() as i32 / 2;
        let center_y = frame.height() as i32 / 2;
        let radius = center_x.min(center_y) / 2;
        match self {
            Self::Simple => raster::fill_circle_simple(frame, center_x, center_y, radius, CIRCLE_COLOR),
            Self::Bresenham => raster::fill_circle_bresenham(frame, center_x, center_y, radius, CIRCLE_COLOR),
        }
    }
}

struct DemoApp {
    windows: WindowManager,
    window_id: SurfaceId,
    base_title: String,
    quit_requested: Rc<Cell<bool>>,
    toggle_requested: Rc<Cell<bool>>,
    algorithm: CircleAlgorithm,
}

impl DemoApp {
    fn new(config: &ApplicationConfig) -> Result<Self, AppError> {
        let mut windows = WindowManager::new();
        let window_id = windows.create_window(&config.window, &config.presenter)?;

        let quit_requested = Rc::new(Cell::new(false));
        let toggle_requested = Rc::new(Cell::new(false));
        if let Some(window) = windows.get_mut(window_id) {
            let quit = quit_requested.clone();
            let toggle = toggle_requested.clone();
            window.on_key_down(move |event| match event.key {
                KeyId::Escape => quit.set(true),
                KeyId::B => toggle.set(true),
                _ => {}
            });
            window.on_key_up(|event| log::trace!("Key released: {:?} {:?}", event.key, event.modifiers));
        }

        Ok(Self {
            windows,
            window_id,
            base_title: config.window.title.clone(),
            quit_requested,
            toggle_requested,
            algorithm: CircleAlgorithm::Simple,
        })
    }

    fn run(&mut self) {
        log::info!("Entering main loop");
        let mut frames: u64 = 0;

        while self.windows.has_open_windows() {
            self.windows.pump_events();
            let Some(window) = self.windows.get_mut(self.window_id) else {
                break;
            };

            if self.quit_requested.get() {
                window.close();
                continue;
            }
            if self.toggle_requested.replace(false) {
                self.algorithm = self.algorithm.toggled();
                window.set_title(&format!("{} ({:?})", self.base_title, self.algorithm));
                log::info!("Drawing circles with {:?}", self.algorithm);
            }

            if let Some(mut frame) = window.frame_buffer() {
                frame.clear(0);
                self.algorithm.draw(&mut frame);
            }
            match window.present() {
                Ok(()) => frames += 1,
                Err(err) if err.is_recoverable() => log::warn!("Frame dropped: {err}"),
                Err(err) => log::trace!("Nothing presented: {err}"),
            }

            std::thread::sleep(FRAME_DELAY);
        }

        log::info!("Main loop finished after {frames} frames");
    }
}

fn load_config(path: Option<PathBuf>) -> Result<ApplicationConfig, AppError> {
    let config = match path {
        Some(path) => ApplicationConfig::load_from_file(path)?,
        None => ApplicationConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

fn run(config: &ApplicationConfig) -> Result<(), AppError> {
    let mut app = DemoApp::new(config)?;
    app.run();
    Ok(())
}

fn main() {
    let config_path = std::env::args_os().nth(1).map(PathBuf::from);
    let config = load_config(config_path.clone());

    let level = config
        .as_ref()
        .ok()
        .and_then(|config| config.level_filter().ok())
        .unwrap_or(logging::LevelFilter::Info);
    logging::init_with_level(level);

    if let Some(path) = &config_path {
        log::info!("Configuration file: {}", path.display());
    }
    if let Err(err) = config.and_then(|config| run(&config)) {
        log::error!("Pixel demo failed: {err}");
        std::process::exit(1);
    }
}
