//! A GLFW window that owns a presentation engine
//!
//! Provides window creation and event handling for CPU-drawn frames

use thiserror::Error;

use super::keys::{translate_key, translate_modifiers, KeyEvent};
use crate::core::config::{PresenterConfig, WindowConfig};
use crate::present::{EngineState, FrameBufferView, PresentError, PresentationEngine, Surface, SurfaceId, SurfaceSize};
use crate::render::vulkan::VulkanDevice;

/// Window management errors
#[derive(Error, Debug)]
pub enum WindowError {
    /// GLFW could not be initialized
    #[error("GLFW initialization failed: {0}")]
    InitializationFailed(String),

    /// The native window could not be created
    #[error("Window creation failed for '{title}'")]
    CreationFailed {
        /// Title of the window that failed
        title: String,
    },

    /// The window configuration was rejected
    #[error("Invalid window configuration: {0}")]
    InvalidConfig(String),

    /// No open window has this id
    #[error("No window with id {0:?}")]
    NotFound(SurfaceId),
}

/// Result type for window operations
pub type WindowResult<T> = Result<T, WindowError>;

/// Callback invoked with each key event
pub type KeyCallback = Box<dyn FnMut(&KeyEvent)>;

/// A GLFW window seen as a presentable surface
pub struct GlfwSurface<'a> {
    id: SurfaceId,
    window: &'a glfw::Window,
}

impl<'a> GlfwSurface<'a> {
    /// Wrap `window` under `id`
    pub const fn new(id: SurfaceId, window: &'a glfw::Window) -> Self {
        Self { id, window }
    }

    /// The underlying GLFW window
    pub const fn window(&self) -> &'a glfw::Window {
        self.window
    }
}

impl Surface for GlfwSurface<'_> {
    fn id(&self) -> SurfaceId {
        self.id
    }

    fn pixel_size(&self) -> SurfaceSize {
        framebuffer_size(self.window.get_framebuffer_size())
    }
}

/// GLFW reports sizes as signed integers
fn framebuffer_size((width, height): (i32, i32)) -> SurfaceSize {
    SurfaceSize::new(width.max(0) as u32, height.max(0) as u32)
}

/// Key-down and key-up callbacks of one window
#[derive(Default)]
struct KeyCallbacks {
    down: Option<KeyCallback>,
    up: Option<KeyCallback>,
}

impl KeyCallbacks {
    /// Route `event` by action; repeats count as presses
    fn dispatch(&mut self, action: glfw::Action, event: &KeyEvent) {
        let callback = match action {
            glfw::Action::Press | glfw::Action::Repeat => self.down.as_mut(),
            glfw::Action::Release => self.up.as_mut(),
        };
        if let Some(callback) = callback {
            callback(event);
        }
    }
}

/// A native window with its own presentation engine
///
/// A window whose engine failed to initialize still exists and still
/// receives events; it just has nothing to draw into.
pub struct Window {
    id: SurfaceId,
    // drops before the native window its surface belongs to
    engine: PresentationEngine<VulkanDevice>,
    handle: glfw::PWindow,
    events: glfw::GlfwReceiver<(f64, glfw::WindowEvent)>,
    title: String,
    callbacks: KeyCallbacks,
}

impl Window {
    /// Create a window and its presentation engine
    pub(crate) fn create(
        glfw: &mut glfw::Glfw,
        id: SurfaceId,
        config: &WindowConfig,
        presenter: &PresenterConfig,
    ) -> WindowResult<Self> {
        // Vulkan presents, so no OpenGL context
        glfw.window_hint(glfw::WindowHint::ClientApi(glfw::ClientApiHint::NoApi));
        glfw.window_hint(glfw::WindowHint::Resizable(config.resizable));

        let (mut handle, events) = glfw
            .create_window(config.width, config.height, &config.title, glfw::WindowMode::Windowed)
            .ok_or_else(|| WindowError::CreationFailed {
                title: config.title.clone(),
            })?;

        handle.set_key_polling(true);
        handle.set_close_polling(true);
        handle.set_framebuffer_size_polling(true);

        let session: &glfw::Glfw = glfw;
        let surface = GlfwSurface::new(id, &handle);
        let engine = PresentationEngine::new(Some(&surface), presenter, |surface| {
            VulkanDevice::open(session, surface.window(), presenter)
        });
        if let Some(err) = engine.construction_error() {
            log::warn!("Window '{}' has no presentation: {err}", config.title);
        }

        log::info!("Created window '{}' ({}x{})", config.title, config.width, config.height);

        Ok(Self {
            id,
            engine,
            handle,
            events,
            title: config.title.clone(),
            callbacks: KeyCallbacks::default(),
        })
    }

    /// Show the frame drawn since the last call
    pub fn present(&mut self) -> Result<(), PresentError> {
        self.engine.present()
    }

    /// Memory to draw the next frame into, if the window can present
    pub fn frame_buffer(&mut self) -> Option<FrameBufferView<'_>> {
        self.engine.frame_buffer()
    }

    /// Change the title bar text
    pub fn set_title(&mut self, title: &str) {
        self.handle.set_title(title);
        title.clone_into(&mut self.title);
    }

    /// Title bar text
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Drawable size in pixels
    pub fn size(&self) -> SurfaceSize {
        framebuffer_size(self.handle.get_framebuffer_size())
    }

    /// Identity of this window
    pub const fn id(&self) -> SurfaceId {
        self.id
    }

    /// Call `callback` for every key press and auto-repeat
    pub fn on_key_down(&mut self, callback: impl FnMut(&KeyEvent) + 'static) {
        self.callbacks.down = Some(Box::new(callback));
    }

    /// Call `callback` for every key release
    pub fn on_key_up(&mut self, callback: impl FnMut(&KeyEvent) + 'static) {
        self.callbacks.up = Some(Box::new(callback));
    }

    /// False once the user or [`close`](Self::close) asked the window to close
    pub fn is_open(&self) -> bool {
        !self.handle.should_close()
    }

    /// Ask for the window to be closed at the next event pump
    pub fn close(&mut self) {
        self.handle.set_should_close(true);
    }

    /// The presentation engine of this window
    pub const fn engine(&self) -> &PresentationEngine<VulkanDevice> {
        &self.engine
    }

    /// Handle everything GLFW queued for this window since the last poll
    pub(crate) fn dispatch_events(&mut self) {
        let events: Vec<_> = glfw::flush_messages(&self.events).map(|(_, event)| event).collect();
        for event in events {
            self.handle_event(event);
        }
    }

    fn handle_event(&mut self, event: glfw::WindowEvent) {
        match event {
            glfw::WindowEvent::Key(key, _, action, modifiers) => {
                let event = KeyEvent {
                    surface: self.id,
                    key: translate_key(key),
                    modifiers: translate_modifiers(modifiers),
                };
                self.callbacks.dispatch(action, &event);
            }
            glfw::WindowEvent::FramebufferSize(width, height) => {
                if self.engine.state() != EngineState::DeviceReady {
                    return;
                }
                let surface = GlfwSurface::new(self.id, &self.handle);
                match self.engine.resize(&surface) {
                    Ok(true) => log::debug!("Window '{}' resized to {width}x{height}", self.title),
                    Ok(false) => {}
                    Err(err) if err.is_recoverable() => log::warn!("Window '{}' resized without a frame buffer: {err}", self.title),
                    Err(err) => log::error!("Window '{}' lost presentation on resize: {err}", self.title),
                }
            }
            glfw::WindowEvent::Close => log::debug!("Window '{}' close requested", self.title),
            _ => {}
        }
    }
}

impl Drop for Window {
    fn drop(&mut self) {
        self.engine.destroy();
        log::debug!("Window '{}' destroyed", self.title);
    }
}
