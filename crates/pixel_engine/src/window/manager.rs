//! Ownership of every open window and the GLFW session behind them

use slotmap::SlotMap;

use super::native::{Window, WindowError, WindowResult};
use super::registry::Registry;
use crate::core::config::{PresenterConfig, WindowConfig};
use crate::present::SurfaceId;

/// Creates windows, pumps their events and closes them
///
/// The GLFW session is started with the first window and shut down when the
/// last one closes. Windows are addressed by [`SurfaceId`].
pub struct WindowManager {
    // windows drop before the session they were created from
    windows: SlotMap<SurfaceId, Window>,
    session: Registry<glfw::Glfw>,
}

impl Default for WindowManager {
    fn default() -> Self {
        Self::new()
    }
}

impl WindowManager {
    /// Manager with no windows; GLFW is not touched yet
    pub fn new() -> Self {
        Self {
            windows: SlotMap::with_key(),
            session: Registry::new(),
        }
    }

    /// Open a window presenting with `presenter`
    ///
    /// Fails only if GLFW or the native window cannot be created. A window
    /// whose presentation engine failed is still returned.
    pub fn create_window(&mut self, config: &WindowConfig, presenter: &PresenterConfig) -> WindowResult<SurfaceId> {
        config.validate().map_err(WindowError::InvalidConfig)?;
        presenter.validate().map_err(WindowError::InvalidConfig)?;

        let glfw = self.session.acquire_with(|| {
            glfw::init(glfw::fail_on_errors).map_err(|err| WindowError::InitializationFailed(format!("{err:?}")))
        })?;

        match self
            .windows
            .try_insert_with_key(|id| Window::create(glfw, id, config, presenter))
        {
            Ok(id) => Ok(id),
            Err(err) => {
                self.session.release();
                Err(err)
            }
        }
    }

    /// Window with `id`, if open
    pub fn get(&self, id: SurfaceId) -> Option<&Window> {
        self.windows.get(id)
    }

    /// Mutable window with `id`, if open
    pub fn get_mut(&mut self, id: SurfaceId) -> Option<&mut Window> {
        self.windows.get_mut(id)
    }

    /// Destroy the window with `id`
    pub fn close(&mut self, id: SurfaceId) -> WindowResult<()> {
        let window = self.windows.remove(id).ok_or(WindowError::NotFound(id))?;
        drop(window);
        if self.session.release() {
            log::info!("Last window closed, GLFW session ended");
        }
        Ok(())
    }

    /// Poll GLFW once and dispatch each window's events
    ///
    /// Windows that were asked to close are destroyed; their ids are returned.
    pub fn pump_events(&mut self) -> Vec<SurfaceId> {
        let Some(glfw) = self.session.get_mut() else {
            return Vec::new();
        };
        glfw.poll_events();

        for (_, window) in &mut self.windows {
            window.dispatch_events();
        }

        let closing: Vec<SurfaceId> = self
            .windows
            .iter()
            .filter(|(_, window)| !window.is_open())
            .map(|(id, _)| id)
            .collect();
        for &id in &closing {
            if let Err(err) = self.close(id) {
                log::warn!("Closing window failed: {err}");
            }
        }
        closing
    }

    /// True while any window is open
    pub fn has_open_windows(&self) -> bool {
        !self.windows.is_empty()
    }

    /// Number of open windows
    pub fn window_count(&self) -> usize {
        self.windows.len()
    }

    /// Ids of every open window
    pub fn ids(&self) -> impl Iterator<Item = SurfaceId> + '_ {
        self.windows.keys()
    }
}

impl Drop for WindowManager {
    fn drop(&mut self) {
        self.windows.clear();
        self.session.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_manager_is_idle() {
        let mut manager = WindowManager::new();
        assert!(!manager.has_open_windows());
        assert_eq!(manager.window_count(), 0);
        assert!(manager.pump_events().is_empty());
    }

    #[test]
    fn test_unknown_window_cannot_close() {
        let mut manager = WindowManager::new();
        let id = SurfaceId::default();
        assert!(manager.get(id).is_none());
        assert!(matches!(manager.close(id), Err(WindowError::NotFound(_))));
    }

    #[test]
    fn test_invalid_config_rejected_before_glfw() {
        let mut manager = WindowManager::new();
        let config = WindowConfig::new("zero").with_size(0, 10);
        let result = manager.create_window(&config, &PresenterConfig::default());
        assert!(matches!(result, Err(WindowError::InvalidConfig(_))));
        assert!(!manager.has_open_windows());
    }
}
