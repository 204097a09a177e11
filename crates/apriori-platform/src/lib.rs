//! Platform layer for the Apriori renderer.
//!
//! Window configuration and the raw handles a Vulkan surface is created
//! from, via winit.

use apriori_gpu::{vk, WindowHandles};
use raw_window_handle::{HandleError, HasDisplayHandle, HasWindowHandle, RawDisplayHandle};
use std::ffi::CStr;
use thiserror::Error;
use winit::dpi::LogicalSize;
use winit::event_loop::ActiveEventLoop;
use winit::window::{Window, WindowAttributes};

#[derive(Error, Debug)]
pub enum PlatformError {
    #[error("Window creation failed: {0}")]
    WindowCreation(String),
    #[error("Event loop error: {0}")]
    EventLoop(String),
    #[error("Window handle unavailable: {0}")]
    Handle(#[from] HandleError),
    #[error("Display not supported by Vulkan: {0}")]
    UnsupportedDisplay(vk::Result),
}

pub type Result<T> = std::result::Result<T, PlatformError>;

/// Platform configuration.
#[derive(Debug, Clone)]
pub struct PlatformConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub resizable: bool,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            title: "Apriori Viewer".to_string(),
            width: 1280,
            height: 720,
            resizable: true,
        }
    }
}

impl PlatformConfig {
    /// Create a new config with the given title.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    /// Set the window dimensions.
    #[must_use]
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Allow or forbid resizing.
    #[must_use]
    pub fn with_resizable(mut self, resizable: bool) -> Self {
        self.resizable = resizable;
        self
    }

    /// Winit attributes for a window with this configuration.
    pub fn window_attributes(&self) -> WindowAttributes {
        Window::default_attributes()
            .with_title(self.title.clone())
            .with_inner_size(LogicalSize::new(self.width, self.height))
            .with_resizable(self.resizable)
    }
}

/// Create a window on a running event loop.
pub fn create_window(event_loop: &ActiveEventLoop, config: &PlatformConfig) -> Result<Window> {
    let window = event_loop
        .create_window(config.window_attributes())
        .map_err(|e| PlatformError::WindowCreation(e.to_string()))?;
    let size = window.inner_size();
    tracing::info!(
        title = %config.title,
        width = size.width,
        height = size.height,
        "Window created"
    );
    Ok(window)
}

/// Raw display and window handles for Vulkan surface creation.
pub fn window_handles(window: &Window) -> Result<WindowHandles> {
    Ok(WindowHandles {
        display: window.display_handle()?.as_raw(),
        window: window.window_handle()?.as_raw(),
    })
}

/// Instance extensions needed to present on `display`.
///
/// Accepts a window or the event loop's display handle, so the instance can
/// be created before any window exists.
pub fn required_extensions(display: &impl HasDisplayHandle) -> Result<Vec<&'static CStr>> {
    display_extensions(display.display_handle()?.as_raw())
}

/// Instance extensions needed to present on a raw display.
pub fn display_extensions(display: RawDisplayHandle) -> Result<Vec<&'static CStr>> {
    let names = ash_window::enumerate_required_extensions(display)
        .map_err(PlatformError::UnsupportedDisplay)?;
    // SAFETY: ash-window returns pointers to static NUL-terminated names.
    let extensions: Vec<_> = names
        .iter()
        .map(|&name| unsafe { CStr::from_ptr(name) })
        .collect();
    tracing::debug!(?extensions, "Display surface extensions");
    Ok(extensions)
}
