//! Presentation surfaces.
//!
//! Surfaces belong to the instance rather than to a device, so they borrow
//! the [`Instance`] they were created from and are destroyed through it.

use crate::dyn_array::{self, DynArray};
use crate::error::Result;
use crate::instance::Instance;
use ash::vk;
use raw_window_handle::{RawDisplayHandle, RawWindowHandle};

/// Raw platform handles of the window a surface presents to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowHandles {
    /// Display connection the window lives on.
    pub display: RawDisplayHandle,
    /// The window itself.
    pub window: RawWindowHandle,
}

/// A `VkSurfaceKHR` destroyed when dropped.
pub struct Surface<'i> {
    instance: &'i Instance,
    handle: vk::SurfaceKHR,
}

impl<'i> Surface<'i> {
    /// Create a surface for a platform window.
    ///
    /// # Safety
    /// The window behind `window` must outlive the surface.
    pub unsafe fn new(instance: &'i Instance, window: &WindowHandles) -> Result<Self> {
        let handle = unsafe { instance.driver().create_surface(window) }?;
        tracing::trace!("Created surface");
        Ok(Self { instance, handle })
    }

    /// Raw surface handle.
    pub fn handle(&self) -> vk::SurfaceKHR {
        self.handle
    }

    /// Instance the surface was created from.
    pub fn instance(&self) -> &'i Instance {
        self.instance
    }

    /// Whether a queue family of `physical_device` can present here.
    pub fn supports_present(
        &self,
        physical_device: vk::PhysicalDevice,
        queue_family: u32,
    ) -> Result<bool> {
        Ok(self
            .instance
            .driver()
            .surface_support(physical_device, queue_family, self.handle)?)
    }

    /// Query the surface capabilities for a physical device.
    pub fn capabilities(
        &self,
        physical_device: vk::PhysicalDevice,
    ) -> Result<vk::SurfaceCapabilitiesKHR> {
        Ok(self
            .instance
            .driver()
            .surface_capabilities(physical_device, self.handle)?)
    }

    /// Supported surface formats.
    pub fn formats(
        &self,
        physical_device: vk::PhysicalDevice,
    ) -> Result<DynArray<vk::SurfaceFormatKHR>> {
        let driver = self.instance.driver();
        dyn_array::enumerate(|count, out| {
            driver.surface_formats(physical_device, self.handle, count, out)
        })
    }

    /// Supported present modes.
    pub fn present_modes(
        &self,
        physical_device: vk::PhysicalDevice,
    ) -> Result<DynArray<vk::PresentModeKHR>> {
        let driver = self.instance.driver();
        dyn_array::enumerate(|count, out| {
            driver.surface_present_modes(physical_device, self.handle, count, out)
        })
    }
}

impl Drop for Surface<'_> {
    fn drop(&mut self) {
        tracing::debug!("Destroying surface");
        // SAFETY: every swapchain on this surface is owned by a renderer that
        // drops it before the surface.
        unsafe { self.instance.driver().destroy_surface(self.handle) };
    }
}
