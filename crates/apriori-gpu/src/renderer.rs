//! Renderer composition root.
//!
//! Construction runs instance → physical device → surface → queue families →
//! logical device → swapchain → command pools → command buffers → render
//! pass → overlay pipeline → descriptor pool. Each stage owns what it
//! created, so a failure releases the earlier stages in reverse and dropping
//! the renderer tears everything down in the same order.

use crate::command::{create_command_buffers, create_command_pools, CommandBuffers, CommandPools};
use crate::descriptors::DescriptorPool;
use crate::device::{create_device, select_physical_device, Device, Queues};
use crate::error::Result;
use crate::instance::{Instance, VALIDATION_LAYER};
use crate::pipeline::{overlay_descriptor_pool_sizes, OverlayPipeline, OverlayShaders};
use crate::queue_family::{resolve_queue_families, QueueFamilies};
use crate::render_pass::RenderPass;
use crate::surface::{Surface, WindowHandles};
use crate::swapchain::{select_surface_format, Swapchain};
use ash::vk;
use std::ffi::{CStr, CString};
use std::sync::Arc;

/// Renderer settings.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Window width in pixels.
    pub width: u32,
    /// Window height in pixels.
    pub height: u32,
    /// Layers required on the physical device.
    pub layers: Vec<CString>,
    /// Extensions required on the physical device.
    pub extensions: Vec<CString>,
    /// Anisotropy of the overlay sampler; `None` disables it.
    pub overlay_anisotropy: Option<f32>,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            layers: Vec::new(),
            extensions: vec![ash::khr::swapchain::NAME.to_owned()],
            overlay_anisotropy: None,
        }
    }
}

impl RendererConfig {
    /// Configuration for a window of the given size.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }

    /// Require the standard validation layer on the device.
    #[must_use]
    pub fn validation(mut self, enable: bool) -> Self {
        let layer = VALIDATION_LAYER.to_owned();
        self.layers.retain(|l| *l != layer);
        if enable {
            self.layers.push(layer);
        }
        self
    }

    /// Require an additional device extension.
    #[must_use]
    pub fn extension(mut self, name: &CStr) -> Self {
        let name = name.to_owned();
        if !self.extensions.contains(&name) {
            self.extensions.push(name);
        }
        self
    }

    /// Set the overlay sampler anisotropy.
    #[must_use]
    pub fn overlay_anisotropy(mut self, anisotropy: Option<f32>) -> Self {
        self.overlay_anisotropy = anisotropy;
        self
    }
}

/// Everything needed to draw overlays into one window.
///
/// Borrows the [`Instance`], which therefore outlives the renderer.
pub struct Renderer<'i> {
    // Destroyed in declaration order.
    descriptor_pool: DescriptorPool,
    pipeline: OverlayPipeline,
    render_pass: RenderPass,
    command_buffers: CommandBuffers,
    command_pools: CommandPools,
    swapchain: Swapchain,
    queues: Queues,
    device: Arc<Device>,
    surface: Surface<'i>,
    instance: &'i Instance,
}

impl<'i> Renderer<'i> {
    /// Create a renderer for a window of `width` x `height` pixels.
    ///
    /// # Safety
    /// The window behind `window` must outlive the renderer.
    pub unsafe fn new(
        instance: &'i Instance,
        window: &WindowHandles,
        width: u32,
        height: u32,
        shaders: &dyn OverlayShaders,
    ) -> Result<Self> {
        let config = RendererConfig::new(width, height).validation(cfg!(debug_assertions));
        unsafe { Self::with_config(instance, window, &config, shaders) }
    }

    /// Create a renderer with explicit settings.
    ///
    /// # Safety
    /// The window behind `window` must outlive the renderer.
    pub unsafe fn with_config(
        instance: &'i Instance,
        window: &WindowHandles,
        config: &RendererConfig,
        shaders: &dyn OverlayShaders,
    ) -> Result<Self> {
        tracing::info!(width = config.width, height = config.height, "Creating renderer...");

        let physical_device = select_physical_device(instance);
        let surface = unsafe { Surface::new(instance, window) }?;
        let families = resolve_queue_families(physical_device.handle, &surface)?;

        let (device, queues) = create_device(
            instance,
            &physical_device,
            families,
            &config.layers,
            &config.extensions,
        )?;

        let formats = surface.formats(physical_device.handle)?;
        let format = select_surface_format(&formats)?;

        let swapchain = Swapchain::new(
            &device,
            &surface,
            format,
            config.width,
            config.height,
            families,
        )?;
        let image_count = swapchain.image_count();

        let command_pools = create_command_pools(&device, families)?;
        let command_buffers = create_command_buffers(&command_pools, image_count)?;

        let render_pass = RenderPass::new(&device, format.format)?;
        let pipeline = OverlayPipeline::new(
            &device,
            &render_pass,
            swapchain.extent(),
            config.overlay_anisotropy,
            shaders,
        )?;

        let descriptor_pool = DescriptorPool::new(
            &device,
            image_count,
            &overlay_descriptor_pool_sizes(image_count),
        )?;

        tracing::info!(
            gpu = %physical_device.name,
            images = image_count,
            shared_queue_family = families.is_shared(),
            "Renderer created"
        );

        Ok(Self {
            descriptor_pool,
            pipeline,
            render_pass,
            command_buffers,
            command_pools,
            swapchain,
            queues,
            device,
            surface,
            instance,
        })
    }

    /// The instance the renderer was created from.
    pub fn instance(&self) -> &'i Instance {
        self.instance
    }

    /// Logical device.
    pub fn device(&self) -> &Arc<Device> {
        &self.device
    }

    /// Graphics and present queues.
    pub fn queues(&self) -> Queues {
        self.queues
    }

    /// Resolved queue families.
    pub fn queue_families(&self) -> QueueFamilies {
        self.device.queue_families()
    }

    /// Presentation surface.
    pub fn surface(&self) -> vk::SurfaceKHR {
        self.surface.handle()
    }

    /// Swapchain and its image views.
    pub fn swapchain(&self) -> &Swapchain {
        &self.swapchain
    }

    /// Command pools, shared when graphics and present share a family.
    pub fn command_pools(&self) -> &CommandPools {
        &self.command_pools
    }

    /// Command buffers, one per swapchain image in every distinct pool.
    pub fn command_buffers(&self) -> &CommandBuffers {
        &self.command_buffers
    }

    /// Render pass.
    pub fn render_pass(&self) -> &RenderPass {
        &self.render_pass
    }

    /// Overlay pipeline.
    pub fn overlay_pipeline(&self) -> &OverlayPipeline {
        &self.pipeline
    }

    /// Descriptor pool sized for one overlay set per swapchain image.
    pub fn descriptor_pool(&self) -> &DescriptorPool {
        &self.descriptor_pool
    }
}

impl Drop for Renderer<'_> {
    fn drop(&mut self) {
        tracing::debug!("Dropping renderer");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_requires_swapchain() {
        let config = RendererConfig::default();
        assert_eq!(config.extensions, vec![ash::khr::swapchain::NAME.to_owned()]);
        assert!(config.overlay_anisotropy.is_none());
    }

    #[test]
    fn validation_toggles_layer_once() {
        let config = RendererConfig::new(800, 600).validation(true).validation(true);
        assert_eq!(config.layers, vec![VALIDATION_LAYER.to_owned()]);
        assert!(config.validation(false).layers.is_empty());
    }

    #[test]
    fn extensions_are_deduplicated() {
        let config = RendererConfig::default().extension(ash::khr::swapchain::NAME);
        assert_eq!(config.extensions.len(), 1);
    }
}
