//! Render pass targeting swapchain images.

use crate::device::Device;
use crate::error::Result;
use crate::handle::Owned;
use ash::vk;
use std::sync::Arc;

/// Subpass the overlay pipeline draws in.
pub const OVERLAY_SUBPASS: u32 = 0;

/// Single-subpass render pass with one color attachment that ends ready for
/// presentation.
pub struct RenderPass {
    handle: Owned<vk::RenderPass>,
    format: vk::Format,
}

impl RenderPass {
    /// Create the render pass for images of `format`.
    pub fn new(device: &Arc<Device>, format: vk::Format) -> Result<Self> {
        tracing::trace!(?format, "Creating render pass...");

        let attachments = [vk::AttachmentDescription::default()
            .format(format)
            .samples(vk::SampleCountFlags::TYPE_1)
            .load_op(vk::AttachmentLoadOp::CLEAR)
            .store_op(vk::AttachmentStoreOp::STORE)
            .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
            .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
            .initial_layout(vk::ImageLayout::UNDEFINED)
            .final_layout(vk::ImageLayout::PRESENT_SRC_KHR)];

        let color_refs = [vk::AttachmentReference::default()
            .attachment(0)
            .layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)];

        let subpasses = [vk::SubpassDescription::default()
            .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
            .color_attachments(&color_refs)];

        let create_info = vk::RenderPassCreateInfo::default()
            .attachments(&attachments)
            .subpasses(&subpasses);

        // SAFETY: the create info only references locals.
        let handle = unsafe { device.driver().create_render_pass(&create_info) }?;
        tracing::debug!("Render pass created");

        Ok(Self {
            handle: Owned::new(device, handle),
            format,
        })
    }

    /// Raw render pass handle.
    pub fn handle(&self) -> vk::RenderPass {
        self.handle.handle()
    }

    /// Color attachment format.
    pub fn format(&self) -> vk::Format {
        self.format
    }

    /// Number of color attachments of the overlay subpass.
    pub const fn color_attachment_count(&self) -> u32 {
        1
    }
}
