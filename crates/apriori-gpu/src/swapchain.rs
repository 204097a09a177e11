//! Swapchain management.

use crate::device::Device;
use crate::dyn_array;
use crate::error::{GpuError, Result};
use crate::handle::Owned;
use crate::queue_family::QueueFamilies;
use crate::surface::Surface;
use ash::vk;
use std::sync::Arc;

/// Swapchain with one view per image.
pub struct Swapchain {
    // Views are destroyed before the swapchain that owns their images.
    views: Vec<Owned<vk::ImageView>>,
    images: Vec<vk::Image>,
    handle: Owned<vk::SwapchainKHR>,
    format: vk::SurfaceFormatKHR,
    present_mode: vk::PresentModeKHR,
    extent: vk::Extent2D,
}

impl Swapchain {
    /// Create a swapchain on `surface` for a window of the given size.
    pub fn new(
        device: &Arc<Device>,
        surface: &Surface<'_>,
        format: vk::SurfaceFormatKHR,
        width: u32,
        height: u32,
        families: QueueFamilies,
    ) -> Result<Self> {
        tracing::trace!("Creating swapchain...");
        let physical_device = device.physical_device().handle;

        let capabilities = surface.capabilities(physical_device)?;
        let present_modes = surface.present_modes(physical_device)?;

        let present_mode = select_present_mode(&present_modes);
        let image_count = select_image_count(&capabilities);
        let extent = calculate_extent(&capabilities, width, height);
        let (sharing_mode, family_indices) = sharing_mode(families);
        tracing::trace!(
            image_count,
            ?present_mode,
            ?sharing_mode,
            width = extent.width,
            height = extent.height,
            "Swapchain parameters"
        );

        let create_info = vk::SwapchainCreateInfoKHR::default()
            .surface(surface.handle())
            .min_image_count(image_count)
            .image_format(format.format)
            .image_color_space(format.color_space)
            .image_extent(extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
            .image_sharing_mode(sharing_mode)
            .queue_family_indices(&family_indices)
            .pre_transform(capabilities.current_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(present_mode)
            .clipped(true)
            .old_swapchain(vk::SwapchainKHR::null());

        // SAFETY: the surface outlives the swapchain inside a renderer.
        let handle = Owned::new(device, unsafe {
            device.driver().create_swapchain(&create_info)
        }?);

        // The driver may create more images than requested.
        let images = dyn_array::enumerate(|count, out| unsafe {
            device.driver().swapchain_images(handle.handle(), count, out)
        })?
        .into_vec();

        let views = images
            .iter()
            .map(|&image| create_image_view(device, image, format.format))
            .collect::<Result<Vec<_>>>()?;

        tracing::info!(
            images = images.len(),
            format = ?format.format,
            width = extent.width,
            height = extent.height,
            "Swapchain created"
        );

        Ok(Self {
            views,
            images,
            handle,
            format,
            present_mode,
            extent,
        })
    }

    /// Raw swapchain handle.
    pub fn handle(&self) -> vk::SwapchainKHR {
        self.handle.handle()
    }

    /// Number of images; equal to the number of views.
    pub fn image_count(&self) -> u32 {
        self.images.len() as u32
    }

    /// Swapchain images, owned by the swapchain.
    pub fn images(&self) -> &[vk::Image] {
        &self.images
    }

    /// One view per image, in image order.
    pub fn image_views(&self) -> impl ExactSizeIterator<Item = vk::ImageView> + '_ {
        self.views.iter().map(Owned::handle)
    }

    /// Image format and color space.
    pub fn format(&self) -> vk::SurfaceFormatKHR {
        self.format
    }

    /// Present mode in use.
    pub fn present_mode(&self) -> vk::PresentModeKHR {
        self.present_mode
    }

    /// Image extent.
    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }
}

fn create_image_view(
    device: &Arc<Device>,
    image: vk::Image,
    format: vk::Format,
) -> Result<Owned<vk::ImageView>> {
    let view_info = vk::ImageViewCreateInfo::default()
        .image(image)
        .view_type(vk::ImageViewType::TYPE_2D)
        .format(format)
        .components(vk::ComponentMapping {
            r: vk::ComponentSwizzle::IDENTITY,
            g: vk::ComponentSwizzle::IDENTITY,
            b: vk::ComponentSwizzle::IDENTITY,
            a: vk::ComponentSwizzle::IDENTITY,
        })
        .subresource_range(
            vk::ImageSubresourceRange::default()
                .aspect_mask(vk::ImageAspectFlags::COLOR)
                .base_mip_level(0)
                .level_count(1)
                .base_array_layer(0)
                .layer_count(1),
        );

    // SAFETY: the image belongs to a live swapchain of this device.
    let view = unsafe { device.driver().create_image_view(&view_info) }?;
    Ok(Owned::new(device, view))
}

/// Select the surface format.
///
/// Prefers `B8G8R8A8_SRGB` with a non-linear sRGB color space, otherwise the
/// first reported format.
pub fn select_surface_format(available: &[vk::SurfaceFormatKHR]) -> Result<vk::SurfaceFormatKHR> {
    // Prefer SRGB
    for format in available {
        if format.format == vk::Format::B8G8R8A8_SRGB
            && format.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR
        {
            return Ok(*format);
        }
    }

    available
        .first()
        .copied()
        .ok_or(GpuError::Vulkan(vk::Result::ERROR_FORMAT_NOT_SUPPORTED))
}

/// Select the present mode: mailbox when offered, otherwise FIFO.
pub fn select_present_mode(available: &[vk::PresentModeKHR]) -> vk::PresentModeKHR {
    if available.contains(&vk::PresentModeKHR::MAILBOX) {
        vk::PresentModeKHR::MAILBOX
    } else {
        // Always supported
        vk::PresentModeKHR::FIFO
    }
}

/// Midpoint of the supported image count range.
///
/// A maximum of zero means no upper bound; one image above the minimum is
/// requested then.
pub const fn select_image_count(capabilities: &vk::SurfaceCapabilitiesKHR) -> u32 {
    if capabilities.max_image_count == 0 {
        capabilities.min_image_count + 1
    } else {
        (capabilities.min_image_count + capabilities.max_image_count) / 2
    }
}

/// Sharing mode and the family indices to share between.
pub fn sharing_mode(families: QueueFamilies) -> (vk::SharingMode, Vec<u32>) {
    if families.is_shared() {
        (vk::SharingMode::EXCLUSIVE, Vec::new())
    } else {
        (
            vk::SharingMode::CONCURRENT,
            vec![families.graphics, families.present],
        )
    }
}

/// Calculate swapchain extent.
pub fn calculate_extent(
    capabilities: &vk::SurfaceCapabilitiesKHR,
    desired_width: u32,
    desired_height: u32,
) -> vk::Extent2D {
    if capabilities.current_extent.width != u32::MAX {
        capabilities.current_extent
    } else {
        vk::Extent2D {
            width: desired_width.clamp(
                capabilities.min_image_extent.width,
                capabilities.max_image_extent.width,
            ),
            height: desired_height.clamp(
                capabilities.min_image_extent.height,
                capabilities.max_image_extent.height,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caps(min: u32, max: u32) -> vk::SurfaceCapabilitiesKHR {
        vk::SurfaceCapabilitiesKHR::default()
            .min_image_count(min)
            .max_image_count(max)
    }

    #[test]
    fn image_count_is_truncated_midpoint() {
        assert_eq!(select_image_count(&caps(2, 4)), 3);
        assert_eq!(select_image_count(&caps(2, 3)), 2);
        assert_eq!(select_image_count(&caps(1, 1)), 1);
        assert_eq!(select_image_count(&caps(3, 8)), 5);
    }

    #[test]
    fn unbounded_image_count_uses_one_above_minimum() {
        assert_eq!(select_image_count(&caps(2, 0)), 3);
    }

    #[test]
    fn mailbox_is_preferred() {
        let modes = [vk::PresentModeKHR::FIFO, vk::PresentModeKHR::MAILBOX];
        assert_eq!(select_present_mode(&modes), vk::PresentModeKHR::MAILBOX);
    }

    #[test]
    fn fifo_is_the_fallback() {
        let modes = [vk::PresentModeKHR::IMMEDIATE, vk::PresentModeKHR::FIFO_RELAXED];
        assert_eq!(select_present_mode(&modes), vk::PresentModeKHR::FIFO);
        assert_eq!(select_present_mode(&[]), vk::PresentModeKHR::FIFO);
    }

    #[test]
    fn sharing_follows_family_relationship() {
        let shared = QueueFamilies { graphics: 1, present: 1 };
        assert_eq!(sharing_mode(shared), (vk::SharingMode::EXCLUSIVE, vec![]));

        let distinct = QueueFamilies { graphics: 0, present: 2 };
        assert_eq!(sharing_mode(distinct), (vk::SharingMode::CONCURRENT, vec![0, 2]));
    }

    #[test]
    fn srgb_format_is_preferred() {
        let unorm = vk::SurfaceFormatKHR {
            format: vk::Format::B8G8R8A8_UNORM,
            color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
        };
        let srgb = vk::SurfaceFormatKHR {
            format: vk::Format::B8G8R8A8_SRGB,
            color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
        };
        let selected = select_surface_format(&[unorm, srgb]).unwrap();
        assert_eq!(selected.format, srgb.format);
        let selected = select_surface_format(&[unorm]).unwrap();
        assert_eq!(selected.format, unorm.format);
        assert_eq!(
            select_surface_format(&[]).unwrap_err(),
            GpuError::Vulkan(vk::Result::ERROR_FORMAT_NOT_SUPPORTED)
        );
    }

    #[test]
    fn current_extent_wins_over_window_size() {
        let mut capabilities = caps(2, 3);
        capabilities.current_extent = vk::Extent2D { width: 640, height: 480 };
        assert_eq!(
            calculate_extent(&capabilities, 1920, 1080),
            vk::Extent2D { width: 640, height: 480 }
        );
    }

    #[test]
    fn undefined_extent_clamps_window_size() {
        let mut capabilities = caps(2, 3);
        capabilities.current_extent = vk::Extent2D { width: u32::MAX, height: u32::MAX };
        capabilities.min_image_extent = vk::Extent2D { width: 100, height: 100 };
        capabilities.max_image_extent = vk::Extent2D { width: 1000, height: 1000 };
        assert_eq!(
            calculate_extent(&capabilities, 1920, 50),
            vk::Extent2D { width: 1000, height: 100 }
        );
    }
}
