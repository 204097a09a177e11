//! Owning wrappers for device-scope Vulkan objects.

use crate::device::Device;
use crate::driver::DeviceDriver;
use ash::vk;
use std::fmt;
use std::sync::Arc;

/// A Vulkan object type that is destroyed through the owning device.
pub trait DeviceObject: vk::Handle + Copy {
    /// Object name used in logs.
    const KIND: &'static str;

    /// Destroy the native object.
    ///
    /// # Safety
    /// The object must belong to `driver` and must not be in use.
    unsafe fn destroy(self, driver: &dyn DeviceDriver);
}

macro_rules! device_object {
    ($($ty:ty => $kind:literal, $destroy:ident;)*) => {
        $(
            impl DeviceObject for $ty {
                const KIND: &'static str = $kind;

                unsafe fn destroy(self, driver: &dyn DeviceDriver) {
                    unsafe { driver.$destroy(self) };
                }
            }
        )*
    };
}

device_object! {
    vk::SwapchainKHR => "swapchain", destroy_swapchain;
    vk::ImageView => "image view", destroy_image_view;
    vk::CommandPool => "command pool", destroy_command_pool;
    vk::RenderPass => "render pass", destroy_render_pass;
    vk::ShaderModule => "shader module", destroy_shader_module;
    vk::Sampler => "sampler", destroy_sampler;
    vk::DescriptorSetLayout => "descriptor set layout", destroy_descriptor_set_layout;
    vk::PipelineLayout => "pipeline layout", destroy_pipeline_layout;
    vk::Pipeline => "pipeline", destroy_pipeline;
    vk::DescriptorPool => "descriptor pool", destroy_descriptor_pool;
}

/// A device object destroyed exactly once, when this guard drops.
///
/// The guard keeps the device alive, so the device is always destroyed after
/// every object created from it.
pub struct Owned<H: DeviceObject> {
    device: Arc<Device>,
    handle: H,
}

impl<H: DeviceObject> Owned<H> {
    /// Take ownership of a freshly created object.
    pub fn new(device: &Arc<Device>, handle: H) -> Self {
        tracing::trace!(kind = H::KIND, handle = handle.as_raw(), "Created");
        Self {
            device: Arc::clone(device),
            handle,
        }
    }

    /// Raw handle.
    pub fn handle(&self) -> H {
        self.handle
    }

    /// Device that owns the object.
    pub fn device(&self) -> &Arc<Device> {
        &self.device
    }
}

impl<H: DeviceObject> Drop for Owned<H> {
    fn drop(&mut self) {
        tracing::debug!(kind = H::KIND, handle = self.handle.as_raw(), "Destroying");
        // SAFETY: the handle was created by this device and nothing else owns it.
        unsafe { self.handle.destroy(self.device.driver()) };
    }
}

impl<H: DeviceObject + fmt::Debug> fmt::Debug for Owned<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Owned").field(&self.handle).finish()
    }
}
