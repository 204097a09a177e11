//! Native driver seam.
//!
//! Every Vulkan call the engine makes goes through one of these traits. The
//! production implementation lives in [`crate::loader`]; tests substitute an
//! allocation-tracking mock.
//!
//! Enumerating methods follow the native two-call protocol: with `out` set to
//! `None` they write the element count, with a buffer they fill at most
//! `*count` elements and write back how many were filled.

use crate::surface::WindowHandles;
use ash::prelude::VkResult;
use ash::vk;

/// Loader-scope entry points.
pub trait EntryDriver {
    /// `vkEnumerateInstanceLayerProperties`.
    fn enumerate_instance_layers(
        &self,
        count: &mut u32,
        out: Option<&mut [vk::LayerProperties]>,
    ) -> vk::Result;

    /// `vkEnumerateInstanceExtensionProperties` for the implicit layer set.
    fn enumerate_instance_extensions(
        &self,
        count: &mut u32,
        out: Option<&mut [vk::ExtensionProperties]>,
    ) -> vk::Result;

    /// `vkCreateInstance`.
    ///
    /// # Safety
    /// Every pointer reachable from `info` must be valid for the call.
    unsafe fn create_instance(
        &self,
        info: &vk::InstanceCreateInfo<'_>,
    ) -> VkResult<Box<dyn InstanceDriver>>;
}

/// Instance-scope entry points.
pub trait InstanceDriver: Send + Sync {
    /// Raw instance handle.
    fn handle(&self) -> vk::Instance;

    /// `vkEnumeratePhysicalDevices`.
    fn enumerate_physical_devices(
        &self,
        count: &mut u32,
        out: Option<&mut [vk::PhysicalDevice]>,
    ) -> vk::Result;

    /// `vkGetPhysicalDeviceProperties`.
    fn physical_device_properties(
        &self,
        physical_device: vk::PhysicalDevice,
    ) -> vk::PhysicalDeviceProperties;

    /// `vkGetPhysicalDeviceFeatures`.
    fn physical_device_features(&self, physical_device: vk::PhysicalDevice)
        -> vk::PhysicalDeviceFeatures;

    /// `vkGetPhysicalDeviceQueueFamilyProperties`. Cannot fail.
    fn queue_family_properties(
        &self,
        physical_device: vk::PhysicalDevice,
        count: &mut u32,
        out: Option<&mut [vk::QueueFamilyProperties]>,
    );

    /// `vkEnumerateDeviceLayerProperties`.
    fn enumerate_device_layers(
        &self,
        physical_device: vk::PhysicalDevice,
        count: &mut u32,
        out: Option<&mut [vk::LayerProperties]>,
    ) -> vk::Result;

    /// `vkEnumerateDeviceExtensionProperties` for the implicit layer set.
    fn enumerate_device_extensions(
        &self,
        physical_device: vk::PhysicalDevice,
        count: &mut u32,
        out: Option<&mut [vk::ExtensionProperties]>,
    ) -> vk::Result;

    /// `vkGetPhysicalDeviceSurfaceSupportKHR`.
    fn surface_support(
        &self,
        physical_device: vk::PhysicalDevice,
        queue_family: u32,
        surface: vk::SurfaceKHR,
    ) -> VkResult<bool>;

    /// `vkGetPhysicalDeviceSurfaceCapabilitiesKHR`.
    fn surface_capabilities(
        &self,
        physical_device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> VkResult<vk::SurfaceCapabilitiesKHR>;

    /// `vkGetPhysicalDeviceSurfaceFormatsKHR`.
    fn surface_formats(
        &self,
        physical_device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
        count: &mut u32,
        out: Option<&mut [vk::SurfaceFormatKHR]>,
    ) -> vk::Result;

    /// `vkGetPhysicalDeviceSurfacePresentModesKHR`.
    fn surface_present_modes(
        &self,
        physical_device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
        count: &mut u32,
        out: Option<&mut [vk::PresentModeKHR]>,
    ) -> vk::Result;

    /// Create a presentation surface for a platform window.
    ///
    /// # Safety
    /// The window behind `window` must outlive the surface.
    unsafe fn create_surface(&self, window: &WindowHandles) -> VkResult<vk::SurfaceKHR>;

    /// `vkDestroySurfaceKHR`.
    ///
    /// # Safety
    /// The surface must not be in use by any swapchain.
    unsafe fn destroy_surface(&self, surface: vk::SurfaceKHR);

    /// Whether the debug-report entry points resolve on this instance.
    fn debug_report_available(&self) -> bool;

    /// `vkCreateDebugReportCallbackEXT`.
    ///
    /// # Safety
    /// [`Self::debug_report_available`] must have returned `true`.
    unsafe fn create_debug_report_callback(
        &self,
        info: &vk::DebugReportCallbackCreateInfoEXT<'_>,
    ) -> VkResult<vk::DebugReportCallbackEXT>;

    /// `vkDestroyDebugReportCallbackEXT`.
    ///
    /// # Safety
    /// The callback must have been created by this instance.
    unsafe fn destroy_debug_report_callback(&self, callback: vk::DebugReportCallbackEXT);

    /// `vkCreateDevice`.
    ///
    /// # Safety
    /// Every pointer reachable from `info` must be valid for the call.
    unsafe fn create_device(
        &self,
        physical_device: vk::PhysicalDevice,
        info: &vk::DeviceCreateInfo<'_>,
    ) -> VkResult<Box<dyn DeviceDriver>>;

    /// `vkDestroyInstance`.
    ///
    /// # Safety
    /// Every object created from this instance must already be destroyed.
    unsafe fn destroy_instance(&self);
}

/// Device-scope entry points.
///
/// # Safety
/// All `unsafe` methods require the handles passed in to belong to this
/// device and, for destroy calls, to no longer be in use.
#[allow(clippy::missing_safety_doc)]
pub trait DeviceDriver: Send + Sync {
    /// Raw device handle.
    fn handle(&self) -> vk::Device;

    /// `vkGetDeviceQueue`.
    unsafe fn get_device_queue(&self, queue_family: u32, queue_index: u32) -> vk::Queue;

    /// `vkCreateSwapchainKHR`.
    unsafe fn create_swapchain(
        &self,
        info: &vk::SwapchainCreateInfoKHR<'_>,
    ) -> VkResult<vk::SwapchainKHR>;

    /// `vkDestroySwapchainKHR`.
    unsafe fn destroy_swapchain(&self, swapchain: vk::SwapchainKHR);

    /// `vkGetSwapchainImagesKHR`.
    unsafe fn swapchain_images(
        &self,
        swapchain: vk::SwapchainKHR,
        count: &mut u32,
        out: Option<&mut [vk::Image]>,
    ) -> vk::Result;

    unsafe fn create_image_view(&self, info: &vk::ImageViewCreateInfo<'_>)
        -> VkResult<vk::ImageView>;
    unsafe fn destroy_image_view(&self, view: vk::ImageView);

    unsafe fn create_command_pool(
        &self,
        info: &vk::CommandPoolCreateInfo<'_>,
    ) -> VkResult<vk::CommandPool>;
    unsafe fn destroy_command_pool(&self, pool: vk::CommandPool);

    /// `vkAllocateCommandBuffers`; returns `command_buffer_count` buffers.
    unsafe fn allocate_command_buffers(
        &self,
        info: &vk::CommandBufferAllocateInfo<'_>,
    ) -> VkResult<Vec<vk::CommandBuffer>>;
    unsafe fn free_command_buffers(&self, pool: vk::CommandPool, buffers: &[vk::CommandBuffer]);

    unsafe fn create_render_pass(&self, info: &vk::RenderPassCreateInfo<'_>)
        -> VkResult<vk::RenderPass>;
    unsafe fn destroy_render_pass(&self, render_pass: vk::RenderPass);

    unsafe fn create_shader_module(
        &self,
        info: &vk::ShaderModuleCreateInfo<'_>,
    ) -> VkResult<vk::ShaderModule>;
    unsafe fn destroy_shader_module(&self, module: vk::ShaderModule);

    unsafe fn create_sampler(&self, info: &vk::SamplerCreateInfo<'_>) -> VkResult<vk::Sampler>;
    unsafe fn destroy_sampler(&self, sampler: vk::Sampler);

    unsafe fn create_descriptor_set_layout(
        &self,
        info: &vk::DescriptorSetLayoutCreateInfo<'_>,
    ) -> VkResult<vk::DescriptorSetLayout>;
    unsafe fn destroy_descriptor_set_layout(&self, layout: vk::DescriptorSetLayout);

    unsafe fn create_pipeline_layout(
        &self,
        info: &vk::PipelineLayoutCreateInfo<'_>,
    ) -> VkResult<vk::PipelineLayout>;
    unsafe fn destroy_pipeline_layout(&self, layout: vk::PipelineLayout);

    /// `vkCreateGraphicsPipelines` for a single pipeline without a cache.
    unsafe fn create_graphics_pipeline(
        &self,
        info: &vk::GraphicsPipelineCreateInfo<'_>,
    ) -> VkResult<vk::Pipeline>;
    unsafe fn destroy_pipeline(&self, pipeline: vk::Pipeline);

    unsafe fn create_descriptor_pool(
        &self,
        info: &vk::DescriptorPoolCreateInfo<'_>,
    ) -> VkResult<vk::DescriptorPool>;
    unsafe fn destroy_descriptor_pool(&self, pool: vk::DescriptorPool);

    /// `vkDestroyDevice`.
    unsafe fn destroy_device(&self);
}
