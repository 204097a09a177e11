//! Driver implementation backed by the system Vulkan loader.

use crate::driver::{DeviceDriver, EntryDriver, InstanceDriver};
use crate::error::{GpuError, Result};
use crate::surface::WindowHandles;
use ash::prelude::VkResult;
use ash::vk;
use std::ptr;

fn out_ptr<T>(out: Option<&mut [T]>) -> *mut T {
    out.map_or(ptr::null_mut(), <[T]>::as_mut_ptr)
}

/// The system Vulkan loader.
pub struct AshEntry {
    entry: ash::Entry,
}

impl AshEntry {
    /// Open the Vulkan library.
    pub fn load() -> Result<Self> {
        // SAFETY: the loaded library stays alive as long as `entry`.
        let entry = unsafe { ash::Entry::load() }.map_err(|e| GpuError::Loading(e.to_string()))?;
        Ok(Self { entry })
    }
}

impl EntryDriver for AshEntry {
    fn enumerate_instance_layers(
        &self,
        count: &mut u32,
        out: Option<&mut [vk::LayerProperties]>,
    ) -> vk::Result {
        unsafe { (self.entry.fp_v1_0().enumerate_instance_layer_properties)(count, out_ptr(out)) }
    }

    fn enumerate_instance_extensions(
        &self,
        count: &mut u32,
        out: Option<&mut [vk::ExtensionProperties]>,
    ) -> vk::Result {
        unsafe {
            (self.entry.fp_v1_0().enumerate_instance_extension_properties)(
                ptr::null(),
                count,
                out_ptr(out),
            )
        }
    }

    #[allow(deprecated)]
    unsafe fn create_instance(
        &self,
        info: &vk::InstanceCreateInfo<'_>,
    ) -> VkResult<Box<dyn InstanceDriver>> {
        let instance = unsafe { self.entry.create_instance(info, None) }?;
        let surface = ash::khr::surface::Instance::new(&self.entry, &instance);

        let proc_name = c"vkCreateDebugReportCallbackEXT";
        let debug_report =
            unsafe { self.entry.get_instance_proc_addr(instance.handle(), proc_name.as_ptr()) }
                .map(|_| ash::ext::debug_report::Instance::new(&self.entry, &instance));

        Ok(Box::new(AshInstance {
            entry: self.entry.clone(),
            instance,
            surface,
            debug_report,
        }))
    }
}

/// A live `VkInstance` with its extension loaders.
pub struct AshInstance {
    entry: ash::Entry,
    instance: ash::Instance,
    surface: ash::khr::surface::Instance,
    debug_report: Option<ash::ext::debug_report::Instance>,
}

impl InstanceDriver for AshInstance {
    fn handle(&self) -> vk::Instance {
        self.instance.handle()
    }

    fn enumerate_physical_devices(
        &self,
        count: &mut u32,
        out: Option<&mut [vk::PhysicalDevice]>,
    ) -> vk::Result {
        unsafe {
            (self.instance.fp_v1_0().enumerate_physical_devices)(
                self.instance.handle(),
                count,
                out_ptr(out),
            )
        }
    }

    fn physical_device_properties(
        &self,
        physical_device: vk::PhysicalDevice,
    ) -> vk::PhysicalDeviceProperties {
        unsafe { self.instance.get_physical_device_properties(physical_device) }
    }

    fn physical_device_features(
        &self,
        physical_device: vk::PhysicalDevice,
    ) -> vk::PhysicalDeviceFeatures {
        unsafe { self.instance.get_physical_device_features(physical_device) }
    }

    fn queue_family_properties(
        &self,
        physical_device: vk::PhysicalDevice,
        count: &mut u32,
        out: Option<&mut [vk::QueueFamilyProperties]>,
    ) {
        unsafe {
            (self.instance.fp_v1_0().get_physical_device_queue_family_properties)(
                physical_device,
                count,
                out_ptr(out),
            );
        }
    }

    fn enumerate_device_layers(
        &self,
        physical_device: vk::PhysicalDevice,
        count: &mut u32,
        out: Option<&mut [vk::LayerProperties]>,
    ) -> vk::Result {
        unsafe {
            (self.instance.fp_v1_0().enumerate_device_layer_properties)(
                physical_device,
                count,
                out_ptr(out),
            )
        }
    }

    fn enumerate_device_extensions(
        &self,
        physical_device: vk::PhysicalDevice,
        count: &mut u32,
        out: Option<&mut [vk::ExtensionProperties]>,
    ) -> vk::Result {
        unsafe {
            (self.instance.fp_v1_0().enumerate_device_extension_properties)(
                physical_device,
                ptr::null(),
                count,
                out_ptr(out),
            )
        }
    }

    fn surface_support(
        &self,
        physical_device: vk::PhysicalDevice,
        queue_family: u32,
        surface: vk::SurfaceKHR,
    ) -> VkResult<bool> {
        unsafe {
            self.surface
                .get_physical_device_surface_support(physical_device, queue_family, surface)
        }
    }

    fn surface_capabilities(
        &self,
        physical_device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> VkResult<vk::SurfaceCapabilitiesKHR> {
        unsafe {
            self.surface
                .get_physical_device_surface_capabilities(physical_device, surface)
        }
    }

    fn surface_formats(
        &self,
        physical_device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
        count: &mut u32,
        out: Option<&mut [vk::SurfaceFormatKHR]>,
    ) -> vk::Result {
        unsafe {
            (self.surface.fp().get_physical_device_surface_formats_khr)(
                physical_device,
                surface,
                count,
                out_ptr(out),
            )
        }
    }

    fn surface_present_modes(
        &self,
        physical_device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
        count: &mut u32,
        out: Option<&mut [vk::PresentModeKHR]>,
    ) -> vk::Result {
        unsafe {
            (self.surface.fp().get_physical_device_surface_present_modes_khr)(
                physical_device,
                surface,
                count,
                out_ptr(out),
            )
        }
    }

    unsafe fn create_surface(&self, window: &WindowHandles) -> VkResult<vk::SurfaceKHR> {
        unsafe {
            ash_window::create_surface(
                &self.entry,
                &self.instance,
                window.display,
                window.window,
                None,
            )
        }
    }

    unsafe fn destroy_surface(&self, surface: vk::SurfaceKHR) {
        unsafe { self.surface.destroy_surface(surface, None) };
    }

    fn debug_report_available(&self) -> bool {
        self.debug_report.is_some()
    }

    #[allow(deprecated)]
    unsafe fn create_debug_report_callback(
        &self,
        info: &vk::DebugReportCallbackCreateInfoEXT<'_>,
    ) -> VkResult<vk::DebugReportCallbackEXT> {
        match &self.debug_report {
            Some(loader) => unsafe { loader.create_debug_report_callback(info, None) },
            None => Err(vk::Result::ERROR_EXTENSION_NOT_PRESENT),
        }
    }

    #[allow(deprecated)]
    unsafe fn destroy_debug_report_callback(&self, callback: vk::DebugReportCallbackEXT) {
        if let Some(loader) = &self.debug_report {
            unsafe { loader.destroy_debug_report_callback(callback, None) };
        }
    }

    unsafe fn create_device(
        &self,
        physical_device: vk::PhysicalDevice,
        info: &vk::DeviceCreateInfo<'_>,
    ) -> VkResult<Box<dyn DeviceDriver>> {
        let device = unsafe { self.instance.create_device(physical_device, info, None) }?;
        let swapchain = ash::khr::swapchain::Device::new(&self.instance, &device);
        Ok(Box::new(AshDevice { device, swapchain }))
    }

    unsafe fn destroy_instance(&self) {
        unsafe { self.instance.destroy_instance(None) };
    }
}

/// A live `VkDevice` with its swapchain loader.
pub struct AshDevice {
    device: ash::Device,
    swapchain: ash::khr::swapchain::Device,
}

impl DeviceDriver for AshDevice {
    fn handle(&self) -> vk::Device {
        self.device.handle()
    }

    unsafe fn get_device_queue(&self, queue_family: u32, queue_index: u32) -> vk::Queue {
        unsafe { self.device.get_device_queue(queue_family, queue_index) }
    }

    unsafe fn create_swapchain(
        &self,
        info: &vk::SwapchainCreateInfoKHR<'_>,
    ) -> VkResult<vk::SwapchainKHR> {
        unsafe { self.swapchain.create_swapchain(info, None) }
    }

    unsafe fn destroy_swapchain(&self, swapchain: vk::SwapchainKHR) {
        unsafe { self.swapchain.destroy_swapchain(swapchain, None) };
    }

    unsafe fn swapchain_images(
        &self,
        swapchain: vk::SwapchainKHR,
        count: &mut u32,
        out: Option<&mut [vk::Image]>,
    ) -> vk::Result {
        unsafe {
            (self.swapchain.fp().get_swapchain_images_khr)(
                self.device.handle(),
                swapchain,
                count,
                out_ptr(out),
            )
        }
    }

    unsafe fn create_image_view(
        &self,
        info: &vk::ImageViewCreateInfo<'_>,
    ) -> VkResult<vk::ImageView> {
        unsafe { self.device.create_image_view(info, None) }
    }

    unsafe fn destroy_image_view(&self, view: vk::ImageView) {
        unsafe { self.device.destroy_image_view(view, None) };
    }

    unsafe fn create_command_pool(
        &self,
        info: &vk::CommandPoolCreateInfo<'_>,
    ) -> VkResult<vk::CommandPool> {
        unsafe { self.device.create_command_pool(info, None) }
    }

    unsafe fn destroy_command_pool(&self, pool: vk::CommandPool) {
        unsafe { self.device.destroy_command_pool(pool, None) };
    }

    unsafe fn allocate_command_buffers(
        &self,
        info: &vk::CommandBufferAllocateInfo<'_>,
    ) -> VkResult<Vec<vk::CommandBuffer>> {
        unsafe { self.device.allocate_command_buffers(info) }
    }

    unsafe fn free_command_buffers(&self, pool: vk::CommandPool, buffers: &[vk::CommandBuffer]) {
        unsafe { self.device.free_command_buffers(pool, buffers) };
    }

    unsafe fn create_render_pass(
        &self,
        info: &vk::RenderPassCreateInfo<'_>,
    ) -> VkResult<vk::RenderPass> {
        unsafe { self.device.create_render_pass(info, None) }
    }

    unsafe fn destroy_render_pass(&self, render_pass: vk::RenderPass) {
        unsafe { self.device.destroy_render_pass(render_pass, None) };
    }

    unsafe fn create_shader_module(
        &self,
        info: &vk::ShaderModuleCreateInfo<'_>,
    ) -> VkResult<vk::ShaderModule> {
        unsafe { self.device.create_shader_module(info, None) }
    }

    unsafe fn destroy_shader_module(&self, module: vk::ShaderModule) {
        unsafe { self.device.destroy_shader_module(module, None) };
    }

    unsafe fn create_sampler(&self, info: &vk::SamplerCreateInfo<'_>) -> VkResult<vk::Sampler> {
        unsafe { self.device.create_sampler(info, None) }
    }

    unsafe fn destroy_sampler(&self, sampler: vk::Sampler) {
        unsafe { self.device.destroy_sampler(sampler, None) };
    }

    unsafe fn create_descriptor_set_layout(
        &self,
        info: &vk::DescriptorSetLayoutCreateInfo<'_>,
    ) -> VkResult<vk::DescriptorSetLayout> {
        unsafe { self.device.create_descriptor_set_layout(info, None) }
    }

    unsafe fn destroy_descriptor_set_layout(&self, layout: vk::DescriptorSetLayout) {
        unsafe { self.device.destroy_descriptor_set_layout(layout, None) };
    }

    unsafe fn create_pipeline_layout(
        &self,
        info: &vk::PipelineLayoutCreateInfo<'_>,
    ) -> VkResult<vk::PipelineLayout> {
        unsafe { self.device.create_pipeline_layout(info, None) }
    }

    unsafe fn destroy_pipeline_layout(&self, layout: vk::PipelineLayout) {
        unsafe { self.device.destroy_pipeline_layout(layout, None) };
    }

    unsafe fn create_graphics_pipeline(
        &self,
        info: &vk::GraphicsPipelineCreateInfo<'_>,
    ) -> VkResult<vk::Pipeline> {
        let pipelines = unsafe {
            self.device.create_graphics_pipelines(
                vk::PipelineCache::null(),
                std::slice::from_ref(info),
                None,
            )
        }
        .map_err(|(_, e)| e)?;
        pipelines
            .into_iter()
            .next()
            .ok_or(vk::Result::ERROR_INITIALIZATION_FAILED)
    }

    unsafe fn destroy_pipeline(&self, pipeline: vk::Pipeline) {
        unsafe { self.device.destroy_pipeline(pipeline, None) };
    }

    unsafe fn create_descriptor_pool(
        &self,
        info: &vk::DescriptorPoolCreateInfo<'_>,
    ) -> VkResult<vk::DescriptorPool> {
        unsafe { self.device.create_descriptor_pool(info, None) }
    }

    unsafe fn destroy_descriptor_pool(&self, pool: vk::DescriptorPool) {
        unsafe { self.device.destroy_descriptor_pool(pool, None) };
    }

    unsafe fn destroy_device(&self) {
        unsafe { self.device.destroy_device(None) };
    }
}
