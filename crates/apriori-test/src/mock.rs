//! Mock Vulkan driver.
//!
//! Implements the three driver traits against a configurable fake GPU
//! catalog. Every object the engine creates is tracked in a shared
//! [`Ledger`], so tests can assert that teardown released everything exactly
//! once and in a valid order, and can inject a failure at any fallible call.

use crate::ledger::{DeviceRequest, Ledger, ObjectKind, PipelineRequest, SwapchainRequest};
use apriori_gpu::instance::{surface_extensions, VALIDATION_LAYER};
use apriori_gpu::{
    DeviceDriver, EntryDriver, Instance, InstanceBuilder, InstanceDriver, OverlayShaders,
    WindowHandles,
};
use ash::prelude::VkResult;
use ash::vk::{self, Handle};
use parking_lot::{Mutex, MutexGuard};
use raw_window_handle::{RawDisplayHandle, RawWindowHandle, XlibDisplayHandle, XlibWindowHandle};
use std::ffi::{c_char, CStr, CString};
use std::sync::Arc;

const PHYSICAL_DEVICE_BASE: u64 = 0x100;
const QUEUE_BASE: u64 = 0x7000_0000;

/// One queue family of a mock GPU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockQueueFamily {
    pub flags: vk::QueueFlags,
    pub queue_count: u32,
    /// Whether the family can present to any surface.
    pub present: bool,
}

impl MockQueueFamily {
    pub const fn new(flags: vk::QueueFlags, queue_count: u32, present: bool) -> Self {
        Self {
            flags,
            queue_count,
            present,
        }
    }

    /// Single-queue graphics family.
    pub const fn graphics(present: bool) -> Self {
        Self::new(vk::QueueFlags::GRAPHICS, 1, present)
    }

    /// Single-queue compute family.
    pub const fn compute(present: bool) -> Self {
        Self::new(vk::QueueFlags::COMPUTE, 1, present)
    }
}

/// A fake physical device.
#[derive(Debug, Clone)]
pub struct MockGpu {
    pub name: CString,
    pub device_type: vk::PhysicalDeviceType,
    pub sampler_anisotropy: bool,
    pub queue_families: Vec<MockQueueFamily>,
    pub layers: Vec<CString>,
    pub extensions: Vec<CString>,
}

impl MockGpu {
    /// A GPU with one graphics family of two present-capable queues.
    pub fn new(name: &CStr, device_type: vk::PhysicalDeviceType) -> Self {
        Self {
            name: name.to_owned(),
            device_type,
            sampler_anisotropy: false,
            queue_families: vec![MockQueueFamily::new(
                vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE | vk::QueueFlags::TRANSFER,
                2,
                true,
            )],
            layers: vec![VALIDATION_LAYER.to_owned()],
            extensions: vec![ash::khr::swapchain::NAME.to_owned()],
        }
    }

    pub fn discrete(name: &CStr) -> Self {
        Self::new(name, vk::PhysicalDeviceType::DISCRETE_GPU)
    }

    pub fn integrated(name: &CStr) -> Self {
        Self::new(name, vk::PhysicalDeviceType::INTEGRATED_GPU)
    }

    #[must_use]
    pub fn anisotropy(mut self, supported: bool) -> Self {
        self.sampler_anisotropy = supported;
        self
    }

    #[must_use]
    pub fn queue_families(mut self, families: Vec<MockQueueFamily>) -> Self {
        self.queue_families = families;
        self
    }
}

/// What the mock driver reports.
#[derive(Debug, Clone)]
pub struct MockConfig {
    pub instance_layers: Vec<CString>,
    pub instance_extensions: Vec<CString>,
    /// Whether the debug-report entry points resolve.
    pub debug_report: bool,
    pub gpus: Vec<MockGpu>,
    pub capabilities: vk::SurfaceCapabilitiesKHR,
    pub formats: Vec<vk::SurfaceFormatKHR>,
    pub present_modes: Vec<vk::PresentModeKHR>,
    /// Images per swapchain; `None` creates exactly the requested minimum.
    pub swapchain_images: Option<u32>,
}

impl Default for MockConfig {
    fn default() -> Self {
        let mut instance_extensions: Vec<CString> = surface_extensions()
            .into_iter()
            .map(CStr::to_owned)
            .collect();
        instance_extensions.push(ash::ext::debug_report::NAME.to_owned());

        Self {
            instance_layers: vec![VALIDATION_LAYER.to_owned()],
            instance_extensions,
            debug_report: true,
            gpus: vec![MockGpu::discrete(c"Mock Discrete GPU")],
            capabilities: vk::SurfaceCapabilitiesKHR::default()
                .min_image_count(2)
                .max_image_count(4)
                .current_extent(vk::Extent2D {
                    width: 800,
                    height: 600,
                })
                .min_image_extent(vk::Extent2D {
                    width: 1,
                    height: 1,
                })
                .max_image_extent(vk::Extent2D {
                    width: 4096,
                    height: 4096,
                })
                .max_image_array_layers(1)
                .supported_transforms(vk::SurfaceTransformFlagsKHR::IDENTITY)
                .current_transform(vk::SurfaceTransformFlagsKHR::IDENTITY)
                .supported_composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
                .supported_usage_flags(vk::ImageUsageFlags::COLOR_ATTACHMENT),
            formats: vec![vk::SurfaceFormatKHR {
                format: vk::Format::B8G8R8A8_SRGB,
                color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
            }],
            present_modes: vec![vk::PresentModeKHR::FIFO, vk::PresentModeKHR::MAILBOX],
            swapchain_images: None,
        }
    }
}

impl MockConfig {
    /// Default configuration with the given GPUs.
    pub fn with_gpus(gpus: Vec<MockGpu>) -> Self {
        Self {
            gpus,
            ..Self::default()
        }
    }
}

struct Shared {
    config: MockConfig,
    ledger: Mutex<Ledger>,
}

impl Shared {
    fn gpu(&self, physical_device: vk::PhysicalDevice) -> Option<&MockGpu> {
        let index = physical_device.as_raw().checked_sub(PHYSICAL_DEVICE_BASE)?;
        self.config.gpus.get(usize::try_from(index).ok()?)
    }

    fn enumerate<T: Clone>(
        &self,
        name: &'static str,
        items: &[T],
        count: &mut u32,
        out: Option<&mut [T]>,
    ) -> vk::Result {
        match self.ledger.lock().call(name) {
            Ok(()) => fill(items, count, out),
            Err(error) => error,
        }
    }
}

/// Answer one step of the two-call enumeration protocol.
fn fill<T: Clone>(items: &[T], count: &mut u32, out: Option<&mut [T]>) -> vk::Result {
    let available = items.len() as u32;
    let Some(out) = out else {
        *count = available;
        return vk::Result::SUCCESS;
    };

    let written = (*count).min(available).min(out.len() as u32) as usize;
    out[..written].clone_from_slice(&items[..written]);
    *count = written as u32;
    if written < items.len() {
        vk::Result::INCOMPLETE
    } else {
        vk::Result::SUCCESS
    }
}

/// Borrow a native array, treating null as empty.
unsafe fn raw_slice<'a, T>(ptr: *const T, len: u32) -> &'a [T] {
    if ptr.is_null() || len == 0 {
        &[]
    } else {
        unsafe { std::slice::from_raw_parts(ptr, len as usize) }
    }
}

unsafe fn raw_names(ptr: *const *const c_char, len: u32) -> Vec<CString> {
    unsafe { raw_slice(ptr, len) }
        .iter()
        .map(|&name| unsafe { CStr::from_ptr(name) }.to_owned())
        .collect()
}

fn layer_properties(names: &[CString]) -> Vec<vk::LayerProperties> {
    names
        .iter()
        .filter_map(|name| vk::LayerProperties::default().layer_name(name).ok())
        .collect()
}

fn extension_properties(names: &[CString]) -> Vec<vk::ExtensionProperties> {
    names
        .iter()
        .filter_map(|name| vk::ExtensionProperties::default().extension_name(name).ok())
        .collect()
}

/// Loader-scope mock. Cheap to clone; clones share one ledger.
#[derive(Clone)]
pub struct MockDriver {
    shared: Arc<Shared>,
}

impl Default for MockDriver {
    fn default() -> Self {
        Self::new(MockConfig::default())
    }
}

impl MockDriver {
    pub fn new(config: MockConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                config,
                ledger: Mutex::new(Ledger::default()),
            }),
        }
    }

    /// Lock the ledger. Do not hold the guard across engine calls.
    pub fn ledger(&self) -> MutexGuard<'_, Ledger> {
        self.shared.ledger.lock()
    }

    /// Fail the `n`-th fallible native call from now, counting from 0.
    pub fn fail_nth(&self, n: usize) {
        self.ledger().fail_nth(n);
    }

    pub fn config(&self) -> &MockConfig {
        &self.shared.config
    }

    /// Handle the mock reports for the GPU at `index`.
    pub fn physical_device(index: usize) -> vk::PhysicalDevice {
        vk::PhysicalDevice::from_raw(PHYSICAL_DEVICE_BASE + index as u64)
    }

    /// Build an instance with validation through this driver.
    pub fn instance(&self) -> apriori_gpu::Result<Instance> {
        InstanceBuilder::new()
            .app_name("apriori-test")
            .validation(true)
            .build_with(self)
    }
}

impl EntryDriver for MockDriver {
    fn enumerate_instance_layers(
        &self,
        count: &mut u32,
        out: Option<&mut [vk::LayerProperties]>,
    ) -> vk::Result {
        let layers = layer_properties(&self.shared.config.instance_layers);
        self.shared
            .enumerate("vkEnumerateInstanceLayerProperties", &layers, count, out)
    }

    fn enumerate_instance_extensions(
        &self,
        count: &mut u32,
        out: Option<&mut [vk::ExtensionProperties]>,
    ) -> vk::Result {
        let extensions = extension_properties(&self.shared.config.instance_extensions);
        self.shared
            .enumerate("vkEnumerateInstanceExtensionProperties", &extensions, count, out)
    }

    unsafe fn create_instance(
        &self,
        info: &vk::InstanceCreateInfo<'_>,
    ) -> VkResult<Box<dyn InstanceDriver>> {
        let config = &self.shared.config;
        let mut ledger = self.shared.ledger.lock();
        ledger.call("vkCreateInstance")?;

        let layers = unsafe { raw_names(info.pp_enabled_layer_names, info.enabled_layer_count) };
        let extensions =
            unsafe { raw_names(info.pp_enabled_extension_names, info.enabled_extension_count) };
        if layers.iter().any(|l| !config.instance_layers.contains(l)) {
            return Err(vk::Result::ERROR_LAYER_NOT_PRESENT);
        }
        if extensions
            .iter()
            .any(|e| !config.instance_extensions.contains(e))
        {
            return Err(vk::Result::ERROR_EXTENSION_NOT_PRESENT);
        }

        ledger.instance_request = Some((layers, extensions));
        let raw = ledger.create(ObjectKind::Instance, 0);
        Ok(Box::new(MockInstance {
            handle: vk::Instance::from_raw(raw),
            shared: Arc::clone(&self.shared),
        }))
    }
}

struct MockInstance {
    handle: vk::Instance,
    shared: Arc<Shared>,
}

impl InstanceDriver for MockInstance {
    fn handle(&self) -> vk::Instance {
        self.handle
    }

    fn enumerate_physical_devices(
        &self,
        count: &mut u32,
        out: Option<&mut [vk::PhysicalDevice]>,
    ) -> vk::Result {
        let devices: Vec<_> = (0..self.shared.config.gpus.len())
            .map(MockDriver::physical_device)
            .collect();
        self.shared
            .enumerate("vkEnumeratePhysicalDevices", &devices, count, out)
    }

    fn physical_device_properties(
        &self,
        physical_device: vk::PhysicalDevice,
    ) -> vk::PhysicalDeviceProperties {
        self.shared
            .ledger
            .lock()
            .note("vkGetPhysicalDeviceProperties");
        let Some(gpu) = self.shared.gpu(physical_device) else {
            return vk::PhysicalDeviceProperties::default();
        };
        let properties = vk::PhysicalDeviceProperties::default()
            .api_version(vk::API_VERSION_1_0)
            .device_type(gpu.device_type);
        properties.device_name(&gpu.name).unwrap_or(properties)
    }

    fn physical_device_features(
        &self,
        physical_device: vk::PhysicalDevice,
    ) -> vk::PhysicalDeviceFeatures {
        self.shared.ledger.lock().note("vkGetPhysicalDeviceFeatures");
        let anisotropy = self
            .shared
            .gpu(physical_device)
            .is_some_and(|gpu| gpu.sampler_anisotropy);
        vk::PhysicalDeviceFeatures::default().sampler_anisotropy(anisotropy)
    }

    fn queue_family_properties(
        &self,
        physical_device: vk::PhysicalDevice,
        count: &mut u32,
        out: Option<&mut [vk::QueueFamilyProperties]>,
    ) {
        self.shared
            .ledger
            .lock()
            .note("vkGetPhysicalDeviceQueueFamilyProperties");
        let families: Vec<_> = self
            .shared
            .gpu(physical_device)
            .map(|gpu| {
                gpu.queue_families
                    .iter()
                    .map(|family| {
                        vk::QueueFamilyProperties::default()
                            .queue_flags(family.flags)
                            .queue_count(family.queue_count)
                    })
                    .collect()
            })
            .unwrap_or_default();
        let _ = fill(&families, count, out);
    }

    fn enumerate_device_layers(
        &self,
        physical_device: vk::PhysicalDevice,
        count: &mut u32,
        out: Option<&mut [vk::LayerProperties]>,
    ) -> vk::Result {
        let layers = self
            .shared
            .gpu(physical_device)
            .map(|gpu| layer_properties(&gpu.layers))
            .unwrap_or_default();
        self.shared
            .enumerate("vkEnumerateDeviceLayerProperties", &layers, count, out)
    }

    fn enumerate_device_extensions(
        &self,
        physical_device: vk::PhysicalDevice,
        count: &mut u32,
        out: Option<&mut [vk::ExtensionProperties]>,
    ) -> vk::Result {
        let extensions = self
            .shared
            .gpu(physical_device)
            .map(|gpu| extension_properties(&gpu.extensions))
            .unwrap_or_default();
        self.shared
            .enumerate("vkEnumerateDeviceExtensionProperties", &extensions, count, out)
    }

    fn surface_support(
        &self,
        physical_device: vk::PhysicalDevice,
        queue_family: u32,
        surface: vk::SurfaceKHR,
    ) -> VkResult<bool> {
        let mut ledger = self.shared.ledger.lock();
        ledger.call("vkGetPhysicalDeviceSurfaceSupportKHR")?;
        if !ledger.is_live(surface.as_raw()) {
            ledger.violate(format!("surface {:#x} queried while not live", surface.as_raw()));
        }
        Ok(self
            .shared
            .gpu(physical_device)
            .and_then(|gpu| gpu.queue_families.get(queue_family as usize))
            .is_some_and(|family| family.present))
    }

    fn surface_capabilities(
        &self,
        _physical_device: vk::PhysicalDevice,
        _surface: vk::SurfaceKHR,
    ) -> VkResult<vk::SurfaceCapabilitiesKHR> {
        self.shared
            .ledger
            .lock()
            .call("vkGetPhysicalDeviceSurfaceCapabilitiesKHR")?;
        Ok(self.shared.config.capabilities)
    }

    fn surface_formats(
        &self,
        _physical_device: vk::PhysicalDevice,
        _surface: vk::SurfaceKHR,
        count: &mut u32,
        out: Option<&mut [vk::SurfaceFormatKHR]>,
    ) -> vk::Result {
        self.shared.enumerate(
            "vkGetPhysicalDeviceSurfaceFormatsKHR",
            &self.shared.config.formats,
            count,
            out,
        )
    }

    fn surface_present_modes(
        &self,
        _physical_device: vk::PhysicalDevice,
        _surface: vk::SurfaceKHR,
        count: &mut u32,
        out: Option<&mut [vk::PresentModeKHR]>,
    ) -> vk::Result {
        self.shared.enumerate(
            "vkGetPhysicalDeviceSurfacePresentModesKHR",
            &self.shared.config.present_modes,
            count,
            out,
        )
    }

    unsafe fn create_surface(&self, _window: &WindowHandles) -> VkResult<vk::SurfaceKHR> {
        let mut ledger = self.shared.ledger.lock();
        ledger.call("vkCreateSurfaceKHR")?;
        let raw = ledger.create(ObjectKind::Surface, self.handle.as_raw());
        Ok(vk::SurfaceKHR::from_raw(raw))
    }

    unsafe fn destroy_surface(&self, surface: vk::SurfaceKHR) {
        let mut ledger = self.shared.ledger.lock();
        ledger.note("vkDestroySurfaceKHR");
        let raw = surface.as_raw();
        let swapchains = ledger.live_where(|o| o.kind == ObjectKind::Swapchain && o.parent == raw);
        if !swapchains.is_empty() {
            ledger.violate(format!(
                "surface {raw:#x} destroyed with {} live swapchains",
                swapchains.len()
            ));
        }
        ledger.destroy(ObjectKind::Surface, raw);
    }

    fn debug_report_available(&self) -> bool {
        self.shared.config.debug_report
    }

    unsafe fn create_debug_report_callback(
        &self,
        _info: &vk::DebugReportCallbackCreateInfoEXT<'_>,
    ) -> VkResult<vk::DebugReportCallbackEXT> {
        let mut ledger = self.shared.ledger.lock();
        ledger.call("vkCreateDebugReportCallbackEXT")?;
        if !self.shared.config.debug_report {
            ledger.violate("debug reporter created while unavailable".to_string());
        }
        let raw = ledger.create(ObjectKind::DebugReporter, self.handle.as_raw());
        Ok(vk::DebugReportCallbackEXT::from_raw(raw))
    }

    unsafe fn destroy_debug_report_callback(&self, callback: vk::DebugReportCallbackEXT) {
        let mut ledger = self.shared.ledger.lock();
        ledger.note("vkDestroyDebugReportCallbackEXT");
        ledger.destroy(ObjectKind::DebugReporter, callback.as_raw());
    }

    unsafe fn create_device(
        &self,
        physical_device: vk::PhysicalDevice,
        info: &vk::DeviceCreateInfo<'_>,
    ) -> VkResult<Box<dyn DeviceDriver>> {
        let mut ledger = self.shared.ledger.lock();
        ledger.call("vkCreateDevice")?;
        let Some(gpu) = self.shared.gpu(physical_device) else {
            return Err(vk::Result::ERROR_INITIALIZATION_FAILED);
        };

        let mut queues = Vec::new();
        let mut slots = Vec::new();
        for queue in unsafe { raw_slice(info.p_queue_create_infos, info.queue_create_info_count) } {
            let family = queue.queue_family_index;
            let available = gpu
                .queue_families
                .get(family as usize)
                .map_or(0, |f| f.queue_count);
            if queue.queue_count == 0 || queue.queue_count > available {
                ledger.violate(format!(
                    "{} queues requested from family {family} with {available}",
                    queue.queue_count
                ));
                return Err(vk::Result::ERROR_INITIALIZATION_FAILED);
            }
            let priorities = unsafe { raw_slice(queue.p_queue_priorities, queue.queue_count) };
            queues.push((family, priorities.to_vec()));
            slots.extend((0..queue.queue_count).map(|index| (family, index)));
        }

        #[allow(deprecated)]
        let layers = unsafe { raw_names(info.pp_enabled_layer_names, info.enabled_layer_count) };
        let extensions =
            unsafe { raw_names(info.pp_enabled_extension_names, info.enabled_extension_count) };
        if extensions.iter().any(|e| !gpu.extensions.contains(e)) {
            return Err(vk::Result::ERROR_EXTENSION_NOT_PRESENT);
        }

        let sampler_anisotropy = unsafe { info.p_enabled_features.as_ref() }
            .is_some_and(|features| features.sampler_anisotropy == vk::TRUE);
        if sampler_anisotropy && !gpu.sampler_anisotropy {
            return Err(vk::Result::ERROR_FEATURE_NOT_PRESENT);
        }

        ledger.device_requests.push(DeviceRequest {
            queues,
            layers,
            extensions,
            sampler_anisotropy,
        });
        let raw = ledger.create(ObjectKind::Device, self.handle.as_raw());
        Ok(Box::new(MockDevice {
            handle: vk::Device::from_raw(raw),
            slots,
            shared: Arc::clone(&self.shared),
        }))
    }

    unsafe fn destroy_instance(&self) {
        let mut ledger = self.shared.ledger.lock();
        ledger.note("vkDestroyInstance");
        let children = ledger.live_where(|o| o.kind != ObjectKind::Instance);
        if !children.is_empty() {
            ledger.violate(format!(
                "instance destroyed with {} live children",
                children.len()
            ));
        }
        ledger.destroy(ObjectKind::Instance, self.handle.as_raw());
    }
}

struct MockDevice {
    handle: vk::Device,
    /// `(family, index)` of every queue requested at creation.
    slots: Vec<(u32, u32)>,
    shared: Arc<Shared>,
}

impl MockDevice {
    fn create<H: Handle>(&self, name: &'static str, kind: ObjectKind, parent: u64) -> VkResult<H> {
        let mut ledger = self.shared.ledger.lock();
        ledger.call(name)?;
        Ok(H::from_raw(ledger.create_in(kind, parent, self.handle.as_raw())))
    }

    fn destroy<H: Handle>(&self, name: &'static str, kind: ObjectKind, handle: H) {
        let mut ledger = self.shared.ledger.lock();
        ledger.note(name);
        ledger.destroy(kind, handle.as_raw());
    }

    fn device_child<H: Handle>(&self, name: &'static str, kind: ObjectKind) -> VkResult<H> {
        self.create(name, kind, self.handle.as_raw())
    }
}

impl DeviceDriver for MockDevice {
    fn handle(&self) -> vk::Device {
        self.handle
    }

    unsafe fn get_device_queue(&self, queue_family: u32, queue_index: u32) -> vk::Queue {
        let mut ledger = self.shared.ledger.lock();
        ledger.note("vkGetDeviceQueue");
        if !self.slots.contains(&(queue_family, queue_index)) {
            ledger.violate(format!(
                "queue {queue_index} of family {queue_family} was never requested"
            ));
        }
        vk::Queue::from_raw(
            QUEUE_BASE
                + (self.handle.as_raw() << 16)
                + (u64::from(queue_family) << 8)
                + u64::from(queue_index),
        )
    }

    unsafe fn create_swapchain(
        &self,
        info: &vk::SwapchainCreateInfoKHR<'_>,
    ) -> VkResult<vk::SwapchainKHR> {
        let mut ledger = self.shared.ledger.lock();
        ledger.call("vkCreateSwapchainKHR")?;

        let surface = info.surface.as_raw();
        if !ledger.is_live(surface) {
            ledger.violate(format!("swapchain created on dead surface {surface:#x}"));
        }
        let queue_family_indices =
            unsafe { raw_slice(info.p_queue_family_indices, info.queue_family_index_count) }
                .to_vec();
        ledger.swapchain_requests.push(SwapchainRequest {
            min_image_count: info.min_image_count,
            format: info.image_format,
            extent: info.image_extent,
            sharing_mode: info.image_sharing_mode,
            queue_family_indices,
            present_mode: info.present_mode,
        });

        let raw = ledger.create_in(ObjectKind::Swapchain, surface, self.handle.as_raw());
        let count = self
            .shared
            .config
            .swapchain_images
            .unwrap_or(info.min_image_count);
        let images = (0..count)
            .map(|_| vk::Image::from_raw(ledger.fresh_handle()))
            .collect();
        ledger.swapchain_images.insert(raw, images);
        Ok(vk::SwapchainKHR::from_raw(raw))
    }

    unsafe fn destroy_swapchain(&self, swapchain: vk::SwapchainKHR) {
        let mut ledger = self.shared.ledger.lock();
        ledger.note("vkDestroySwapchainKHR");
        let raw = swapchain.as_raw();
        let images = ledger.swapchain_images.remove(&raw).unwrap_or_default();
        let views = ledger.live_where(|o| {
            o.kind == ObjectKind::ImageView && images.iter().any(|i| i.as_raw() == o.parent)
        });
        if !views.is_empty() {
            ledger.violate(format!(
                "swapchain {raw:#x} destroyed with {} live image views",
                views.len()
            ));
        }
        ledger.destroy(ObjectKind::Swapchain, raw);
    }

    unsafe fn swapchain_images(
        &self,
        swapchain: vk::SwapchainKHR,
        count: &mut u32,
        out: Option<&mut [vk::Image]>,
    ) -> vk::Result {
        let mut ledger = self.shared.ledger.lock();
        if let Err(error) = ledger.call("vkGetSwapchainImagesKHR") {
            return error;
        }
        let images = ledger
            .swapchain_images
            .get(&swapchain.as_raw())
            .cloned()
            .unwrap_or_default();
        fill(&images, count, out)
    }

    unsafe fn create_image_view(
        &self,
        info: &vk::ImageViewCreateInfo<'_>,
    ) -> VkResult<vk::ImageView> {
        self.create("vkCreateImageView", ObjectKind::ImageView, info.image.as_raw())
    }

    unsafe fn destroy_image_view(&self, view: vk::ImageView) {
        self.destroy("vkDestroyImageView", ObjectKind::ImageView, view);
    }

    unsafe fn create_command_pool(
        &self,
        _info: &vk::CommandPoolCreateInfo<'_>,
    ) -> VkResult<vk::CommandPool> {
        self.device_child("vkCreateCommandPool", ObjectKind::CommandPool)
    }

    unsafe fn destroy_command_pool(&self, pool: vk::CommandPool) {
        let mut ledger = self.shared.ledger.lock();
        ledger.note("vkDestroyCommandPool");
        let raw = pool.as_raw();
        let buffers = ledger.live_where(|o| o.kind == ObjectKind::CommandBuffer && o.parent == raw);
        if !buffers.is_empty() {
            ledger.violate(format!(
                "command pool {raw:#x} destroyed with {} live buffers",
                buffers.len()
            ));
        }
        ledger.destroy(ObjectKind::CommandPool, raw);
    }

    unsafe fn allocate_command_buffers(
        &self,
        info: &vk::CommandBufferAllocateInfo<'_>,
    ) -> VkResult<Vec<vk::CommandBuffer>> {
        let mut ledger = self.shared.ledger.lock();
        ledger.call("vkAllocateCommandBuffers")?;
        let pool = info.command_pool.as_raw();
        if !ledger.is_live(pool) {
            ledger.violate(format!("buffers allocated from dead pool {pool:#x}"));
        }
        Ok((0..info.command_buffer_count)
            .map(|_| {
                let raw = ledger.create_in(ObjectKind::CommandBuffer, pool, self.handle.as_raw());
                vk::CommandBuffer::from_raw(raw)
            })
            .collect())
    }

    unsafe fn free_command_buffers(&self, pool: vk::CommandPool, buffers: &[vk::CommandBuffer]) {
        let mut ledger = self.shared.ledger.lock();
        ledger.note("vkFreeCommandBuffers");
        let pool = pool.as_raw();
        for buffer in buffers {
            let raw = buffer.as_raw();
            if ledger.parent_of(raw).is_some_and(|parent| parent != pool) {
                ledger.violate(format!("buffer {raw:#x} freed through foreign pool {pool:#x}"));
            }
            ledger.destroy(ObjectKind::CommandBuffer, raw);
        }
    }

    unsafe fn create_render_pass(
        &self,
        _info: &vk::RenderPassCreateInfo<'_>,
    ) -> VkResult<vk::RenderPass> {
        self.device_child("vkCreateRenderPass", ObjectKind::RenderPass)
    }

    unsafe fn destroy_render_pass(&self, render_pass: vk::RenderPass) {
        self.destroy("vkDestroyRenderPass", ObjectKind::RenderPass, render_pass);
    }

    unsafe fn create_shader_module(
        &self,
        info: &vk::ShaderModuleCreateInfo<'_>,
    ) -> VkResult<vk::ShaderModule> {
        if info.code_size == 0 || info.code_size % 4 != 0 {
            return Err(vk::Result::ERROR_INVALID_SHADER_NV);
        }
        self.device_child("vkCreateShaderModule", ObjectKind::ShaderModule)
    }

    unsafe fn destroy_shader_module(&self, module: vk::ShaderModule) {
        self.destroy("vkDestroyShaderModule", ObjectKind::ShaderModule, module);
    }

    unsafe fn create_sampler(&self, _info: &vk::SamplerCreateInfo<'_>) -> VkResult<vk::Sampler> {
        self.device_child("vkCreateSampler", ObjectKind::Sampler)
    }

    unsafe fn destroy_sampler(&self, sampler: vk::Sampler) {
        self.destroy("vkDestroySampler", ObjectKind::Sampler, sampler);
    }

    unsafe fn create_descriptor_set_layout(
        &self,
        _info: &vk::DescriptorSetLayoutCreateInfo<'_>,
    ) -> VkResult<vk::DescriptorSetLayout> {
        self.device_child("vkCreateDescriptorSetLayout", ObjectKind::DescriptorSetLayout)
    }

    unsafe fn destroy_descriptor_set_layout(&self, layout: vk::DescriptorSetLayout) {
        self.destroy(
            "vkDestroyDescriptorSetLayout",
            ObjectKind::DescriptorSetLayout,
            layout,
        );
    }

    unsafe fn create_pipeline_layout(
        &self,
        _info: &vk::PipelineLayoutCreateInfo<'_>,
    ) -> VkResult<vk::PipelineLayout> {
        self.device_child("vkCreatePipelineLayout", ObjectKind::PipelineLayout)
    }

    unsafe fn destroy_pipeline_layout(&self, layout: vk::PipelineLayout) {
        self.destroy("vkDestroyPipelineLayout", ObjectKind::PipelineLayout, layout);
    }

    unsafe fn create_graphics_pipeline(
        &self,
        info: &vk::GraphicsPipelineCreateInfo<'_>,
    ) -> VkResult<vk::Pipeline> {
        let request = unsafe {
            PipelineRequest {
                stage_count: info.stage_count,
                vertex_attribute_count: info
                    .p_vertex_input_state
                    .as_ref()
                    .map_or(0, |s| s.vertex_attribute_description_count),
                viewport_count: info.p_viewport_state.as_ref().map_or(0, |s| s.viewport_count),
                blend_attachment_count: info
                    .p_color_blend_state
                    .as_ref()
                    .map_or(0, |s| s.attachment_count),
                subpass: info.subpass,
            }
        };
        let pipeline = self.device_child("vkCreateGraphicsPipelines", ObjectKind::Pipeline)?;
        self.shared.ledger.lock().pipeline_requests.push(request);
        Ok(pipeline)
    }

    unsafe fn destroy_pipeline(&self, pipeline: vk::Pipeline) {
        self.destroy("vkDestroyPipeline", ObjectKind::Pipeline, pipeline);
    }

    unsafe fn create_descriptor_pool(
        &self,
        _info: &vk::DescriptorPoolCreateInfo<'_>,
    ) -> VkResult<vk::DescriptorPool> {
        self.device_child("vkCreateDescriptorPool", ObjectKind::DescriptorPool)
    }

    unsafe fn destroy_descriptor_pool(&self, pool: vk::DescriptorPool) {
        self.destroy("vkDestroyDescriptorPool", ObjectKind::DescriptorPool, pool);
    }

    unsafe fn destroy_device(&self) {
        let mut ledger = self.shared.ledger.lock();
        ledger.note("vkDestroyDevice");
        let children = ledger.live_children_of(self.handle.as_raw());
        if children > 0 {
            ledger.violate(format!("device destroyed with {children} live children"));
        }
        ledger.destroy(ObjectKind::Device, self.handle.as_raw());
    }
}

/// Placeholder window handles; the mock never dereferences them.
pub fn window_handles() -> WindowHandles {
    WindowHandles {
        display: RawDisplayHandle::Xlib(XlibDisplayHandle::new(None, 0)),
        window: RawWindowHandle::Xlib(XlibWindowHandle::new(1)),
    }
}

const SPIRV_HEADER: [u32; 5] = [0x0723_0203, 0x0001_0000, 0, 1, 0];

/// Minimal SPIR-V module headers standing in for the overlay shaders.
#[derive(Debug, Clone, Copy, Default)]
pub struct MockShaders;

impl OverlayShaders for MockShaders {
    fn vertex_overlay(&self) -> &[u32] {
        &SPIRV_HEADER
    }

    fn fragment_overlay(&self) -> &[u32] {
        &SPIRV_HEADER
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fill_follows_two_call_protocol() {
        let items = [1u32, 2, 3];
        let mut count = 0;
        assert_eq!(fill(&items, &mut count, None), vk::Result::SUCCESS);
        assert_eq!(count, 3);

        let mut out = [0u32; 2];
        count = 2;
        assert_eq!(fill(&items, &mut count, Some(&mut out)), vk::Result::INCOMPLETE);
        assert_eq!((count, out), (2, [1, 2]));
    }

    #[test]
    fn unknown_physical_device_has_no_gpu() {
        let driver = MockDriver::default();
        assert!(driver.shared.gpu(MockDriver::physical_device(0)).is_some());
        assert!(driver.shared.gpu(MockDriver::physical_device(1)).is_none());
        assert!(driver.shared.gpu(vk::PhysicalDevice::null()).is_none());
    }
}
