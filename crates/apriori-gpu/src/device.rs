//! Physical device selection and logical device creation.

use crate::driver::{DeviceDriver, InstanceDriver};
use crate::dyn_array;
use crate::error::Result;
use crate::instance::{check_extensions, check_layers, Instance};
use crate::queue_family::{queue_family_properties, QueueFamilies};
use ash::vk;
use std::ffi::{c_char, CString};
use std::fmt;
use std::sync::Arc;

/// Priorities of the graphics and present queues, in that order.
const QUEUE_PRIORITIES: [f32; 2] = [1.0, 0.75];

/// Selection score of a device type.
pub const fn device_type_score(device_type: vk::PhysicalDeviceType) -> u32 {
    match device_type {
        vk::PhysicalDeviceType::DISCRETE_GPU => 1000,
        vk::PhysicalDeviceType::INTEGRATED_GPU => 100,
        vk::PhysicalDeviceType::VIRTUAL_GPU => 10,
        _ => 0,
    }
}

/// Selection score of a physical device.
pub fn score_physical_device(
    properties: &vk::PhysicalDeviceProperties,
    features: &vk::PhysicalDeviceFeatures,
) -> u32 {
    let mut score = device_type_score(properties.device_type);
    if features.sampler_anisotropy == vk::TRUE {
        score += 10;
    }
    score
}

/// Index of the highest score. Ties keep the earliest entry.
pub fn best_score_index(scores: impl IntoIterator<Item = u32>) -> Option<usize> {
    let mut best: Option<(usize, u32)> = None;
    for (index, score) in scores.into_iter().enumerate() {
        match best {
            Some((_, best_score)) if score <= best_score => {}
            _ => best = Some((index, score)),
        }
    }
    best.map(|(index, _)| index)
}

/// A physical device together with what selection learned about it.
#[derive(Clone)]
pub struct PhysicalDeviceInfo {
    pub handle: vk::PhysicalDevice,
    pub name: String,
    pub device_type: vk::PhysicalDeviceType,
    pub sampler_anisotropy: bool,
    pub score: u32,
}

impl PhysicalDeviceInfo {
    /// Query a physical device.
    pub fn query(driver: &dyn InstanceDriver, handle: vk::PhysicalDevice) -> Self {
        let properties = driver.physical_device_properties(handle);
        let features = driver.physical_device_features(handle);
        let name = properties
            .device_name_as_c_str()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        Self {
            handle,
            name,
            device_type: properties.device_type,
            sampler_anisotropy: features.sampler_anisotropy == vk::TRUE,
            score: score_physical_device(&properties, &features),
        }
    }
}

impl fmt::Debug for PhysicalDeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PhysicalDeviceInfo")
            .field("name", &self.name)
            .field("device_type", &self.device_type)
            .field("score", &self.score)
            .finish_non_exhaustive()
    }
}

/// Select the best physical device of the instance.
///
/// # Panics
/// If the instance has no physical devices.
pub fn select_physical_device(instance: &Instance) -> PhysicalDeviceInfo {
    let devices = instance.physical_devices();
    assert!(!devices.is_empty(), "no Vulkan physical devices available");

    let candidates: Vec<_> = devices
        .iter()
        .map(|&device| PhysicalDeviceInfo::query(instance.driver(), device))
        .collect();
    for candidate in &candidates {
        tracing::trace!(name = %candidate.name, score = candidate.score, "Physical device candidate");
    }

    let best = best_score_index(candidates.iter().map(|c| c.score)).unwrap_or(0);
    let selected = candidates[best].clone();
    tracing::info!(
        name = %selected.name,
        device_type = ?selected.device_type,
        score = selected.score,
        "Selected GPU"
    );
    selected
}

/// A queue identified by family and index within the family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueSlot {
    pub family: u32,
    pub index: u32,
}

/// One `VkDeviceQueueCreateInfo` entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QueueRequest {
    pub family: u32,
    pub priorities: &'static [f32],
}

/// Queues to create and where graphics and present come from.
#[derive(Debug, Clone, PartialEq)]
pub struct QueuePlan {
    pub requests: Vec<QueueRequest>,
    pub graphics: QueueSlot,
    pub present: QueueSlot,
}

/// Plan queue creation.
///
/// A shared family is asked for two queues when it has them; with a single
/// queue both roles use it. Distinct families get one queue each.
pub fn plan_queues(families: QueueFamilies, shared_queue_count: u32) -> QueuePlan {
    if families.is_shared() {
        let slots = shared_queue_count.clamp(1, 2);
        QueuePlan {
            requests: vec![QueueRequest {
                family: families.graphics,
                priorities: &QUEUE_PRIORITIES[..slots as usize],
            }],
            graphics: QueueSlot {
                family: families.graphics,
                index: 0,
            },
            present: QueueSlot {
                family: families.present,
                index: slots - 1,
            },
        }
    } else {
        QueuePlan {
            requests: vec![
                QueueRequest {
                    family: families.graphics,
                    priorities: &QUEUE_PRIORITIES[..1],
                },
                QueueRequest {
                    family: families.present,
                    priorities: &QUEUE_PRIORITIES[1..],
                },
            ],
            graphics: QueueSlot {
                family: families.graphics,
                index: 0,
            },
            present: QueueSlot {
                family: families.present,
                index: 0,
            },
        }
    }
}

/// Graphics and present queue handles. They are equal when aliased.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Queues {
    pub graphics: vk::Queue,
    pub present: vk::Queue,
}

impl Queues {
    /// Whether both roles use the same native queue.
    pub fn is_aliased(&self) -> bool {
        self.graphics == self.present
    }
}

/// A logical device, destroyed when the last reference drops.
pub struct Device {
    driver: Box<dyn DeviceDriver>,
    physical_device: PhysicalDeviceInfo,
    families: QueueFamilies,
}

impl Device {
    /// Native driver of this device.
    pub fn driver(&self) -> &dyn DeviceDriver {
        self.driver.as_ref()
    }

    /// Raw device handle.
    pub fn handle(&self) -> vk::Device {
        self.driver.handle()
    }

    /// The physical device this device was created from.
    pub fn physical_device(&self) -> &PhysicalDeviceInfo {
        &self.physical_device
    }

    /// Queue families the device was created with.
    pub fn queue_families(&self) -> QueueFamilies {
        self.families
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        tracing::debug!(name = %self.physical_device.name, "Destroying logical device");
        // SAFETY: every child object holds an `Arc<Device>`, so none is left.
        unsafe { self.driver.destroy_device() };
    }
}

impl fmt::Debug for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Device")
            .field("handle", &self.handle())
            .field("physical_device", &self.physical_device)
            .field("families", &self.families)
            .finish()
    }
}

/// Create the logical device and retrieve its queues.
///
/// Requested layers and extensions are checked against the chosen physical
/// device before anything is created.
pub fn create_device(
    instance: &Instance,
    physical_device: &PhysicalDeviceInfo,
    families: QueueFamilies,
    layers: &[CString],
    extensions: &[CString],
) -> Result<(Arc<Device>, Queues)> {
    tracing::info!(name = %physical_device.name, "Creating logical device...");
    let driver = instance.driver();
    let handle = physical_device.handle;

    let available_layers = dyn_array::enumerate(|count, out| {
        driver.enumerate_device_layers(handle, count, out)
    })?;
    check_layers(layers, &available_layers)?;

    let available_extensions = dyn_array::enumerate(|count, out| {
        driver.enumerate_device_extensions(handle, count, out)
    })?;
    check_extensions(extensions, &available_extensions)?;

    let shared_queue_count = if families.is_shared() {
        queue_family_properties(driver, handle)?
            .get(families.graphics as usize)
            .map_or(1, |family| family.queue_count)
    } else {
        1
    };
    let plan = plan_queues(families, shared_queue_count);

    let queue_infos: Vec<vk::DeviceQueueCreateInfo> = plan
        .requests
        .iter()
        .map(|request| {
            vk::DeviceQueueCreateInfo::default()
                .queue_family_index(request.family)
                .queue_priorities(request.priorities)
        })
        .collect();

    let layer_names: Vec<*const c_char> = layers.iter().map(|l| l.as_ptr()).collect();
    let extension_names: Vec<*const c_char> = extensions.iter().map(|e| e.as_ptr()).collect();

    let features =
        vk::PhysicalDeviceFeatures::default().sampler_anisotropy(physical_device.sampler_anisotropy);

    // Device layers are ignored by current loaders but still honoured by old ones.
    #[allow(deprecated)]
    let create_info = vk::DeviceCreateInfo::default()
        .queue_create_infos(&queue_infos)
        .enabled_layer_names(&layer_names)
        .enabled_extension_names(&extension_names)
        .enabled_features(&features);

    // SAFETY: every pointer in `create_info` outlives the call.
    let device_driver = unsafe { driver.create_device(handle, &create_info) }?;
    let device = Arc::new(Device {
        driver: device_driver,
        physical_device: physical_device.clone(),
        families,
    });

    // SAFETY: both slots were requested in `queue_infos`.
    let queues = unsafe {
        Queues {
            graphics: device
                .driver()
                .get_device_queue(plan.graphics.family, plan.graphics.index),
            present: device
                .driver()
                .get_device_queue(plan.present.family, plan.present.index),
        }
    };

    tracing::info!(
        graphics_family = plan.graphics.family,
        present_family = plan.present.family,
        queue_requests = plan.requests.len(),
        aliased = queues.is_aliased(),
        "Logical device created"
    );

    Ok((device, queues))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_types_are_ranked() {
        assert_eq!(device_type_score(vk::PhysicalDeviceType::DISCRETE_GPU), 1000);
        assert_eq!(device_type_score(vk::PhysicalDeviceType::INTEGRATED_GPU), 100);
        assert_eq!(device_type_score(vk::PhysicalDeviceType::VIRTUAL_GPU), 10);
        assert_eq!(device_type_score(vk::PhysicalDeviceType::CPU), 0);
        assert_eq!(device_type_score(vk::PhysicalDeviceType::OTHER), 0);
    }

    #[test]
    fn anisotropy_adds_ten() {
        let properties = vk::PhysicalDeviceProperties::default()
            .device_type(vk::PhysicalDeviceType::DISCRETE_GPU);
        let with = vk::PhysicalDeviceFeatures::default().sampler_anisotropy(true);
        let without = vk::PhysicalDeviceFeatures::default();
        assert_eq!(score_physical_device(&properties, &with), 1010);
        assert_eq!(score_physical_device(&properties, &without), 1000);
    }

    #[test]
    fn highest_score_wins() {
        assert_eq!(best_score_index([100, 1000, 1010]), Some(2));
    }

    #[test]
    fn ties_keep_first_enumerated() {
        assert_eq!(best_score_index([1000, 1010, 1010]), Some(1));
        assert_eq!(best_score_index([0, 0]), Some(0));
        assert_eq!(best_score_index(std::iter::empty()), None);
    }

    #[test]
    fn shared_family_requests_two_slots() {
        let families = QueueFamilies { graphics: 3, present: 3 };
        let plan = plan_queues(families, 16);
        assert_eq!(plan.requests.len(), 1);
        assert_eq!(plan.requests[0].priorities, &[1.0, 0.75]);
        assert_eq!(plan.graphics, QueueSlot { family: 3, index: 0 });
        assert_eq!(plan.present, QueueSlot { family: 3, index: 1 });
    }

    #[test]
    fn single_queue_family_aliases_present() {
        let families = QueueFamilies { graphics: 0, present: 0 };
        let plan = plan_queues(families, 1);
        assert_eq!(plan.requests[0].priorities, &[1.0]);
        assert_eq!(plan.graphics, plan.present);
    }

    #[test]
    fn distinct_families_get_one_queue_each() {
        let families = QueueFamilies { graphics: 0, present: 2 };
        let plan = plan_queues(families, 1);
        assert_eq!(
            plan.requests,
            vec![
                QueueRequest { family: 0, priorities: &[1.0] },
                QueueRequest { family: 2, priorities: &[0.75] },
            ]
        );
        assert_eq!(plan.present, QueueSlot { family: 2, index: 0 });
    }
}
