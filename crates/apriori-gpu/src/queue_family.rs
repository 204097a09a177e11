//! Graphics and present queue-family resolution.

use crate::driver::InstanceDriver;
use crate::dyn_array;
use crate::error::{GpuError, Result};
use crate::surface::Surface;
use ash::vk;

/// Queue families used for rendering and presentation. They may coincide.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueFamilies {
    pub graphics: u32,
    pub present: u32,
}

impl QueueFamilies {
    /// Whether graphics and present share one family.
    pub const fn is_shared(&self) -> bool {
        self.graphics == self.present
    }
}

/// Whether graphics and present share one family.
pub const fn families_equal(families: &QueueFamilies) -> bool {
    families.is_shared()
}

/// Scan `properties` in order.
///
/// The first family with both graphics and present support wins both roles
/// immediately. Otherwise each role keeps the first family offering it. A
/// failing `supports_present` query aborts the scan.
pub fn scan_queue_families<F>(
    properties: &[vk::QueueFamilyProperties],
    mut supports_present: F,
) -> Result<QueueFamilies>
where
    F: FnMut(u32) -> Result<bool>,
{
    let mut graphics = None;
    let mut present = None;

    for (index, family) in (0u32..).zip(properties) {
        let has_graphics = family.queue_flags.contains(vk::QueueFlags::GRAPHICS);
        let has_present = supports_present(index)?;
        tracing::trace!(index, has_graphics, has_present, "Queue family");

        if has_graphics && has_present {
            graphics = Some(index);
            present = Some(index);
            break;
        }
        if has_graphics && graphics.is_none() {
            graphics = Some(index);
        }
        if has_present && present.is_none() {
            present = Some(index);
        }
    }

    match (graphics, present) {
        (Some(graphics), Some(present)) => Ok(QueueFamilies { graphics, present }),
        (None, None) => Err(GpuError::BothQueueFamiliesNotFound),
        (None, Some(_)) => Err(GpuError::GraphicsQueueFamilyNotFound),
        (Some(_), None) => Err(GpuError::PresentQueueFamilyNotFound),
    }
}

/// Query the queue families of `physical_device` and resolve them against `surface`.
pub fn resolve_queue_families(
    physical_device: vk::PhysicalDevice,
    surface: &Surface<'_>,
) -> Result<QueueFamilies> {
    let properties = queue_family_properties(surface.instance().driver(), physical_device)?;

    let families = scan_queue_families(&properties, |index| {
        surface.supports_present(physical_device, index)
    })?;
    tracing::debug!(
        graphics = families.graphics,
        present = families.present,
        "Resolved queue families"
    );
    Ok(families)
}

/// Queue-family properties of a device, in index order.
pub fn queue_family_properties(
    driver: &dyn InstanceDriver,
    physical_device: vk::PhysicalDevice,
) -> Result<Vec<vk::QueueFamilyProperties>> {
    let properties = dyn_array::enumerate(|count, out| {
        driver.queue_family_properties(physical_device, count, out);
        vk::Result::SUCCESS
    })?;
    Ok(properties.into_vec())
}
