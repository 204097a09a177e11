//! Descriptor set layouts and pools.

use crate::device::Device;
use crate::error::Result;
use crate::handle::Owned;
use ash::vk;
use std::sync::Arc;

/// Descriptor set layout builder.
#[derive(Default)]
pub struct DescriptorSetLayoutBuilder<'a> {
    bindings: Vec<vk::DescriptorSetLayoutBinding<'a>>,
}

impl<'a> DescriptorSetLayoutBuilder<'a> {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a combined image sampler binding whose sampler is baked into the layout.
    pub fn immutable_sampler(
        mut self,
        binding: u32,
        stage_flags: vk::ShaderStageFlags,
        sampler: &'a vk::Sampler,
    ) -> Self {
        self.bindings.push(
            vk::DescriptorSetLayoutBinding::default()
                .binding(binding)
                .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
                .stage_flags(stage_flags)
                .immutable_samplers(std::slice::from_ref(sampler)),
        );
        self
    }

    /// Build the descriptor set layout.
    pub fn build(self, device: &Arc<Device>) -> Result<Owned<vk::DescriptorSetLayout>> {
        let layout_info = vk::DescriptorSetLayoutCreateInfo::default().bindings(&self.bindings);

        // SAFETY: immutable samplers referenced by the bindings are alive.
        let layout = unsafe { device.driver().create_descriptor_set_layout(&layout_info) }?;
        Ok(Owned::new(device, layout))
    }
}

/// Descriptor pool for allocating descriptor sets.
pub struct DescriptorPool {
    pool: Owned<vk::DescriptorPool>,
    max_sets: u32,
}

impl DescriptorPool {
    /// Create a new descriptor pool.
    pub fn new(
        device: &Arc<Device>,
        max_sets: u32,
        pool_sizes: &[vk::DescriptorPoolSize],
    ) -> Result<Self> {
        let create_info = vk::DescriptorPoolCreateInfo::default()
            .max_sets(max_sets)
            .pool_sizes(pool_sizes);

        // SAFETY: the create info only references the caller's slice.
        let pool = unsafe { device.driver().create_descriptor_pool(&create_info) }?;
        tracing::debug!(max_sets, sizes = pool_sizes.len(), "Descriptor pool created");

        Ok(Self {
            pool: Owned::new(device, pool),
            max_sets,
        })
    }

    /// Get the raw pool handle.
    pub fn handle(&self) -> vk::DescriptorPool {
        self.pool.handle()
    }

    /// Maximum number of sets the pool can hold.
    pub fn max_sets(&self) -> u32 {
        self.max_sets
    }
}
