//! Command pool and command buffer management.
//!
//! Graphics and present each need a pool and a buffer per swapchain image.
//! When both roles use one queue family a single pool and buffer set serves
//! both, so nothing is ever created or destroyed twice.

use crate::device::Device;
use crate::error::Result;
use crate::handle::Owned;
use crate::queue_family::QueueFamilies;
use ash::vk;
use std::fmt;
use std::sync::Arc;

/// One resource per queue-family role, shared when the families coincide.
#[derive(Debug)]
pub enum PerFamily<T> {
    /// Both roles use the same resource.
    Shared(T),
    /// Each role has its own resource.
    Distinct { graphics: T, present: T },
}

impl<T> PerFamily<T> {
    /// Build one value per distinct family of `families`.
    pub fn try_new<F>(families: QueueFamilies, mut make: F) -> Result<Self>
    where
        F: FnMut(u32) -> Result<T>,
    {
        if families.is_shared() {
            Ok(Self::Shared(make(families.graphics)?))
        } else {
            let graphics = make(families.graphics)?;
            let present = make(families.present)?;
            Ok(Self::Distinct { graphics, present })
        }
    }

    /// Resource serving the graphics role.
    pub fn graphics(&self) -> &T {
        match self {
            Self::Shared(shared) => shared,
            Self::Distinct { graphics, .. } => graphics,
        }
    }

    /// Resource serving the present role.
    pub fn present(&self) -> &T {
        match self {
            Self::Shared(shared) => shared,
            Self::Distinct { present, .. } => present,
        }
    }

    /// Whether both roles share one resource.
    pub const fn is_shared(&self) -> bool {
        matches!(self, Self::Shared(_))
    }

    /// Map each distinct resource, keeping the sharing shape.
    pub fn try_map<U, F>(&self, mut f: F) -> Result<PerFamily<U>>
    where
        F: FnMut(&T) -> Result<U>,
    {
        match self {
            Self::Shared(shared) => Ok(PerFamily::Shared(f(shared)?)),
            Self::Distinct { graphics, present } => {
                let graphics = f(graphics)?;
                let present = f(present)?;
                Ok(PerFamily::Distinct { graphics, present })
            }
        }
    }

    /// Number of distinct resources.
    pub const fn count(&self) -> usize {
        match self {
            Self::Shared(_) => 1,
            Self::Distinct { .. } => 2,
        }
    }
}

/// Command pool bound to one queue family.
pub struct CommandPool {
    pool: Owned<vk::CommandPool>,
    queue_family: u32,
}

impl CommandPool {
    /// Create a new command pool.
    pub fn new(
        device: &Arc<Device>,
        queue_family: u32,
        flags: vk::CommandPoolCreateFlags,
    ) -> Result<Self> {
        let create_info = vk::CommandPoolCreateInfo::default()
            .queue_family_index(queue_family)
            .flags(flags);

        // SAFETY: the queue family was requested at device creation.
        let pool = unsafe { device.driver().create_command_pool(&create_info) }?;
        tracing::trace!(queue_family, "Created command pool");

        Ok(Self {
            pool: Owned::new(device, pool),
            queue_family,
        })
    }

    /// Get the raw pool handle.
    pub fn handle(&self) -> vk::CommandPool {
        self.pool.handle()
    }

    /// Get the queue family index.
    pub fn queue_family(&self) -> u32 {
        self.queue_family
    }

    /// Allocate primary command buffers.
    ///
    /// The pool must outlive the returned set.
    pub fn allocate(&self, count: u32) -> Result<CommandBufferSet> {
        let alloc_info = vk::CommandBufferAllocateInfo::default()
            .command_pool(self.handle())
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(count);

        let device = self.pool.device();
        // SAFETY: the pool belongs to this device.
        let buffers = unsafe { device.driver().allocate_command_buffers(&alloc_info) }?;
        tracing::trace!(queue_family = self.queue_family, count, "Allocated command buffers");

        Ok(CommandBufferSet {
            device: Arc::clone(device),
            pool: self.handle(),
            buffers,
        })
    }
}

impl fmt::Debug for CommandPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandPool")
            .field("pool", &self.handle())
            .field("queue_family", &self.queue_family)
            .finish()
    }
}

/// Command buffers allocated from one pool, freed together on drop.
pub struct CommandBufferSet {
    device: Arc<Device>,
    pool: vk::CommandPool,
    buffers: Vec<vk::CommandBuffer>,
}

impl CommandBufferSet {
    /// Command buffers, one per swapchain image.
    pub fn buffers(&self) -> &[vk::CommandBuffer] {
        &self.buffers
    }

    /// Pool the buffers were allocated from.
    pub fn pool(&self) -> vk::CommandPool {
        self.pool
    }
}

impl Drop for CommandBufferSet {
    fn drop(&mut self) {
        if self.buffers.is_empty() {
            return;
        }
        tracing::debug!(count = self.buffers.len(), "Freeing command buffers");
        // SAFETY: the buffers came from `pool`, which is still alive.
        unsafe {
            self.device
                .driver()
                .free_command_buffers(self.pool, &self.buffers);
        }
    }
}

impl fmt::Debug for CommandBufferSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandBufferSet")
            .field("pool", &self.pool)
            .field("buffers", &self.buffers)
            .finish()
    }
}

/// One command pool per distinct queue family.
pub type CommandPools = PerFamily<CommandPool>;

/// One command buffer set per distinct command pool.
pub type CommandBuffers = PerFamily<CommandBufferSet>;

/// Create the command pools for `families`.
pub fn create_command_pools(device: &Arc<Device>, families: QueueFamilies) -> Result<CommandPools> {
    let pools = PerFamily::try_new(families, |family| {
        CommandPool::new(device, family, vk::CommandPoolCreateFlags::empty())
    })?;
    tracing::debug!(pools = pools.count(), "Command pools created");
    Ok(pools)
}

/// Allocate `count` primary buffers from every distinct pool.
pub fn create_command_buffers(pools: &CommandPools, count: u32) -> Result<CommandBuffers> {
    let buffers = pools.try_map(|pool| pool.allocate(count))?;
    tracing::debug!(sets = buffers.count(), count, "Command buffers created");
    Ok(buffers)
}
