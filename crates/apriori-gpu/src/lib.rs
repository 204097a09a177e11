//! Vulkan lifecycle layer for the Apriori overlay renderer.
//!
//! This crate provides:
//! - Instance creation with layer/extension checks and debug reporting
//! - Physical device scoring and logical device creation
//! - Queue-family resolution against a presentation surface
//! - Swapchain, command pool and command buffer management
//! - The overlay render pass and pipeline
//!
//! All native calls go through the [`driver`] traits; [`loader`] implements
//! them on top of the system Vulkan loader.

pub mod command;
pub mod descriptors;
pub mod device;
pub mod driver;
pub mod dyn_array;
pub mod error;
pub mod handle;
pub mod instance;
pub mod loader;
pub mod pipeline;
pub mod queue_family;
pub mod render_pass;
pub mod renderer;
pub mod surface;
pub mod swapchain;

pub use ash::vk;
pub use command::{CommandBufferSet, CommandBuffers, CommandPool, CommandPools, PerFamily};
pub use device::{Device, PhysicalDeviceInfo, Queues};
pub use driver::{DeviceDriver, EntryDriver, InstanceDriver};
pub use dyn_array::DynArray;
pub use error::{describe, GpuError, Result};
pub use handle::Owned;
pub use instance::{vk_handle, Instance, InstanceBuilder};
pub use loader::AshEntry;
pub use pipeline::{OverlayPipeline, OverlayPushConstants, OverlayShaders, VertexOverlay};
pub use queue_family::{families_equal, resolve_queue_families, QueueFamilies};
pub use render_pass::RenderPass;
pub use renderer::{Renderer, RendererConfig};
pub use surface::{Surface, WindowHandles};
pub use swapchain::Swapchain;
