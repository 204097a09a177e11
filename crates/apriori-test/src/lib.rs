//! Test support for the Apriori renderer.
//!
//! Provides an allocation-tracking mock of the Vulkan driver so the whole
//! lifecycle can be exercised without a GPU or a window.

pub mod ledger;
pub mod mock;

pub use ledger::{
    DeviceRequest, Ledger, LiveObject, ObjectKind, PipelineRequest, SwapchainRequest,
    INJECTED_FAILURE,
};
pub use mock::{window_handles, MockConfig, MockDriver, MockGpu, MockQueueFamily, MockShaders};
