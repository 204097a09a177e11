//! Record of native objects and calls made through the mock driver.

use ash::prelude::VkResult;
use ash::vk;
use std::collections::BTreeMap;
use std::ffi::CString;

/// Status returned by an injected failure.
pub const INJECTED_FAILURE: vk::Result = vk::Result::ERROR_INITIALIZATION_FAILED;

/// Kind of a tracked native object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ObjectKind {
    Instance,
    DebugReporter,
    Surface,
    Device,
    Swapchain,
    ImageView,
    CommandPool,
    CommandBuffer,
    RenderPass,
    ShaderModule,
    Sampler,
    DescriptorSetLayout,
    PipelineLayout,
    Pipeline,
    DescriptorPool,
}

/// A live native object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiveObject {
    pub kind: ObjectKind,
    /// Raw handle of the object this one was created from, or 0.
    pub parent: u64,
    /// Raw handle of the owning logical device, or 0 for instance-scope objects.
    pub device: u64,
}

/// What a `vkCreateDevice` call asked for.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceRequest {
    /// `(family, priorities)` per queue create info.
    pub queues: Vec<(u32, Vec<f32>)>,
    pub layers: Vec<CString>,
    pub extensions: Vec<CString>,
    pub sampler_anisotropy: bool,
}

/// What a `vkCreateSwapchainKHR` call asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapchainRequest {
    pub min_image_count: u32,
    pub format: vk::Format,
    pub extent: vk::Extent2D,
    pub sharing_mode: vk::SharingMode,
    pub queue_family_indices: Vec<u32>,
    pub present_mode: vk::PresentModeKHR,
}

/// What a `vkCreateGraphicsPipelines` call asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineRequest {
    pub stage_count: u32,
    pub vertex_attribute_count: u32,
    pub viewport_count: u32,
    pub blend_attachment_count: u32,
    pub subpass: u32,
}

/// Every object and call seen by one mock driver.
#[derive(Debug, Default)]
pub struct Ledger {
    next_handle: u64,
    live: BTreeMap<u64, LiveObject>,
    created: Vec<(ObjectKind, u64)>,
    destroyed: Vec<(ObjectKind, u64)>,
    violations: Vec<String>,
    calls: Vec<&'static str>,
    fallible_calls: usize,
    fail_at: Option<usize>,
    pub(crate) swapchain_images: BTreeMap<u64, Vec<vk::Image>>,
    pub(crate) instance_request: Option<(Vec<CString>, Vec<CString>)>,
    pub(crate) device_requests: Vec<DeviceRequest>,
    pub(crate) swapchain_requests: Vec<SwapchainRequest>,
    pub(crate) pipeline_requests: Vec<PipelineRequest>,
}

impl Ledger {
    /// Fail the `n`-th fallible call from now, counting from 0.
    pub fn fail_nth(&mut self, n: usize) {
        self.fail_at = Some(self.fallible_calls + n);
    }

    /// Log an infallible call.
    pub(crate) fn note(&mut self, name: &'static str) {
        self.calls.push(name);
    }

    /// Log a fallible call and report whether it should fail.
    pub(crate) fn call(&mut self, name: &'static str) -> VkResult<()> {
        self.calls.push(name);
        let index = self.fallible_calls;
        self.fallible_calls += 1;
        if self.fail_at == Some(index) {
            self.fail_at = None;
            tracing::debug!(call = name, index, "Injecting failure");
            return Err(INJECTED_FAILURE);
        }
        Ok(())
    }

    /// A fresh raw handle that is not tracked as a live object.
    pub(crate) fn fresh_handle(&mut self) -> u64 {
        self.next_handle += 1;
        0x1000 + self.next_handle
    }

    /// Track a new instance-scope object and return its raw handle.
    pub(crate) fn create(&mut self, kind: ObjectKind, parent: u64) -> u64 {
        self.create_in(kind, parent, 0)
    }

    /// Track a new object owned by `device` and return its raw handle.
    pub(crate) fn create_in(&mut self, kind: ObjectKind, parent: u64, device: u64) -> u64 {
        let raw = self.fresh_handle();
        self.live.insert(raw, LiveObject { kind, parent, device });
        self.created.push((kind, raw));
        raw
    }

    /// Stop tracking a live object, recording misuse as a violation.
    pub(crate) fn destroy(&mut self, kind: ObjectKind, raw: u64) {
        match self.live.remove(&raw) {
            Some(object) if object.kind == kind => self.destroyed.push((kind, raw)),
            Some(object) => {
                self.live.insert(raw, object);
                self.violate(format!(
                    "{raw:#x} destroyed as {kind:?} but is a {:?}",
                    object.kind
                ));
            }
            None => self.violate(format!("{kind:?} {raw:#x} destroyed while not live")),
        }
    }

    pub(crate) fn violate(&mut self, message: String) {
        tracing::error!("{message}");
        self.violations.push(message);
    }

    /// Live objects matching `predicate`.
    pub(crate) fn live_where(&self, predicate: impl Fn(&LiveObject) -> bool) -> Vec<u64> {
        self.live
            .iter()
            .filter(|(_, object)| predicate(object))
            .map(|(&raw, _)| raw)
            .collect()
    }

    /// Parent of a live object.
    pub(crate) fn parent_of(&self, raw: u64) -> Option<u64> {
        self.live.get(&raw).map(|object| object.parent)
    }

    /// Number of live objects.
    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    /// Number of live objects of `kind`.
    pub fn live_of(&self, kind: ObjectKind) -> usize {
        self.live.values().filter(|o| o.kind == kind).count()
    }

    /// Number of live objects owned by the device `device`.
    pub fn live_children_of(&self, device: u64) -> usize {
        self.live.values().filter(|o| o.device == device).count()
    }

    /// Whether `raw` is a live object.
    pub fn is_live(&self, raw: u64) -> bool {
        self.live.contains_key(&raw)
    }

    /// Number of objects of `kind` ever created.
    pub fn created_of(&self, kind: ObjectKind) -> usize {
        self.created.iter().filter(|(k, _)| *k == kind).count()
    }

    /// Number of objects of `kind` destroyed.
    pub fn destroyed_of(&self, kind: ObjectKind) -> usize {
        self.destroyed.iter().filter(|(k, _)| *k == kind).count()
    }

    /// How many times `raw` was destroyed.
    pub fn destroy_count(&self, raw: u64) -> usize {
        self.destroyed.iter().filter(|(_, r)| *r == raw).count()
    }

    /// Kinds in the order their objects were destroyed.
    pub fn destroy_order(&self) -> Vec<ObjectKind> {
        self.destroyed.iter().map(|(kind, _)| *kind).collect()
    }

    /// Misuse detected so far: double destroys, wrong parents, bad ordering.
    pub fn violations(&self) -> &[String] {
        &self.violations
    }

    /// Names of every native call, in order.
    pub fn calls(&self) -> &[&'static str] {
        &self.calls
    }

    /// Whether `name` was called.
    pub fn called(&self, name: &str) -> bool {
        self.calls.iter().any(|call| *call == name)
    }

    /// Number of fallible calls made so far.
    pub fn fallible_calls(&self) -> usize {
        self.fallible_calls
    }

    /// Nothing is live and nothing was misused.
    pub fn is_clean(&self) -> bool {
        self.live.is_empty() && self.violations.is_empty()
    }

    /// Layers and extensions the instance was created with.
    pub fn instance_request(&self) -> Option<&(Vec<CString>, Vec<CString>)> {
        self.instance_request.as_ref()
    }

    /// Every `vkCreateDevice` request, in order.
    pub fn device_requests(&self) -> &[DeviceRequest] {
        &self.device_requests
    }

    /// Every `vkCreateSwapchainKHR` request, in order.
    pub fn swapchain_requests(&self) -> &[SwapchainRequest] {
        &self.swapchain_requests
    }

    /// Every `vkCreateGraphicsPipelines` request, in order.
    pub fn pipeline_requests(&self) -> &[PipelineRequest] {
        &self.pipeline_requests
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn injected_failure_hits_only_the_chosen_call() {
        let mut ledger = Ledger::default();
        ledger.call("first").unwrap();
        ledger.fail_nth(1);
        assert!(ledger.call("second").is_ok());
        assert_eq!(ledger.call("third"), Err(INJECTED_FAILURE));
        assert!(ledger.call("fourth").is_ok());
        assert_eq!(ledger.fallible_calls(), 4);
    }

    #[test]
    fn double_destroy_is_a_violation() {
        let mut ledger = Ledger::default();
        let raw = ledger.create(ObjectKind::Sampler, 0);
        ledger.destroy(ObjectKind::Sampler, raw);
        assert!(ledger.is_clean());

        ledger.destroy(ObjectKind::Sampler, raw);
        assert_eq!(ledger.violations().len(), 1);
        assert_eq!(ledger.destroy_count(raw), 1);
    }

    #[test]
    fn children_are_counted_per_device() {
        let mut ledger = Ledger::default();
        let first = ledger.create(ObjectKind::Device, 0);
        let second = ledger.create(ObjectKind::Device, 0);
        let pool = ledger.create_in(ObjectKind::CommandPool, first, first);
        ledger.create_in(ObjectKind::CommandBuffer, pool, first);
        ledger.create_in(ObjectKind::RenderPass, second, second);

        assert_eq!(ledger.live_children_of(first), 2);
        assert_eq!(ledger.live_children_of(second), 1);
        assert_eq!(ledger.live_children_of(0), 2);
    }

    #[test]
    fn wrong_kind_keeps_object_live() {
        let mut ledger = Ledger::default();
        let raw = ledger.create(ObjectKind::RenderPass, 0);
        ledger.destroy(ObjectKind::Pipeline, raw);
        assert!(ledger.is_live(raw));
        assert!(!ledger.violations().is_empty());
    }
}
