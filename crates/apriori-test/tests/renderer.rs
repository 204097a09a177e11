mod common;

use apriori_gpu::render_pass::OVERLAY_SUBPASS;
use apriori_gpu::{vk, GpuError, RendererConfig};
use apriori_test::{MockConfig, MockDriver, MockGpu, MockQueueFamily, ObjectKind, INJECTED_FAILURE};
use ash::vk::Handle;

const DEVICE_OBJECTS: [ObjectKind; 11] = [
    ObjectKind::Swapchain,
    ObjectKind::ImageView,
    ObjectKind::CommandPool,
    ObjectKind::CommandBuffer,
    ObjectKind::RenderPass,
    ObjectKind::ShaderModule,
    ObjectKind::Sampler,
    ObjectKind::DescriptorSetLayout,
    ObjectKind::PipelineLayout,
    ObjectKind::Pipeline,
    ObjectKind::DescriptorPool,
];

fn split_queue_config() -> MockConfig {
    MockConfig::with_gpus(vec![MockGpu::discrete(c"Split Queues").queue_families(vec![
        MockQueueFamily::graphics(false),
        MockQueueFamily::compute(true),
    ])])
}

#[test]
fn every_object_is_destroyed_exactly_once() {
    common::init_tracing();
    let driver = MockDriver::default();
    let instance = driver.instance().unwrap();

    let renderer = common::renderer(&instance, &common::config()).unwrap();
    assert_eq!(renderer.device().physical_device().name, "Mock Discrete GPU");
    assert_ne!(renderer.surface(), vk::SurfaceKHR::null());
    assert_ne!(renderer.overlay_pipeline().handle(), vk::Pipeline::null());
    drop(renderer);

    {
        let ledger = driver.ledger();
        common::assert_no_violations(&ledger);
        for kind in DEVICE_OBJECTS {
            assert!(ledger.created_of(kind) > 0, "{kind:?} never created");
            assert_eq!(ledger.created_of(kind), ledger.destroyed_of(kind), "{kind:?}");
        }
        assert_eq!(ledger.destroyed_of(ObjectKind::Device), 1);
        assert_eq!(ledger.destroyed_of(ObjectKind::Surface), 1);

        // Only the instance and its reporter outlive the renderer.
        assert_eq!(ledger.live_count(), 2);
        let order = ledger.destroy_order();
        assert_eq!(
            order[order.len() - 2..],
            [ObjectKind::Device, ObjectKind::Surface]
        );
    }

    drop(instance);
    assert!(driver.ledger().is_clean());
}

#[test]
fn failure_at_every_native_call_releases_earlier_stages() {
    common::init_tracing();
    let probe = MockDriver::default();
    let instance = probe.instance().unwrap();
    let before = probe.ledger().fallible_calls();
    drop(common::renderer(&instance, &common::config()).unwrap());
    let calls = probe.ledger().fallible_calls() - before;
    drop(instance);
    assert!(calls > 10);

    for n in 0..calls {
        let driver = MockDriver::default();
        let instance = driver.instance().unwrap();
        driver.fail_nth(n);

        let Some(error) = common::renderer(&instance, &common::config()).err() else {
            panic!("renderer survived a failure at call {n}");
        };
        assert_eq!(error, GpuError::Vulkan(INJECTED_FAILURE), "call {n}");

        {
            let ledger = driver.ledger();
            common::assert_no_violations(&ledger);
            assert_eq!(
                ledger.live_count(),
                2,
                "call {n} ({}) leaked objects",
                ledger.calls().last().copied().unwrap_or_default()
            );
        }

        drop(instance);
        assert!(driver.ledger().is_clean(), "call {n}");
    }
}

#[test]
fn shared_family_shares_pool_and_buffers() {
    let driver = MockDriver::default();
    let instance = driver.instance().unwrap();
    let renderer = common::renderer(&instance, &common::config()).unwrap();

    let pools = renderer.command_pools();
    let buffers = renderer.command_buffers();
    assert!(pools.is_shared());
    assert!(buffers.is_shared());
    assert!(std::ptr::eq(pools.graphics(), pools.present()));
    assert_eq!(pools.graphics().handle(), pools.present().handle());
    assert!(std::ptr::eq(
        buffers.graphics().buffers().as_ptr(),
        buffers.present().buffers().as_ptr()
    ));
    let pool = pools.graphics().handle().as_raw();
    let image_count = renderer.swapchain().image_count() as usize;
    drop(renderer);

    let ledger = driver.ledger();
    assert_eq!(ledger.created_of(ObjectKind::CommandPool), 1);
    assert_eq!(ledger.destroy_count(pool), 1);
    assert_eq!(ledger.destroyed_of(ObjectKind::CommandBuffer), image_count);
    common::assert_no_violations(&ledger);
}

#[test]
fn distinct_families_get_separate_pools() {
    let driver = MockDriver::new(split_queue_config());
    let instance = driver.instance().unwrap();
    let renderer = common::renderer(&instance, &common::config()).unwrap();

    let pools = renderer.command_pools();
    let buffers = renderer.command_buffers();
    assert!(!pools.is_shared());
    assert_eq!(pools.count(), 2);
    assert_eq!(pools.graphics().queue_family(), 0);
    assert_eq!(pools.present().queue_family(), 1);
    assert_ne!(pools.graphics().handle(), pools.present().handle());
    assert_eq!(buffers.graphics().pool(), pools.graphics().handle());
    assert_eq!(buffers.present().pool(), pools.present().handle());

    let families = renderer.queue_families();
    assert!(!families.is_shared());
    assert_ne!(renderer.queues().graphics, renderer.queues().present);
    let image_count = renderer.swapchain().image_count() as usize;
    drop(renderer);

    let ledger = driver.ledger();
    assert_eq!(ledger.destroyed_of(ObjectKind::CommandPool), 2);
    assert_eq!(
        ledger.destroyed_of(ObjectKind::CommandBuffer),
        2 * image_count
    );
    common::assert_no_violations(&ledger);
}

#[test]
fn pipeline_matches_render_pass() {
    let driver = MockDriver::default();
    let instance = driver.instance().unwrap();
    let renderer = common::renderer(&instance, &common::config()).unwrap();

    let ledger = driver.ledger();
    let request = &ledger.pipeline_requests()[0];
    assert_eq!(request.stage_count, 2);
    assert_eq!(request.vertex_attribute_count, 3);
    assert_eq!(request.viewport_count, 1);
    assert_eq!(
        request.blend_attachment_count,
        renderer.render_pass().color_attachment_count()
    );
    assert_eq!(request.subpass, OVERLAY_SUBPASS);
    assert_eq!(ledger.created_of(ObjectKind::ShaderModule), 2);
    assert_eq!(ledger.created_of(ObjectKind::Sampler), 1);
}

#[test]
fn device_layers_and_extensions_follow_config() {
    let driver = MockDriver::default();
    let instance = driver.instance().unwrap();
    let config = RendererConfig::new(800, 600).validation(false);
    let _renderer = common::renderer(&instance, &config).unwrap();

    let ledger = driver.ledger();
    let request = &ledger.device_requests()[0];
    assert!(request.layers.is_empty());
    assert_eq!(request.extensions, vec![ash::khr::swapchain::NAME.to_owned()]);
}

#[test]
fn missing_queue_families_fail_before_device_creation() {
    let driver = MockDriver::new(MockConfig::with_gpus(vec![
        MockGpu::discrete(c"Compute Only").queue_families(vec![MockQueueFamily::compute(false)])
    ]));
    let instance = driver.instance().unwrap();

    let result = common::renderer(&instance, &common::config());
    assert_eq!(result.err(), Some(GpuError::BothQueueFamiliesNotFound));

    let ledger = driver.ledger();
    assert_eq!(ledger.created_of(ObjectKind::Device), 0);
    assert_eq!(ledger.destroyed_of(ObjectKind::Surface), 1);
    common::assert_no_violations(&ledger);
}

#[test]
fn two_renderers_share_one_instance() {
    let driver = MockDriver::default();
    let instance = driver.instance().unwrap();

    let first = common::renderer(&instance, &common::config()).unwrap();
    let second = common::renderer(&instance, &common::config()).unwrap();
    assert_ne!(first.surface(), second.surface());
    assert_eq!(first.instance().handle(), second.instance().handle());
    assert_ne!(first.device().handle(), second.device().handle());
    assert_ne!(first.queues().graphics, second.queues().graphics);
    assert_ne!(first.queues().present, second.queues().present);

    drop(first);
    {
        let ledger = driver.ledger();
        common::assert_no_violations(&ledger);
        assert_eq!(ledger.live_children_of(second.device().handle().as_raw()), 16);
    }

    drop(second);
    drop(instance);
    assert!(driver.ledger().is_clean());
}
