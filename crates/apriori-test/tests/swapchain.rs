mod common;

use apriori_gpu::{vk, GpuError};
use apriori_test::{MockConfig, MockDriver, MockGpu, MockQueueFamily, ObjectKind};

fn split_queue_gpu() -> MockGpu {
    MockGpu::discrete(c"Split Queues").queue_families(vec![
        MockQueueFamily::graphics(false),
        MockQueueFamily::compute(true),
    ])
}

#[test]
fn views_match_images_for_every_count() {
    common::init_tracing();
    for count in [1, 2, 3, 8] {
        let driver = MockDriver::new(MockConfig {
            swapchain_images: Some(count),
            ..MockConfig::default()
        });
        let instance = driver.instance().unwrap();
        let renderer = common::renderer(&instance, &common::config()).unwrap();

        let swapchain = renderer.swapchain();
        assert_eq!(swapchain.image_count(), count);
        assert_eq!(swapchain.images().len(), count as usize);
        assert_eq!(swapchain.image_views().len(), count as usize);
        assert_eq!(
            renderer.command_buffers().graphics().buffers().len(),
            count as usize
        );
        assert_eq!(renderer.descriptor_pool().max_sets(), count);
        assert_eq!(driver.ledger().live_of(ObjectKind::ImageView), count as usize);

        drop(renderer);
        let ledger = driver.ledger();
        assert_eq!(ledger.destroyed_of(ObjectKind::ImageView), count as usize);
        common::assert_no_violations(&ledger);
    }
}

#[test]
fn image_count_is_midpoint_of_surface_range() {
    let driver = MockDriver::default();
    let instance = driver.instance().unwrap();
    let renderer = common::renderer(&instance, &common::config()).unwrap();

    assert_eq!(renderer.swapchain().image_count(), 3);
    assert_eq!(driver.ledger().swapchain_requests()[0].min_image_count, 3);
}

#[test]
fn unbounded_surface_requests_one_above_minimum() {
    let driver = MockDriver::new(MockConfig {
        capabilities: MockConfig::default()
            .capabilities
            .min_image_count(3)
            .max_image_count(0),
        ..MockConfig::default()
    });
    let instance = driver.instance().unwrap();
    let _renderer = common::renderer(&instance, &common::config()).unwrap();

    assert_eq!(driver.ledger().swapchain_requests()[0].min_image_count, 4);
}

#[test]
fn shared_family_uses_exclusive_sharing() {
    let driver = MockDriver::default();
    let instance = driver.instance().unwrap();
    let _renderer = common::renderer(&instance, &common::config()).unwrap();

    let ledger = driver.ledger();
    let request = &ledger.swapchain_requests()[0];
    assert_eq!(request.sharing_mode, vk::SharingMode::EXCLUSIVE);
    assert!(request.queue_family_indices.is_empty());
    assert_eq!(request.present_mode, vk::PresentModeKHR::MAILBOX);
}

#[test]
fn distinct_families_use_concurrent_sharing() {
    let driver = MockDriver::new(MockConfig::with_gpus(vec![split_queue_gpu()]));
    let instance = driver.instance().unwrap();
    let _renderer = common::renderer(&instance, &common::config()).unwrap();

    let ledger = driver.ledger();
    let request = &ledger.swapchain_requests()[0];
    assert_eq!(request.sharing_mode, vk::SharingMode::CONCURRENT);
    assert_eq!(request.queue_family_indices, vec![0, 1]);
}

#[test]
fn preferred_format_and_fifo_fallback() {
    let driver = MockDriver::new(MockConfig {
        formats: vec![
            vk::SurfaceFormatKHR {
                format: vk::Format::R8G8B8A8_UNORM,
                color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
            },
            vk::SurfaceFormatKHR {
                format: vk::Format::B8G8R8A8_SRGB,
                color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
            },
        ],
        present_modes: vec![vk::PresentModeKHR::FIFO],
        ..MockConfig::default()
    });
    let instance = driver.instance().unwrap();
    let renderer = common::renderer(&instance, &common::config()).unwrap();

    assert_eq!(renderer.swapchain().format().format, vk::Format::B8G8R8A8_SRGB);
    assert_eq!(renderer.swapchain().present_mode(), vk::PresentModeKHR::FIFO);
    assert_eq!(renderer.render_pass().format(), vk::Format::B8G8R8A8_SRGB);
}

#[test]
fn first_format_used_without_srgb() {
    let driver = MockDriver::new(MockConfig {
        formats: vec![vk::SurfaceFormatKHR {
            format: vk::Format::R8G8B8A8_UNORM,
            color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
        }],
        ..MockConfig::default()
    });
    let instance = driver.instance().unwrap();
    let renderer = common::renderer(&instance, &common::config()).unwrap();

    assert_eq!(renderer.swapchain().format().format, vk::Format::R8G8B8A8_UNORM);
}

#[test]
fn no_surface_formats_fails_cleanly() {
    let driver = MockDriver::new(MockConfig {
        formats: Vec::new(),
        ..MockConfig::default()
    });
    let instance = driver.instance().unwrap();

    let result = common::renderer(&instance, &common::config());
    assert_eq!(
        result.err(),
        Some(GpuError::Vulkan(vk::Result::ERROR_FORMAT_NOT_SUPPORTED))
    );
    assert!(!driver.ledger().called("vkCreateSwapchainKHR"));

    drop(instance);
    assert!(driver.ledger().is_clean());
}

#[test]
fn extent_follows_surface_or_clamped_window() {
    let driver = MockDriver::default();
    let instance = driver.instance().unwrap();
    let renderer = common::renderer(&instance, &common::config()).unwrap();
    assert_eq!(
        renderer.swapchain().extent(),
        vk::Extent2D {
            width: 800,
            height: 600
        }
    );
    drop(renderer);
    drop(instance);

    let driver = MockDriver::new(MockConfig {
        capabilities: MockConfig::default()
            .capabilities
            .current_extent(vk::Extent2D {
                width: u32::MAX,
                height: u32::MAX,
            })
            .max_image_extent(vk::Extent2D {
                width: 1024,
                height: 1024,
            }),
        ..MockConfig::default()
    });
    let instance = driver.instance().unwrap();
    let mut config = common::config();
    config.width = 1920;
    config.height = 480;
    let renderer = common::renderer(&instance, &config).unwrap();
    assert_eq!(
        renderer.swapchain().extent(),
        vk::Extent2D {
            width: 1024,
            height: 480
        }
    );
}
