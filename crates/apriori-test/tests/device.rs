mod common;

use apriori_gpu::device::{create_device, select_physical_device};
use apriori_gpu::{GpuError, QueueFamilies};
use apriori_test::{MockConfig, MockDriver, MockGpu, MockQueueFamily, ObjectKind};
use ash::vk;
use std::ffi::CString;

fn swapchain_extension() -> Vec<CString> {
    vec![ash::khr::swapchain::NAME.to_owned()]
}

#[test]
fn highest_score_wins() {
    let driver = MockDriver::new(MockConfig::with_gpus(vec![
        MockGpu::integrated(c"Integrated"),
        MockGpu::discrete(c"Discrete"),
        MockGpu::discrete(c"Discrete Anisotropic").anisotropy(true),
    ]));
    let instance = driver.instance().unwrap();

    let selected = select_physical_device(&instance);
    assert_eq!(selected.name, "Discrete Anisotropic");
    assert_eq!(selected.handle, MockDriver::physical_device(2));
    assert_eq!(selected.score, 1010);
    assert!(selected.sampler_anisotropy);
}

#[test]
fn tie_keeps_first_enumerated() {
    let driver = MockDriver::new(MockConfig::with_gpus(vec![
        MockGpu::integrated(c"Integrated"),
        MockGpu::discrete(c"First"),
        MockGpu::discrete(c"Second"),
    ]));
    let instance = driver.instance().unwrap();

    let selected = select_physical_device(&instance);
    assert_eq!(selected.name, "First");
    assert_eq!(selected.handle, MockDriver::physical_device(1));
}

#[test]
#[should_panic(expected = "no Vulkan physical devices")]
fn selecting_without_devices_panics() {
    let driver = MockDriver::new(MockConfig::with_gpus(Vec::new()));
    let instance = driver.instance().unwrap();
    let _ = select_physical_device(&instance);
}

#[test]
fn shared_family_with_two_queues_uses_both() {
    common::init_tracing();
    let driver = MockDriver::default();
    let instance = driver.instance().unwrap();
    let gpu = select_physical_device(&instance);
    let families = QueueFamilies {
        graphics: 0,
        present: 0,
    };

    let (device, queues) =
        create_device(&instance, &gpu, families, &[], &swapchain_extension()).unwrap();
    assert!(!queues.is_aliased());
    assert_eq!(device.queue_families(), families);

    {
        let ledger = driver.ledger();
        let request = &ledger.device_requests()[0];
        assert_eq!(request.queues, vec![(0, vec![1.0, 0.75])]);
        assert!(!request.sampler_anisotropy);
        common::assert_no_violations(&ledger);
    }

    drop(device);
    let ledger = driver.ledger();
    assert_eq!(ledger.destroyed_of(ObjectKind::Device), 1);
    common::assert_no_violations(&ledger);
}

#[test]
fn shared_family_with_one_queue_aliases_it() {
    let gpu = MockGpu::discrete(c"Single Queue").queue_families(vec![MockQueueFamily::graphics(true)]);
    let driver = MockDriver::new(MockConfig::with_gpus(vec![gpu]));
    let instance = driver.instance().unwrap();
    let info = select_physical_device(&instance);

    let (_device, queues) = create_device(
        &instance,
        &info,
        QueueFamilies {
            graphics: 0,
            present: 0,
        },
        &[],
        &swapchain_extension(),
    )
    .unwrap();
    assert!(queues.is_aliased());

    let ledger = driver.ledger();
    assert_eq!(ledger.device_requests()[0].queues, vec![(0, vec![1.0])]);
    common::assert_no_violations(&ledger);
}

#[test]
fn distinct_families_get_one_queue_each() {
    let gpu = MockGpu::discrete(c"Split Queues").queue_families(vec![
        MockQueueFamily::graphics(false),
        MockQueueFamily::compute(true),
    ]);
    let driver = MockDriver::new(MockConfig::with_gpus(vec![gpu]));
    let instance = driver.instance().unwrap();
    let info = select_physical_device(&instance);

    let (_device, queues) = create_device(
        &instance,
        &info,
        QueueFamilies {
            graphics: 0,
            present: 1,
        },
        &[],
        &swapchain_extension(),
    )
    .unwrap();
    assert!(!queues.is_aliased());

    let ledger = driver.ledger();
    assert_eq!(
        ledger.device_requests()[0].queues,
        vec![(0, vec![1.0]), (1, vec![0.75])]
    );
    common::assert_no_violations(&ledger);
}

#[test]
fn anisotropy_is_enabled_when_supported() {
    let driver = MockDriver::new(MockConfig::with_gpus(vec![
        MockGpu::discrete(c"Anisotropic").anisotropy(true)
    ]));
    let instance = driver.instance().unwrap();
    let info = select_physical_device(&instance);

    let families = QueueFamilies {
        graphics: 0,
        present: 0,
    };
    let _device = create_device(&instance, &info, families, &[], &swapchain_extension()).unwrap();
    assert!(driver.ledger().device_requests()[0].sampler_anisotropy);
}

#[test]
fn missing_device_extension_creates_nothing() {
    let driver = MockDriver::default();
    let instance = driver.instance().unwrap();
    let info = select_physical_device(&instance);
    let families = QueueFamilies {
        graphics: 0,
        present: 0,
    };

    let result = create_device(
        &instance,
        &info,
        families,
        &[],
        &[c"VK_KHR_missing".to_owned()],
    );
    assert_eq!(
        result.err(),
        Some(GpuError::ExtensionsNotFound("VK_KHR_missing".into()))
    );
    assert!(!driver.ledger().called("vkCreateDevice"));
}

#[test]
fn missing_device_layer_creates_nothing() {
    let gpu = MockGpu {
        layers: Vec::new(),
        ..MockGpu::discrete(c"No Layers")
    };
    let driver = MockDriver::new(MockConfig::with_gpus(vec![gpu]));
    let instance = driver.instance().unwrap();
    let info = select_physical_device(&instance);
    let families = QueueFamilies {
        graphics: 0,
        present: 0,
    };

    let result = create_device(
        &instance,
        &info,
        families,
        &[apriori_gpu::instance::VALIDATION_LAYER.to_owned()],
        &swapchain_extension(),
    );
    assert!(matches!(
        result,
        Err(GpuError::ValidationLayersNotFound(_))
    ));
    assert_eq!(driver.ledger().created_of(ObjectKind::Device), 0);
}

#[test]
fn device_type_scores() {
    use apriori_gpu::device::device_type_score;
    assert_eq!(device_type_score(vk::PhysicalDeviceType::DISCRETE_GPU), 1000);
    assert_eq!(device_type_score(vk::PhysicalDeviceType::INTEGRATED_GPU), 100);
    assert_eq!(device_type_score(vk::PhysicalDeviceType::VIRTUAL_GPU), 10);
    assert_eq!(device_type_score(vk::PhysicalDeviceType::CPU), 0);
}
