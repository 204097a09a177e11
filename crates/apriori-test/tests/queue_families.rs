mod common;

use apriori_gpu::{resolve_queue_families, GpuError, QueueFamilies, Result, Surface};
use apriori_test::{
    window_handles, MockConfig, MockDriver, MockGpu, MockQueueFamily, INJECTED_FAILURE,
};

fn resolve_with(families: Vec<MockQueueFamily>, fail_nth: Option<usize>) -> Result<QueueFamilies> {
    let gpu = MockGpu::discrete(c"Queue Test GPU").queue_families(families);
    let driver = MockDriver::new(MockConfig::with_gpus(vec![gpu]));
    let instance = driver.instance().unwrap();
    // SAFETY: the mock never dereferences the window handles.
    let surface = unsafe { Surface::new(&instance, &window_handles()) }.unwrap();

    if let Some(n) = fail_nth {
        driver.fail_nth(n);
    }
    let result = resolve_queue_families(MockDriver::physical_device(0), &surface);

    drop(surface);
    drop(instance);
    assert!(driver.ledger().is_clean());
    result
}

fn resolve(families: Vec<MockQueueFamily>) -> Result<QueueFamilies> {
    resolve_with(families, None)
}

#[test]
fn later_family_with_both_overrides_independent_winners() {
    let families = resolve(vec![
        MockQueueFamily::graphics(false),
        MockQueueFamily::compute(true),
        MockQueueFamily::graphics(true),
    ]);
    assert_eq!(
        families,
        Ok(QueueFamilies {
            graphics: 2,
            present: 2
        })
    );
}

#[test]
fn independent_families_keep_first_of_each() {
    let families = resolve(vec![
        MockQueueFamily::compute(false),
        MockQueueFamily::graphics(false),
        MockQueueFamily::compute(true),
        MockQueueFamily::graphics(false),
        MockQueueFamily::compute(true),
    ])
    .unwrap();
    assert_eq!(
        families,
        QueueFamilies {
            graphics: 1,
            present: 2
        }
    );
    assert!(!families.is_shared());
}

#[test]
fn first_family_with_both_wins() {
    let families = resolve(vec![
        MockQueueFamily::graphics(true),
        MockQueueFamily::graphics(true),
    ])
    .unwrap();
    assert_eq!(families.graphics, 0);
    assert!(families.is_shared());
}

#[test]
fn no_capable_family_reports_both_missing() {
    assert_eq!(
        resolve(vec![MockQueueFamily::compute(false)]),
        Err(GpuError::BothQueueFamiliesNotFound)
    );
    assert_eq!(resolve(Vec::new()), Err(GpuError::BothQueueFamiliesNotFound));
}

#[test]
fn single_missing_role_is_reported() {
    assert_eq!(
        resolve(vec![MockQueueFamily::compute(true)]),
        Err(GpuError::GraphicsQueueFamilyNotFound)
    );
    assert_eq!(
        resolve(vec![MockQueueFamily::graphics(false)]),
        Err(GpuError::PresentQueueFamilyNotFound)
    );
}

#[test]
fn failing_support_query_aborts_resolution() {
    let result = resolve_with(
        vec![
            MockQueueFamily::graphics(false),
            MockQueueFamily::graphics(true),
        ],
        Some(0),
    );
    assert_eq!(result, Err(GpuError::Vulkan(INJECTED_FAILURE)));
}
