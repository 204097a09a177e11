#![allow(dead_code)]

use apriori_gpu::{Instance, Renderer, RendererConfig, Result};
use apriori_test::{window_handles, Ledger, MockShaders};
use tracing_subscriber::EnvFilter;

/// Send engine logs to the test output, filtered by `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Window settings matching the mock surface.
pub fn config() -> RendererConfig {
    RendererConfig::new(800, 600).validation(true)
}

/// Build a renderer against the mock window.
pub fn renderer<'i>(instance: &'i Instance, config: &RendererConfig) -> Result<Renderer<'i>> {
    // SAFETY: the mock never dereferences the window handles.
    unsafe { Renderer::with_config(instance, &window_handles(), config, &MockShaders) }
}

/// Fail unless the ledger recorded no misuse.
pub fn assert_no_violations(ledger: &Ledger) {
    assert!(
        ledger.violations().is_empty(),
        "violations: {:#?}",
        ledger.violations()
    );
}
