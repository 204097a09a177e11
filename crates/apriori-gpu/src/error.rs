//! GPU error types.

use ash::vk;
use thiserror::Error;

/// Numeric codes of the engine's own error kinds.
///
/// Engine codes count up from `-1000`; native Vulkan codes keep their raw
/// `VkResult` value, so the two ranges never overlap.
pub mod codes {
    pub const OUT_OF_MEMORY: i32 = -1000;
    pub const NATIVE_PROC_NOT_FOUND: i32 = -999;
    pub const DEBUG_REPORTER_CREATION_FAILED: i32 = -998;
    pub const VALIDATION_LAYERS_NOT_FOUND: i32 = -997;
    pub const EXTENSIONS_NOT_FOUND: i32 = -996;
    pub const GRAPHICS_QUEUE_FAMILY_NOT_FOUND: i32 = -995;
    pub const PRESENT_QUEUE_FAMILY_NOT_FOUND: i32 = -994;
    pub const BOTH_QUEUE_FAMILIES_NOT_FOUND: i32 = -993;
    pub const LOADING: i32 = -992;
}

/// GPU-related errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GpuError {
    /// Host memory allocation failed.
    #[error("{}", describe(codes::OUT_OF_MEMORY))]
    OutOfMemory,

    /// A native entry point could not be resolved.
    #[error("{}", describe(codes::NATIVE_PROC_NOT_FOUND))]
    NativeProcNotFound,

    /// The debug-report callback could not be created.
    #[error("{}", describe(codes::DEBUG_REPORTER_CREATION_FAILED))]
    DebugReporterCreationFailed,

    /// A requested validation layer is missing (first missing name).
    #[error("{} (\"{}\")", describe(codes::VALIDATION_LAYERS_NOT_FOUND), .0)]
    ValidationLayersNotFound(String),

    /// A requested extension is missing (first missing name).
    #[error("{} (\"{}\")", describe(codes::EXTENSIONS_NOT_FOUND), .0)]
    ExtensionsNotFound(String),

    /// No queue family with graphics capability.
    #[error("{}", describe(codes::GRAPHICS_QUEUE_FAMILY_NOT_FOUND))]
    GraphicsQueueFamilyNotFound,

    /// No queue family able to present to the surface.
    #[error("{}", describe(codes::PRESENT_QUEUE_FAMILY_NOT_FOUND))]
    PresentQueueFamilyNotFound,

    /// Neither a graphics nor a present queue family exists.
    #[error("{}", describe(codes::BOTH_QUEUE_FAMILIES_NOT_FOUND))]
    BothQueueFamiliesNotFound,

    /// The Vulkan loader library could not be opened.
    #[error("{}: {}", describe(codes::LOADING), .0)]
    Loading(String),

    /// Native driver status, passed through unmodified.
    #[error("{}", describe(.0.as_raw()))]
    Vulkan(#[from] vk::Result),
}

impl GpuError {
    /// Stable numeric code of this error.
    pub const fn code(&self) -> i32 {
        match self {
            Self::OutOfMemory => codes::OUT_OF_MEMORY,
            Self::NativeProcNotFound => codes::NATIVE_PROC_NOT_FOUND,
            Self::DebugReporterCreationFailed => codes::DEBUG_REPORTER_CREATION_FAILED,
            Self::ValidationLayersNotFound(_) => codes::VALIDATION_LAYERS_NOT_FOUND,
            Self::ExtensionsNotFound(_) => codes::EXTENSIONS_NOT_FOUND,
            Self::GraphicsQueueFamilyNotFound => codes::GRAPHICS_QUEUE_FAMILY_NOT_FOUND,
            Self::PresentQueueFamilyNotFound => codes::PRESENT_QUEUE_FAMILY_NOT_FOUND,
            Self::BothQueueFamiliesNotFound => codes::BOTH_QUEUE_FAMILIES_NOT_FOUND,
            Self::Loading(_) => codes::LOADING,
            Self::Vulkan(result) => result.as_raw(),
        }
    }

    /// Whether this error is a native driver status rather than an engine kind.
    pub const fn is_native(&self) -> bool {
        matches!(self, Self::Vulkan(_))
    }
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, GpuError>;

/// Fixed human-readable description for any numeric error code.
pub fn describe(code: i32) -> &'static str {
    match code {
        codes::OUT_OF_MEMORY => "OUT_OF_MEMORY: memory allocation failure",
        codes::NATIVE_PROC_NOT_FOUND => "VK_PROC_NOT_FOUND: vkGetInstanceProcAddr failed",
        codes::DEBUG_REPORTER_CREATION_FAILED => {
            "DEBUG_REPORTER_CREATION: unable to create Vulkan Instance debug reporter"
        }
        codes::VALIDATION_LAYERS_NOT_FOUND => {
            "LAYERS_NOT_FOUND: some Vulkan validation layers were not found"
        }
        codes::EXTENSIONS_NOT_FOUND => "EXTENSIONS_NOT_FOUND: some Vulkan extensions were not found",
        codes::GRAPHICS_QUEUE_FAMILY_NOT_FOUND => {
            "GRAPHICS_QUEUE_FAMILY_NOT_FOUND: graphics queue family was not found on the physical device"
        }
        codes::PRESENT_QUEUE_FAMILY_NOT_FOUND => {
            "PRESENT_QUEUE_FAMILY_NOT_FOUND: present queue family was not found on the physical device"
        }
        codes::BOTH_QUEUE_FAMILIES_NOT_FOUND => {
            "RENDERER_QUEUE_FAMILIES_NOT_FOUND: both graphics and present queue families were not found on the physical device"
        }
        codes::LOADING => "LOADING: unable to load the Vulkan library",
        native => describe_native(vk::Result::from_raw(native)),
    }
}

fn describe_native(result: vk::Result) -> &'static str {
    match result {
        vk::Result::SUCCESS => "SUCCESS",
        vk::Result::NOT_READY => "(Vulkan API) NOT_READY",
        vk::Result::TIMEOUT => "(Vulkan API) TIMEOUT",
        vk::Result::EVENT_SET => "(Vulkan API) EVENT_SET",
        vk::Result::EVENT_RESET => "(Vulkan API) EVENT_RESET",
        vk::Result::INCOMPLETE => "(Vulkan API) INCOMPLETE",
        vk::Result::ERROR_OUT_OF_HOST_MEMORY => "(Vulkan API) ERROR_OUT_OF_HOST_MEMORY",
        vk::Result::ERROR_OUT_OF_DEVICE_MEMORY => "(Vulkan API) ERROR_OUT_OF_DEVICE_MEMORY",
        vk::Result::ERROR_INITIALIZATION_FAILED => "(Vulkan API) ERROR_INITIALIZATION_FAILED",
        vk::Result::ERROR_DEVICE_LOST => "(Vulkan API) ERROR_DEVICE_LOST",
        vk::Result::ERROR_MEMORY_MAP_FAILED => "(Vulkan API) ERROR_MEMORY_MAP_FAILED",
        vk::Result::ERROR_LAYER_NOT_PRESENT => "(Vulkan API) ERROR_LAYER_NOT_PRESENT",
        vk::Result::ERROR_EXTENSION_NOT_PRESENT => "(Vulkan API) ERROR_EXTENSION_NOT_PRESENT",
        vk::Result::ERROR_FEATURE_NOT_PRESENT => "(Vulkan API) ERROR_FEATURE_NOT_PRESENT",
        vk::Result::ERROR_INCOMPATIBLE_DRIVER => "(Vulkan API) ERROR_INCOMPATIBLE_DRIVER",
        vk::Result::ERROR_TOO_MANY_OBJECTS => "(Vulkan API) ERROR_TOO_MANY_OBJECTS",
        vk::Result::ERROR_FORMAT_NOT_SUPPORTED => "(Vulkan API) ERROR_FORMAT_NOT_SUPPORTED",
        vk::Result::ERROR_SURFACE_LOST_KHR => "(Vulkan API) ERROR_SURFACE_LOST_KHR",
        vk::Result::ERROR_NATIVE_WINDOW_IN_USE_KHR => "(Vulkan API) ERROR_NATIVE_WINDOW_IN_USE_KHR",
        vk::Result::SUBOPTIMAL_KHR => "(Vulkan API) SUBOPTIMAL_KHR",
        vk::Result::ERROR_OUT_OF_DATE_KHR => "(Vulkan API) ERROR_OUT_OF_DATE_KHR",
        vk::Result::ERROR_INCOMPATIBLE_DISPLAY_KHR => "(Vulkan API) ERROR_INCOMPATIBLE_DISPLAY_KHR",
        vk::Result::ERROR_VALIDATION_FAILED_EXT => "(Vulkan API) ERROR_VALIDATION_FAILED_EXT",
        vk::Result::ERROR_INVALID_SHADER_NV => "(Vulkan API) ERROR_INVALID_SHADER_NV",
        _ => "Unknown error",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn engine_errors() -> Vec<GpuError> {
        vec![
            GpuError::OutOfMemory,
            GpuError::NativeProcNotFound,
            GpuError::DebugReporterCreationFailed,
            GpuError::ValidationLayersNotFound("VK_LAYER_KHRONOS_validation".into()),
            GpuError::ExtensionsNotFound("VK_KHR_surface".into()),
            GpuError::GraphicsQueueFamilyNotFound,
            GpuError::PresentQueueFamilyNotFound,
            GpuError::BothQueueFamiliesNotFound,
            GpuError::Loading("libvulkan.so.1".into()),
        ]
    }

    #[test]
    fn every_kind_has_a_distinct_description() {
        let descriptions: Vec<_> = engine_errors().iter().map(|e| describe(e.code())).collect();
        assert!(descriptions.iter().all(|d| !d.is_empty()));
        assert!(descriptions.iter().all(|d| *d != "Unknown error"));

        let unique: HashSet<_> = descriptions.iter().collect();
        assert_eq!(unique.len(), descriptions.len());
    }

    #[test]
    fn engine_and_native_codes_do_not_overlap() {
        let native = [
            vk::Result::ERROR_OUT_OF_HOST_MEMORY,
            vk::Result::ERROR_DEVICE_LOST,
            vk::Result::ERROR_SURFACE_LOST_KHR,
            vk::Result::ERROR_OUT_OF_DATE_KHR,
            vk::Result::ERROR_VALIDATION_FAILED_EXT,
        ];
        for error in engine_errors() {
            assert!(!error.is_native());
            assert!(native.iter().all(|r| r.as_raw() != error.code()));
        }
        for result in native {
            let error = GpuError::from(result);
            assert!(error.is_native());
            assert_eq!(error.code(), result.as_raw());
        }
    }

    #[test]
    fn native_codes_are_prefixed() {
        assert_eq!(
            describe(vk::Result::ERROR_DEVICE_LOST.as_raw()),
            "(Vulkan API) ERROR_DEVICE_LOST"
        );
        assert_eq!(
            GpuError::Vulkan(vk::Result::ERROR_OUT_OF_DATE_KHR).to_string(),
            "(Vulkan API) ERROR_OUT_OF_DATE_KHR"
        );
    }

    #[test]
    fn unmapped_codes_are_unknown() {
        assert_eq!(describe(-12_345), "Unknown error");
        assert_eq!(describe(i32::MIN), "Unknown error");
        assert_eq!(GpuError::Vulkan(vk::Result::from_raw(-4242)).to_string(), "Unknown error");
    }

    #[test]
    fn missing_name_is_reported() {
        let error = GpuError::ValidationLayersNotFound("VK_LAYER_KHRONOS_validation".into());
        assert!(error.to_string().contains("VK_LAYER_KHRONOS_validation"));
        assert!(error.to_string().starts_with("LAYERS_NOT_FOUND"));
    }

    #[test]
    fn payload_variants_format_their_field() {
        assert_eq!(
            GpuError::ExtensionsNotFound("VK_KHR_surface".into()).to_string(),
            "EXTENSIONS_NOT_FOUND: some Vulkan extensions were not found (\"VK_KHR_surface\")"
        );
        assert_eq!(
            GpuError::Loading("libvulkan.so.1: not found".into()).to_string(),
            "LOADING: unable to load the Vulkan library: libvulkan.so.1: not found"
        );
    }

    #[test]
    fn native_status_converts_with_question_mark() {
        fn driver_call() -> Result<()> {
            Err(vk::Result::ERROR_INITIALIZATION_FAILED)?;
            Ok(())
        }
        assert_eq!(
            driver_call(),
            Err(GpuError::Vulkan(vk::Result::ERROR_INITIALIZATION_FAILED))
        );
    }
}
