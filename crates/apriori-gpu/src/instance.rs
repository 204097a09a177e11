//! Vulkan instance creation and the physical-device catalog.

use crate::driver::{EntryDriver, InstanceDriver};
use crate::dyn_array::{self, DynArray};
use crate::error::{GpuError, Result};
use crate::loader::AshEntry;
use ash::vk;
use std::ffi::{c_char, c_void, CStr, CString};

/// Engine name reported to the driver.
pub const ENGINE_NAME: &CStr = c"Apriori";

/// Standard validation layer enabled with validation.
pub const VALIDATION_LAYER: &CStr = c"VK_LAYER_KHRONOS_validation";

/// Instance extensions needed to present to a window on this platform.
pub fn surface_extensions() -> Vec<&'static CStr> {
    vec![
        ash::khr::surface::NAME,
        #[cfg(target_os = "windows")]
        ash::khr::win32_surface::NAME,
        #[cfg(all(unix, not(target_os = "macos"), not(target_os = "android")))]
        ash::khr::xlib_surface::NAME,
        #[cfg(all(unix, not(target_os = "macos"), not(target_os = "android")))]
        ash::khr::wayland_surface::NAME,
        #[cfg(target_os = "macos")]
        ash::ext::metal_surface::NAME,
        #[cfg(target_os = "macos")]
        ash::khr::portability_enumeration::NAME,
    ]
}

/// Return the first requested name missing from `available`.
pub(crate) fn first_missing<'a, 'b>(
    requested: &'a [CString],
    available: impl Iterator<Item = &'b CStr> + Clone,
) -> Option<&'a CStr> {
    requested
        .iter()
        .map(CString::as_c_str)
        .find(|name| !available.clone().any(|found| found == *name))
}

/// Fail with [`GpuError::ValidationLayersNotFound`] unless every layer is listed.
pub(crate) fn check_layers(
    requested: &[CString],
    available: &[vk::LayerProperties],
) -> Result<()> {
    tracing::trace!(available = available.len(), "Checking requested validation layers");
    let names = available.iter().filter_map(|p| p.layer_name_as_c_str().ok());
    if let Some(missing) = first_missing(requested, names) {
        let missing = missing.to_string_lossy().into_owned();
        tracing::error!("Layer \"{missing}\" is not found");
        return Err(GpuError::ValidationLayersNotFound(missing));
    }
    Ok(())
}

/// Fail with [`GpuError::ExtensionsNotFound`] unless every extension is listed.
pub(crate) fn check_extensions(
    requested: &[CString],
    available: &[vk::ExtensionProperties],
) -> Result<()> {
    tracing::trace!(available = available.len(), "Checking requested extensions");
    let names = available
        .iter()
        .filter_map(|p| p.extension_name_as_c_str().ok());
    if let Some(missing) = first_missing(requested, names) {
        let missing = missing.to_string_lossy().into_owned();
        tracing::error!("Extension \"{missing}\" is not found");
        return Err(GpuError::ExtensionsNotFound(missing));
    }
    Ok(())
}

/// Tracing level for a debug-report message, by its most severe flag.
pub fn report_level(flags: vk::DebugReportFlagsEXT) -> Option<tracing::Level> {
    if flags.contains(vk::DebugReportFlagsEXT::ERROR) {
        Some(tracing::Level::ERROR)
    } else if flags.contains(vk::DebugReportFlagsEXT::WARNING) {
        Some(tracing::Level::WARN)
    } else if flags.contains(vk::DebugReportFlagsEXT::INFORMATION) {
        Some(tracing::Level::INFO)
    } else if flags.contains(vk::DebugReportFlagsEXT::PERFORMANCE_WARNING) {
        Some(tracing::Level::WARN)
    } else if flags.contains(vk::DebugReportFlagsEXT::DEBUG) {
        Some(tracing::Level::DEBUG)
    } else {
        None
    }
}

unsafe extern "system" fn debug_report_callback(
    flags: vk::DebugReportFlagsEXT,
    _object_type: vk::DebugReportObjectTypeEXT,
    _object: u64,
    _location: usize,
    message_code: i32,
    p_layer_prefix: *const c_char,
    p_message: *const c_char,
    _user_data: *mut c_void,
) -> vk::Bool32 {
    let text = |ptr: *const c_char| {
        if ptr.is_null() {
            String::new()
        } else {
            // SAFETY: the driver passes NUL-terminated strings valid for the call.
            unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned()
        }
    };
    let prefix = text(p_layer_prefix);
    let message = text(p_message);

    match report_level(flags) {
        Some(tracing::Level::ERROR) => {
            tracing::error!(target: "vulkan", "{prefix}: {message}, code = {message_code}");
        }
        Some(tracing::Level::WARN) => {
            tracing::warn!(target: "vulkan", "{prefix}: {message}, code = {message_code}");
        }
        Some(tracing::Level::INFO) => {
            tracing::info!(target: "vulkan", "{prefix}: {message}, code = {message_code}");
        }
        Some(_) => {
            tracing::debug!(target: "vulkan", "{prefix}: {message}, code = {message_code}");
        }
        None => {}
    }

    // Applications must always return false here.
    vk::FALSE
}

/// Destroys a native instance unless ownership moved into an [`Instance`].
struct NativeInstance(Box<dyn InstanceDriver>);

impl Drop for NativeInstance {
    fn drop(&mut self) {
        tracing::debug!("Destroying Vulkan instance");
        // SAFETY: every child object is destroyed before the instance guard.
        unsafe { self.0.destroy_instance() };
    }
}

/// A Vulkan instance with its cached physical devices.
///
/// Renderers borrow the instance, so it cannot be dropped while any of them
/// is alive.
pub struct Instance {
    debug_reporter: Option<vk::DebugReportCallbackEXT>,
    physical_devices: DynArray<vk::PhysicalDevice>,
    native: NativeInstance,
}

impl Instance {
    /// Create an instance with default settings through the system loader.
    pub fn new() -> Result<Self> {
        InstanceBuilder::new().build()
    }

    /// Native driver of this instance.
    pub fn driver(&self) -> &dyn InstanceDriver {
        self.native.0.as_ref()
    }

    /// Raw instance handle.
    pub fn handle(&self) -> vk::Instance {
        self.native.0.handle()
    }

    /// Physical devices, in enumeration order.
    pub fn physical_devices(&self) -> &[vk::PhysicalDevice] {
        &self.physical_devices
    }

    /// Whether a debug-report callback is installed.
    pub fn has_debug_reporter(&self) -> bool {
        self.debug_reporter.is_some()
    }
}

impl Drop for Instance {
    fn drop(&mut self) {
        if let Some(callback) = self.debug_reporter.take() {
            tracing::debug!("Destroying debug reporter");
            // SAFETY: the callback was created by this instance.
            unsafe { self.native.0.destroy_debug_report_callback(callback) };
        }
    }
}

/// Raw handle of an optional instance; null when there is none.
pub fn vk_handle(instance: Option<&Instance>) -> vk::Instance {
    instance.map_or(vk::Instance::null(), Instance::handle)
}

/// Builder for creating an [`Instance`].
pub struct InstanceBuilder {
    app_name: String,
    enable_validation: bool,
    layers: Vec<CString>,
    extensions: Vec<CString>,
    debug_reporting: Option<bool>,
    require_debug_reporter: bool,
}

impl Default for InstanceBuilder {
    fn default() -> Self {
        Self {
            app_name: "Apriori".to_string(),
            enable_validation: cfg!(debug_assertions),
            layers: Vec::new(),
            extensions: surface_extensions().into_iter().map(CStr::to_owned).collect(),
            debug_reporting: None,
            require_debug_reporter: false,
        }
    }
}

impl InstanceBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the application name.
    pub fn app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = name.into();
        self
    }

    /// Enable or disable the standard validation layer.
    pub fn validation(mut self, enable: bool) -> Self {
        self.enable_validation = enable;
        self
    }

    /// Request an additional instance layer.
    pub fn layer(mut self, name: &CStr) -> Self {
        self.layers.push(name.to_owned());
        self
    }

    /// Request an additional instance extension.
    pub fn extension(mut self, name: &CStr) -> Self {
        self.extensions.push(name.to_owned());
        self
    }

    /// Replace the window-system extensions with the set a display reports.
    pub fn surface_extensions(mut self, names: &[&CStr]) -> Self {
        let platform = surface_extensions();
        self.extensions
            .retain(|ext| !platform.contains(&ext.as_c_str()));
        self.extensions
            .extend(names.iter().map(|&name| name.to_owned()));
        // Required by the portability flag set at creation.
        #[cfg(target_os = "macos")]
        self.extensions
            .push(ash::khr::portability_enumeration::NAME.to_owned());
        self
    }

    /// Forward driver debug reports to the log. Defaults to the validation setting.
    pub fn debug_reporting(mut self, enable: bool) -> Self {
        self.debug_reporting = Some(enable);
        self
    }

    /// Fail instead of warning when the debug-report entry point is missing.
    pub fn require_debug_reporter(mut self, require: bool) -> Self {
        self.require_debug_reporter = require;
        self
    }

    fn requested_layers(&self) -> Vec<CString> {
        let mut layers = Vec::new();
        if self.enable_validation {
            layers.push(VALIDATION_LAYER.to_owned());
        }
        for layer in &self.layers {
            if !layers.contains(layer) {
                layers.push(layer.clone());
            }
        }
        layers
    }

    fn requested_extensions(&self, debug_reporting: bool) -> Vec<CString> {
        let mut extensions = Vec::new();
        for extension in &self.extensions {
            if !extensions.contains(extension) {
                extensions.push(extension.clone());
            }
        }
        let debug_report = ash::ext::debug_report::NAME.to_owned();
        if debug_reporting && !extensions.contains(&debug_report) {
            extensions.push(debug_report);
        }
        extensions
    }

    /// Build the instance through the system Vulkan loader.
    pub fn build(self) -> Result<Instance> {
        let entry = AshEntry::load()?;
        self.build_with(&entry)
    }

    /// Build the instance through any loader-scope driver.
    pub fn build_with(self, entry: &dyn EntryDriver) -> Result<Instance> {
        tracing::info!("Creating new Vulkan instance...");

        let debug_reporting = self.debug_reporting.unwrap_or(self.enable_validation);
        let layers = self.requested_layers();
        let extensions = self.requested_extensions(debug_reporting);

        let available_layers =
            dyn_array::enumerate(|count, out| entry.enumerate_instance_layers(count, out))?;
        check_layers(&layers, &available_layers)?;

        let available_extensions =
            dyn_array::enumerate(|count, out| entry.enumerate_instance_extensions(count, out))?;
        check_extensions(&extensions, &available_extensions)?;

        let app_name = CString::new(self.app_name.replace('\0', ""))
            .unwrap_or_else(|_| CString::from(c"Apriori"));
        tracing::trace!(app_name = %self.app_name, "Application identity");

        let app_info = vk::ApplicationInfo::default()
            .application_name(&app_name)
            .application_version(vk::make_api_version(0, 0, 1, 0))
            .engine_name(ENGINE_NAME)
            .engine_version(vk::make_api_version(0, 0, 1, 0))
            .api_version(vk::API_VERSION_1_0);

        let layer_names: Vec<*const c_char> = layers.iter().map(|l| l.as_ptr()).collect();
        let extension_names: Vec<*const c_char> =
            extensions.iter().map(|e| e.as_ptr()).collect();

        // Required for MoltenVK on macOS
        #[cfg(target_os = "macos")]
        let create_flags = vk::InstanceCreateFlags::ENUMERATE_PORTABILITY_KHR;
        #[cfg(not(target_os = "macos"))]
        let create_flags = vk::InstanceCreateFlags::empty();

        let create_info = vk::InstanceCreateInfo::default()
            .application_info(&app_info)
            .enabled_layer_names(&layer_names)
            .enabled_extension_names(&extension_names)
            .flags(create_flags);

        // SAFETY: every name pointer outlives the call.
        let native = NativeInstance(unsafe { entry.create_instance(&create_info) }?);

        tracing::trace!("Initializing physical devices...");
        let physical_devices = dyn_array::enumerate(|count, out| {
            native.0.enumerate_physical_devices(count, out)
        })?;
        tracing::trace!(count = physical_devices.count(), "Physical devices initialized");

        let debug_reporter = if debug_reporting {
            create_debug_reporter(native.0.as_ref(), self.require_debug_reporter)?
        } else {
            None
        };

        tracing::info!(
            physical_devices = physical_devices.count(),
            debug_reporter = debug_reporter.is_some(),
            "Vulkan instance created"
        );

        Ok(Instance {
            debug_reporter,
            physical_devices,
            native,
        })
    }
}

fn create_debug_reporter(
    driver: &dyn InstanceDriver,
    required: bool,
) -> Result<Option<vk::DebugReportCallbackEXT>> {
    tracing::trace!("Creating new debug reporter...");

    if !driver.debug_report_available() {
        if required {
            tracing::error!("vkCreateDebugReportCallbackEXT is not available");
            return Err(GpuError::NativeProcNotFound);
        }
        tracing::warn!("vkCreateDebugReportCallbackEXT is not available, debug reporting disabled");
        return Ok(None);
    }

    let info = vk::DebugReportCallbackCreateInfoEXT::default()
        .flags(
            vk::DebugReportFlagsEXT::WARNING
                | vk::DebugReportFlagsEXT::PERFORMANCE_WARNING
                | vk::DebugReportFlagsEXT::ERROR
                | vk::DebugReportFlagsEXT::DEBUG,
        )
        .pfn_callback(Some(debug_report_callback));

    // SAFETY: availability was checked above.
    let callback = unsafe { driver.create_debug_report_callback(&info) }.map_err(|e| {
        tracing::error!("Unable to create debug reporter: {e}");
        GpuError::DebugReporterCreationFailed
    })?;

    tracing::trace!("Debug reporter created");
    Ok(Some(callback))
}
