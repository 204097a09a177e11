//! Apriori Viewer
//!
//! Creates a Vulkan instance, opens a window and builds the overlay
//! renderer for it. Closing the window tears everything down.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p apriori-viewer -- [OPTIONS]
//! ```
//!
//! ## Options
//!
//! - `--shaders <DIR>`: Directory holding `overlay.vert.spv` and `overlay.frag.spv` (default: `shaders`)
//! - `--width <N>` / `--height <N>`: Initial window size (default: 1280x720)
//! - `--validation`: Enable the validation layer in release builds
//! - `-h, --help`: Print help message

use anyhow::{bail, Context};
use apriori_gpu::{Instance, InstanceBuilder, Renderer, RendererConfig};
use apriori_platform::{create_window, required_extensions, window_handles, PlatformConfig};
use apriori_shaders::SpirvShaders;
use std::ffi::CStr;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

#[derive(Debug)]
struct Options {
    shaders: PathBuf,
    width: u32,
    height: u32,
    validation: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            shaders: PathBuf::from("shaders"),
            width: 1280,
            height: 720,
            validation: cfg!(debug_assertions),
        }
    }
}

fn parse_args(args: impl IntoIterator<Item = String>) -> anyhow::Result<Options> {
    let mut options = Options::default();
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        let mut value = |name: &str| args.next().with_context(|| format!("{name} expects a value"));
        match arg.as_str() {
            "--shaders" => options.shaders = PathBuf::from(value("--shaders")?),
            "--width" => options.width = value("--width")?.parse().context("invalid --width")?,
            "--height" => options.height = value("--height")?.parse().context("invalid --height")?,
            "--validation" => options.validation = true,
            other => bail!("unknown argument: {other}"),
        }
    }
    Ok(options)
}

fn main() -> anyhow::Result<()> {
    if std::env::args().any(|arg| arg == "-h" || arg == "--help") {
        print_help();
        return Ok(());
    }

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let options = parse_args(std::env::args().skip(1))?;
    let shaders = load_shaders(&options)?;

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Wait);

    let extensions = required_extensions(&event_loop.owned_display_handle())?;
    let instance = instance_builder(&options, &extensions).build()?;

    let mut runner = AppRunner {
        instance: &instance,
        shaders,
        platform: PlatformConfig::new("Apriori Viewer").with_size(options.width, options.height),
        validation: options.validation,
        state: None,
        error: None,
    };
    event_loop.run_app(&mut runner)?;

    match runner.error {
        Some(error) => Err(error),
        None => Ok(()),
    }
}

/// Instance settings for the viewer, presenting to the given display's surfaces.
fn instance_builder(options: &Options, surface_extensions: &[&CStr]) -> InstanceBuilder {
    InstanceBuilder::new()
        .app_name("Apriori Viewer")
        .validation(options.validation)
        .surface_extensions(surface_extensions)
}

#[cfg(feature = "embedded-shaders")]
fn load_shaders(_options: &Options) -> anyhow::Result<SpirvShaders> {
    Ok(SpirvShaders::embedded()?)
}

#[cfg(not(feature = "embedded-shaders"))]
fn load_shaders(options: &Options) -> anyhow::Result<SpirvShaders> {
    SpirvShaders::from_dir(&options.shaders)
        .with_context(|| format!("loading shaders from {}", options.shaders.display()))
}

fn print_help() {
    eprintln!(
        "Apriori Viewer

USAGE:
    apriori-viewer [OPTIONS]

OPTIONS:
    --shaders <DIR>     Directory with overlay.vert.spv and overlay.frag.spv [default: shaders]
    --width <N>         Initial window width [default: 1280]
    --height <N>        Initial window height [default: 720]
    --validation        Enable the validation layer
    -h, --help          Print this help message

ENVIRONMENT:
    RUST_LOG            Log filter [default: info]"
    );
}

/// Live window state. The renderer is declared first so it drops before the window.
struct State<'i> {
    renderer: Renderer<'i>,
    window: Window,
}

struct AppRunner<'i> {
    instance: &'i Instance,
    shaders: SpirvShaders,
    platform: PlatformConfig,
    validation: bool,
    state: Option<State<'i>>,
    error: Option<anyhow::Error>,
}

impl<'i> AppRunner<'i> {
    fn create_state(&self, event_loop: &ActiveEventLoop) -> anyhow::Result<State<'i>> {
        let window = create_window(event_loop, &self.platform)?;
        let size = window.inner_size();
        let handles = window_handles(&window)?;
        let config = RendererConfig::new(size.width, size.height).validation(self.validation);

        // SAFETY: the window is stored next to the renderer and dropped after it.
        let renderer =
            unsafe { Renderer::with_config(self.instance, &handles, &config, &self.shaders) }?;

        let swapchain = renderer.swapchain();
        tracing::info!(
            gpu = %renderer.device().physical_device().name,
            images = swapchain.image_count(),
            width = swapchain.extent().width,
            height = swapchain.extent().height,
            format = ?swapchain.format().format,
            present_mode = ?swapchain.present_mode(),
            "Viewer ready"
        );

        Ok(State { renderer, window })
    }
}

impl ApplicationHandler for AppRunner<'_> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }
        match self.create_state(event_loop) {
            Ok(state) => self.state = Some(state),
            Err(e) => {
                tracing::error!("Failed to initialize: {e:#}");
                self.error = Some(e);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        let Some(state) = &self.state else {
            return;
        };
        if state.window.id() != window_id {
            return;
        }

        match event {
            WindowEvent::CloseRequested => {
                tracing::info!("Close requested, shutting down");
                self.state = None;
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                let current = state.renderer.swapchain().extent();
                if (size.width, size.height) != (current.width, current.height) {
                    tracing::debug!(
                        width = size.width,
                        height = size.height,
                        "Window resized; swapchain keeps its creation extent"
                    );
                }
            }
            _ => {}
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.state = None;
    }
}
