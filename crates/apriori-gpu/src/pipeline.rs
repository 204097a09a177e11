//! Overlay graphics pipeline.
//!
//! Draws textured, vertex-colored 2D quads for UI planes. Each plane is
//! positioned and sized with push constants and samples its texture through
//! an immutable sampler.

use crate::descriptors::DescriptorSetLayoutBuilder;
use crate::device::Device;
use crate::error::Result;
use crate::handle::Owned;
use crate::render_pass::{RenderPass, OVERLAY_SUBPASS};
use ash::vk;
use bytemuck::{Pod, Zeroable};
use glam::{UVec2, Vec2};
use std::mem::{offset_of, size_of};
use std::sync::Arc;

/// Vertex buffer binding of the overlay pipeline.
pub const VERTEX_BINDING: u32 = 0;
/// Shader location of [`VertexOverlay::pos`].
pub const LOCATION_POSITION: u32 = 0;
/// Shader location of [`VertexOverlay::color`].
pub const LOCATION_COLOR: u32 = 1;
/// Shader location of [`VertexOverlay::tex`].
pub const LOCATION_TEXTURE: u32 = 2;
/// Descriptor binding of the plane texture.
pub const TEXTURE_BINDING: u32 = 0;

/// Source of the overlay shader bytecode.
pub trait OverlayShaders {
    /// SPIR-V words of the vertex stage.
    fn vertex_overlay(&self) -> &[u32];
    /// SPIR-V words of the fragment stage.
    fn fragment_overlay(&self) -> &[u32];
}

/// Overlay vertex.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct VertexOverlay {
    pub pos: [f32; 2],
    pub color: [f32; 4],
    pub tex: [f32; 2],
}

impl VertexOverlay {
    /// Per-vertex binding.
    pub fn binding_description() -> vk::VertexInputBindingDescription {
        vk::VertexInputBindingDescription::default()
            .binding(VERTEX_BINDING)
            .stride(size_of::<Self>() as u32)
            .input_rate(vk::VertexInputRate::VERTEX)
    }

    /// Position, color and texture coordinate attributes.
    pub fn attribute_descriptions() -> [vk::VertexInputAttributeDescription; 3] {
        [
            vk::VertexInputAttributeDescription::default()
                .binding(VERTEX_BINDING)
                .location(LOCATION_POSITION)
                .format(vk::Format::R32G32_SFLOAT)
                .offset(offset_of!(Self, pos) as u32),
            vk::VertexInputAttributeDescription::default()
                .binding(VERTEX_BINDING)
                .location(LOCATION_COLOR)
                .format(vk::Format::R32G32B32A32_SFLOAT)
                .offset(offset_of!(Self, color) as u32),
            vk::VertexInputAttributeDescription::default()
                .binding(VERTEX_BINDING)
                .location(LOCATION_TEXTURE)
                .format(vk::Format::R32G32_SFLOAT)
                .offset(offset_of!(Self, tex) as u32),
        ]
    }
}

/// Per-plane push constants.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct OverlayPushConstants {
    /// Plane position, vertex stage only.
    pub position: Vec2,
    /// Plane extent in pixels, vertex and fragment stages.
    pub extent: UVec2,
}

impl OverlayPushConstants {
    /// Push-constant ranges, back to back.
    pub fn ranges() -> [vk::PushConstantRange; 2] {
        [
            vk::PushConstantRange::default()
                .stage_flags(vk::ShaderStageFlags::VERTEX)
                .offset(offset_of!(Self, position) as u32)
                .size(size_of::<Vec2>() as u32),
            vk::PushConstantRange::default()
                .stage_flags(vk::ShaderStageFlags::VERTEX | vk::ShaderStageFlags::FRAGMENT)
                .offset(offset_of!(Self, extent) as u32)
                .size(size_of::<UVec2>() as u32),
        ]
    }
}

/// Color blending of overlay planes.
pub fn overlay_blend_attachment() -> vk::PipelineColorBlendAttachmentState {
    vk::PipelineColorBlendAttachmentState::default()
        .blend_enable(true)
        .src_color_blend_factor(vk::BlendFactor::SRC_ALPHA)
        .dst_color_blend_factor(vk::BlendFactor::ONE_MINUS_DST_ALPHA)
        .color_blend_op(vk::BlendOp::ADD)
        .src_alpha_blend_factor(vk::BlendFactor::ONE)
        .dst_alpha_blend_factor(vk::BlendFactor::ZERO)
        .alpha_blend_op(vk::BlendOp::ADD)
        .color_write_mask(vk::ColorComponentFlags::RGBA)
}

/// Sampler settings for plane textures; `anisotropy` enables anisotropic filtering.
pub fn overlay_sampler_info(anisotropy: Option<f32>) -> vk::SamplerCreateInfo<'static> {
    vk::SamplerCreateInfo::default()
        .mag_filter(vk::Filter::LINEAR)
        .min_filter(vk::Filter::LINEAR)
        .mipmap_mode(vk::SamplerMipmapMode::NEAREST)
        .address_mode_u(vk::SamplerAddressMode::CLAMP_TO_BORDER)
        .address_mode_v(vk::SamplerAddressMode::CLAMP_TO_BORDER)
        .address_mode_w(vk::SamplerAddressMode::CLAMP_TO_BORDER)
        .anisotropy_enable(anisotropy.is_some())
        .max_anisotropy(anisotropy.unwrap_or(0.0))
        .border_color(vk::BorderColor::FLOAT_TRANSPARENT_BLACK)
        .unnormalized_coordinates(true)
}

/// Descriptor pool sizes for `render_target_count` overlay sets.
pub fn overlay_descriptor_pool_sizes(render_target_count: u32) -> [vk::DescriptorPoolSize; 1] {
    [vk::DescriptorPoolSize::default()
        .ty(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
        .descriptor_count(render_target_count)]
}

/// The overlay pipeline with every object it depends on.
pub struct OverlayPipeline {
    // Destroyed in declaration order.
    pipeline: Owned<vk::Pipeline>,
    layout: Owned<vk::PipelineLayout>,
    descriptor_set_layout: Owned<vk::DescriptorSetLayout>,
    sampler: Owned<vk::Sampler>,
    fragment_shader: Owned<vk::ShaderModule>,
    vertex_shader: Owned<vk::ShaderModule>,
}

impl OverlayPipeline {
    /// Create the overlay pipeline for `render_pass`.
    ///
    /// The scissor is fixed to `extent`; the viewport is dynamic.
    pub fn new(
        device: &Arc<Device>,
        render_pass: &RenderPass,
        extent: vk::Extent2D,
        anisotropy: Option<f32>,
        shaders: &dyn OverlayShaders,
    ) -> Result<Self> {
        tracing::info!("Creating overlay pipeline...");

        let vertex_shader = create_shader_module(device, shaders.vertex_overlay())?;
        let fragment_shader = create_shader_module(device, shaders.fragment_overlay())?;

        let sampler_info = overlay_sampler_info(anisotropy);
        // SAFETY: the sampler info references no external memory.
        let sampler = Owned::new(device, unsafe { device.driver().create_sampler(&sampler_info) }?);

        let sampler_handle = sampler.handle();
        let descriptor_set_layout = DescriptorSetLayoutBuilder::new()
            .immutable_sampler(TEXTURE_BINDING, vk::ShaderStageFlags::FRAGMENT, &sampler_handle)
            .build(device)?;

        let set_layouts = [descriptor_set_layout.handle()];
        let push_constant_ranges = OverlayPushConstants::ranges();
        let layout_info = vk::PipelineLayoutCreateInfo::default()
            .set_layouts(&set_layouts)
            .push_constant_ranges(&push_constant_ranges);
        // SAFETY: the set layout is alive.
        let layout = Owned::new(device, unsafe {
            device.driver().create_pipeline_layout(&layout_info)
        }?);

        // Shader stages
        let shader_stages = [
            vk::PipelineShaderStageCreateInfo::default()
                .stage(vk::ShaderStageFlags::VERTEX)
                .module(vertex_shader.handle())
                .name(c"main"),
            vk::PipelineShaderStageCreateInfo::default()
                .stage(vk::ShaderStageFlags::FRAGMENT)
                .module(fragment_shader.handle())
                .name(c"main"),
        ];

        // Vertex input
        let bindings = [VertexOverlay::binding_description()];
        let attributes = VertexOverlay::attribute_descriptions();
        let vertex_input = vk::PipelineVertexInputStateCreateInfo::default()
            .vertex_binding_descriptions(&bindings)
            .vertex_attribute_descriptions(&attributes);

        // Input assembly
        let input_assembly = vk::PipelineInputAssemblyStateCreateInfo::default()
            .topology(vk::PrimitiveTopology::TRIANGLE_LIST)
            .primitive_restart_enable(false);

        // Viewport (dynamic), scissor covers the render target
        let scissors = [vk::Rect2D {
            offset: vk::Offset2D { x: 0, y: 0 },
            extent,
        }];
        let viewport_state = vk::PipelineViewportStateCreateInfo::default()
            .viewport_count(1)
            .scissors(&scissors);

        // Rasterization
        let rasterization = vk::PipelineRasterizationStateCreateInfo::default()
            .depth_clamp_enable(false)
            .rasterizer_discard_enable(false)
            .polygon_mode(vk::PolygonMode::FILL)
            .cull_mode(vk::CullModeFlags::NONE)
            .front_face(vk::FrontFace::CLOCKWISE)
            .depth_bias_enable(false)
            .line_width(1.0);

        // Multisampling
        let multisampling = vk::PipelineMultisampleStateCreateInfo::default()
            .rasterization_samples(vk::SampleCountFlags::TYPE_1)
            .sample_shading_enable(false);

        // Color blending, one attachment per subpass color attachment
        let color_blend_attachments: Vec<_> = (0..render_pass.color_attachment_count())
            .map(|_| overlay_blend_attachment())
            .collect();
        let color_blending = vk::PipelineColorBlendStateCreateInfo::default()
            .logic_op_enable(false)
            .attachments(&color_blend_attachments);

        // Dynamic state
        let dynamic_states = [vk::DynamicState::VIEWPORT];
        let dynamic_state =
            vk::PipelineDynamicStateCreateInfo::default().dynamic_states(&dynamic_states);

        let pipeline_info = vk::GraphicsPipelineCreateInfo::default()
            .stages(&shader_stages)
            .vertex_input_state(&vertex_input)
            .input_assembly_state(&input_assembly)
            .viewport_state(&viewport_state)
            .rasterization_state(&rasterization)
            .multisample_state(&multisampling)
            .color_blend_state(&color_blending)
            .dynamic_state(&dynamic_state)
            .layout(layout.handle())
            .render_pass(render_pass.handle())
            .subpass(OVERLAY_SUBPASS);

        // SAFETY: every state struct and handle referenced above is alive.
        let pipeline = Owned::new(device, unsafe {
            device.driver().create_graphics_pipeline(&pipeline_info)
        }?);

        tracing::info!("Overlay pipeline created");

        Ok(Self {
            pipeline,
            layout,
            descriptor_set_layout,
            sampler,
            fragment_shader,
            vertex_shader,
        })
    }

    /// Raw pipeline handle.
    pub fn handle(&self) -> vk::Pipeline {
        self.pipeline.handle()
    }

    /// Pipeline layout.
    pub fn layout(&self) -> vk::PipelineLayout {
        self.layout.handle()
    }

    /// Layout of the plane texture descriptor set.
    pub fn descriptor_set_layout(&self) -> vk::DescriptorSetLayout {
        self.descriptor_set_layout.handle()
    }

    /// Immutable sampler of the plane texture binding.
    pub fn sampler(&self) -> vk::Sampler {
        self.sampler.handle()
    }

    /// Vertex and fragment shader modules.
    pub fn shader_modules(&self) -> [vk::ShaderModule; 2] {
        [self.vertex_shader.handle(), self.fragment_shader.handle()]
    }
}

fn create_shader_module(device: &Arc<Device>, code: &[u32]) -> Result<Owned<vk::ShaderModule>> {
    let shader_info = vk::ShaderModuleCreateInfo::default().code(code);
    // SAFETY: the code slice outlives the call.
    let module = unsafe { device.driver().create_shader_module(&shader_info) }?;
    Ok(Owned::new(device, module))
}
