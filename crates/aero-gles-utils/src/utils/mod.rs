//! The utility dispatch engine.
//!
//! GL operations the GPU API has no direct equivalent for (index/vertex format conversion,
//! masked clears, format-converting copies and blits, stencil blits without shader stencil
//! export, mipmap generation, multisample unresolve, ETC transcoding, the debug overlay) are
//! implemented as small internal compute or draw passes.
//!
//! Each [`Function`] owns one descriptor set layout, one pipeline layout and one descriptor pool,
//! created the first time the function is used. Pipelines are cached per function and shader
//! variant, so repeated operations only record commands.

pub mod flags;
pub mod params;

mod blit;
mod clear;
mod convert;
mod copy;
mod mipmap;
mod overlay;
mod shading_rate;
mod transcode;
mod unresolve;

use std::sync::Arc;

use aero_gles_texture::Rectangle;
use hashbrown::HashMap;

use crate::config::UtilsConfig;
use crate::error::Result;
use crate::hal::{
    BufferHandle, CommandRecorder, DepthState, DescriptorPoolHandle, DescriptorPoolSize,
    DescriptorResource, DescriptorSetHandle, DescriptorSetLayoutBinding,
    DescriptorSetLayoutDesc, DescriptorSetLayoutHandle, DescriptorType, DescriptorWrite, Device,
    Features, GraphicsPipelineDesc, ImageViewHandle, LoadOp, PipelineBindPoint,
    PipelineHandle, PipelineLayoutDesc, PipelineLayoutHandle, PushConstantRange,
    RenderPassBegin, RenderPassClosureReason, RenderPassDesc, SamplerDesc, SamplerHandle,
    ShaderModuleHandle, ShaderSource, StencilState,
};
use crate::image::BufferHelper;
use crate::shaders::ShaderKey;
use params::{
    BlitResolveShaderParams, BlitResolveStencilNoExportShaderParams,
    ConvertIndexIndirectLineLoopShaderParams, ConvertIndexIndirectShaderParams,
    ConvertIndexShaderParams, ConvertIndirectLineLoopShaderParams, ConvertVertexShaderParams,
    CopyImageToBufferShaderParams, EtcToBcShaderParams, ExportStencilShaderParams,
    GenerateFragmentShadingRateShaderParams, GenerateMipmapShaderParams, ImageClearShaderParams,
    ImageCopyShaderParams, OverlayDrawShaderParams,
};

/// Largest number of input attachments an unresolve pass reads: every color attachment plus
/// depth and stencil.
pub const MAX_UNRESOLVE_ATTACHMENTS: u32 = crate::hal::MAX_DRAW_BUFFERS as u32 + 2;

/// Framebuffers the engine creates for its own passes get serials from this base upwards so they
/// never collide with application framebuffers.
const TEMPORARY_FRAMEBUFFER_SERIAL_BASE: u64 = 1 << 63;

/// One internal operation family. Every function has its own descriptor set and pipeline layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Function {
    ImageClear,
    ImageCopy,
    BlitResolve,
    Blit3DSrc,
    ExportStencil,
    OverlayDraw,
    ConvertIndexBuffer,
    ConvertIndexIndirectBuffer,
    ConvertIndexIndirectLineLoopBuffer,
    ConvertIndirectLineLoopBuffer,
    ConvertVertexBuffer,
    BlitResolveStencilNoExport,
    CopyImageToBuffer,
    GenerateMipmap,
    TransCodeEtcToBc,
    /// Unresolve reading the given number of input attachments (1 to 10).
    Unresolve(u32),
    GenerateFragmentShadingRate,
}

impl Function {
    pub fn is_compute(self) -> bool {
        matches!(
            self,
            Function::ConvertIndexBuffer
                | Function::ConvertIndexIndirectBuffer
                | Function::ConvertIndexIndirectLineLoopBuffer
                | Function::ConvertIndirectLineLoopBuffer
                | Function::ConvertVertexBuffer
                | Function::BlitResolveStencilNoExport
                | Function::CopyImageToBuffer
                | Function::GenerateMipmap
                | Function::TransCodeEtcToBc
                | Function::GenerateFragmentShadingRate
        )
    }

    /// Shader stages that see this function's descriptors and push constants.
    pub fn stages(self) -> wgpu::ShaderStages {
        if self.is_compute() {
            wgpu::ShaderStages::COMPUTE
        } else if self == Function::OverlayDraw {
            wgpu::ShaderStages::VERTEX_FRAGMENT
        } else {
            wgpu::ShaderStages::FRAGMENT
        }
    }

    /// Descriptor bindings, one entry per binding numbered from zero.
    ///
    /// `mipmap_levels` is the number of storage images one mipmap dispatch writes.
    pub fn descriptor_set_sizes(self, mipmap_levels: u32) -> Vec<DescriptorPoolSize> {
        use DescriptorType as T;

        let size = |ty, count| DescriptorPoolSize { ty, count };
        let one = |ty| size(ty, 1);
        match self {
            Function::ImageClear => Vec::new(),
            Function::ImageCopy => vec![one(T::SampledImage)],
            Function::BlitResolve | Function::Blit3DSrc => {
                vec![one(T::SampledImage), one(T::SampledImage), one(T::Sampler)]
            }
            Function::ExportStencil => vec![one(T::InputAttachment)],
            Function::OverlayDraw => {
                vec![one(T::UniformBuffer), one(T::UniformBuffer), one(T::SampledImage)]
            }
            Function::ConvertIndexBuffer | Function::ConvertVertexBuffer => {
                vec![one(T::StorageBuffer); 2]
            }
            Function::ConvertIndexIndirectBuffer | Function::ConvertIndexIndirectLineLoopBuffer => {
                vec![one(T::StorageBuffer); 4]
            }
            Function::ConvertIndirectLineLoopBuffer => vec![one(T::StorageBuffer); 3],
            Function::BlitResolveStencilNoExport => {
                vec![one(T::StorageBuffer), one(T::SampledImage), one(T::Sampler)]
            }
            Function::CopyImageToBuffer => vec![one(T::SampledImage), one(T::StorageBuffer)],
            Function::GenerateMipmap => {
                vec![size(T::StorageImage, mipmap_levels), one(T::CombinedImageSampler)]
            }
            Function::TransCodeEtcToBc => vec![one(T::UniformTexelBuffer), one(T::StorageImage)],
            Function::Unresolve(count) => {
                assert!((1..=MAX_UNRESOLVE_ATTACHMENTS).contains(&count));
                vec![one(T::InputAttachment); count as usize]
            }
            Function::GenerateFragmentShadingRate => vec![one(T::StorageImage)],
        }
    }

    /// Size of the push-constant block; zero when the function takes none.
    pub fn push_constant_size(self) -> u32 {
        use core::mem::size_of;

        let size = match self {
            Function::ImageClear => size_of::<ImageClearShaderParams>(),
            Function::ImageCopy => size_of::<ImageCopyShaderParams>(),
            Function::BlitResolve | Function::Blit3DSrc => size_of::<BlitResolveShaderParams>(),
            Function::ExportStencil => size_of::<ExportStencilShaderParams>(),
            Function::OverlayDraw => size_of::<OverlayDrawShaderParams>(),
            Function::ConvertIndexBuffer => size_of::<ConvertIndexShaderParams>(),
            Function::ConvertIndexIndirectBuffer => size_of::<ConvertIndexIndirectShaderParams>(),
            Function::ConvertIndexIndirectLineLoopBuffer => {
                size_of::<ConvertIndexIndirectLineLoopShaderParams>()
            }
            Function::ConvertIndirectLineLoopBuffer => {
                size_of::<ConvertIndirectLineLoopShaderParams>()
            }
            Function::ConvertVertexBuffer => size_of::<ConvertVertexShaderParams>(),
            Function::BlitResolveStencilNoExport => {
                size_of::<BlitResolveStencilNoExportShaderParams>()
            }
            Function::CopyImageToBuffer => size_of::<CopyImageToBufferShaderParams>(),
            Function::GenerateMipmap => size_of::<GenerateMipmapShaderParams>(),
            Function::TransCodeEtcToBc => size_of::<EtcToBcShaderParams>(),
            Function::Unresolve(_) => 0,
            Function::GenerateFragmentShadingRate => {
                size_of::<GenerateFragmentShadingRateShaderParams>()
            }
        };
        size as u32
    }
}

/// Layout objects shared by every pipeline of one [`Function`].
#[derive(Debug, PartialEq, Eq)]
pub struct FunctionResources {
    pub set_layout: DescriptorSetLayoutHandle,
    pub pipeline_layout: PipelineLayoutHandle,
    /// Absent for functions without descriptors.
    pub descriptor_pool: Option<DescriptorPoolHandle>,
    pub push_constants: Option<PushConstantRange>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct GraphicsPipelineKey {
    function: Function,
    vertex: ShaderSource,
    fragment: Option<ShaderSource>,
    desc: GraphicsPipelineDesc,
}

/// An application framebuffer a utility draws into with the caller's render pass.
#[derive(Clone, Debug, PartialEq)]
pub struct FramebufferTarget {
    pub serial: u64,
    pub render_pass: RenderPassDesc,
    pub attachments: Vec<ImageViewHandle>,
    /// The whole framebuffer after pre-rotation.
    pub complete_render_area: Rectangle,
    pub layer_count: u32,
    /// Bit `i` set when color attachment `i` is an enabled draw buffer.
    pub enabled_draw_buffers: u8,
    /// Bit `i` set when color attachment `i` has an alpha channel only through emulation.
    pub emulated_alpha_attachments: u8,
    pub subpass: u32,
}

impl FramebufferTarget {
    fn begin(&self, render_area: Rectangle) -> RenderPassBegin {
        RenderPassBegin {
            desc: self.render_pass,
            framebuffer_serial: self.serial,
            attachments: self.attachments.clone(),
            render_area,
            load_op: LoadOp::Load,
            layer_count: self.layer_count,
        }
    }
}

/// Lazily built internal programs plus the state needed to record them.
///
/// Owned by one context and used from its recording thread only.
#[derive(Debug)]
pub struct UtilsEngine {
    config: UtilsConfig,
    resources: HashMap<Function, Arc<FunctionResources>>,
    shader_modules: HashMap<ShaderSource, ShaderModuleHandle>,
    compute_pipelines: HashMap<(Function, ShaderKey), PipelineHandle>,
    graphics_pipelines: HashMap<GraphicsPipelineKey, PipelineHandle>,
    point_sampler: Option<SamplerHandle>,
    linear_sampler: Option<SamplerHandle>,
    hits: u64,
    misses: u64,
    next_framebuffer_serial: u64,
}

impl Default for UtilsEngine {
    fn default() -> Self {
        Self::new(UtilsConfig::default())
    }
}

impl UtilsEngine {
    pub fn new(config: UtilsConfig) -> Self {
        Self {
            config,
            resources: HashMap::new(),
            shader_modules: HashMap::new(),
            compute_pipelines: HashMap::new(),
            graphics_pipelines: HashMap::new(),
            point_sampler: None,
            linear_sampler: None,
            hits: 0,
            misses: 0,
            next_framebuffer_serial: TEMPORARY_FRAMEBUFFER_SERIAL_BASE,
        }
    }

    pub fn config(&self) -> &UtilsConfig {
        &self.config
    }

    /// Features of `device` after configuration overrides.
    pub fn features(&self, device: &dyn Device) -> Features {
        self.config.apply(device.features())
    }

    /// Creates the layouts and pool of `function` unless they already exist.
    ///
    /// Bindings are numbered from zero in `set_sizes` order. Nothing is cached if any creation
    /// step fails, so a later call retries from scratch.
    pub fn ensure_resources_initialized(
        &mut self,
        device: &mut dyn Device,
        function: Function,
        set_sizes: &[DescriptorPoolSize],
        push_constant_size: u32,
    ) -> Result<Arc<FunctionResources>> {
        if let Some(resources) = self.resources.get(&function) {
            self.hits += 1;
            return Ok(resources.clone());
        }
        self.misses += 1;

        let stages = function.stages();
        let bindings = set_sizes
            .iter()
            .enumerate()
            .map(|(binding, size)| DescriptorSetLayoutBinding {
                binding: binding as u32,
                ty: size.ty,
                count: size.count,
                stages,
            })
            .collect();
        let set_layout =
            device.create_descriptor_set_layout(&DescriptorSetLayoutDesc { bindings })?;

        let push_constants = (push_constant_size > 0).then_some(PushConstantRange {
            stages,
            size: push_constant_size,
        });
        let pipeline_layout = device.create_pipeline_layout(&PipelineLayoutDesc {
            set_layout,
            push_constants,
        })?;

        let pool_sizes: Vec<DescriptorPoolSize> =
            set_sizes.iter().copied().filter(|size| size.count > 0).collect();
        let descriptor_pool = if pool_sizes.is_empty() {
            None
        } else {
            Some(device.create_descriptor_pool(set_layout, &pool_sizes)?)
        };

        tracing::debug!(
            ?function,
            bindings = set_sizes.len(),
            push_constant_size,
            "created utility function resources"
        );

        let resources = Arc::new(FunctionResources {
            set_layout,
            pipeline_layout,
            descriptor_pool,
            push_constants,
        });
        self.resources.insert(function, resources.clone());
        Ok(resources)
    }

    /// Hit/miss counters of [`Self::ensure_resources_initialized`].
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            entries: self.resources.len(),
        }
    }

    pub fn compute_pipeline_count(&self) -> usize {
        self.compute_pipelines.len()
    }

    pub fn graphics_pipeline_count(&self) -> usize {
        self.graphics_pipelines.len()
    }

    fn ensure(
        &mut self,
        device: &mut dyn Device,
        function: Function,
    ) -> Result<Arc<FunctionResources>> {
        let levels = self.config.generate_mipmap_levels(&self.features(device));
        let sizes = function.descriptor_set_sizes(levels);
        self.ensure_resources_initialized(device, function, &sizes, function.push_constant_size())
    }

    fn allocate_descriptor_set(
        &mut self,
        device: &mut dyn Device,
        function: Function,
    ) -> Result<DescriptorSetHandle> {
        let resources = self.ensure(device, function)?;
        let Some(pool) = resources.descriptor_pool else {
            panic!("{function:?} has no descriptors");
        };
        Ok(device.allocate_descriptor_set(pool)?)
    }

    fn shader_module(
        &mut self,
        device: &mut dyn Device,
        source: &ShaderSource,
    ) -> Result<ShaderModuleHandle> {
        if let Some(module) = self.shader_modules.get(source) {
            return Ok(*module);
        }
        let module = device.create_shader_module(source)?;
        tracing::trace!(?source, "created utility shader module");
        self.shader_modules.insert(source.clone(), module);
        Ok(module)
    }

    fn sampler(
        &mut self,
        device: &mut dyn Device,
        filter: wgpu::FilterMode,
    ) -> Result<SamplerHandle> {
        let slot = match filter {
            wgpu::FilterMode::Nearest => &mut self.point_sampler,
            wgpu::FilterMode::Linear => &mut self.linear_sampler,
        };
        if let Some(sampler) = *slot {
            return Ok(sampler);
        }
        let sampler = device.create_sampler(&SamplerDesc { filter })?;
        *slot = Some(sampler);
        Ok(sampler)
    }

    fn point_sampler(&mut self, device: &mut dyn Device) -> Result<SamplerHandle> {
        self.sampler(device, wgpu::FilterMode::Nearest)
    }

    fn linear_sampler(&mut self, device: &mut dyn Device) -> Result<SamplerHandle> {
        self.sampler(device, wgpu::FilterMode::Linear)
    }

    /// Binds the compute pipeline for `shader`, then `set` and `push_constants`.
    fn setup_compute_program(
        &mut self,
        device: &mut dyn Device,
        cmd: &mut dyn CommandRecorder,
        function: Function,
        shader: ShaderKey,
        set: Option<DescriptorSetHandle>,
        push_constants: &[u8],
    ) -> Result<()> {
        debug_assert!(function.is_compute() && shader.program.is_compute());
        let resources = self.ensure(device, function)?;

        let pipeline = match self.compute_pipelines.get(&(function, shader)) {
            Some(pipeline) => *pipeline,
            None => {
                let module = self.shader_module(device, &ShaderSource::Library(shader))?;
                let pipeline = device.create_compute_pipeline(resources.pipeline_layout, module)?;
                tracing::debug!(?function, ?shader, "created utility compute pipeline");
                self.compute_pipelines.insert((function, shader), pipeline);
                pipeline
            }
        };

        cmd.bind_pipeline(PipelineBindPoint::Compute, pipeline);
        if let Some(set) = set {
            cmd.bind_descriptor_set(PipelineBindPoint::Compute, resources.pipeline_layout, set);
        }
        if !push_constants.is_empty() {
            cmd.push_constants(
                resources.pipeline_layout,
                wgpu::ShaderStages::COMPUTE,
                push_constants,
            );
        }
        Ok(())
    }

    /// Binds the graphics pipeline for `desc` and the given shaders, then `set` and
    /// `push_constants`.
    #[allow(clippy::too_many_arguments)]
    fn setup_graphics_program(
        &mut self,
        device: &mut dyn Device,
        cmd: &mut dyn CommandRecorder,
        function: Function,
        vertex: ShaderSource,
        fragment: Option<ShaderSource>,
        desc: &GraphicsPipelineDesc,
        set: Option<DescriptorSetHandle>,
        push_constants: &[u8],
    ) -> Result<()> {
        debug_assert!(!function.is_compute());
        let resources = self.ensure(device, function)?;

        let key = GraphicsPipelineKey {
            function,
            vertex,
            fragment,
            desc: *desc,
        };
        let pipeline = match self.graphics_pipelines.get(&key) {
            Some(pipeline) => *pipeline,
            None => {
                let vertex = self.shader_module(device, &key.vertex)?;
                let fragment = match &key.fragment {
                    Some(source) => Some(self.shader_module(device, source)?),
                    None => None,
                };
                let pipeline = device.create_graphics_pipeline(
                    resources.pipeline_layout,
                    vertex,
                    fragment,
                    desc,
                )?;
                tracing::debug!(
                    ?function,
                    fragment = ?key.fragment,
                    "created utility graphics pipeline"
                );
                self.graphics_pipelines.insert(key, pipeline);
                pipeline
            }
        };

        cmd.bind_pipeline(PipelineBindPoint::Graphics, pipeline);
        if let Some(set) = set {
            cmd.bind_descriptor_set(PipelineBindPoint::Graphics, resources.pipeline_layout, set);
        }
        if !push_constants.is_empty() {
            cmd.push_constants(resources.pipeline_layout, function.stages(), push_constants);
        }
        Ok(())
    }

    fn push_constants(
        &mut self,
        device: &mut dyn Device,
        cmd: &mut dyn CommandRecorder,
        function: Function,
        data: &[u8],
    ) -> Result<()> {
        let resources = self.ensure(device, function)?;
        cmd.push_constants(resources.pipeline_layout, function.stages(), data);
        Ok(())
    }

    fn next_framebuffer_serial(&mut self) -> u64 {
        let serial = self.next_framebuffer_serial;
        self.next_framebuffer_serial += 1;
        serial
    }

    /// Opens a render pass over a single temporary attachment.
    fn start_render_pass(
        &mut self,
        cmd: &mut dyn CommandRecorder,
        desc: RenderPassDesc,
        attachment: ImageViewHandle,
        render_area: Rectangle,
        load_op: LoadOp,
    ) -> Result<()> {
        let begin = RenderPassBegin {
            desc,
            framebuffer_serial: self.next_framebuffer_serial(),
            attachments: vec![attachment],
            render_area,
            load_op,
            layer_count: 1,
        };
        begin_render_pass(cmd, begin)
    }
}

/// Opens `begin`, closing whatever pass is currently open.
fn begin_render_pass(cmd: &mut dyn CommandRecorder, begin: RenderPassBegin) -> Result<()> {
    if cmd.active_render_pass().is_some() {
        cmd.end_render_pass(RenderPassClosureReason::NewRenderPass);
    }
    cmd.begin_render_pass(begin)?;
    Ok(())
}

/// Closes the open render pass, if any, before recording outside-render-pass work.
pub(crate) fn end_render_pass_for_outside_commands(cmd: &mut dyn CommandRecorder) {
    if cmd.active_render_pass().is_some() {
        cmd.end_render_pass(RenderPassClosureReason::OutsideRenderPassCommands);
    }
}

/// Depth and stencil dynamic state for passes that touch neither.
fn set_depth_stencil_unused(features: &Features, cmd: &mut dyn CommandRecorder) {
    if features.supports_dynamic_depth_stencil_state {
        cmd.set_depth_state(DepthState::default());
        cmd.set_stencil_state(StencilState::default());
    }
}

/// Depth state that overwrites depth unconditionally.
fn depth_state_for_write(clamp_enabled: bool) -> DepthState {
    DepthState {
        test_enabled: true,
        write_enabled: true,
        compare: wgpu::CompareFunction::Always,
        clamp_enabled,
    }
}

/// One storage-buffer descriptor per buffer at consecutive bindings starting at `first_binding`.
fn storage_buffer_writes(first_binding: u32, buffers: &[&BufferHelper]) -> Vec<DescriptorWrite> {
    buffers
        .iter()
        .enumerate()
        .map(|(i, buffer)| DescriptorWrite {
            binding: first_binding + i as u32,
            array_element: 0,
            ty: DescriptorType::StorageBuffer,
            resource: buffer_resource(buffer),
        })
        .collect()
}

fn buffer_resource(buffer: &BufferHelper) -> DescriptorResource {
    DescriptorResource::Buffer {
        buffer: buffer.handle,
        offset: buffer.offset,
        size: buffer.size,
    }
}

/// Scratch buffer for passes that stage data between a copy and a dispatch.
pub(crate) fn create_scratch_buffer(
    device: &mut dyn Device,
    size: u64,
    usage: wgpu::BufferUsages,
) -> Result<BufferHelper> {
    let handle: BufferHandle = device.create_buffer(size, usage)?;
    Ok(BufferHelper::new(handle, 0, size))
}
