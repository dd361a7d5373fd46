//! Backend abstraction used by the utility engine.
//!
//! [`Device`] creates objects (layouts, pools, samplers, shader modules, pipelines, views,
//! buffers) and [`CommandRecorder`] records work into the current command stream. The engine only
//! ever talks to these two traits; [`recording`] provides an implementation that logs every call.

pub mod recording;

use aero_gles_texture::Rectangle;
use bitflags::bitflags;

use crate::error::BackendError;
use crate::shaders::ShaderKey;
use crate::utils::flags::UnresolveFlags;

/// Maximum number of color attachments in a framebuffer.
pub const MAX_DRAW_BUFFERS: usize = 8;

macro_rules! handle {
    ($($(#[$meta:meta])* $name:ident),* $(,)?) => {
        $(
            $(#[$meta])*
            #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
            pub struct $name(pub u32);
        )*
    };
}

handle!(
    DescriptorSetLayoutHandle,
    PipelineLayoutHandle,
    DescriptorPoolHandle,
    DescriptorSetHandle,
    SamplerHandle,
    ShaderModuleHandle,
    PipelineHandle,
    ImageHandle,
    ImageViewHandle,
    BufferHandle,
);

/// Optional capabilities the engine branches on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Features {
    pub supports_shader_stencil_export: bool,
    pub supports_shader_float16: bool,
    pub supports_index_type_uint8: bool,
    pub supports_depth_clamp: bool,
    pub supports_dynamic_depth_stencil_state: bool,
    pub supports_etc_to_bc_transcoding: bool,
    pub max_per_stage_storage_images: u32,
}

impl Default for Features {
    fn default() -> Self {
        Self {
            supports_shader_stencil_export: false,
            supports_shader_float16: false,
            supports_index_type_uint8: false,
            supports_depth_clamp: true,
            supports_dynamic_depth_stencil_state: true,
            supports_etc_to_bc_transcoding: false,
            max_per_stage_storage_images: 8,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DescriptorType {
    StorageBuffer,
    UniformBuffer,
    UniformTexelBuffer,
    SampledImage,
    StorageImage,
    CombinedImageSampler,
    Sampler,
    InputAttachment,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DescriptorSetLayoutBinding {
    pub binding: u32,
    pub ty: DescriptorType,
    pub count: u32,
    pub stages: wgpu::ShaderStages,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct DescriptorSetLayoutDesc {
    pub bindings: Vec<DescriptorSetLayoutBinding>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DescriptorPoolSize {
    pub ty: DescriptorType,
    pub count: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PushConstantRange {
    pub stages: wgpu::ShaderStages,
    pub size: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PipelineLayoutDesc {
    pub set_layout: DescriptorSetLayoutHandle,
    pub push_constants: Option<PushConstantRange>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SamplerDesc {
    pub filter: wgpu::FilterMode,
}

/// Where a shader module's code comes from.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ShaderSource {
    /// A prebuilt variant from the backend's shader library.
    Library(ShaderKey),
    /// A fragment shader generated from an unresolve attachment description.
    Unresolve(UnresolveFlags),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PipelineBindPoint {
    Compute,
    Graphics,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DepthState {
    pub test_enabled: bool,
    pub write_enabled: bool,
    pub compare: wgpu::CompareFunction,
    pub clamp_enabled: bool,
}

impl Default for DepthState {
    fn default() -> Self {
        Self {
            test_enabled: false,
            write_enabled: false,
            compare: wgpu::CompareFunction::Always,
            clamp_enabled: false,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct StencilState {
    pub test_enabled: bool,
    pub compare: wgpu::CompareFunction,
    pub pass_op: wgpu::StencilOperation,
    pub fail_op: wgpu::StencilOperation,
    pub depth_fail_op: wgpu::StencilOperation,
}

impl Default for StencilState {
    fn default() -> Self {
        Self {
            test_enabled: false,
            compare: wgpu::CompareFunction::Always,
            pass_op: wgpu::StencilOperation::Keep,
            fail_op: wgpu::StencilOperation::Keep,
            depth_fail_op: wgpu::StencilOperation::Keep,
        }
    }
}

impl StencilState {
    /// Always passes and replaces the stored value with the reference.
    pub fn replace_always() -> Self {
        Self {
            test_enabled: true,
            compare: wgpu::CompareFunction::Always,
            pass_op: wgpu::StencilOperation::Replace,
            fail_op: wgpu::StencilOperation::Replace,
            depth_fail_op: wgpu::StencilOperation::Replace,
        }
    }
}

/// Attachment formats and sample count a pipeline is compatible with.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct RenderPassDesc {
    pub colors: [Option<wgpu::TextureFormat>; MAX_DRAW_BUFFERS],
    pub depth_stencil: Option<wgpu::TextureFormat>,
    pub samples: u32,
}

impl RenderPassDesc {
    pub fn color_count(&self) -> usize {
        self.colors.iter().rposition(Option::is_some).map_or(0, |i| i + 1)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GraphicsPipelineDesc {
    pub render_pass: RenderPassDesc,
    pub topology: wgpu::PrimitiveTopology,
    pub color_write_masks: [wgpu::ColorWrites; MAX_DRAW_BUFFERS],
    pub blend: Option<wgpu::BlendState>,
    pub depth: DepthState,
    pub stencil: StencilState,
    pub subpass: u32,
}

impl GraphicsPipelineDesc {
    pub fn new(render_pass: RenderPassDesc) -> Self {
        Self {
            render_pass,
            topology: wgpu::PrimitiveTopology::TriangleList,
            color_write_masks: [wgpu::ColorWrites::ALL; MAX_DRAW_BUFFERS],
            blend: None,
            depth: DepthState::default(),
            stencil: StencilState::default(),
            subpass: 0,
        }
    }

    pub fn set_color_write_masks(&mut self, mask: wgpu::ColorWrites, enabled_draw_buffers: u8) {
        for (i, write_mask) in self.color_write_masks.iter_mut().enumerate() {
            *write_mask = if enabled_draw_buffers & (1 << i) != 0 {
                mask
            } else {
                wgpu::ColorWrites::empty()
            };
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ImageViewDesc {
    pub image: ImageHandle,
    pub dimension: wgpu::TextureViewDimension,
    pub format: Option<wgpu::TextureFormat>,
    pub aspect: wgpu::TextureAspect,
    pub base_level: u32,
    pub level_count: u32,
    pub base_layer: u32,
    pub layer_count: u32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ClearValue {
    Float([f32; 4]),
    Int([i32; 4]),
    Uint([u32; 4]),
    DepthStencil { depth: f32, stencil: u32 },
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LoadOp {
    Load,
    Clear(ClearValue),
    DontCare,
}

/// Parameters for opening a render pass.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderPassBegin {
    pub desc: RenderPassDesc,
    pub framebuffer_serial: u64,
    pub attachments: Vec<ImageViewHandle>,
    pub render_area: Rectangle,
    pub load_op: LoadOp,
    pub layer_count: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RenderPassClosureReason {
    /// A utility started a pass of its own while another was open.
    NewRenderPass,
    /// Work that must be recorded outside a render pass (dispatches, copies, barriers).
    OutsideRenderPassCommands,
    TemporaryForClearTexture,
    TemporaryForImageClear,
    TemporaryForImageCopy,
    TemporaryForOverlayDraw,
    GenerateMipmapWithDraw,
    FramebufferFetchEmulation,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub min_depth: f32,
    pub max_depth: f32,
}

impl Viewport {
    pub fn from_rect(rect: Rectangle, min_depth: f32, max_depth: f32) -> Self {
        Self {
            x: rect.x as f32,
            y: rect.y as f32,
            width: rect.width as f32,
            height: rect.height as f32,
            min_depth,
            max_depth,
        }
    }
}

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct PipelineStages: u32 {
        const TOP_OF_PIPE = 1 << 0;
        const VERTEX_SHADER = 1 << 1;
        const FRAGMENT_SHADER = 1 << 2;
        const COMPUTE_SHADER = 1 << 3;
        const COLOR_ATTACHMENT_OUTPUT = 1 << 4;
        const EARLY_FRAGMENT_TESTS = 1 << 5;
        const LATE_FRAGMENT_TESTS = 1 << 6;
        const TRANSFER = 1 << 7;
        const DRAW_INDIRECT = 1 << 8;
        const VERTEX_INPUT = 1 << 9;
    }
}

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Access: u32 {
        const SHADER_READ = 1 << 0;
        const SHADER_WRITE = 1 << 1;
        const TRANSFER_READ = 1 << 2;
        const TRANSFER_WRITE = 1 << 3;
        const COLOR_ATTACHMENT_READ = 1 << 4;
        const COLOR_ATTACHMENT_WRITE = 1 << 5;
        const DEPTH_STENCIL_ATTACHMENT_WRITE = 1 << 6;
        const INDEX_READ = 1 << 7;
        const INDIRECT_COMMAND_READ = 1 << 8;
        const VERTEX_ATTRIBUTE_READ = 1 << 9;
    }
}

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct ImageAspects: u8 {
        const COLOR = 1 << 0;
        const DEPTH = 1 << 1;
        const STENCIL = 1 << 2;
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ImageLayout {
    #[default]
    Undefined,
    General,
    ColorAttachment,
    DepthStencilAttachment,
    ShaderReadOnly,
    TransferSrc,
    TransferDst,
    Present,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MemoryBarrier {
    pub src_stages: PipelineStages,
    pub src_access: Access,
    pub dst_stages: PipelineStages,
    pub dst_access: Access,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ImageBarrier {
    pub image: ImageHandle,
    pub aspects: ImageAspects,
    pub base_level: u32,
    pub level_count: u32,
    pub base_layer: u32,
    pub layer_count: u32,
    pub old_layout: ImageLayout,
    pub new_layout: ImageLayout,
    pub src_stages: PipelineStages,
    pub src_access: Access,
    pub dst_stages: PipelineStages,
    pub dst_access: Access,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BufferCopy {
    pub src_offset: u64,
    pub dst_offset: u64,
    pub size: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BufferImageCopy {
    pub buffer_offset: u64,
    /// Texels per row in the buffer; zero means tightly packed.
    pub buffer_row_length: u32,
    pub buffer_image_height: u32,
    pub aspects: ImageAspects,
    pub level: u32,
    pub base_layer: u32,
    pub layer_count: u32,
    pub offset: [i32; 3],
    pub extent: [u32; 3],
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DescriptorResource {
    Buffer { buffer: BufferHandle, offset: u64, size: u64 },
    Image { view: ImageViewHandle, layout: ImageLayout },
    CombinedImageSampler { view: ImageViewHandle, sampler: SamplerHandle },
    Sampler(SamplerHandle),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DescriptorWrite {
    pub binding: u32,
    pub array_element: u32,
    pub ty: DescriptorType,
    pub resource: DescriptorResource,
}

/// Object creation.
pub trait Device {
    fn features(&self) -> Features;

    fn create_descriptor_set_layout(
        &mut self,
        desc: &DescriptorSetLayoutDesc,
    ) -> Result<DescriptorSetLayoutHandle, BackendError>;

    fn create_pipeline_layout(
        &mut self,
        desc: &PipelineLayoutDesc,
    ) -> Result<PipelineLayoutHandle, BackendError>;

    fn create_descriptor_pool(
        &mut self,
        layout: DescriptorSetLayoutHandle,
        sizes: &[DescriptorPoolSize],
    ) -> Result<DescriptorPoolHandle, BackendError>;

    fn allocate_descriptor_set(
        &mut self,
        pool: DescriptorPoolHandle,
    ) -> Result<DescriptorSetHandle, BackendError>;

    fn create_sampler(&mut self, desc: &SamplerDesc) -> Result<SamplerHandle, BackendError>;

    fn create_shader_module(
        &mut self,
        source: &ShaderSource,
    ) -> Result<ShaderModuleHandle, BackendError>;

    fn create_compute_pipeline(
        &mut self,
        layout: PipelineLayoutHandle,
        module: ShaderModuleHandle,
    ) -> Result<PipelineHandle, BackendError>;

    fn create_graphics_pipeline(
        &mut self,
        layout: PipelineLayoutHandle,
        vertex: ShaderModuleHandle,
        fragment: Option<ShaderModuleHandle>,
        desc: &GraphicsPipelineDesc,
    ) -> Result<PipelineHandle, BackendError>;

    fn create_image_view(&mut self, desc: &ImageViewDesc) -> Result<ImageViewHandle, BackendError>;

    fn create_buffer(
        &mut self,
        size: u64,
        usage: wgpu::BufferUsages,
    ) -> Result<BufferHandle, BackendError>;
}

/// Command recording into the current command stream.
pub trait CommandRecorder {
    /// Serial of the framebuffer the open render pass draws into, if a pass is open.
    fn active_render_pass(&self) -> Option<u64>;
    fn begin_render_pass(&mut self, begin: RenderPassBegin) -> Result<(), BackendError>;
    fn end_render_pass(&mut self, reason: RenderPassClosureReason);
    fn grow_render_area(&mut self, area: Rectangle);

    fn bind_pipeline(&mut self, bind_point: PipelineBindPoint, pipeline: PipelineHandle);
    fn update_descriptor_set(&mut self, set: DescriptorSetHandle, writes: &[DescriptorWrite]);
    fn bind_descriptor_set(
        &mut self,
        bind_point: PipelineBindPoint,
        layout: PipelineLayoutHandle,
        set: DescriptorSetHandle,
    );
    fn push_constants(
        &mut self,
        layout: PipelineLayoutHandle,
        stages: wgpu::ShaderStages,
        data: &[u8],
    );

    fn dispatch(&mut self, x: u32, y: u32, z: u32);
    fn draw(&mut self, vertex_count: u32, first_vertex: u32);
    fn draw_instanced(&mut self, vertex_count: u32, instance_count: u32, first_vertex: u32);

    fn set_viewport(&mut self, viewport: Viewport);
    fn set_scissor(&mut self, scissor: Rectangle);
    fn set_depth_state(&mut self, state: DepthState);
    fn set_stencil_state(&mut self, state: StencilState);
    fn set_stencil_compare_mask(&mut self, mask: u8);
    fn set_stencil_write_mask(&mut self, mask: u8);
    fn set_stencil_reference(&mut self, reference: u8);

    fn memory_barrier(&mut self, barrier: MemoryBarrier);
    fn image_barrier(&mut self, barrier: ImageBarrier);

    fn copy_buffer(&mut self, src: BufferHandle, dst: BufferHandle, regions: &[BufferCopy]);
    /// Host write into a buffer, ordered before the commands recorded after it.
    fn write_buffer(&mut self, buffer: BufferHandle, offset: u64, data: &[u8]);
    fn copy_buffer_to_image(
        &mut self,
        src: BufferHandle,
        dst: ImageHandle,
        dst_layout: ImageLayout,
        region: BufferImageCopy,
    );
    fn copy_image_to_buffer(
        &mut self,
        src: ImageHandle,
        src_layout: ImageLayout,
        dst: BufferHandle,
        region: BufferImageCopy,
    );
    fn clear_image(
        &mut self,
        image: ImageHandle,
        aspects: ImageAspects,
        level: u32,
        base_layer: u32,
        layer_count: u32,
        value: ClearValue,
    );
}
