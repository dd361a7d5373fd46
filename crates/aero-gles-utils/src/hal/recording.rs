//! A [`Device`] and [`CommandRecorder`] that log every call instead of talking to a GPU.
//!
//! Used by tests to assert on the exact object creation and command sequences the engine emits,
//! and as a dry-run backend when tracing which commands an operation would record.

use aero_gles_texture::Rectangle;

use super::*;

/// Which device entry point [`RecordingDevice::fail_on`] makes fail.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FailPoint {
    DescriptorSetLayout,
    PipelineLayout,
    DescriptorPool,
    DescriptorSet,
    Sampler,
    ShaderModule,
    ComputePipeline,
    GraphicsPipeline,
    ImageView,
    Buffer,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Created {
    DescriptorSetLayout(DescriptorSetLayoutHandle, DescriptorSetLayoutDesc),
    PipelineLayout(PipelineLayoutHandle, PipelineLayoutDesc),
    DescriptorPool(DescriptorPoolHandle, Vec<DescriptorPoolSize>),
    DescriptorSet(DescriptorSetHandle, DescriptorPoolHandle),
    Sampler(SamplerHandle, SamplerDesc),
    ShaderModule(ShaderModuleHandle, ShaderSource),
    ComputePipeline(PipelineHandle, PipelineLayoutHandle, ShaderModuleHandle),
    GraphicsPipeline {
        pipeline: PipelineHandle,
        layout: PipelineLayoutHandle,
        vertex: ShaderModuleHandle,
        fragment: Option<ShaderModuleHandle>,
        desc: GraphicsPipelineDesc,
    },
    ImageView(ImageViewHandle, ImageViewDesc),
    Buffer(BufferHandle, u64, wgpu::BufferUsages),
}

impl Created {
    pub fn kind(&self) -> FailPoint {
        match self {
            Created::DescriptorSetLayout(..) => FailPoint::DescriptorSetLayout,
            Created::PipelineLayout(..) => FailPoint::PipelineLayout,
            Created::DescriptorPool(..) => FailPoint::DescriptorPool,
            Created::DescriptorSet(..) => FailPoint::DescriptorSet,
            Created::Sampler(..) => FailPoint::Sampler,
            Created::ShaderModule(..) => FailPoint::ShaderModule,
            Created::ComputePipeline(..) => FailPoint::ComputePipeline,
            Created::GraphicsPipeline { .. } => FailPoint::GraphicsPipeline,
            Created::ImageView(..) => FailPoint::ImageView,
            Created::Buffer(..) => FailPoint::Buffer,
        }
    }
}

#[derive(Debug, Default)]
pub struct RecordingDevice {
    pub features: Features,
    created: Vec<Created>,
    next_id: u32,
    fail_on: Option<(FailPoint, BackendError)>,
}

impl RecordingDevice {
    pub fn new(features: Features) -> Self {
        Self {
            features,
            ..Self::default()
        }
    }

    /// Makes every subsequent call to `point` fail with `error`.
    pub fn fail_on(&mut self, point: FailPoint, error: BackendError) {
        self.fail_on = Some((point, error));
    }

    pub fn clear_failure(&mut self) {
        self.fail_on = None;
    }

    pub fn created(&self) -> &[Created] {
        &self.created
    }

    pub fn count(&self, kind: FailPoint) -> usize {
        self.created.iter().filter(|c| c.kind() == kind).count()
    }

    pub fn graphics_pipeline_desc(
        &self,
        pipeline: PipelineHandle,
    ) -> Option<&GraphicsPipelineDesc> {
        self.created.iter().find_map(|c| match c {
            Created::GraphicsPipeline { pipeline: p, desc, .. } if *p == pipeline => Some(desc),
            _ => None,
        })
    }

    pub fn shader_source(&self, module: ShaderModuleHandle) -> Option<&ShaderSource> {
        self.created.iter().find_map(|c| match c {
            Created::ShaderModule(m, source) if *m == module => Some(source),
            _ => None,
        })
    }

    fn check(&self, point: FailPoint) -> Result<u32, BackendError> {
        match self.fail_on {
            Some((p, err)) if p == point => Err(err),
            _ => Ok(self.next_id + 1),
        }
    }

    fn record(&mut self, id: u32, created: Created) {
        self.next_id = id;
        self.created.push(created);
    }
}

impl Device for RecordingDevice {
    fn features(&self) -> Features {
        self.features
    }

    fn create_descriptor_set_layout(
        &mut self,
        desc: &DescriptorSetLayoutDesc,
    ) -> Result<DescriptorSetLayoutHandle, BackendError> {
        let id = self.check(FailPoint::DescriptorSetLayout)?;
        let handle = DescriptorSetLayoutHandle(id);
        self.record(id, Created::DescriptorSetLayout(handle, desc.clone()));
        Ok(handle)
    }

    fn create_pipeline_layout(
        &mut self,
        desc: &PipelineLayoutDesc,
    ) -> Result<PipelineLayoutHandle, BackendError> {
        let id = self.check(FailPoint::PipelineLayout)?;
        let handle = PipelineLayoutHandle(id);
        self.record(id, Created::PipelineLayout(handle, *desc));
        Ok(handle)
    }

    fn create_descriptor_pool(
        &mut self,
        _layout: DescriptorSetLayoutHandle,
        sizes: &[DescriptorPoolSize],
    ) -> Result<DescriptorPoolHandle, BackendError> {
        let id = self.check(FailPoint::DescriptorPool)?;
        let handle = DescriptorPoolHandle(id);
        self.record(id, Created::DescriptorPool(handle, sizes.to_vec()));
        Ok(handle)
    }

    fn allocate_descriptor_set(
        &mut self,
        pool: DescriptorPoolHandle,
    ) -> Result<DescriptorSetHandle, BackendError> {
        let id = self.check(FailPoint::DescriptorSet)?;
        let handle = DescriptorSetHandle(id);
        self.record(id, Created::DescriptorSet(handle, pool));
        Ok(handle)
    }

    fn create_sampler(&mut self, desc: &SamplerDesc) -> Result<SamplerHandle, BackendError> {
        let id = self.check(FailPoint::Sampler)?;
        let handle = SamplerHandle(id);
        self.record(id, Created::Sampler(handle, *desc));
        Ok(handle)
    }

    fn create_shader_module(
        &mut self,
        source: &ShaderSource,
    ) -> Result<ShaderModuleHandle, BackendError> {
        let id = self.check(FailPoint::ShaderModule)?;
        let handle = ShaderModuleHandle(id);
        self.record(id, Created::ShaderModule(handle, source.clone()));
        Ok(handle)
    }

    fn create_compute_pipeline(
        &mut self,
        layout: PipelineLayoutHandle,
        module: ShaderModuleHandle,
    ) -> Result<PipelineHandle, BackendError> {
        let id = self.check(FailPoint::ComputePipeline)?;
        let handle = PipelineHandle(id);
        self.record(id, Created::ComputePipeline(handle, layout, module));
        Ok(handle)
    }

    fn create_graphics_pipeline(
        &mut self,
        layout: PipelineLayoutHandle,
        vertex: ShaderModuleHandle,
        fragment: Option<ShaderModuleHandle>,
        desc: &GraphicsPipelineDesc,
    ) -> Result<PipelineHandle, BackendError> {
        let id = self.check(FailPoint::GraphicsPipeline)?;
        let handle = PipelineHandle(id);
        self.record(
            id,
            Created::GraphicsPipeline {
                pipeline: handle,
                layout,
                vertex,
                fragment,
                desc: *desc,
            },
        );
        Ok(handle)
    }

    fn create_image_view(&mut self, desc: &ImageViewDesc) -> Result<ImageViewHandle, BackendError> {
        let id = self.check(FailPoint::ImageView)?;
        let handle = ImageViewHandle(id);
        self.record(id, Created::ImageView(handle, *desc));
        Ok(handle)
    }

    fn create_buffer(
        &mut self,
        size: u64,
        usage: wgpu::BufferUsages,
    ) -> Result<BufferHandle, BackendError> {
        let id = self.check(FailPoint::Buffer)?;
        let handle = BufferHandle(id);
        self.record(id, Created::Buffer(handle, size, usage));
        Ok(handle)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    BeginRenderPass(RenderPassBegin),
    EndRenderPass(RenderPassClosureReason),
    GrowRenderArea(Rectangle),
    BindPipeline(PipelineBindPoint, PipelineHandle),
    UpdateDescriptorSet(DescriptorSetHandle, Vec<DescriptorWrite>),
    BindDescriptorSet(PipelineBindPoint, PipelineLayoutHandle, DescriptorSetHandle),
    PushConstants(PipelineLayoutHandle, wgpu::ShaderStages, Vec<u8>),
    Dispatch(u32, u32, u32),
    Draw { vertex_count: u32, first_vertex: u32 },
    DrawInstanced { vertex_count: u32, instance_count: u32, first_vertex: u32 },
    SetViewport(Viewport),
    SetScissor(Rectangle),
    SetDepthState(DepthState),
    SetStencilState(StencilState),
    SetStencilCompareMask(u8),
    SetStencilWriteMask(u8),
    SetStencilReference(u8),
    MemoryBarrier(MemoryBarrier),
    ImageBarrier(ImageBarrier),
    CopyBuffer(BufferHandle, BufferHandle, Vec<BufferCopy>),
    WriteBuffer(BufferHandle, u64, Vec<u8>),
    CopyBufferToImage(BufferHandle, ImageHandle, ImageLayout, BufferImageCopy),
    CopyImageToBuffer(ImageHandle, ImageLayout, BufferHandle, BufferImageCopy),
    ClearImage {
        image: ImageHandle,
        aspects: ImageAspects,
        level: u32,
        base_layer: u32,
        layer_count: u32,
        value: ClearValue,
    },
}

#[derive(Debug, Default)]
pub struct RecordingCommands {
    commands: Vec<Command>,
    active_render_pass: Option<u64>,
    fail_begin_render_pass: Option<BackendError>,
}

impl RecordingCommands {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn take(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.commands)
    }

    pub fn fail_begin_render_pass(&mut self, error: BackendError) {
        self.fail_begin_render_pass = Some(error);
    }

    pub fn dispatches(&self) -> Vec<(u32, u32, u32)> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                Command::Dispatch(x, y, z) => Some((*x, *y, *z)),
                _ => None,
            })
            .collect()
    }

    pub fn push_constant_blocks(&self) -> Vec<&[u8]> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                Command::PushConstants(_, _, data) => Some(data.as_slice()),
                _ => None,
            })
            .collect()
    }
}

impl CommandRecorder for RecordingCommands {
    fn active_render_pass(&self) -> Option<u64> {
        self.active_render_pass
    }

    fn begin_render_pass(&mut self, begin: RenderPassBegin) -> Result<(), BackendError> {
        if let Some(err) = self.fail_begin_render_pass {
            return Err(err);
        }
        self.active_render_pass = Some(begin.framebuffer_serial);
        self.commands.push(Command::BeginRenderPass(begin));
        Ok(())
    }

    fn end_render_pass(&mut self, reason: RenderPassClosureReason) {
        self.active_render_pass = None;
        self.commands.push(Command::EndRenderPass(reason));
    }

    fn grow_render_area(&mut self, area: Rectangle) {
        self.commands.push(Command::GrowRenderArea(area));
    }

    fn bind_pipeline(&mut self, bind_point: PipelineBindPoint, pipeline: PipelineHandle) {
        self.commands.push(Command::BindPipeline(bind_point, pipeline));
    }

    fn update_descriptor_set(&mut self, set: DescriptorSetHandle, writes: &[DescriptorWrite]) {
        self.commands
            .push(Command::UpdateDescriptorSet(set, writes.to_vec()));
    }

    fn bind_descriptor_set(
        &mut self,
        bind_point: PipelineBindPoint,
        layout: PipelineLayoutHandle,
        set: DescriptorSetHandle,
    ) {
        self.commands
            .push(Command::BindDescriptorSet(bind_point, layout, set));
    }

    fn push_constants(
        &mut self,
        layout: PipelineLayoutHandle,
        stages: wgpu::ShaderStages,
        data: &[u8],
    ) {
        self.commands
            .push(Command::PushConstants(layout, stages, data.to_vec()));
    }

    fn dispatch(&mut self, x: u32, y: u32, z: u32) {
        self.commands.push(Command::Dispatch(x, y, z));
    }

    fn draw(&mut self, vertex_count: u32, first_vertex: u32) {
        self.commands.push(Command::Draw {
            vertex_count,
            first_vertex,
        });
    }

    fn draw_instanced(&mut self, vertex_count: u32, instance_count: u32, first_vertex: u32) {
        self.commands.push(Command::DrawInstanced {
            vertex_count,
            instance_count,
            first_vertex,
        });
    }

    fn set_viewport(&mut self, viewport: Viewport) {
        self.commands.push(Command::SetViewport(viewport));
    }

    fn set_scissor(&mut self, scissor: Rectangle) {
        self.commands.push(Command::SetScissor(scissor));
    }

    fn set_depth_state(&mut self, state: DepthState) {
        self.commands.push(Command::SetDepthState(state));
    }

    fn set_stencil_state(&mut self, state: StencilState) {
        self.commands.push(Command::SetStencilState(state));
    }

    fn set_stencil_compare_mask(&mut self, mask: u8) {
        self.commands.push(Command::SetStencilCompareMask(mask));
    }

    fn set_stencil_write_mask(&mut self, mask: u8) {
        self.commands.push(Command::SetStencilWriteMask(mask));
    }

    fn set_stencil_reference(&mut self, reference: u8) {
        self.commands.push(Command::SetStencilReference(reference));
    }

    fn memory_barrier(&mut self, barrier: MemoryBarrier) {
        self.commands.push(Command::MemoryBarrier(barrier));
    }

    fn image_barrier(&mut self, barrier: ImageBarrier) {
        self.commands.push(Command::ImageBarrier(barrier));
    }

    fn copy_buffer(&mut self, src: BufferHandle, dst: BufferHandle, regions: &[BufferCopy]) {
        self.commands
            .push(Command::CopyBuffer(src, dst, regions.to_vec()));
    }

    fn write_buffer(&mut self, buffer: BufferHandle, offset: u64, data: &[u8]) {
        self.commands
            .push(Command::WriteBuffer(buffer, offset, data.to_vec()));
    }

    fn copy_buffer_to_image(
        &mut self,
        src: BufferHandle,
        dst: ImageHandle,
        dst_layout: ImageLayout,
        region: BufferImageCopy,
    ) {
        self.commands
            .push(Command::CopyBufferToImage(src, dst, dst_layout, region));
    }

    fn copy_image_to_buffer(
        &mut self,
        src: ImageHandle,
        src_layout: ImageLayout,
        dst: BufferHandle,
        region: BufferImageCopy,
    ) {
        self.commands
            .push(Command::CopyImageToBuffer(src, src_layout, dst, region));
    }

    fn clear_image(
        &mut self,
        image: ImageHandle,
        aspects: ImageAspects,
        level: u32,
        base_layer: u32,
        layer_count: u32,
        value: ClearValue,
    ) {
        self.commands.push(Command::ClearImage {
            image,
            aspects,
            level,
            base_layer,
            layer_count,
            value,
        });
    }
}
